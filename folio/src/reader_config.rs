//! Reader configuration from folio.toml

use crate::search::SearchOptions;
use crate::settings::{FontSizeBounds, ReaderSettings, Theme};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of the configuration file
pub const CONFIG_FILE_NAME: &str = "folio.toml";

/// Main configuration from folio.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// JSON file holding positions, bookmarks and settings
    pub storage_path: PathBuf,

    /// Defaults for reader settings
    pub reader: ReaderDefaults,

    /// Search tuning
    pub search: SearchConfig,
}

/// Defaults and limits for reader settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderDefaults {
    /// Font size used until the user picks one, in pixels
    pub default_font_size: u32,

    /// Smallest font size the user may pick
    pub min_font_size: u32,

    /// Largest font size the user may pick
    pub max_font_size: u32,

    /// Theme used until the user picks one
    pub default_theme: Theme,
}

/// Search configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Characters of context on each side of a hit
    pub context_chars: usize,

    /// Cap on the number of hits reported
    pub max_results: Option<usize>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(".folio-state.json"),
            reader: ReaderDefaults::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for ReaderDefaults {
    fn default() -> Self {
        let bounds = FontSizeBounds::default();
        let settings = ReaderSettings::default();
        Self {
            default_font_size: settings.font_size,
            min_font_size: bounds.min,
            max_font_size: bounds.max,
            default_theme: settings.theme,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let options = SearchOptions::default();
        Self {
            context_chars: options.context_chars,
            max_results: options.max_results,
        }
    }
}

impl ReaderConfig {
    /// Load configuration from a folio.toml file
    ///
    /// # Parameters
    /// * `path` - Path to the folio.toml configuration file
    ///
    /// # Returns
    /// * `Ok(ReaderConfig)` - Successfully loaded and validated configuration
    /// * `Err(ReaderConfigError)` - Error reading, parsing or validating the file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReaderConfigError> {
        let content = fs::read_to_string(&path).map_err(ReaderConfigError::IoError)?;

        let config: ReaderConfig =
            toml::from_str(&content).map_err(ReaderConfigError::ParseError)?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ReaderConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            log::info!(
                "No configuration at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// Save configuration to a folio.toml file
    ///
    /// # Parameters
    /// * `path` - Path where the folio.toml file will be written
    ///
    /// # Returns
    /// * `Ok(())` - Successfully saved configuration
    /// * `Err(ReaderConfigError)` - Error serializing or writing the configuration file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ReaderConfigError> {
        let content = toml::to_string_pretty(self).map_err(ReaderConfigError::SerializeError)?;

        fs::write(&path, content).map_err(ReaderConfigError::IoError)?;

        Ok(())
    }

    /// Check that the font size defaults are consistent
    pub fn validate(&self) -> Result<(), ReaderConfigError> {
        let reader = &self.reader;
        if reader.min_font_size == 0 || reader.min_font_size > reader.max_font_size {
            return Err(ReaderConfigError::Invalid(format!(
                "font size range {}..={} is empty",
                reader.min_font_size, reader.max_font_size
            )));
        }
        self.font_bounds()
            .check(reader.default_font_size)
            .map_err(|e| ReaderConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Accepted font size range
    pub fn font_bounds(&self) -> FontSizeBounds {
        FontSizeBounds {
            min: self.reader.min_font_size,
            max: self.reader.max_font_size,
        }
    }

    /// Settings a session starts with before anything is stored
    pub fn default_settings(&self) -> ReaderSettings {
        ReaderSettings {
            font_size: self.reader.default_font_size,
            theme: self.reader.default_theme,
        }
    }

    /// Search options derived from the configuration
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            context_chars: self.search.context_chars,
            max_results: self.search.max_results,
        }
    }
}

/// Errors that can occur when loading or saving reader configuration
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum ReaderConfigError {
    /// IO error when reading or writing file
    IoError(std::io::Error),

    /// Error parsing TOML
    ParseError(toml::de::Error),

    /// Error serializing to TOML
    SerializeError(toml::ser::Error),

    /// Values parse but contradict each other
    Invalid(String),
}

impl std::fmt::Display for ReaderConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ReaderConfigError::ParseError(e) => write!(f, "TOML parse error: {}", e),
            ReaderConfigError::SerializeError(e) => write!(f, "TOML serialize error: {}", e),
            ReaderConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ReaderConfigError {}
