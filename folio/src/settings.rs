//! Reader settings: font size and color theme

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when validating reader settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Font size outside the configured range
    #[error("Font size {size}px is outside the allowed range {min}..={max}px")]
    FontSizeOutOfRange {
        /// Requested size
        size: u32,
        /// Smallest allowed size
        min: u32,
        /// Largest allowed size
        max: u32,
    },

    /// Theme name not recognised
    #[error("Unknown theme '{0}' (expected light, dark or sepia)")]
    UnknownTheme(String),

    /// Stored font size is not a number
    #[error("Invalid font size '{0}'")]
    InvalidFontSize(String),
}

/// Color theme applied to the rendered content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark text on white
    #[default]
    Light,
    /// Light text on near-black
    Dark,
    /// Brown text on cream
    Sepia,
}

/// Colors of one theme, as CSS hex strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    /// Body text color
    pub text: &'static str,
    /// Page background color
    pub background: &'static str,
    /// Unvisited link color
    pub link: &'static str,
    /// Visited link color
    pub visited: &'static str,
}

impl Theme {
    /// All themes, in the order a picker lists them
    pub const ALL: [Theme; 3] = [Theme::Light, Theme::Dark, Theme::Sepia];

    /// Name used in storage and configuration
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Sepia => "sepia",
        }
    }

    /// Colors for this theme
    pub fn palette(self) -> ThemePalette {
        match self {
            Theme::Light => ThemePalette {
                text: "#1a1a1a",
                background: "#ffffff",
                link: "#0066cc",
                visited: "#8000ff",
            },
            Theme::Dark => ThemePalette {
                text: "#e2e8f0",
                background: "#1a1a1a",
                link: "#93c5fd",
                visited: "#c4b5fd",
            },
            Theme::Sepia => ThemePalette {
                text: "#5b4636",
                background: "#f4ecd8",
                link: "#0066cc",
                visited: "#8000ff",
            },
        }
    }

    /// Parse a stored theme name, falling back to [`Theme::Light`]
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or_else(|e| {
            log::warn!("{}, using light theme", e);
            Theme::Light
        })
    }
}

impl FromStr for Theme {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "sepia" => Ok(Theme::Sepia),
            _ => Err(SettingsError::UnknownTheme(s.to_string())),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive range of accepted font sizes, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSizeBounds {
    /// Smallest accepted size
    pub min: u32,
    /// Largest accepted size
    pub max: u32,
}

impl Default for FontSizeBounds {
    fn default() -> Self {
        Self { min: 10, max: 40 }
    }
}

impl FontSizeBounds {
    /// Accept `size` if it lies within the bounds
    pub fn check(&self, size: u32) -> Result<u32, SettingsError> {
        if (self.min..=self.max).contains(&size) {
            Ok(size)
        } else {
            Err(SettingsError::FontSizeOutOfRange {
                size,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Parse and check a stored font size such as `"18"` or `"18px"`
    pub fn parse(&self, value: &str) -> Result<u32, SettingsError> {
        let digits = value.trim().trim_end_matches("px");
        let size = digits
            .parse::<u32>()
            .map_err(|_| SettingsError::InvalidFontSize(value.to_string()))?;
        self.check(size)
    }
}

/// Font size and theme of a reading session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderSettings {
    /// Font size in pixels
    pub font_size: u32,
    /// Color theme
    pub theme: Theme,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            font_size: 16,
            theme: Theme::Light,
        }
    }
}

impl ReaderSettings {
    /// CSS font size value handed to the rendering engine
    pub fn font_size_css(&self) -> String {
        format!("{}px", self.font_size)
    }
}
