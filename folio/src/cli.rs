//! Command-line interface definitions for folio

use clap::{Parser, Subcommand, ValueEnum};
use folio::settings::Theme;
use std::path::PathBuf;

/// Output format for the paginate command
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns for reading in a terminal
    #[default]
    Table,
    /// Comma-separated values with a header row
    Csv,
}

/// Theme selection
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    /// Dark text on white
    Light,
    /// Light text on near-black
    Dark,
    /// Brown text on cream
    Sepia,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Sepia => Theme::Sepia,
        }
    }
}

/// CLI structure for the folio application
#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Continuous page numbers and reading state for EPUB layouts", long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "folio.toml")]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for folio
#[derive(Subcommand)]
pub enum Commands {
    /// Show the page offset of every section
    Paginate {
        /// Layout file reported by the rendering engine
        layout: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Convert a page inside a section to a global page number
    Page {
        /// Layout file reported by the rendering engine
        layout: PathBuf,

        /// Section key
        section: String,

        /// 1-based page within the section
        local_page: u32,
    },

    /// Move the reading position and save it
    Locate {
        /// Layout file reported by the rendering engine
        layout: PathBuf,

        /// Section key
        section: String,

        /// 1-based page within the section
        local_page: u32,

        /// Fragment identifier of the location (derived from section and page if omitted)
        #[arg(long)]
        cfi: Option<String>,

        /// Engine-reported fraction of the book read (0.0 - 1.0)
        #[arg(long)]
        progress: Option<f64>,
    },

    /// Show where reading left off
    Resume {
        /// Layout file reported by the rendering engine
        layout: PathBuf,
    },

    /// Add or remove a bookmark
    Bookmark {
        /// Layout file reported by the rendering engine
        layout: PathBuf,

        /// Section key
        section: String,

        /// 1-based page within the section
        local_page: u32,

        /// Preview text (taken from the section text if omitted)
        #[arg(short, long)]
        text: Option<String>,
    },

    /// List bookmarks with their current page numbers
    Bookmarks {
        /// Layout file reported by the rendering engine
        layout: PathBuf,
    },

    /// Search the text of every section
    Search {
        /// Layout file reported by the rendering engine
        layout: PathBuf,

        /// Text to search for (case-insensitive)
        query: String,
    },

    /// Print the table of contents with start pages
    Toc {
        /// Layout file reported by the rendering engine
        layout: PathBuf,
    },

    /// Show or change reader settings
    Settings {
        /// Font size in pixels
        #[arg(long)]
        font_size: Option<u32>,

        /// Color theme
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,
    },
}
