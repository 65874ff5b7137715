//! Error types for pagination

use thiserror::Error;

/// Errors raised while building or querying a page offset index
///
/// All of these are recoverable: a session that hits one falls back to a
/// coarser progress indicator instead of a page number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    /// The section list handed to `build` cannot be paginated
    #[error("Invalid layout: {0}")]
    InvalidLayout(InvalidLayoutReason),

    /// The section key is not part of the current index
    #[error("Unknown section: {key}")]
    UnknownSection {
        /// Key that was looked up
        key: String,
    },

    /// The local page lies outside the section
    #[error("Invalid local page {local_page} for section {key} ({page_count} pages)")]
    InvalidLocalPage {
        /// Section the page was requested in
        key: String,
        /// Requested 1-based page
        local_page: u32,
        /// Pages the section actually has
        page_count: u32,
    },
}

/// Why a section list was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidLayoutReason {
    /// No sections at all
    #[error("layout contains no sections")]
    NoSections,

    /// The same key was listed twice
    #[error("section {0} appears more than once")]
    DuplicateSection(String),

    /// Every section reported zero pages
    #[error("no section has any pages")]
    NoPages,

    /// Sum of page counts does not fit in a u32
    #[error("total page count exceeds {max}", max = u32::MAX)]
    PageCountOverflow,
}
