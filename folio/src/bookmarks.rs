//! Bookmarks keyed by fragment identifier

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Longest preview kept for a bookmark, in characters
pub const PREVIEW_CHARS: usize = 100;

/// Label used when no preview text could be extracted
pub const FALLBACK_PREVIEW: &str = "Bookmarked location";

/// A saved location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Engine fragment identifier (CFI) of the bookmarked location
    pub cfi: String,

    /// Preview text shown in the bookmark list
    pub text: String,
}

/// Result of toggling a bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkToggle {
    /// A new bookmark was appended
    Added,
    /// The existing bookmark was removed
    Removed,
}

/// Ordered bookmark set, unique by fragment identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkList {
    items: Vec<Bookmark>,
}

impl BookmarkList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stored JSON array
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to the stored JSON array
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Remove the bookmark at `cfi` if present, otherwise append one
    pub fn toggle(&mut self, cfi: &str, text: impl Into<String>) -> BookmarkToggle {
        match self.items.iter().position(|b| b.cfi == cfi) {
            Some(existing) => {
                self.items.remove(existing);
                BookmarkToggle::Removed
            }
            None => {
                self.items.push(Bookmark {
                    cfi: cfi.to_string(),
                    text: text.into(),
                });
                BookmarkToggle::Added
            }
        }
    }

    /// True if a bookmark exists at `cfi`
    pub fn contains(&self, cfi: &str) -> bool {
        self.items.iter().any(|b| b.cfi == cfi)
    }

    /// Bookmark at `cfi`
    pub fn get(&self, cfi: &str) -> Option<&Bookmark> {
        self.items.iter().find(|b| b.cfi == cfi)
    }

    /// Bookmarks in the order they were added
    pub fn iter(&self) -> std::slice::Iter<'_, Bookmark> {
        self.items.iter()
    }

    /// Number of bookmarks
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if there are no bookmarks
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a BookmarkList {
    type Item = &'a Bookmark;
    type IntoIter = std::slice::Iter<'a, Bookmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Build the preview text for a bookmark
///
/// # Parameters
/// * `chapter_label` - Label of the enclosing chapter, if the TOC knows one
/// * `content` - Text of the bookmarked page or section
///
/// # Returns
/// The content on one line (whitespace runs collapsed), cut to
/// [`PREVIEW_CHARS`] characters (with `...` when
/// cut), prefixed with `"{label}: "`. Falls back to the label alone, or to
/// [`FALLBACK_PREVIEW`] when there is nothing to show.
pub fn preview_text(chapter_label: Option<&str>, content: &str) -> String {
    let text = content.split_whitespace().join(" ");
    let label = chapter_label.map(str::trim).filter(|l| !l.is_empty());

    if text.is_empty() {
        return label.unwrap_or(FALLBACK_PREVIEW).to_string();
    }

    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        preview.push_str("...");
    }

    match label {
        Some(label) => format!("{}: {}", label, preview),
        None => preview,
    }
}
