//! Full-text search across section texts
//!
//! Matching is case-insensitive (Unicode lowercase). Every occurrence is
//! reported with an excerpt of surrounding context, so a result list can be
//! shown before the user jumps to a hit.

use regex::Regex;
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

static WHITESPACE: OnceLock<Regex> = OnceLock::new();

/// Plain text of one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionText {
    /// Section key, as used by the page index
    pub key: String,
    /// Text content with markup removed
    pub text: String,
}

impl SectionText {
    /// Pair a section key with its text
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

/// Tuning for a search run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Characters of context kept on each side of a match
    pub context_chars: usize,
    /// Stop after this many hits
    pub max_results: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            context_chars: 40,
            max_results: None,
        }
    }
}

/// One occurrence of the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Zero-based position of the section in document order
    pub section_index: usize,
    /// Key of the section containing the match
    pub section_key: String,
    /// Character offset of the match inside the section text
    pub position: usize,
    /// Context around the match, whitespace collapsed, wrapped in `...`
    pub excerpt: String,
}

impl SearchHit {
    /// Caption for the hit in a result list, e.g. `Result 2 of 7 (Chapter 3)`
    pub fn caption(&self, ordinal: usize, total: usize) -> String {
        format!(
            "Result {} of {} (Chapter {})",
            ordinal,
            total,
            self.section_index + 1
        )
    }
}

/// Search every section for `query`
///
/// # Parameters
/// * `sections` - Section texts in document order
/// * `query` - Text to look for; surrounding whitespace is ignored
/// * `options` - Context width and result limit
///
/// # Returns
/// Hits in document order. A blank query returns no hits.
pub fn search(sections: &[SectionText], query: &str, options: &SearchOptions) -> Vec<SearchHit> {
    let needle: Vec<char> = query.trim().chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return Vec::new();
    }

    #[cfg(feature = "parallel")]
    let per_section: Vec<Vec<SearchHit>> = sections
        .par_iter()
        .enumerate()
        .map(|(index, section)| search_section(index, section, &needle, options))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let per_section: Vec<Vec<SearchHit>> = sections
        .iter()
        .enumerate()
        .map(|(index, section)| search_section(index, section, &needle, options))
        .collect();

    let hits = per_section.into_iter().flatten();
    match options.max_results {
        Some(limit) => hits.take(limit).collect(),
        None => hits.collect(),
    }
}

fn search_section(
    index: usize,
    section: &SectionText,
    needle: &[char],
    options: &SearchOptions,
) -> Vec<SearchHit> {
    let chars: Vec<char> = section.text.chars().collect();

    // Lowercasing can expand a char, so each folded char remembers its source.
    let folded: Vec<(usize, char)> = chars
        .iter()
        .enumerate()
        .flat_map(|(i, c)| c.to_lowercase().map(move |lower| (i, lower)))
        .collect();

    let mut hits = Vec::new();
    let mut last_start = None;

    for window in folded.windows(needle.len()) {
        if !window.iter().map(|(_, c)| *c).eq(needle.iter().copied()) {
            continue;
        }

        let start = window[0].0;
        if last_start == Some(start) {
            continue;
        }
        last_start = Some(start);

        let end = window[window.len() - 1].0 + 1;
        hits.push(SearchHit {
            section_index: index,
            section_key: section.key.clone(),
            position: start,
            excerpt: excerpt(&chars, start, end, options.context_chars),
        });

        if options.max_results.is_some_and(|limit| hits.len() >= limit) {
            break;
        }
    }

    hits
}

fn excerpt(chars: &[char], start: usize, end: usize, context: usize) -> String {
    let from = start.saturating_sub(context);
    let to = (end + context).min(chars.len());
    let raw: String = chars[from..to].iter().collect();

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    format!("...{}...", whitespace.replace_all(&raw, " ").trim())
}
