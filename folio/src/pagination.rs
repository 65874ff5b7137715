//! Continuous page numbering across section boundaries
//!
//! The rendering engine paginates every section on its own, so a location
//! only knows its page inside the current chapter. This module turns the
//! per-section page counts into one page sequence for the whole document:
//! each section is assigned the number of pages preceding it (an exclusive
//! prefix sum), and a location maps to `offset + local_page`.
//!
//! [`PageOffsetIndex`] is an immutable snapshot of one layout pass.
//! [`Paginator`] owns the current snapshot and swaps in a new one on
//! relayout, so readers only ever see a complete index.

mod error;

pub use error::{InvalidLayoutReason, PaginationError};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A contiguous unit of document content as paginated by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Stable identifier (the section's reference path)
    pub key: String,

    /// Number of pages the section occupies at the current layout
    pub page_count: u32,
}

impl Section {
    /// Create a section from its key and page count
    pub fn new(key: impl Into<String>, page_count: u32) -> Self {
        Self {
            key: key.into(),
            page_count,
        }
    }
}

/// A position inside one section
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// Key of the section the reader is in
    pub section_key: String,

    /// 1-based page within the section
    pub local_page: u32,
}

impl Location {
    /// Create a location from a section key and a 1-based local page
    pub fn new(section_key: impl Into<String>, local_page: u32) -> Self {
        Self {
            section_key: section_key.into(),
            local_page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SectionEntry {
    position: usize,
    offset: u32,
    page_count: u32,
}

/// One row of the index, in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionOffset<'a> {
    /// Section key
    pub key: &'a str,
    /// Pages preceding this section
    pub offset: u32,
    /// Pages in this section
    pub page_count: u32,
}

/// Mapping from section key to the number of pages preceding it
///
/// The default value is the "not yet paginated" index: it knows no sections
/// and reports zero total pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOffsetIndex {
    order: Vec<String>,
    entries: HashMap<String, SectionEntry>,
    total_pages: u32,
}

impl PageOffsetIndex {
    /// Build the index for an ordered list of sections
    ///
    /// Sections reporting zero pages (metadata, empty documents) still get
    /// an offset equal to the running sum at their position.
    ///
    /// # Parameters
    /// * `sections` - Sections in document order with their page counts
    ///
    /// # Returns
    /// * `Ok(PageOffsetIndex)` - The complete index
    /// * `Err(PaginationError::InvalidLayout)` - The list is empty, repeats a
    ///   key, has no pages at all, or overflows the page counter
    pub fn build(sections: &[Section]) -> Result<Self, PaginationError> {
        if sections.is_empty() {
            return Err(PaginationError::InvalidLayout(
                InvalidLayoutReason::NoSections,
            ));
        }

        if let Some(key) = sections.iter().map(|s| s.key.as_str()).duplicates().next() {
            return Err(PaginationError::InvalidLayout(
                InvalidLayoutReason::DuplicateSection(key.to_string()),
            ));
        }

        let mut entries = HashMap::with_capacity(sections.len());
        let mut running: u32 = 0;

        for (position, section) in sections.iter().enumerate() {
            entries.insert(
                section.key.clone(),
                SectionEntry {
                    position,
                    offset: running,
                    page_count: section.page_count,
                },
            );
            running = running.checked_add(section.page_count).ok_or(
                PaginationError::InvalidLayout(InvalidLayoutReason::PageCountOverflow),
            )?;
        }

        if running == 0 {
            return Err(PaginationError::InvalidLayout(InvalidLayoutReason::NoPages));
        }

        Ok(Self {
            order: sections.iter().map(|s| s.key.clone()).collect(),
            entries,
            total_pages: running,
        })
    }

    /// Total pages in the document, 0 if the index was never built
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Global 1-based page number for a page inside a section
    pub fn global_page(&self, section_key: &str, local_page: u32) -> Result<u32, PaginationError> {
        let entry = self.entry(section_key)?;

        if local_page < 1 || local_page > entry.page_count {
            return Err(PaginationError::InvalidLocalPage {
                key: section_key.to_string(),
                local_page,
                page_count: entry.page_count,
            });
        }

        Ok(entry.offset + local_page)
    }

    /// Global page number for a [`Location`]
    pub fn global_page_at(&self, location: &Location) -> Result<u32, PaginationError> {
        self.global_page(&location.section_key, location.local_page)
    }

    /// Fraction of the document read at this page, in `(0, 1]`
    ///
    /// Divides by the document total, never by the section's own length, so
    /// zero-page sections cannot cause a division by zero.
    pub fn progress(&self, section_key: &str, local_page: u32) -> Result<f64, PaginationError> {
        let page = self.global_page(section_key, local_page)?;
        Ok(f64::from(page) / f64::from(self.total_pages))
    }

    /// Pages preceding a section
    pub fn offset(&self, section_key: &str) -> Option<u32> {
        self.entries.get(section_key).map(|e| e.offset)
    }

    /// Pages inside a section
    pub fn page_count(&self, section_key: &str) -> Option<u32> {
        self.entries.get(section_key).map(|e| e.page_count)
    }

    /// Zero-based position of a section in document order
    pub fn position(&self, section_key: &str) -> Option<usize> {
        self.entries.get(section_key).map(|e| e.position)
    }

    /// Number of sections in the index
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if the index has never been built
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate over the sections in document order
    pub fn iter(&self) -> impl Iterator<Item = SectionOffset<'_>> {
        self.order.iter().filter_map(move |key| {
            self.entries.get(key).map(|entry| SectionOffset {
                key: key.as_str(),
                offset: entry.offset,
                page_count: entry.page_count,
            })
        })
    }

    fn entry(&self, section_key: &str) -> Result<&SectionEntry, PaginationError> {
        self.entries
            .get(section_key)
            .ok_or_else(|| PaginationError::UnknownSection {
                key: section_key.to_string(),
            })
    }
}

/// Owner of the current page offset index
///
/// A rebuild constructs the new index off to the side and publishes it with
/// a single pointer swap. A concurrent `global_page` therefore observes
/// either the old or the new mapping. A failed rebuild publishes nothing.
#[derive(Debug, Default)]
pub struct Paginator {
    current: RwLock<Arc<PageOffsetIndex>>,
}

impl Paginator {
    /// Create a paginator in the "not yet paginated" state
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index for a new layout and publish it
    ///
    /// # Returns
    /// * `Ok(Arc<PageOffsetIndex>)` - The index that is now current
    /// * `Err(PaginationError)` - The layout was rejected; the previous index stays current
    pub fn rebuild(&self, sections: &[Section]) -> Result<Arc<PageOffsetIndex>, PaginationError> {
        let fresh = Arc::new(PageOffsetIndex::build(sections)?);

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&fresh);

        log::debug!(
            "Published page index: {} sections, {} pages",
            fresh.len(),
            fresh.total_pages()
        );

        Ok(fresh)
    }

    /// The index that is current right now
    pub fn snapshot(&self) -> Arc<PageOffsetIndex> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Global page number against the current index
    pub fn global_page(&self, section_key: &str, local_page: u32) -> Result<u32, PaginationError> {
        self.snapshot().global_page(section_key, local_page)
    }

    /// Total pages of the current index, 0 before the first successful build
    pub fn total_pages(&self) -> u32 {
        self.snapshot().total_pages()
    }

    /// True once a layout has been published
    pub fn is_paginated(&self) -> bool {
        self.total_pages() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sections() -> Vec<Section> {
        vec![
            Section::new("a", 10),
            Section::new("b", 5),
            Section::new("c", 20),
        ]
    }

    #[test]
    fn test_offsets_are_exclusive_prefix_sums() {
        let index = PageOffsetIndex::build(&sample_sections()).unwrap();

        assert_eq!(index.offset("a"), Some(0));
        assert_eq!(index.offset("b"), Some(10));
        assert_eq!(index.offset("c"), Some(15));
        assert_eq!(index.total_pages(), 35);
    }

    #[test]
    fn test_global_page() {
        let index = PageOffsetIndex::build(&sample_sections()).unwrap();

        assert_eq!(index.global_page("a", 1).unwrap(), 1);
        assert_eq!(index.global_page("c", 1).unwrap(), 16);
        assert_eq!(index.global_page("c", 20).unwrap(), 35);
        assert_eq!(
            index.global_page_at(&Location::new("b", 5)).unwrap(),
            15
        );
    }

    #[test]
    fn test_local_page_out_of_range() {
        let index = PageOffsetIndex::build(&sample_sections()).unwrap();

        assert_eq!(
            index.global_page("b", 6),
            Err(PaginationError::InvalidLocalPage {
                key: "b".to_string(),
                local_page: 6,
                page_count: 5,
            })
        );
        assert!(matches!(
            index.global_page("b", 0),
            Err(PaginationError::InvalidLocalPage { .. })
        ));
    }

    #[test]
    fn test_unknown_section() {
        let index = PageOffsetIndex::build(&sample_sections()).unwrap();

        assert_eq!(
            index.global_page("z", 1),
            Err(PaginationError::UnknownSection {
                key: "z".to_string()
            })
        );
    }

    #[test]
    fn test_build_rejects_empty_layout() {
        assert_eq!(
            PageOffsetIndex::build(&[]),
            Err(PaginationError::InvalidLayout(
                InvalidLayoutReason::NoSections
            ))
        );
    }

    #[test]
    fn test_build_rejects_duplicate_keys() {
        let sections = vec![Section::new("a", 1), Section::new("a", 2)];

        assert_eq!(
            PageOffsetIndex::build(&sections),
            Err(PaginationError::InvalidLayout(
                InvalidLayoutReason::DuplicateSection("a".to_string())
            ))
        );
    }

    #[test]
    fn test_build_rejects_layout_without_pages() {
        let sections = vec![Section::new("meta", 0), Section::new("cover", 0)];

        assert_eq!(
            PageOffsetIndex::build(&sections),
            Err(PaginationError::InvalidLayout(InvalidLayoutReason::NoPages))
        );
    }

    #[test]
    fn test_build_rejects_overflow() {
        let sections = vec![Section::new("a", u32::MAX), Section::new("b", 1)];

        assert_eq!(
            PageOffsetIndex::build(&sections),
            Err(PaginationError::InvalidLayout(
                InvalidLayoutReason::PageCountOverflow
            ))
        );
    }

    #[test]
    fn test_zero_page_section_gets_running_offset() {
        let sections = vec![
            Section::new("a", 3),
            Section::new("nav", 0),
            Section::new("b", 4),
        ];
        let index = PageOffsetIndex::build(&sections).unwrap();

        assert_eq!(index.offset("nav"), Some(3));
        assert_eq!(index.offset("b"), Some(3));
        assert!(matches!(
            index.global_page("nav", 1),
            Err(PaginationError::InvalidLocalPage { page_count: 0, .. })
        ));
        assert!(index.progress("nav", 1).is_err());
    }

    #[test]
    fn test_progress() {
        let index = PageOffsetIndex::build(&sample_sections()).unwrap();

        assert!((index.progress("c", 20).unwrap() - 1.0).abs() < f64::EPSILON);
        assert!((index.progress("b", 4).unwrap() - 14.0 / 35.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_iter_in_document_order() {
        let index = PageOffsetIndex::build(&sample_sections()).unwrap();
        let rows: Vec<(&str, u32)> = index.iter().map(|row| (row.key, row.offset)).collect();

        assert_eq!(rows, vec![("a", 0), ("b", 10), ("c", 15)]);
        assert_eq!(index.position("c"), Some(2));
    }

    #[test]
    fn test_default_index_is_unpaginated() {
        let index = PageOffsetIndex::default();

        assert_eq!(index.total_pages(), 0);
        assert!(index.is_empty());
        assert!(matches!(
            index.global_page("a", 1),
            Err(PaginationError::UnknownSection { .. })
        ));
    }

    #[test]
    fn test_paginator_keeps_previous_index_on_failure() {
        let paginator = Paginator::new();
        assert_eq!(paginator.total_pages(), 0);
        assert!(!paginator.is_paginated());

        paginator.rebuild(&sample_sections()).unwrap();
        assert_eq!(paginator.total_pages(), 35);

        assert!(paginator.rebuild(&[]).is_err());
        assert_eq!(paginator.total_pages(), 35);
        assert_eq!(paginator.global_page("c", 1).unwrap(), 16);
    }

    #[test]
    fn test_paginator_snapshot_survives_rebuild() {
        let paginator = Paginator::new();
        paginator.rebuild(&sample_sections()).unwrap();
        let before = paginator.snapshot();

        paginator
            .rebuild(&[Section::new("a", 2), Section::new("b", 2)])
            .unwrap();

        assert_eq!(before.total_pages(), 35);
        assert_eq!(paginator.total_pages(), 4);
    }

    #[test]
    fn test_concurrent_readers_see_whole_layouts() {
        let paginator = Paginator::new();
        let small = vec![Section::new("a", 1), Section::new("b", 1)];
        let large = vec![Section::new("a", 100), Section::new("b", 100)];
        paginator.rebuild(&small).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..200 {
                    let layout = if i % 2 == 0 { &large } else { &small };
                    paginator.rebuild(layout).unwrap();
                }
            });

            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let index = paginator.snapshot();
                        let total = index.total_pages();
                        let b = index.global_page("b", 1).unwrap();
                        assert!(
                            (total == 2 && b == 2) || (total == 200 && b == 101),
                            "mixed layout observed: total={total}, b={b}"
                        );
                    }
                });
            }
        });
    }
}
