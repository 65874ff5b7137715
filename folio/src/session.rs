//! Reading session: one open document with its position, bookmarks and settings
//!
//! A [`ReaderSession`] is constructed explicitly by whatever owns the UI and
//! holds every piece of per-document state, including the page offset index.
//! The rendering engine drives it with two kinds of events:
//!
//! 1. **Layout**: after paginating at a font size and viewport, the engine
//!    reports the sections with their page counts. Each layout pass is
//!    tagged with a [`LayoutGeneration`]; results from an older pass are
//!    discarded.
//! 2. **Relocation**: whenever the reader moves, the engine reports where.
//!    The session saves the position and returns the indicator to display.

use crate::bookmarks::{Bookmark, BookmarkList, BookmarkToggle};
use crate::pagination::{Location, PageOffsetIndex, PaginationError, Paginator, Section};
use crate::reader_config::ReaderConfig;
use crate::search::{self, SearchHit, SearchOptions, SectionText};
use crate::settings::{FontSizeBounds, ReaderSettings, SettingsError, Theme};
use crate::storage::{KeyValueStore, StorageError, StorageKeys};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by session operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// The key-value store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A settings value was rejected
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// The layout could not be paginated
    #[error("Pagination error: {0}")]
    Pagination(#[from] PaginationError),

    /// Bookmarks could not be encoded for storage
    #[error("Failed to encode bookmarks: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Tag of one layout pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayoutGeneration(u64);

impl LayoutGeneration {
    /// Numeric value of the generation
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LayoutGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happened to a reported layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOutcome {
    /// The layout is now current
    Applied {
        /// Pages in the new layout
        total_pages: u32,
    },
    /// A newer layout pass has started since; the result was dropped
    Stale {
        /// Generation the layout was computed for
        reported: LayoutGeneration,
        /// Generation the session is waiting for
        current: LayoutGeneration,
    },
}

/// A location event from the rendering engine
#[derive(Debug, Clone, PartialEq)]
pub struct Relocation {
    /// Stable fragment identifier (CFI) of the location
    pub cfi: String,

    /// Section and local page
    pub location: Location,

    /// Engine-reported fraction of the document read, if known
    pub progress: Option<f64>,
}

impl Relocation {
    /// Relocation without engine progress
    pub fn new(cfi: impl Into<String>, location: Location) -> Self {
        Self {
            cfi: cfi.into(),
            location,
            progress: None,
        }
    }

    /// Attach an engine-reported progress fraction
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Where-am-I indicator shown to the reader, from most to least precise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageIndicator {
    /// Continuous page number across the whole document
    Page {
        /// 1-based global page
        current: u32,
        /// Pages in the document
        total: u32,
    },
    /// Percentage reported by the engine
    Percent(u8),
    /// Percentage estimated from the section's position in reading order
    Approximate(u8),
    /// The section is unknown to the current layout
    Reading,
    /// No layout has been reported yet
    Loading,
}

impl fmt::Display for PageIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageIndicator::Page { current, total } => write!(f, "Page {} of {}", current, total),
            PageIndicator::Percent(pct) => write!(f, "{}%", pct),
            PageIndicator::Approximate(pct) => write!(f, "~{}%", pct),
            PageIndicator::Reading => write!(f, "Reading..."),
            PageIndicator::Loading => write!(f, "Loading..."),
        }
    }
}

/// Result of a relocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocateOutcome {
    /// Indicator to display
    pub indicator: PageIndicator,
    /// Whether the new location is bookmarked
    pub bookmarked: bool,
    /// Whether the position reached the store
    pub position_saved: bool,
}

/// Resolves a stored fragment identifier back to a location
///
/// Implemented by the host around its rendering engine. Resolution must
/// reflect the current layout; return `None` when the fragment cannot be
/// placed in it.
pub trait FragmentResolver {
    /// Location of `cfi` in the current layout
    fn resolve(&self, cfi: &str) -> Option<Location>;
}

/// State of one open document
pub struct ReaderSession<S: KeyValueStore> {
    keys: StorageKeys,
    store: S,
    paginator: Paginator,
    generation: LayoutGeneration,
    current: Option<Relocation>,
    last_position: Option<String>,
    bookmarks: BookmarkList,
    settings: ReaderSettings,
    font_bounds: FontSizeBounds,
    search_options: SearchOptions,
}

impl<S: KeyValueStore> ReaderSession<S> {
    /// Open a session for a document, restoring stored state
    ///
    /// # Parameters
    /// * `document_id` - Stable identifier of the document
    /// * `store` - Where reading state is kept
    /// * `config` - Defaults and limits
    ///
    /// # Returns
    /// * `Ok(ReaderSession)` - Session with position, bookmarks and settings restored
    /// * `Err(SessionError::Storage)` - The store could not be read
    ///
    /// Unreadable stored values are logged and replaced with defaults.
    pub fn open(
        document_id: impl Into<String>,
        store: S,
        config: &ReaderConfig,
    ) -> Result<Self, SessionError> {
        let keys = StorageKeys::new(document_id);
        let settings = load_settings(&store, config)?;

        let bookmarks = match store.get(&keys.bookmarks())? {
            Some(json) => BookmarkList::from_json(&json).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable bookmarks: {}", e);
                BookmarkList::new()
            }),
            None => BookmarkList::new(),
        };

        let last_position = store.get(&keys.last_position())?;

        log::info!(
            "Opened {}: {} bookmarks, last position {}",
            keys.document_id(),
            bookmarks.len(),
            last_position.as_deref().unwrap_or("none")
        );

        Ok(Self {
            keys,
            store,
            paginator: Paginator::new(),
            generation: LayoutGeneration(0),
            current: None,
            last_position,
            bookmarks,
            settings,
            font_bounds: config.font_bounds(),
            search_options: config.search_options(),
        })
    }

    /// Identifier of the open document
    pub fn document_id(&self) -> &str {
        self.keys.document_id()
    }

    /// Current reader settings
    pub fn settings(&self) -> ReaderSettings {
        self.settings
    }

    /// Bookmarks of this document
    pub fn bookmarks(&self) -> &BookmarkList {
        &self.bookmarks
    }

    /// Fragment identifier to resume reading at
    pub fn last_position(&self) -> Option<&str> {
        self.last_position.as_deref()
    }

    /// Most recent relocation
    pub fn current(&self) -> Option<&Relocation> {
        self.current.as_ref()
    }

    /// The paginator shared with navigation handlers
    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Snapshot of the current page index
    pub fn page_index(&self) -> Arc<PageOffsetIndex> {
        self.paginator.snapshot()
    }

    /// Total pages of the current layout, 0 before the first layout
    pub fn total_pages(&self) -> u32 {
        self.paginator.total_pages()
    }

    /// Generation of the layout pass the session is waiting for
    pub fn generation(&self) -> LayoutGeneration {
        self.generation
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Close the session and hand back the store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Start a new layout pass; results of earlier passes become stale
    pub fn begin_relayout(&mut self) -> LayoutGeneration {
        self.generation = LayoutGeneration(self.generation.0 + 1);
        log::debug!("Layout pass {} started", self.generation);
        self.generation
    }

    /// Report the sections of a finished layout pass
    ///
    /// # Returns
    /// * `Ok(LayoutOutcome::Applied)` - The new index is published
    /// * `Ok(LayoutOutcome::Stale)` - A newer pass has started; nothing changed
    /// * `Err(SessionError::Pagination)` - The layout was rejected; the previous index stays
    pub fn apply_layout(
        &mut self,
        generation: LayoutGeneration,
        sections: &[Section],
    ) -> Result<LayoutOutcome, SessionError> {
        if generation != self.generation {
            log::debug!(
                "Dropping layout {} while waiting for {}",
                generation,
                self.generation
            );
            return Ok(LayoutOutcome::Stale {
                reported: generation,
                current: self.generation,
            });
        }

        let index = self.paginator.rebuild(sections)?;

        Ok(LayoutOutcome::Applied {
            total_pages: index.total_pages(),
        })
    }

    /// Record a new location, save it, and compute what to display
    pub fn relocate(&mut self, relocation: Relocation) -> RelocateOutcome {
        let indicator = self.indicator_for(&relocation);
        let bookmarked = self.bookmarks.contains(&relocation.cfi);

        let position_saved = match self
            .store
            .set(&self.keys.last_position(), &relocation.cfi)
        {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Could not save reading position: {}", e);
                false
            }
        };

        self.last_position = Some(relocation.cfi.clone());
        self.current = Some(relocation);

        RelocateOutcome {
            indicator,
            bookmarked,
            position_saved,
        }
    }

    /// Indicator for the current location against the current layout
    pub fn page_indicator(&self) -> PageIndicator {
        match &self.current {
            Some(relocation) => self.indicator_for(relocation),
            None => PageIndicator::Loading,
        }
    }

    fn indicator_for(&self, relocation: &Relocation) -> PageIndicator {
        let index = self.paginator.snapshot();
        match index.global_page_at(&relocation.location) {
            Ok(current) => {
                return PageIndicator::Page {
                    current,
                    total: index.total_pages(),
                }
            }
            Err(e) if !index.is_empty() => {
                log::debug!("Falling back from page numbers: {}", e);
            }
            Err(_) => {}
        }

        if let Some(progress) = relocation.progress.filter(|p| p.is_finite()) {
            return PageIndicator::Percent(to_percent(progress));
        }

        if index.is_empty() {
            return PageIndicator::Loading;
        }

        match index.position(&relocation.location.section_key) {
            Some(position) => PageIndicator::Approximate(to_percent(
                (position + 1) as f64 / index.len() as f64,
            )),
            None => PageIndicator::Reading,
        }
    }

    /// True if `cfi` is bookmarked
    pub fn is_bookmarked(&self, cfi: &str) -> bool {
        self.bookmarks.contains(cfi)
    }

    /// Add or remove the bookmark at `cfi` and save the list
    ///
    /// If saving fails the toggle is undone, so memory and store agree.
    pub fn toggle_bookmark(
        &mut self,
        cfi: &str,
        preview: impl Into<String>,
    ) -> Result<BookmarkToggle, SessionError> {
        let previous = self.bookmarks.clone();
        let toggle = self.bookmarks.toggle(cfi, preview);

        if let Err(e) = self.save_bookmarks() {
            self.bookmarks = previous;
            return Err(e);
        }

        log::debug!("Bookmark {:?} at {}", toggle, cfi);
        Ok(toggle)
    }

    fn save_bookmarks(&mut self) -> Result<(), SessionError> {
        let json = self.bookmarks.to_json()?;
        self.store.set(&self.keys.bookmarks(), &json)?;
        Ok(())
    }

    /// Global page of a bookmark under the current layout
    ///
    /// Returns `None` when the resolver cannot place the fragment or the
    /// resolved location does not fit the current index. A page number from
    /// an older layout is never reported.
    pub fn bookmark_page(
        &self,
        bookmark: &Bookmark,
        resolver: &impl FragmentResolver,
    ) -> Option<u32> {
        let location = resolver.resolve(&bookmark.cfi)?;
        match self.paginator.snapshot().global_page_at(&location) {
            Ok(page) => Some(page),
            Err(e) => {
                log::debug!("No page for bookmark {}: {}", bookmark.cfi, e);
                None
            }
        }
    }

    /// Change the font size; the engine must repaginate
    ///
    /// # Returns
    /// * `Ok(LayoutGeneration)` - Generation the new layout must be reported under
    /// * `Err(SessionError)` - Size out of range or store failure; nothing changed
    pub fn set_font_size(&mut self, font_size: u32) -> Result<LayoutGeneration, SessionError> {
        self.settings.font_size = save_font_size(&mut self.store, self.font_bounds, font_size)?;
        Ok(self.begin_relayout())
    }

    /// Change the color theme
    pub fn set_theme(&mut self, theme: Theme) -> Result<(), SessionError> {
        save_theme(&mut self.store, theme)?;
        self.settings.theme = theme;
        Ok(())
    }

    /// Search section texts with the configured options
    pub fn search(&self, sections: &[SectionText], query: &str) -> Vec<SearchHit> {
        search::search(sections, query, &self.search_options)
    }
}

/// Reader settings kept in `store`, with configured defaults for anything missing
///
/// Settings are shared by all documents, so this works without a session.
/// Unreadable values are logged and replaced with the default.
pub fn load_settings<S: KeyValueStore>(
    store: &S,
    config: &ReaderConfig,
) -> Result<ReaderSettings, StorageError> {
    let mut settings = config.default_settings();

    if let Some(stored) = store.get(StorageKeys::FONT_SIZE)? {
        match config.font_bounds().parse(&stored) {
            Ok(size) => settings.font_size = size,
            Err(e) => log::warn!("Ignoring stored font size: {}", e),
        }
    }

    if let Some(stored) = store.get(StorageKeys::THEME)? {
        settings.theme = Theme::from_stored(&stored);
    }

    Ok(settings)
}

/// Check a font size against `bounds` and store it for every document
///
/// Returns the stored size. Nothing is written when the size is rejected.
pub fn save_font_size<S: KeyValueStore>(
    store: &mut S,
    bounds: FontSizeBounds,
    font_size: u32,
) -> Result<u32, SessionError> {
    let font_size = bounds.check(font_size)?;
    store.set(StorageKeys::FONT_SIZE, &font_size.to_string())?;
    Ok(font_size)
}

/// Store the theme for every document
pub fn save_theme<S: KeyValueStore>(store: &mut S, theme: Theme) -> Result<(), StorageError> {
    store.set(StorageKeys::THEME, theme.as_str())
}

fn to_percent(fraction: f64) -> u8 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}
