//! folio - reading sessions for paginated EPUB documents
//!
//! The rendering engine paginates each section of a book on its own. folio
//! turns those per-section page counts into continuous page numbers and
//! keeps the state of a reading session: position, bookmarks, font size and
//! theme, persisted through a key-value store.
//!
//! ```rust
//! use folio::pagination::{PageOffsetIndex, Section};
//!
//! let index = PageOffsetIndex::build(&[
//!     Section::new("a", 10),
//!     Section::new("b", 5),
//!     Section::new("c", 20),
//! ])
//! .unwrap();
//!
//! assert_eq!(index.total_pages(), 35);
//! assert_eq!(index.global_page("c", 1).unwrap(), 16);
//! ```

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(missing_docs))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod bookmarks;
pub mod layout_file;
pub mod pagination;
pub mod reader_config;
pub mod search;
pub mod session;
pub mod settings;
pub mod storage;
pub mod toc;

pub use pagination::{Location, PageOffsetIndex, PaginationError, Paginator, Section};
pub use reader_config::ReaderConfig;
pub use session::{PageIndicator, ReaderSession, Relocation};
