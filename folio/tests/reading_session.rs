use folio::bookmarks::{self, BookmarkToggle};
use folio::layout_file::LayoutFile;
use folio::pagination::Location;
use folio::reader_config::ReaderConfig;
use folio::session::{LayoutOutcome, PageIndicator, ReaderSession, Relocation};
use folio::settings::Theme;
use folio::storage::FileStore;
use folio::toc;
use std::path::PathBuf;

fn fixture_layout() -> LayoutFile {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/frankenstein/layout.toml");
    LayoutFile::load(&path).expect("fixture layout should load")
}

fn open(layout: &LayoutFile, state: &std::path::Path) -> ReaderSession<FileStore> {
    let store = FileStore::open(state).unwrap();
    let mut session =
        ReaderSession::open(layout.document_id.clone(), store, &ReaderConfig::default()).unwrap();
    let generation = session.begin_relayout();
    session.apply_layout(generation, &layout.sections()).unwrap();
    session
}

#[test]
fn test_fixture_paginates() {
    let layout = fixture_layout();
    let dir = tempfile::tempdir().unwrap();
    let session = open(&layout, &dir.path().join("state.json"));

    let index = session.page_index();
    assert_eq!(index.total_pages(), 35);
    assert_eq!(index.offset("text/titlepage.xhtml"), Some(0));
    assert_eq!(index.global_page("text/chapter1.xhtml", 1).unwrap(), 16);
}

#[test]
fn test_position_and_bookmarks_persist_to_disk() {
    let layout = fixture_layout();
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");

    {
        let mut session = open(&layout, &state);
        let cfi = LayoutFile::fragment_id("text/letter2.xhtml", 3);

        let outcome = session.relocate(Relocation::new(
            cfi.clone(),
            Location::new("text/letter2.xhtml", 3),
        ));
        assert_eq!(outcome.indicator.to_string(), "Page 13 of 35");
        assert!(outcome.position_saved);

        let content = layout.section_text("text/letter2.xhtml").unwrap().text;
        let preview = bookmarks::preview_text(
            toc::chapter_label(&layout.toc, "text/letter2.xhtml"),
            &content,
        );
        assert!(preview.starts_with("Letter 2: "));
        assert_eq!(
            session.toggle_bookmark(&cfi, preview).unwrap(),
            BookmarkToggle::Added
        );
        session.set_theme(Theme::Dark).unwrap();
    }

    let session = open(&layout, &state);
    assert_eq!(session.last_position(), Some("text/letter2.xhtml#page=3"));
    assert_eq!(session.settings().theme, Theme::Dark);

    let bookmark = session.bookmarks().iter().next().unwrap();
    assert_eq!(session.bookmark_page(bookmark, &layout), Some(13));
}

#[test]
fn test_relayout_after_font_change() {
    let layout = fixture_layout();
    let dir = tempfile::tempdir().unwrap();
    let mut session = open(&layout, &dir.path().join("state.json"));

    session.relocate(Relocation::new(
        "text/chapter1.xhtml#page=20",
        Location::new("text/chapter1.xhtml", 20),
    ));

    let generation = session.set_font_size(10).unwrap();
    let smaller: Vec<_> = layout
        .sections()
        .into_iter()
        .map(|mut s| {
            s.page_count = s.page_count.div_ceil(2);
            s
        })
        .collect();

    assert_eq!(
        session.apply_layout(generation, &smaller).unwrap(),
        LayoutOutcome::Applied { total_pages: 18 }
    );

    // Page 20 no longer exists in chapter 1; the position estimate takes over.
    assert_eq!(session.page_indicator(), PageIndicator::Approximate(100));
}

#[test]
fn test_search_fixture_text() {
    let layout = fixture_layout();
    let dir = tempfile::tempdir().unwrap();
    let session = open(&layout, &dir.path().join("state.json"));

    let texts = layout.section_texts();
    assert_eq!(texts.len(), 3);

    let hits = session.search(&texts, "ENTERPRISE");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].section_key, "text/letter1.xhtml");
    assert_eq!(hits[1].section_key, "text/letter2.xhtml");
    assert_eq!(hits[1].caption(2, hits.len()), "Result 2 of 2 (Chapter 2)");
    assert!(hits.iter().all(|h| h.excerpt.starts_with("...")));

    let hits = session.search(&texts, "genevese");
    assert_eq!(hits.len(), 1);
    assert!(!hits[0].excerpt.contains('\n'));
}
