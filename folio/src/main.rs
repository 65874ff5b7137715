//! folio - reading sessions for paginated EPUB documents
//!
//! A CLI for the reading state of a book whose layout was reported by a
//! rendering engine: continuous page numbers, saved position, bookmarks,
//! search and reader settings.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(missing_docs))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, OutputFormat};
use folio::bookmarks::{self, BookmarkToggle};
use folio::layout_file::LayoutFile;
use folio::pagination::{Location, PageOffsetIndex};
use folio::reader_config::ReaderConfig;
use folio::session::{self, FragmentResolver, ReaderSession, Relocation};
use folio::settings::Theme;
use folio::storage::FileStore;
use folio::toc;
use std::path::{Path, PathBuf};

/// Main entry point for the folio CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = ReaderConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    match cli.command {
        Commands::Paginate { layout, format } => {
            handle_paginate_command(&layout, format)?;
        }

        Commands::Page {
            layout,
            section,
            local_page,
        } => {
            handle_page_command(&layout, &section, local_page)?;
        }

        Commands::Locate {
            layout,
            section,
            local_page,
            cfi,
            progress,
        } => {
            handle_locate_command(&config, &layout, section, local_page, cfi, progress)?;
        }

        Commands::Resume { layout } => {
            handle_resume_command(&config, &layout)?;
        }

        Commands::Bookmark {
            layout,
            section,
            local_page,
            text,
        } => {
            handle_bookmark_command(&config, &layout, &section, local_page, text)?;
        }

        Commands::Bookmarks { layout } => {
            handle_bookmarks_command(&config, &layout)?;
        }

        Commands::Search { layout, query } => {
            handle_search_command(&config, &layout, &query)?;
        }

        Commands::Toc { layout } => {
            handle_toc_command(&layout)?;
        }

        Commands::Settings { font_size, theme } => {
            handle_settings_command(&config, font_size, theme.map(Theme::from))?;
        }
    }

    Ok(())
}

/// Initialize logging: info level with --verbose, otherwise RUST_LOG
fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder.init();
}

/// Load a layout file with context for the error message
fn load_layout(path: &Path) -> Result<LayoutFile> {
    LayoutFile::load(path).with_context(|| format!("Failed to load layout {}", path.display()))
}

/// Build the page index for a layout
fn build_index(layout: &LayoutFile) -> Result<PageOffsetIndex> {
    PageOffsetIndex::build(&layout.sections())
        .with_context(|| format!("Failed to paginate {}", layout.display_title()))
}

/// Open the persistent store named in the configuration
fn open_store(config: &ReaderConfig) -> Result<FileStore> {
    FileStore::open(&config.storage_path).with_context(|| {
        format!(
            "Failed to open state file {}",
            config.storage_path.display()
        )
    })
}

/// Open a session for a layout and apply the layout to it
///
/// A layout that cannot be paginated is reported as a warning; the session
/// then falls back to coarser progress indicators.
fn open_session(config: &ReaderConfig, layout: &LayoutFile) -> Result<ReaderSession<FileStore>> {
    let store = open_store(config)?;
    let mut session = ReaderSession::open(layout.document_id.clone(), store, config)
        .with_context(|| format!("Failed to open session for {}", layout.document_id))?;

    let generation = session.begin_relayout();
    if let Err(e) = session.apply_layout(generation, &layout.sections()) {
        log::warn!("Page numbers unavailable: {}", e);
    }

    Ok(session)
}

/// Handle the paginate command
fn handle_paginate_command(layout_path: &Path, format: OutputFormat) -> Result<()> {
    let layout = load_layout(layout_path)?;
    let index = build_index(&layout)?;

    match format {
        OutputFormat::Table => {
            println!("{}", layout.display_title());
            println!("{:>8} {:>8}  SECTION", "OFFSET", "PAGES");
            for row in index.iter() {
                println!("{:>8} {:>8}  {}", row.offset, row.page_count, row.key);
            }
            println!("\nTotal pages: {}", index.total_pages());
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.write_record(["key", "offset", "page_count", "first_page"])?;
            for row in index.iter() {
                let first_page = if row.page_count > 0 {
                    (row.offset + 1).to_string()
                } else {
                    String::new()
                };
                writer.write_record([
                    row.key.to_string(),
                    row.offset.to_string(),
                    row.page_count.to_string(),
                    first_page,
                ])?;
            }
            writer.flush()?;
        }
    }

    Ok(())
}

/// Handle the page command
fn handle_page_command(layout_path: &Path, section: &str, local_page: u32) -> Result<()> {
    let layout = load_layout(layout_path)?;
    let index = build_index(&layout)?;

    let page = index
        .global_page(section, local_page)
        .with_context(|| format!("No global page for {} page {}", section, local_page))?;

    println!("{} of {}", page, index.total_pages());

    Ok(())
}

/// Handle the locate command
fn handle_locate_command(
    config: &ReaderConfig,
    layout_path: &Path,
    section: String,
    local_page: u32,
    cfi: Option<String>,
    progress: Option<f64>,
) -> Result<()> {
    let layout = load_layout(layout_path)?;
    let mut session = open_session(config, &layout)?;

    let cfi = cfi.unwrap_or_else(|| LayoutFile::fragment_id(&section, local_page));
    let mut relocation = Relocation::new(cfi, Location::new(section, local_page));
    if let Some(progress) = progress {
        relocation = relocation.with_progress(progress);
    }

    let outcome = session.relocate(relocation);

    println!(
        "{}{}",
        outcome.indicator,
        if outcome.bookmarked { " (bookmarked)" } else { "" }
    );
    if !outcome.position_saved {
        println!("Warning: reading position could not be saved");
    }

    Ok(())
}

/// Handle the resume command
fn handle_resume_command(config: &ReaderConfig, layout_path: &Path) -> Result<()> {
    let layout = load_layout(layout_path)?;
    let session = open_session(config, &layout)?;

    let Some(cfi) = session.last_position() else {
        println!("No saved position for {}", layout.display_title());
        return Ok(());
    };

    let page = layout
        .resolve(cfi)
        .and_then(|location| session.page_index().global_page_at(&location).ok());

    match page {
        Some(page) => println!(
            "Resume at {} (page {} of {})",
            cfi,
            page,
            session.total_pages()
        ),
        None => println!("Resume at {} (page unknown in current layout)", cfi),
    }

    Ok(())
}

/// Handle the bookmark command
fn handle_bookmark_command(
    config: &ReaderConfig,
    layout_path: &Path,
    section: &str,
    local_page: u32,
    text: Option<String>,
) -> Result<()> {
    let layout = load_layout(layout_path)?;
    let mut session = open_session(config, &layout)?;

    let cfi = LayoutFile::fragment_id(section, local_page);
    if layout.resolve(&cfi).is_none() {
        anyhow::bail!(
            "{} page {} is not part of {}",
            section,
            local_page,
            layout.display_title()
        );
    }

    let preview = text.unwrap_or_else(|| {
        let content = layout
            .section_text(section)
            .map(|t| t.text)
            .unwrap_or_default();
        bookmarks::preview_text(toc::chapter_label(&layout.toc, section), &content)
    });

    match session
        .toggle_bookmark(&cfi, preview)
        .context("Failed to save bookmarks")?
    {
        BookmarkToggle::Added => println!("✓ Bookmarked {}", cfi),
        BookmarkToggle::Removed => println!("✓ Removed bookmark {}", cfi),
    }

    Ok(())
}

/// Handle the bookmarks command
fn handle_bookmarks_command(config: &ReaderConfig, layout_path: &Path) -> Result<()> {
    let layout = load_layout(layout_path)?;
    let session = open_session(config, &layout)?;

    if session.bookmarks().is_empty() {
        println!("No bookmarks for {}", layout.display_title());
        return Ok(());
    }

    println!("Bookmarks for {}:\n", layout.display_title());
    for bookmark in session.bookmarks() {
        let page = session
            .bookmark_page(bookmark, &layout)
            .map_or_else(|| "p. ?".to_string(), |page| format!("p. {}", page));
        println!("  {:>7}  {}", page, bookmark.text);
        println!("           {}", bookmark.cfi);
    }

    Ok(())
}

/// Handle the search command
fn handle_search_command(config: &ReaderConfig, layout_path: &Path, query: &str) -> Result<()> {
    let layout = load_layout(layout_path)?;
    let session = open_session(config, &layout)?;

    let texts = layout.section_texts();
    if texts.is_empty() {
        anyhow::bail!(
            "No section texts available in {}; add `text` paths to the layout",
            layout_path.display()
        );
    }

    let hits = session.search(&texts, query);
    if hits.is_empty() {
        println!("No results found");
        return Ok(());
    }

    let total = hits.len();
    for (i, hit) in hits.iter().enumerate() {
        println!("{}", hit.excerpt);
        println!("  {}\n", hit.caption(i + 1, total));
    }

    Ok(())
}

/// Handle the toc command
fn handle_toc_command(layout_path: &Path) -> Result<()> {
    let layout = load_layout(layout_path)?;

    let index = match PageOffsetIndex::build(&layout.sections()) {
        Ok(index) => index,
        Err(e) => {
            log::warn!("Page numbers unavailable: {}", e);
            PageOffsetIndex::default()
        }
    };

    println!("{}\n", layout.display_title());
    for (depth, entry) in toc::flatten(&layout.toc) {
        let page = index
            .global_page(entry.section_key(), 1)
            .map_or_else(|_| "-".to_string(), |page| page.to_string());
        let label = format!("{}{}", "  ".repeat(depth), entry.label);
        println!("{:<60} {:>6}", label, page);
    }

    Ok(())
}

/// Handle the settings command
fn handle_settings_command(
    config: &ReaderConfig,
    font_size: Option<u32>,
    theme: Option<Theme>,
) -> Result<()> {
    let mut store = open_store(config)?;

    if let Some(font_size) = font_size {
        session::save_font_size(&mut store, config.font_bounds(), font_size)?;
    }

    if let Some(theme) = theme {
        session::save_theme(&mut store, theme)?;
    }

    let settings = session::load_settings(&store, config)?;
    let palette = settings.theme.palette();

    println!("Font size: {}", settings.font_size_css());
    println!(
        "Theme: {} (text {}, background {})",
        settings.theme, palette.text, palette.background
    );
    println!("State file: {}", display_path(store.path()));

    Ok(())
}

/// Absolute form of a path for display, when it can be resolved
fn display_path(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .display()
        .to_string()
}
