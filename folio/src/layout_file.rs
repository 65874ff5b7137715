//! Layout description consumed by the command line
//!
//! A layout file records what the rendering engine reported for one
//! document at one font size and viewport: the sections in reading order
//! with their page counts, where their text lives, and the table of
//! contents. Example:
//!
//! ```toml
//! document_id = "frankenstein"
//! title = "Frankenstein"
//!
//! [[sections]]
//! key = "text/letter1.xhtml"
//! page_count = 6
//! text = "text/letter1.xhtml"
//!
//! [[toc]]
//! label = "Letter 1"
//! href = "text/letter1.xhtml"
//! ```

use crate::pagination::{Location, Section};
use crate::search::SectionText;
use crate::session::FragmentResolver;
use crate::toc::TocEntry;
use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity, unescape_with};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker between a section key and a page number in CLI fragment ids
const PAGE_MARKER: &str = "#page=";

/// Errors loading a layout file
#[derive(Error, Debug)]
pub enum LayoutFileError {
    /// The file could not be read
    #[error("IO error reading {path}: {source}", path = .0.display(), source = .1)]
    IoError(PathBuf, #[source] std::io::Error),

    /// The file is not a valid layout description
    #[error("Error parsing {path}: {source}", path = .0.display(), source = .1)]
    ParseError(PathBuf, #[source] toml::de::Error),

    /// A section text file is not well-formed markup
    #[error("Malformed markup in {path}: {source}", path = .0.display(), source = .1)]
    MarkupError(PathBuf, #[source] quick_xml::Error),
}

/// One section entry of a layout file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSection {
    /// Section key (reference path inside the book)
    pub key: String,

    /// Pages reported by the engine
    pub page_count: u32,

    /// Text or XHTML file with the section content, relative to the layout file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<PathBuf>,
}

/// A document layout as reported by the rendering engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFile {
    /// Stable identifier used to key stored state
    pub document_id: String,

    /// Human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Sections in reading order
    #[serde(default)]
    pub sections: Vec<LayoutSection>,

    /// Table of contents
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toc: Vec<TocEntry>,

    /// Directory that relative text paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl LayoutFile {
    /// Load a layout file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LayoutFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LayoutFileError::IoError(path.to_path_buf(), e))?;

        let mut layout: LayoutFile = toml::from_str(&content)
            .map_err(|e| LayoutFileError::ParseError(path.to_path_buf(), e))?;

        layout.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        log::info!(
            "Loaded layout for {} with {} sections",
            layout.document_id,
            layout.sections.len()
        );
        Ok(layout)
    }

    /// Display title, falling back to the document id
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.document_id)
    }

    /// Sections with page counts, ready for pagination
    pub fn sections(&self) -> Vec<Section> {
        self.sections
            .iter()
            .map(|s| Section::new(s.key.clone(), s.page_count))
            .collect()
    }

    /// Fragment id the command line uses for a page of a section
    pub fn fragment_id(section_key: &str, local_page: u32) -> String {
        format!("{}{}{}", section_key, PAGE_MARKER, local_page)
    }

    /// Text of one section, markup removed
    ///
    /// Returns `None` when the section has no text file or it cannot be read.
    pub fn section_text(&self, key: &str) -> Option<SectionText> {
        let section = self.sections.iter().find(|s| s.key == key)?;
        let relative = section.text.as_ref()?;
        let path = self.base_dir.join(relative);

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Skipping text of {}: {}: {}", key, path.display(), e);
                return None;
            }
        };

        match extract_text(&path, &raw) {
            Ok(text) => Some(SectionText::new(key, text)),
            Err(e) => {
                log::warn!("Skipping text of {}: {}", key, e);
                None
            }
        }
    }

    /// Texts of every section that has a readable text file, in reading order
    pub fn section_texts(&self) -> Vec<SectionText> {
        self.sections
            .iter()
            .filter_map(|s| self.section_text(&s.key))
            .collect()
    }
}

impl FragmentResolver for LayoutFile {
    fn resolve(&self, cfi: &str) -> Option<Location> {
        let (key, page) = cfi.rsplit_once(PAGE_MARKER)?;
        let page: u32 = page.parse().ok()?;
        let section = self.sections.iter().find(|s| s.key == key)?;

        (1..=section.page_count)
            .contains(&page)
            .then(|| Location::new(key, page))
    }
}

/// Text content of a section file
///
/// Markup files (`.xhtml`, `.html`, `.htm`, `.xml`) lose their tags, head,
/// scripts and styles; other files are returned as-is.
pub fn extract_text(path: &Path, raw: &str) -> Result<String, LayoutFileError> {
    let is_markup = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "xhtml" | "html" | "htm" | "xml"));

    if is_markup {
        strip_markup(raw).map_err(|e| LayoutFileError::MarkupError(path.to_path_buf(), e))
    } else {
        Ok(raw.to_string())
    }
}

/// Text of an XHTML document with every entity and CDATA section decoded
///
/// Content of `head`, `script` and `style` elements is dropped. Entities
/// without a known replacement are kept as written.
pub fn strip_markup(markup: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().check_end_names = false;

    let mut text = String::with_capacity(markup.len());
    let mut skip_depth = 0usize;
    let mut entity_buf = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if is_non_text(e.local_name().as_ref()) {
                    skip_depth += 1;
                }
            }
            Event::End(e) => {
                if is_non_text(e.local_name().as_ref()) {
                    skip_depth = skip_depth.saturating_sub(1);
                }
            }
            Event::Text(e) if skip_depth == 0 => {
                text.push_str(&e.decode()?);
            }
            Event::CData(e) if skip_depth == 0 => {
                text.push_str(&reader.decoder().decode(&e)?);
            }
            Event::GeneralRef(e) if skip_depth == 0 => {
                entity_buf.clear();
                entity_buf.push('&');
                entity_buf.push_str(&e.decode()?);
                entity_buf.push(';');
                match unescape_with(&entity_buf, |name| {
                    resolve_predefined_entity(name).or_else(|| resolve_html5_entity(name))
                }) {
                    Ok(resolved) => text.push_str(&resolved),
                    Err(err) => {
                        log::debug!("Keeping unresolved entity {}: {}", entity_buf, err);
                        text.push_str(&entity_buf);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

fn is_non_text(name: &[u8]) -> bool {
    [b"head".as_slice(), b"script", b"style"]
        .iter()
        .any(|tag| name.eq_ignore_ascii_case(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LAYOUT: &str = r#"
document_id = "frankenstein"
title = "Frankenstein"

[[sections]]
key = "text/letter1.xhtml"
page_count = 6
text = "text/letter1.xhtml"

[[sections]]
key = "text/chapter1.xhtml"
page_count = 12
text = "text/missing.xhtml"

[[sections]]
key = "text/colophon.xhtml"
page_count = 0

[[toc]]
label = "Letter 1"
href = "text/letter1.xhtml"
"#;

    fn write_layout(dir: &Path) -> PathBuf {
        fs::create_dir_all(dir.join("text")).unwrap();
        fs::write(
            dir.join("text/letter1.xhtml"),
            "<html><head><title>L1</title></head><body><p>You will <em>rejoice</em> &amp; hear</p></body></html>",
        )
        .unwrap();
        let path = dir.join("layout.toml");
        fs::write(&path, LAYOUT).unwrap();
        path
    }

    #[test]
    fn test_load_layout() {
        let dir = tempfile::tempdir().unwrap();
        let layout = LayoutFile::load(write_layout(dir.path())).unwrap();

        assert_eq!(layout.display_title(), "Frankenstein");
        assert_eq!(
            layout.sections(),
            vec![
                Section::new("text/letter1.xhtml", 6),
                Section::new("text/chapter1.xhtml", 12),
                Section::new("text/colophon.xhtml", 0),
            ]
        );
        assert_eq!(layout.toc[0].label, "Letter 1");
    }

    #[test]
    fn test_section_texts_skip_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let layout = LayoutFile::load(write_layout(dir.path())).unwrap();

        let texts = layout.section_texts();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].key, "text/letter1.xhtml");
        assert_eq!(texts[0].text, "You will rejoice & hear");
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "document_id = ").unwrap();

        let err = LayoutFile::load(&path).unwrap_err();
        assert!(matches!(err, LayoutFileError::ParseError(_, _)));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_fragment_resolution() {
        let layout: LayoutFile = toml::from_str(LAYOUT).unwrap();
        let id = LayoutFile::fragment_id("text/chapter1.xhtml", 3);

        assert_eq!(id, "text/chapter1.xhtml#page=3");
        assert_eq!(
            layout.resolve(&id),
            Some(Location::new("text/chapter1.xhtml", 3))
        );
        assert_eq!(layout.resolve("text/chapter1.xhtml#page=13"), None);
        assert_eq!(layout.resolve("text/colophon.xhtml#page=1"), None);
        assert_eq!(layout.resolve("text/unknown.xhtml#page=1"), None);
        assert_eq!(layout.resolve("epubcfi(/6/4!/4/2)"), None);
    }

    #[test]
    fn test_strip_markup() {
        let markup = "<style>p { color: red }</style><p>Tom &quot;&amp;&quot; Jerry</p><script>x()</script>";
        assert_eq!(strip_markup(markup).unwrap(), "Tom \"&\" Jerry");
        assert_eq!(strip_markup("&amp;lt;").unwrap(), "&lt;");
    }

    #[test]
    fn test_strip_markup_decodes_entities_and_cdata() {
        let markup = "<p>It&#8217;s &#x2014; caf&eacute;<![CDATA[<b>x</b>]]></p>";
        assert_eq!(strip_markup(markup).unwrap(), "It\u{2019}s \u{2014} caf\u{e9}<b>x</b>");

        assert_eq!(strip_markup("<p>a&nbsp;b &bogus; c</p>").unwrap(), "a\u{a0}b &bogus; c");
        assert_eq!(
            strip_markup("<html><HEAD><title>T</title></HEAD><body>x<SCRIPT>y()</SCRIPT></body></html>")
                .unwrap(),
            "x"
        );
    }

    #[test]
    fn test_extract_text_keeps_plain_text() {
        assert_eq!(
            extract_text(Path::new("a.txt"), "<not markup>").unwrap(),
            "<not markup>"
        );
        assert_eq!(
            extract_text(Path::new("a.XHTML"), "<b>bold</b>").unwrap(),
            "bold"
        );
    }

    #[test]
    fn test_malformed_markup_is_reported() {
        let err = extract_text(Path::new("text/broken.xhtml"), "<p>cut <b").unwrap_err();
        assert!(matches!(err, LayoutFileError::MarkupError(_, _)));
        assert!(err.to_string().contains("broken.xhtml"));
    }
}
