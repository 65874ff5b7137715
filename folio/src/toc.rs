//! Table of contents

use serde::{Deserialize, Serialize};

/// A table of contents entry, possibly with nested entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Display label
    pub label: String,

    /// Target href: a section key, optionally followed by `#fragment`
    pub href: String,

    /// Nested entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    /// Key of the section this entry points into
    pub fn section_key(&self) -> &str {
        section_key(&self.href)
    }
}

/// Strip the fragment from an href, leaving the section key
pub fn section_key(href: &str) -> &str {
    href.split_once('#').map_or(href, |(key, _)| key)
}

/// Flatten a TOC tree depth-first as `(depth, entry)` pairs, depth 0 at the top
pub fn flatten(entries: &[TocEntry]) -> Vec<(usize, &TocEntry)> {
    let mut out = Vec::new();
    push_flattened(entries, 0, &mut out);
    out
}

fn push_flattened<'a>(entries: &'a [TocEntry], depth: usize, out: &mut Vec<(usize, &'a TocEntry)>) {
    for entry in entries {
        out.push((depth, entry));
        push_flattened(&entry.children, depth + 1, out);
    }
}

/// Label of the first entry, in reading order, that points into `section_key`
pub fn chapter_label<'a>(entries: &'a [TocEntry], section_key: &str) -> Option<&'a str> {
    flatten(entries)
        .into_iter()
        .find(|(_, entry)| entry.section_key() == section_key)
        .map(|(_, entry)| entry.label.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, href: &str, children: Vec<TocEntry>) -> TocEntry {
        TocEntry {
            label: label.to_string(),
            href: href.to_string(),
            children,
        }
    }

    fn sample_toc() -> Vec<TocEntry> {
        vec![
            entry("Letter 1", "text/letter1.xhtml", vec![]),
            entry(
                "Volume I",
                "text/chapter1.xhtml#vol1",
                vec![
                    entry("Chapter 1", "text/chapter1.xhtml#ch1", vec![]),
                    entry("Chapter 2", "text/chapter2.xhtml", vec![]),
                ],
            ),
        ]
    }

    #[test]
    fn test_section_key() {
        assert_eq!(section_key("text/chapter1.xhtml#ch1"), "text/chapter1.xhtml");
        assert_eq!(section_key("text/chapter2.xhtml"), "text/chapter2.xhtml");
    }

    #[test]
    fn test_flatten_depths() {
        let toc = sample_toc();
        let flat: Vec<(usize, &str)> = flatten(&toc)
            .into_iter()
            .map(|(depth, e)| (depth, e.label.as_str()))
            .collect();

        assert_eq!(
            flat,
            vec![
                (0, "Letter 1"),
                (0, "Volume I"),
                (1, "Chapter 1"),
                (1, "Chapter 2")
            ]
        );
    }

    #[test]
    fn test_chapter_label() {
        let toc = sample_toc();

        assert_eq!(chapter_label(&toc, "text/chapter1.xhtml"), Some("Volume I"));
        assert_eq!(chapter_label(&toc, "text/chapter2.xhtml"), Some("Chapter 2"));
        assert_eq!(chapter_label(&toc, "text/colophon.xhtml"), None);
    }

    #[test]
    fn test_deserialize_nested_toml() {
        let content = r#"
[[toc]]
label = "Volume I"
href = "text/chapter1.xhtml"

[[toc.children]]
label = "Chapter 1"
href = "text/chapter1.xhtml#ch1"
"#;

        #[derive(Deserialize)]
        struct Wrapper {
            toc: Vec<TocEntry>,
        }

        let parsed: Wrapper = toml::from_str(content).unwrap();
        assert_eq!(parsed.toc.len(), 1);
        assert_eq!(parsed.toc[0].children[0].label, "Chapter 1");
    }
}
