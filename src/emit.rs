//! Rewriting resolved styles into the document and building output records.

use crate::cascade::Resolution;
use crate::dom::{ArenaDom, serialize_document};
use crate::style::ToCss;

/// One piece of formatted text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FormattedEntry {
    pub book: u32,
    pub chapter: u32,
    /// Local name of the element directly containing the text.
    pub element: String,
    pub text: String,
    /// Sorted labels joined by `", "`, e.g. `"bold, italic"`.
    pub format: String,
}

/// Output of [`emit`].
#[derive(Debug, Clone, Default)]
pub struct Emitted {
    /// The rewritten document markup.
    pub html: String,
    pub entries: Vec<FormattedEntry>,
}

/// Write every element's computed style back as its `style` attribute.
///
/// Elements with an empty computed style lose their `style` attribute. Every
/// `class` attribute is removed, since the styles it selected are now
/// inline. Other attributes are untouched.
pub fn apply_styles(dom: &mut ArenaDom, resolution: &Resolution) -> usize {
    let elements: Vec<_> = dom.elements().collect();
    let mut styled = 0;

    for id in elements {
        match resolution.element_style(id).filter(|s| !s.is_empty()) {
            Some(style) => {
                dom.set_attr(id, "style", style.to_css_string());
                styled += 1;
            }
            None => {
                dom.remove_attr(id, "style");
            }
        }
        dom.remove_attr(id, "class");
    }

    styled
}

/// Rewrite the document and tag the resolved text with `book` and `chapter`.
pub fn emit(dom: &mut ArenaDom, resolution: &Resolution, book: u32, chapter: u32) -> Emitted {
    let styled = apply_styles(dom, resolution);

    let entries: Vec<_> = resolution
        .drafts()
        .iter()
        .map(|draft| FormattedEntry {
            book,
            chapter,
            element: draft.element.clone(),
            text: draft.text.clone(),
            format: draft.labels.label_string(),
        })
        .collect();

    tracing::debug!(book, chapter, styled, entries = entries.len(), "emitted chapter");

    Emitted {
        html: serialize_document(dom),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::resolve;
    use crate::css::{CssSource, SelectorStyleMap, parse_css_sources};
    use crate::diagnostics::Diagnostics;
    use crate::dom::{parse_html, select};

    fn run(css: &str, html: &str) -> (ArenaDom, Emitted) {
        let selectors = parse_css_sources(&[CssSource::inline("test.css", css)]).selectors;
        run_with(&selectors, html)
    }

    fn run_with(selectors: &SelectorStyleMap, html: &str) -> (ArenaDom, Emitted) {
        let mut dom = parse_html(html);
        let resolution = resolve(&dom, selectors, &mut Diagnostics::new());
        let emitted = emit(&mut dom, &resolution, 1, 2);
        (dom, emitted)
    }

    #[test]
    fn test_class_and_id_selectors_inlined() {
        let (dom, emitted) = run(
            ".title { font-weight: bold } #x { font-style: italic }",
            r#"<h1 class="title" id="x">Intro</h1>"#,
        );

        assert_eq!(
            emitted.entries,
            vec![FormattedEntry {
                book: 1,
                chapter: 2,
                element: "h1".to_string(),
                text: "Intro".to_string(),
                format: "bold, italic".to_string(),
            }]
        );

        let h1 = dom.find_by_tag("h1").unwrap();
        assert_eq!(
            dom.get_attr(h1, "style"),
            Some("font-style:italic;font-weight:bold;")
        );
        assert_eq!(dom.get_attr(h1, "class"), None);
        assert_eq!(dom.get_attr(h1, "id"), Some("x"));
        assert!(
            emitted
                .html
                .contains(r#"<h1 id="x" style="font-style:italic;font-weight:bold;">Intro</h1>"#),
            "{}",
            emitted.html
        );
    }

    #[test]
    fn test_style_replaced_in_place() {
        let (_, emitted) = run(
            "",
            r#"<p style="COLOR: red ; font-weight: 800" title="t">x</p>"#,
        );
        assert!(
            emitted
                .html
                .contains(r#"<p style="color:red;font-weight:bold;" title="t">x</p>"#),
            "{}",
            emitted.html
        );
    }

    #[test]
    fn test_untracked_only_style_removed_when_empty() {
        let (dom, emitted) = run(".a { color: red }", r#"<p class="a" style="">x</p>"#);
        let p = dom.find_by_tag("p").unwrap();
        assert_eq!(dom.get_attr(p, "style"), None);
        assert!(emitted.entries.is_empty());
        assert!(emitted.html.contains("<p>x</p>"));
    }

    #[test]
    fn test_non_asserting_inline_value_kept() {
        let (dom, emitted) = run(
            "p { font-weight: bold }",
            r#"<p style="font-weight: normal !important">x</p>"#,
        );
        let p = dom.find_by_tag("p").unwrap();
        assert_eq!(dom.get_attr(p, "style"), Some("font-weight:normal;"));
        assert!(emitted.entries.is_empty());
    }

    #[test]
    fn test_tag_semantics_inlined() {
        let (dom, _) = run("", "<p><strong>a</strong><em>b</em></p>");
        let strong = select(&dom, "strong").unwrap()[0];
        let em = select(&dom, "em").unwrap()[0];
        assert_eq!(dom.get_attr(strong, "style"), Some("font-weight:bold;"));
        assert_eq!(dom.get_attr(em, "style"), Some("font-style:italic;"));
    }

    #[test]
    fn test_emit_is_idempotent() {
        let css = ".c { text-align: center; font-weight: 700 } .i { font-style: oblique }";
        let html = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml"><head><style>.i { font-style: italic }</style></head>
<body><div class="c"><p class="i" style="margin: 0; font-weight: 300">A &amp; B<br/>
<b>C</b> <span style="text-decoration: underline overline">D</span></p></div></body></html>"#;

        let (_, first) = run(css, html);
        let (_, second) = run_with(&SelectorStyleMap::new(), &first.html);

        assert_eq!(second.html, first.html);
        assert!(!first.html.contains("class="));

        let formats = |e: &Emitted| -> Vec<(String, String)> {
            e.entries
                .iter()
                .map(|x| (x.text.clone(), x.format.clone()))
                .collect()
        };
        assert_eq!(formats(&second), formats(&first));
        assert_eq!(
            formats(&first),
            vec![
                ("A & B".to_string(), "italic, text-align:center".to_string()),
                ("C".to_string(), "bold, italic, text-align:center".to_string()),
                (
                    "D".to_string(),
                    "italic, text-align:center, underline".to_string()
                ),
            ]
        );
    }
}
