//! Document tree: parsing, querying and serialization.
//!
//! HTML is parsed with html5ever's HTML tree builder and XHTML with
//! xml5ever's XML tree builder, both into an [`ArenaDom`]. The XML builder
//! keeps the tree exactly as written, so `<a id="n1"/>` stays an empty
//! element instead of swallowing the text after it. The tree is mutable in
//! one way only, through attribute setters, which is all the formatting
//! emitter needs.
//!
//! # Example
//!
//! ```
//! use stylefold::dom::{parse_html, select, serialize_document};
//!
//! let mut dom = parse_html(r#"<p class="lead">Hello</p>"#);
//! let p = select(&dom, "p.lead").unwrap()[0];
//! dom.remove_attr(p, "class");
//!
//! assert!(serialize_document(&dom).contains("<p>Hello</p>"));
//! ```

mod arena;
mod element_ref;
mod select;
mod serialize;
mod tree_sink;

pub use arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId, Attribute, ChildrenIter};
pub use element_ref::{ElementRef, FoldSelectors};
pub use select::{CompiledSelector, SelectorError, select};
pub use serialize::{is_raw_text_element, is_void_element, serialize_document, serialize_node};

use std::path::Path;

use html5ever::driver::ParseOpts;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use xml5ever::driver::XmlParseOpts;

use crate::error::{Error, Result};
use tree_sink::FoldSink;

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Markup syntax of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Syntax {
    #[default]
    Html,
    Xhtml,
}

impl Syntax {
    /// Guess the syntax from document text.
    ///
    /// An XML declaration, or an `<html>` start tag declaring the XHTML
    /// namespace, means XHTML.
    pub fn sniff(text: &str) -> Self {
        let text = text.trim_start_matches('\u{feff}').trim_start();
        if text.starts_with("<?xml") {
            return Syntax::Xhtml;
        }

        let declares_xhtml = text.find("<html").is_some_and(|start| {
            let tag = &text[start..];
            let tag = tag.find('>').map_or(tag, |end| &tag[..end]);
            tag.contains("xmlns") && tag.contains(XHTML_NAMESPACE)
        });
        if declares_xhtml {
            Syntax::Xhtml
        } else {
            Syntax::Html
        }
    }

    /// Syntax implied by a file extension, if it implies one.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.eq_ignore_ascii_case("xhtml").then_some(Syntax::Xhtml)
    }
}

/// Parse HTML into an arena DOM.
///
/// Never fails: malformed markup is repaired the way browsers repair it.
/// Scripting is treated as disabled, so `<noscript>` content is parsed as
/// markup.
pub fn parse_html(html: &str) -> ArenaDom {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..TreeBuilderOpts::default()
        },
        ..ParseOpts::default()
    };
    html5ever::parse_document(FoldSink::new(Syntax::Html), opts)
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Parse XHTML into an arena DOM with the XML tree builder.
///
/// Well-formedness errors are recovered from rather than reported.
pub fn parse_xhtml(xhtml: &str) -> ArenaDom {
    xml5ever::driver::parse_document(FoldSink::new(Syntax::Xhtml), XmlParseOpts::default())
        .from_utf8()
        .one(xhtml.as_bytes())
        .into_dom()
}

/// Parse markup with the tree builder for `syntax`.
pub fn parse_markup(text: &str, syntax: Syntax) -> ArenaDom {
    match syntax {
        Syntax::Html => parse_html(text),
        Syntax::Xhtml => parse_xhtml(text),
    }
}

/// Parse a document that is about to be processed, sniffing its syntax.
pub fn parse_document(text: &str) -> Result<ArenaDom> {
    parse_document_as(text, Syntax::sniff(text))
}

/// Parse a document that is about to be processed.
///
/// Blank input is rejected as [`Error::StructuralInput`] rather than handed
/// to the tree builder, which would synthesize an empty `<html>` skeleton.
pub fn parse_document_as(text: &str, syntax: Syntax) -> Result<ArenaDom> {
    if text.trim().is_empty() {
        return Err(Error::StructuralInput("document is empty".into()));
    }

    let dom = parse_markup(text, syntax);
    if dom.root_element().is_none() {
        return Err(Error::StructuralInput("document has no root element".into()));
    }
    Ok(dom)
}

/// Parse document bytes, detecting their encoding first.
pub fn parse_document_bytes(bytes: &[u8]) -> Result<ArenaDom> {
    parse_document(&crate::util::decode_document(bytes))
}

/// Contents of every non-blank `<style>` block, in document order.
pub fn collect_inline_css(dom: &ArenaDom) -> Vec<String> {
    dom.elements()
        .filter(|&id| dom.element_name(id).is_some_and(|n| n.as_ref() == "style"))
        .map(|id| dom.child_text(id))
        .filter(|text| !text.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_inline_css() {
        let html = r#"
            <html>
            <head>
                <link rel="stylesheet" href="styles.css">
                <style>p { color: red; }</style>
                <style>   </style>
            </head>
            <body><p>Content</p><style>.late { font-weight: bold }</style></body>
            </html>
        "#;

        let inline = collect_inline_css(&parse_html(html));

        assert_eq!(inline.len(), 2);
        assert!(inline[0].contains("color: red"));
        assert!(inline[1].contains(".late"));
    }

    #[test]
    fn test_collect_inline_css_unwraps_cdata() {
        let xhtml = r#"<html xmlns="http://www.w3.org/1999/xhtml"><head><style type="text/css">/*<![CDATA[*/
.b { font-weight: bold }
/*]]>*/</style></head><body/></html>"#;

        let inline = collect_inline_css(&parse_xhtml(xhtml));
        assert_eq!(inline.len(), 1);
        assert!(!inline[0].contains("CDATA"), "{}", inline[0]);
        assert!(inline[0].contains(".b { font-weight: bold }"));
    }

    #[test]
    fn test_syntax_sniff() {
        assert_eq!(
            Syntax::sniff("\u{feff}  <?xml version=\"1.0\"?><html/>"),
            Syntax::Xhtml
        );
        assert_eq!(
            Syntax::sniff(r#"<!DOCTYPE html><html xmlns="http://www.w3.org/1999/xhtml" lang="en"><body/></html>"#),
            Syntax::Xhtml
        );
        assert_eq!(Syntax::sniff("<!DOCTYPE html><html lang=\"en\"><p>x"), Syntax::Html);
        assert_eq!(Syntax::sniff("<p>fragment</p>"), Syntax::Html);
    }

    #[test]
    fn test_syntax_from_path() {
        assert_eq!(Syntax::from_path(Path::new("OEBPS/ch01.XHTML")), Some(Syntax::Xhtml));
        assert_eq!(Syntax::from_path(Path::new("ch01.html")), None);
        assert_eq!(Syntax::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_noscript_content_is_markup() {
        let dom = parse_html("<body><noscript><p>x</p></noscript></body>");
        let p = dom.find_by_tag("p").unwrap();
        assert_eq!(dom.element_name(dom.parent(p).unwrap()).unwrap().as_ref(), "noscript");
        assert!(serialize_document(&dom).contains("<noscript><p>x</p></noscript>"));
    }

    #[test]
    fn test_parse_document_rejects_blank_input() {
        for syntax in [Syntax::Html, Syntax::Xhtml] {
            for input in ["", "  \n\t "] {
                assert!(matches!(
                    parse_document_as(input, syntax),
                    Err(Error::StructuralInput(_))
                ));
            }
        }
    }

    #[test]
    fn test_parse_document_fragment_gets_root() {
        let dom = parse_document("<p>bare fragment</p>").unwrap();
        let root = dom.root_element().unwrap();
        assert_eq!(dom.element_name(root).unwrap().as_ref(), "html");
        assert_eq!(dom.syntax(), Syntax::Html);
    }

    #[test]
    fn test_parse_document_sniffs_xhtml() {
        let dom = parse_document(r#"<?xml version="1.0"?><html xmlns="http://www.w3.org/1999/xhtml"><body><div/><p>x</p></body></html>"#).unwrap();
        assert_eq!(dom.syntax(), Syntax::Xhtml);

        let div = dom.find_by_tag("div").unwrap();
        assert_eq!(dom.children(div).count(), 0);
    }

    #[test]
    fn test_parse_document_bytes_decodes() {
        let dom = parse_document_bytes(b"<p>caf\xe9</p>").unwrap();
        let p = dom.find_by_tag("p").unwrap();
        assert_eq!(dom.child_text(p), "caf\u{e9}");
    }
}
