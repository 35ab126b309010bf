//! Serializing the arena back to markup.
//!
//! The output is XHTML-flavored: void elements self-close (`<br/>`) and
//! attribute values are always quoted. Nothing is reordered, inserted or
//! dropped, so a document round-trips through [`super::parse_markup`] to the
//! same tree. Raw text of a tree parsed as XHTML is wrapped in a CDATA
//! section when it contains markup characters.

use html5ever::QualName;

use super::Syntax;
use super::arena::{ArenaDom, ArenaNodeData, ArenaNodeId, Attribute};

/// Elements that never have content.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text content is emitted without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe",
    "noembed",
    "noframes",
    "plaintext",
    "script",
    "style",
    "xmp",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Serialize the whole document, including doctype and prolog.
pub fn serialize_document(dom: &ArenaDom) -> String {
    let mut out = String::with_capacity(dom.len() * 16);
    for child in dom.children(dom.document()) {
        write_node(dom, child, false, &[], &mut out);
    }
    out
}

/// Serialize one node and its subtree.
pub fn serialize_node(dom: &ArenaDom, id: ArenaNodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, false, &[], &mut out);
    out
}

/// Namespace bindings in scope, as `(prefix, namespace)`; `""` is the
/// default namespace.
type Bindings = [(String, String)];

fn bound_namespace<'a>(scope: &'a Bindings, prefix: &str) -> &'a str {
    scope
        .iter()
        .rev()
        .find(|(p, _)| p == prefix)
        .map_or("", |(_, ns)| ns.as_str())
}

/// Namespace declaration carried as an attribute, as `(prefix, namespace)`.
fn as_declaration(attr: &Attribute) -> Option<(String, String)> {
    match &attr.name.prefix {
        Some(prefix) if prefix.as_ref() == "xmlns" => {
            Some((attr.name.local.to_string(), attr.value.clone()))
        }
        None if attr.name.local.as_ref() == "xmlns" => Some((String::new(), attr.value.clone())),
        _ => None,
    }
}

/// Declarations an XHTML element must write so its own name and its
/// attributes' prefixes resolve. The XML tree builder drops `xmlns`
/// attributes after binding names, so they are rebuilt here.
fn missing_declarations(
    name: &QualName,
    attrs: &[Attribute],
    scope: &Bindings,
) -> Vec<(String, String)> {
    let explicit: Vec<_> = attrs.iter().filter_map(as_declaration).collect();
    let element = (
        name.prefix.as_ref().map_or(String::new(), |p| p.to_string()),
        name.ns.to_string(),
    );
    let prefixed_attrs = attrs.iter().filter_map(|a| {
        let prefix = a.name.prefix.as_ref()?;
        (!matches!(prefix.as_ref(), "xml" | "xmlns"))
            .then(|| (prefix.to_string(), a.name.ns.to_string()))
    });

    let mut missing: Vec<(String, String)> = Vec::new();
    for (prefix, ns) in std::iter::once(element).chain(prefixed_attrs) {
        let declared = explicit.iter().chain(&missing).any(|(p, _)| *p == prefix);
        if !declared && bound_namespace(scope, &prefix) != ns {
            missing.push((prefix, ns));
        }
    }
    missing
}

fn write_node(
    dom: &ArenaDom,
    id: ArenaNodeId,
    raw_text: bool,
    scope: &Bindings,
    out: &mut String,
) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        ArenaNodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, false, scope, out);
            }
        }
        ArenaNodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            if !public_id.is_empty() {
                out.push_str(" PUBLIC \"");
                out.push_str(public_id);
                out.push('"');
                if !system_id.is_empty() {
                    out.push_str(" \"");
                    out.push_str(system_id);
                    out.push('"');
                }
            } else if !system_id.is_empty() {
                out.push_str(" SYSTEM \"");
                out.push_str(system_id);
                out.push('"');
            }
            out.push('>');
        }
        ArenaNodeData::Comment(text) => {
            // Processing instructions are kept as `?...?` comments
            if text.starts_with('?') && text.ends_with('?') && text.len() > 1 {
                out.push('<');
                out.push_str(text);
                out.push('>');
            } else {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
        ArenaNodeData::Text(text) => {
            if !raw_text {
                escape_text(text, out);
            } else if dom.syntax() == Syntax::Xhtml && text.contains(['<', '&']) {
                write_cdata(text, out);
            } else {
                out.push_str(text);
            }
        }
        ArenaNodeData::Element { name, attrs, .. } => {
            let tag = name.local.as_ref();
            let qualified = match &name.prefix {
                Some(prefix) => format!("{prefix}:{tag}"),
                None => tag.to_string(),
            };
            out.push('<');
            out.push_str(&qualified);

            let mut inner_scope = scope.to_vec();
            if dom.syntax() == Syntax::Xhtml {
                for (prefix, ns) in missing_declarations(name, attrs, scope) {
                    out.push_str(" xmlns");
                    if !prefix.is_empty() {
                        out.push(':');
                        out.push_str(&prefix);
                    }
                    out.push_str("=\"");
                    escape_attr(&ns, out);
                    out.push('"');
                    inner_scope.push((prefix, ns));
                }
                inner_scope.extend(attrs.iter().filter_map(as_declaration));
            }

            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.qualified_name());
                out.push_str("=\"");
                escape_attr(&attr.value, out);
                out.push('"');
            }

            if is_void_element(tag) {
                out.push_str("/>");
                return;
            }
            out.push('>');

            let raw = is_raw_text_element(tag);
            for child in dom.children(id) {
                write_node(dom, child, raw, &inner_scope, out);
            }

            out.push_str("</");
            out.push_str(&qualified);
            out.push('>');
        }
    }
}

fn write_cdata(text: &str, out: &mut String) {
    out.push_str("<![CDATA[");
    out.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
    out.push_str("]]>");
}

/// Escape text content.
fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&#160;"),
            _ => out.push(c),
        }
    }
}

/// Escape a double-quoted attribute value.
fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{parse_html, parse_xhtml};
    use super::*;

    fn roundtrip(html: &str) -> String {
        serialize_document(&parse_html(html))
    }

    #[test]
    fn test_doctype_and_structure() {
        let out = roundtrip("<!DOCTYPE html><html><head></head><body><p>Hi</p></body></html>");
        assert_eq!(
            out,
            "<!DOCTYPE html><html><head></head><body><p>Hi</p></body></html>"
        );
    }

    #[test]
    fn test_xhtml_prolog_and_public_doctype() {
        let html = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>T</title></head><body><p>x</p></body></html>"#;
        let out = roundtrip(html);
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#), "{out}");
        assert!(out.contains(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#
        ));
        assert!(out.contains(r#"<html xmlns="http://www.w3.org/1999/xhtml">"#));
    }

    #[test]
    fn test_void_elements_self_close() {
        let out = roundtrip(r#"<p>a<br>b<img src="x.png" alt=""></p>"#);
        assert!(out.contains(r#"<p>a<br/>b<img src="x.png" alt=""/></p>"#), "{out}");
    }

    #[test]
    fn test_escaping() {
        let out = roundtrip(r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp;&amp; 3 &gt; 2</p>"#);
        assert!(
            out.contains(r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp;&amp; 3 &gt; 2</p>"#),
            "{out}"
        );
    }

    #[test]
    fn test_raw_text_not_escaped() {
        let out = roundtrip("<style>p > em { font-style: italic }</style><p>x</p>");
        assert!(out.contains("<style>p > em { font-style: italic }</style>"), "{out}");
    }

    #[test]
    fn test_comments_kept() {
        let out = roundtrip("<p>a<!-- note -->b</p>");
        assert!(out.contains("<p>a<!-- note -->b</p>"));
    }

    #[test]
    fn test_serialize_is_stable() {
        let html = r#"<html><head><style>.a{}</style></head><body><div class="a" id="k"><p>x &amp; y<br/></p></div></body></html>"#;
        let once = roundtrip(html);
        assert_eq!(roundtrip(&once), once);
    }

    #[test]
    fn test_xhtml_self_closed_elements_round_trip() {
        let xhtml = r#"<html xmlns="http://www.w3.org/1999/xhtml"><head><title/></head><body><p>one<a id="x"/>two</p><div/><p>three</p></body></html>"#;
        let out = serialize_document(&parse_xhtml(xhtml));
        assert_eq!(
            out,
            r#"<html xmlns="http://www.w3.org/1999/xhtml"><head><title></title></head><body><p>one<a id="x"></a>two</p><div></div><p>three</p></body></html>"#
        );
        assert_eq!(serialize_document(&parse_xhtml(&out)), out);
    }

    #[test]
    fn test_xhtml_prefixed_names_kept() {
        let xhtml = r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops"><body><section epub:type="chapter"><p>x</p></section></body></html>"#;
        let out = serialize_document(&parse_xhtml(xhtml));
        assert!(out.starts_with(r#"<html xmlns="http://www.w3.org/1999/xhtml""#), "{out}");
        assert!(out.contains(r#"xmlns:epub="http://www.idpf.org/2007/ops""#), "{out}");
        assert!(out.contains(r#"epub:type="chapter"><p>x</p></section>"#), "{out}");
        assert_eq!(serialize_document(&parse_xhtml(&out)), out);
    }

    #[test]
    fn test_xhtml_raw_text_with_markup_uses_cdata() {
        let xhtml = r#"<html xmlns="http://www.w3.org/1999/xhtml"><head><script><![CDATA[if (a < b && c) {}]]></script></head><body/></html>"#;
        let out = serialize_document(&parse_xhtml(xhtml));
        assert!(
            out.contains("<script><![CDATA[if (a < b && c) {}]]></script>"),
            "{out}"
        );
        assert_eq!(serialize_document(&parse_xhtml(&out)), out);
    }

    #[test]
    fn test_noscript_round_trips() {
        let out = roundtrip("<body><noscript><p>x &amp; y</p></noscript></body>");
        assert!(out.contains("<noscript><p>x &amp; y</p></noscript>"), "{out}");
    }
}
