//! Text decoding and small string helpers.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// How far into a document an XML declaration is looked for.
const DECLARATION_WINDOW: usize = 100;

/// Decode bytes as UTF-8, then as `hint_encoding`, then as Windows-1252.
///
/// A UTF-8 BOM is stripped. Valid UTF-8 input is borrowed, not copied.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (text, _, malformed) = UTF_8.decode(bytes);
    if !malformed {
        return text;
    }

    let fallback = hint_encoding
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(WINDOWS_1252);
    tracing::debug!(encoding = fallback.name(), "input is not UTF-8");
    fallback.decode(bytes).0
}

/// Decode an HTML/XHTML document, honoring an XML encoding declaration.
pub fn decode_document(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// The `encoding` pseudo-attribute of a leading `<?xml ...?>` declaration.
///
/// # Examples
///
/// ```
/// use stylefold::util::extract_xml_encoding;
///
/// assert_eq!(extract_xml_encoding(b"<?xml version='1.0' encoding='ISO-8859-1'?>"), Some("ISO-8859-1"));
/// assert_eq!(extract_xml_encoding(b"<html>"), None);
/// ```
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(DECLARATION_WINDOW)];
    let declaration = &head[find(head, b"<?xml")?..];
    let declaration = &declaration[..find(declaration, b"?>").unwrap_or(declaration.len())];

    const KEY: &[u8] = b"encoding=";
    let start = declaration
        .windows(KEY.len())
        .position(|w| w.eq_ignore_ascii_case(KEY))?
        + KEY.len();
    let (&quote, rest) = declaration[start..].split_first()?;
    if !matches!(quote, b'"' | b'\'') {
        return None;
    }
    let len = rest.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[..len]).ok()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the last run of ASCII digits in `name`, e.g. `"book-03"` -> `3`.
///
/// Returns `default` when the name has no digits or the number overflows.
pub fn extract_book_number(name: &str, default: u32) -> u32 {
    let bytes = name.as_bytes();
    let Some(end) = bytes.iter().rposition(u8::is_ascii_digit) else {
        return default;
    };
    let start = bytes[..end]
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |i| i + 1);
    name[start..=end].parse().unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
