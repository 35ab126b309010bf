//! Parsing of inline `style="..."` attributes.

use std::collections::BTreeMap;

use super::normalize::{clean_value, normalize_tracked};
use super::{Property, PropertyMap};

/// Declarations from one `style` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    /// Tracked declarations. A value that asserts its label is stored
    /// normalized; any other value (`normal`, `400`, `none`) is stored cleaned
    /// so it still overrides an inherited or selector-derived value.
    pub tracked: PropertyMap,
    /// Untracked declarations, kept verbatim under a lower-cased name.
    pub passthrough: BTreeMap<String, String>,
}

impl InlineStyle {
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty() && self.passthrough.is_empty()
    }
}

/// Parse an inline style attribute. Later declarations win.
///
/// ```
/// use stylefold::style::{parse_inline_style, Property};
///
/// let style = parse_inline_style("font-weight: 700; color: Red; font-style: normal");
/// assert_eq!(style.tracked.get(Property::FontWeight), Some("bold"));
/// assert_eq!(style.tracked.get(Property::FontStyle), Some("normal"));
/// assert_eq!(style.passthrough.get("color").map(String::as_str), Some("Red"));
/// ```
pub fn parse_inline_style(style: &str) -> InlineStyle {
    let mut result = InlineStyle::default();

    for part in split_declarations(style) {
        let Some((name, value)) = part.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }

        match Property::from_css(&name) {
            Some(property) => {
                let value = match normalize_tracked(property, value) {
                    Some((_, normalized)) => normalized,
                    None => clean_value(value),
                };
                if value.is_empty() {
                    continue;
                }
                result.tracked.insert(property, value);
            }
            None => {
                result.passthrough.insert(name, value.to_string());
            }
        }
    }

    result
}

/// Split on `;` outside of quotes and parentheses, so `url(data:...;base64,...)`
/// stays in one piece.
fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, c) in style.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&style[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&style[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert!(parse_inline_style("").is_empty());
        assert!(parse_inline_style(" ; ;").is_empty());
    }

    #[test]
    fn test_tracked_and_passthrough() {
        let style = parse_inline_style("TEXT-ALIGN: Center; margin-left: 2em");
        assert_eq!(style.tracked.get(Property::TextAlign), Some("center"));
        assert_eq!(
            style.passthrough.get("margin-left").map(String::as_str),
            Some("2em")
        );
    }

    #[test]
    fn test_non_asserting_value_kept() {
        let style = parse_inline_style("font-weight:normal;text-decoration:none !important");
        assert_eq!(style.tracked.get(Property::FontWeight), Some("normal"));
        assert_eq!(style.tracked.get(Property::TextDecoration), Some("none"));
    }

    #[test]
    fn test_later_declaration_wins() {
        let style = parse_inline_style("font-weight:bold; font-weight:300");
        assert_eq!(style.tracked.get(Property::FontWeight), Some("300"));
    }

    #[test]
    fn test_malformed_parts_skipped() {
        let style = parse_inline_style("bogus; :red; color:; font-style:italic");
        assert_eq!(style.tracked.len(), 1);
        assert!(style.passthrough.is_empty());
    }

    #[test]
    fn test_url_with_semicolon() {
        let style =
            parse_inline_style("background:url(data:image/png;base64,AAAA); font-weight:bold");
        assert_eq!(
            style.passthrough.get("background").map(String::as_str),
            Some("url(data:image/png;base64,AAAA)")
        );
        assert_eq!(style.tracked.get(Property::FontWeight), Some("bold"));
    }
}
