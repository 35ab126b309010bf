//! Normalization of raw CSS declarations into tracked properties.
//!
//! Only values that assert formatting produce an entry. `font-weight: 300`
//! and `font-style: normal` are dropped rather than recorded as "normal":
//! absence means "not asserted".

use super::Property;

/// Normalize a raw declaration.
///
/// Returns `None` for untracked properties and for values that do not assert
/// the property's label.
///
/// # Examples
///
/// ```
/// use stylefold::style::{normalize, Property};
///
/// assert_eq!(normalize("font-weight", "700"), Some((Property::FontWeight, "bold".to_string())));
/// assert_eq!(normalize("font-weight", "300"), None);
/// assert_eq!(normalize("text-align", "CENTER "), Some((Property::TextAlign, "center".to_string())));
/// assert_eq!(normalize("color", "red"), None);
/// ```
pub fn normalize(property: &str, raw_value: &str) -> Option<(Property, String)> {
    let property = Property::from_css(property)?;
    normalize_tracked(property, raw_value)
}

/// Normalize a value for an already-identified tracked property.
pub(crate) fn normalize_tracked(property: Property, raw_value: &str) -> Option<(Property, String)> {
    let value = clean_value(raw_value);

    let normalized = match property {
        Property::FontWeight => {
            let bold = if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                // Overlong digit strings are certainly heavier than 400
                value.parse::<u32>().map_or(true, |weight| weight > 400)
            } else {
                matches!(value.as_str(), "bold" | "bolder")
            };
            bold.then(|| "bold".to_string())
        }
        Property::FontStyle => (value.contains("italic") || value.contains("oblique"))
            .then(|| "italic".to_string()),
        Property::TextDecoration => value
            .contains("underline")
            .then(|| "underline".to_string()),
        Property::TextAlign => value.split_whitespace().next().map(str::to_string),
    };

    normalized.map(|value| (property, value))
}

/// Trim, lower-case, and strip a trailing `!important` annotation.
pub fn clean_value(raw_value: &str) -> String {
    let lowered = raw_value.trim().to_ascii_lowercase();
    let without_important = match lowered.find("!important") {
        Some(idx) => &lowered[..idx],
        None => lowered.as_str(),
    };
    // `! important` with whitespace is also valid CSS
    let without_bang = match without_important.find('!') {
        Some(idx) if without_important[idx + 1..].trim() == "important" => {
            &without_important[..idx]
        }
        _ => without_important,
    };
    without_bang.trim().to_string()
}
