//! Formatting implied by the HTML element itself.

use super::{Property, PropertyMap};

/// Map an HTML element name to the formatting it implies regardless of CSS.
///
/// Tag-implied formatting has the highest precedence for that element:
/// `<b style="font-weight:normal">` is still bold.
pub fn tag_implied_style(local_name: &str) -> PropertyMap {
    let mut style = PropertyMap::new();
    match local_name.to_ascii_lowercase().as_str() {
        // Strong importance / bring attention
        "b" | "strong" => style.insert(Property::FontWeight, "bold"),

        // Emphasis / alternate voice
        "i" | "em" => style.insert(Property::FontStyle, "italic"),

        "u" => style.insert(Property::TextDecoration, "underline"),

        _ => {}
    }
    style
}
