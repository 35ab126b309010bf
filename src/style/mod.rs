//! Tracked formatting properties and the maps that carry them.
//!
//! This module contains:
//! - [`Property`], the four CSS properties the engine understands
//! - [`Label`] and [`LabelSet`], the formatting signals reported per text node
//! - [`PropertyMap`], a rightmost-wins map from property to value
//! - normalization of raw CSS values, inline `style` parsing, and tag semantics

mod inline;
mod normalize;
mod tag_map;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

pub use inline::{InlineStyle, parse_inline_style};
pub use normalize::{clean_value, normalize};
pub use tag_map::tag_implied_style;

/// Serialize a value as CSS text.
pub trait ToCss {
    /// Write this value as CSS to the buffer.
    fn to_css(&self, buf: &mut String);

    /// Convert to a CSS string (convenience method).
    fn to_css_string(&self) -> String {
        let mut buf = String::new();
        self.to_css(&mut buf);
        buf
    }
}

/// One of the four tracked CSS properties.
///
/// Variants are declared in alphabetical order of their CSS names so the
/// derived `Ord` sorts keys the same way their names do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    FontStyle,
    FontWeight,
    TextAlign,
    TextDecoration,
}

impl Property {
    pub const ALL: [Property; 4] = [
        Property::FontStyle,
        Property::FontWeight,
        Property::TextAlign,
        Property::TextDecoration,
    ];

    /// Returns the CSS property name.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::FontStyle => "font-style",
            Property::FontWeight => "font-weight",
            Property::TextAlign => "text-align",
            Property::TextDecoration => "text-decoration",
        }
    }

    /// Look up a tracked property by CSS name (case-insensitive).
    ///
    /// `text-decoration-line` folds into `text-decoration`.
    pub fn from_css(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("font-weight") {
            Some(Property::FontWeight)
        } else if name.eq_ignore_ascii_case("font-style") {
            Some(Property::FontStyle)
        } else if name.eq_ignore_ascii_case("text-decoration")
            || name.eq_ignore_ascii_case("text-decoration-line")
        {
            Some(Property::TextDecoration)
        } else if name.eq_ignore_ascii_case("text-align") {
            Some(Property::TextAlign)
        } else {
            None
        }
    }

    /// Reduce a value for this property to the label it asserts, if any.
    ///
    /// Accepts both normalized values and raw author values.
    pub fn label(&self, value: &str) -> Option<Label> {
        let (_, normalized) = normalize::normalize_tracked(*self, value)?;
        Some(match self {
            Property::FontWeight => Label::Bold,
            Property::FontStyle => Label::Italic,
            Property::TextDecoration => Label::Underline,
            Property::TextAlign => Label::Align(normalized),
        })
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An active formatting signal on a piece of text.
///
/// Ordering follows the rendered label text, so a [`LabelSet`] joins in
/// alphabetical order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Bold,
    Italic,
    Underline,
    Align(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Bold => f.write_str("bold"),
            Label::Italic => f.write_str("italic"),
            Label::Underline => f.write_str("underline"),
            Label::Align(value) => write!(f, "text-align:{value}"),
        }
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Sorted set of active labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet(BTreeSet<Label>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: Label) {
        self.0.insert(label);
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.0.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.0.iter()
    }

    /// The comma-joined label string, e.g. `"bold, text-align:center"`.
    pub fn label_string(&self) -> String {
        self.0
            .iter()
            .map(Label::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<Label> for LabelSet {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label_string())
    }
}

/// Map from tracked property to value. Later merges win per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertyMap(BTreeMap<Property, String>);

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any earlier one for the same property.
    pub fn insert(&mut self, property: Property, value: impl Into<String>) {
        self.0.insert(property, value.into());
    }

    pub fn remove(&mut self, property: Property) -> Option<String> {
        self.0.remove(&property)
    }

    pub fn get(&self, property: Property) -> Option<&str> {
        self.0.get(&property).map(String::as_str)
    }

    pub fn contains(&self, property: Property) -> bool {
        self.0.contains_key(&property)
    }

    /// Merge `other` into `self`; values in `other` win on collision.
    pub fn merge(&mut self, other: &PropertyMap) {
        for (property, value) in &other.0 {
            self.0.insert(*property, value.clone());
        }
    }

    /// Return a new map with `other` merged over `self`.
    pub fn merged(&self, other: &PropertyMap) -> PropertyMap {
        let mut result = self.clone();
        result.merge(other);
        result
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Entries in property order.
    pub fn iter(&self) -> impl Iterator<Item = (Property, &str)> {
        self.0.iter().map(|(p, v)| (*p, v.as_str()))
    }

    /// Sorted `(property, value)` tuple used to key style groups.
    pub fn key(&self) -> Vec<(Property, String)> {
        self.0.iter().map(|(p, v)| (*p, v.clone())).collect()
    }

    /// Labels asserted by the values in this map.
    pub fn labels(&self) -> LabelSet {
        self.iter()
            .filter_map(|(property, value)| property.label(value))
            .collect()
    }
}

impl FromIterator<(Property, String)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (Property, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl ToCss for PropertyMap {
    fn to_css(&self, buf: &mut String) {
        for (property, value) in self.iter() {
            buf.push_str(property.as_str());
            buf.push(':');
            buf.push_str(value);
            buf.push(';');
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for PropertyMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (property, value) in &self.0 {
            map.serialize_entry(property.as_str(), value)?;
        }
        map.end()
    }
}
