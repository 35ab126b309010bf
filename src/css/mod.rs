//! Stylesheet parsing into selector styles and deduplicated style groups.
//!
//! Every CSS source (a stylesheet file or an inline `<style>` block) is
//! tokenized into style rules; each rule's declarations are normalized to the
//! tracked properties and merged into one [`PropertyMap`]. Rules that assert
//! nothing are dropped. The surviving rules feed two structures:
//!
//! - a [`SelectorStyleMap`], mapping each selector to its accumulated styles
//! - a list of [`StyleGroup`]s, bundling selectors that share identical styles
//!
//! # Example
//!
//! ```
//! use stylefold::css::{parse_css_sources, CssSource};
//! use stylefold::style::Property;
//!
//! let parsed = parse_css_sources(&[
//!     CssSource::inline("book.css", ".title, .chapter { font-weight: bold }"),
//!     CssSource::inline("<style>", ".chapter { text-align: center }"),
//! ]);
//!
//! let chapter = parsed.selectors.get(".chapter").unwrap();
//! assert_eq!(chapter.get(Property::FontWeight), Some("bold"));
//! assert_eq!(chapter.get(Property::TextAlign), Some("center"));
//! assert_eq!(parsed.groups.len(), 2);
//! ```

mod parsing;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

pub use parsing::{RawDeclaration, RawRule, RawSheet, parse_rules};

use crate::diagnostics::Diagnostics;
use crate::style::{Property, PropertyMap, normalize};

/// A stylesheet to parse, tagged with its identity for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssSource {
    /// A stylesheet file on disk.
    File(PathBuf),
    /// CSS text already in memory, such as a `<style>` block.
    Inline { label: String, text: String },
}

impl CssSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn inline(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Inline {
            label: label.into(),
            text: text.into(),
        }
    }

    /// Human-readable identity used in diagnostics and logs.
    pub fn label(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Inline { label, .. } => label.clone(),
        }
    }

    /// Load the CSS text for this source.
    fn load(&self) -> std::io::Result<String> {
        match self {
            Self::File(path) => read_stylesheet(path),
            Self::Inline { text, .. } => Ok(text.clone()),
        }
    }
}

fn read_stylesheet(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(crate::util::decode_text(&bytes, None).into_owned())
}

/// Insertion-ordered map from raw selector text to its accumulated styles.
///
/// Iteration follows first-insertion order, which is also the order in which
/// the cascade resolver applies selectors to elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorStyleMap {
    entries: Vec<(String, PropertyMap)>,
    index: HashMap<String, usize>,
}

impl SelectorStyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `style` into the entry for `selector` (rightmost wins per key).
    pub fn merge(&mut self, selector: &str, style: &PropertyMap) {
        match self.index.get(selector) {
            Some(&idx) => self.entries[idx].1.merge(style),
            None => {
                self.index.insert(selector.to_string(), self.entries.len());
                self.entries.push((selector.to_string(), style.clone()));
            }
        }
    }

    /// Replace the entry for `selector` wholesale.
    ///
    /// An existing selector keeps its position; a new one is appended.
    pub fn replace(&mut self, selector: &str, style: &PropertyMap) {
        match self.index.get(selector) {
            Some(&idx) => self.entries[idx].1 = style.clone(),
            None => {
                self.index.insert(selector.to_string(), self.entries.len());
                self.entries.push((selector.to_string(), style.clone()));
            }
        }
    }

    /// Overlay another map, each of its selectors replacing the base entry.
    ///
    /// Used to layer a chapter's own `<style>` blocks over the book's CSS.
    pub fn overlay(&mut self, other: &SelectorStyleMap) {
        for (selector, style) in other.iter() {
            self.replace(selector, style);
        }
    }

    pub fn get(&self, selector: &str) -> Option<&PropertyMap> {
        self.index.get(selector).map(|&idx| &self.entries[idx].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyMap)> {
        self.entries.iter().map(|(s, p)| (s.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SelectorStyleMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (selector, style) in &self.entries {
            map.serialize_entry(selector, style)?;
        }
        map.end()
    }
}

/// Selectors that share one identical set of normalized properties.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StyleGroup {
    pub properties: PropertyMap,
    /// Sorted and de-duplicated.
    pub selectors: Vec<String>,
}

/// Accumulates selectors per distinct property set, ordered by key tuple.
#[derive(Debug, Default)]
struct GroupTable {
    groups: BTreeMap<Vec<(Property, String)>, (PropertyMap, BTreeSet<String>)>,
}

impl GroupTable {
    fn add<'a>(&mut self, properties: &PropertyMap, selectors: impl IntoIterator<Item = &'a str>) {
        let (_, entry) = self
            .groups
            .entry(properties.key())
            .or_insert_with(|| (properties.clone(), BTreeSet::new()));
        entry.extend(selectors.into_iter().map(str::to_string));
    }

    fn into_groups(self) -> Vec<StyleGroup> {
        self.groups
            .into_values()
            .map(|(properties, selectors)| StyleGroup {
                properties,
                selectors: selectors.into_iter().collect(),
            })
            .collect()
    }
}

/// Output of [`parse_css_sources`].
#[derive(Debug, Clone, Default)]
pub struct ParsedCss {
    pub selectors: SelectorStyleMap,
    pub groups: Vec<StyleGroup>,
    pub diagnostics: Diagnostics,
}

/// Parse CSS sources in order into selector styles and style groups.
///
/// Callers pass stylesheet files before inline blocks. A source that cannot
/// be loaded is skipped with a diagnostic; the remaining sources are still
/// parsed.
pub fn parse_css_sources(sources: &[CssSource]) -> ParsedCss {
    let mut selectors = SelectorStyleMap::new();
    let mut groups = GroupTable::default();
    let mut diagnostics = Diagnostics::new();

    for source in sources {
        let label = source.label();
        let text = match source.load() {
            Ok(text) => text,
            Err(e) => {
                diagnostics.source_skipped(label, e.to_string());
                continue;
            }
        };

        if matches!(source, CssSource::Inline { .. }) && text.trim().is_empty() {
            continue;
        }

        let sheet = parse_rules(&text);
        if sheet.rules.is_empty() && sheet.invalid_rules > 0 {
            diagnostics.source_skipped(
                label,
                format!("no parseable rules ({} malformed)", sheet.invalid_rules),
            );
            continue;
        }
        diagnostics.rules_dropped(label.as_str(), sheet.invalid_rules);

        let mut tracked_rules = 0usize;
        for rule in &sheet.rules {
            let properties = rule_properties(rule);
            if properties.is_empty() {
                continue;
            }
            tracked_rules += 1;

            for selector in &rule.selectors {
                selectors.merge(selector, &properties);
            }
            groups.add(&properties, rule.selectors.iter().map(String::as_str));
        }

        tracing::debug!(
            source = %label,
            rules = sheet.rules.len(),
            tracked_rules,
            "parsed CSS source"
        );
    }

    ParsedCss {
        selectors,
        groups: groups.into_groups(),
        diagnostics,
    }
}

/// Normalize a rule's declarations into one map; the rightmost declaration
/// of a property wins.
pub fn rule_properties(rule: &RawRule) -> PropertyMap {
    let mut properties = PropertyMap::new();
    for declaration in &rule.declarations {
        if let Some((property, value)) = normalize(&declaration.name, &declaration.value) {
            properties.insert(property, value);
        }
    }
    properties
}

/// Merge groups with structurally identical properties, unioning selectors.
///
/// The result is sorted by property key tuple, like [`parse_css_sources`].
pub fn collapse_style_groups<I>(groups: I) -> Vec<StyleGroup>
where
    I: IntoIterator<Item = StyleGroup>,
{
    let mut table = GroupTable::default();
    for group in groups {
        table.add(&group.properties, group.selectors.iter().map(String::as_str));
    }
    table.into_groups()
}

/// Selector styles and collapsed groups for one book, kept for inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CssSummary {
    pub selectors: SelectorStyleMap,
    pub groups: Vec<StyleGroup>,
}
