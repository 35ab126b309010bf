//! Recoverable problems encountered while folding styles.
//!
//! Nothing in here aborts processing. A stylesheet that cannot be read or a
//! selector the matcher does not understand is skipped, logged, and recorded
//! so callers can audit how much input was ignored.

use std::fmt;

/// A single recovered problem.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Diagnostic {
    /// A CSS source was unreadable or contained no parseable rules.
    SourceParse { source: String, message: String },
    /// A readable CSS source in which some rules were malformed and dropped.
    InvalidRules { source: String, count: usize },
    /// A selector could not be parsed or matched; it contributes no styles.
    SelectorMatch { selector: String, message: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceParse { source, message } => {
                write!(f, "skipped CSS source {source}: {message}")
            }
            Self::InvalidRules { source, count } => {
                write!(f, "dropped {count} malformed rule(s) in {source}")
            }
            Self::SelectorMatch { selector, message } => {
                write!(f, "skipped selector `{selector}`: {message}")
            }
        }
    }
}

/// Ordered collection of diagnostics for one parse or one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a source that was skipped entirely.
    pub fn source_skipped(&mut self, source: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic::SourceParse {
            source: source.into(),
            message: message.into(),
        };
        tracing::warn!("{diagnostic}");
        self.items.push(diagnostic);
    }

    /// Record malformed rules dropped from an otherwise usable source.
    pub fn rules_dropped(&mut self, source: impl Into<String>, count: usize) {
        if count == 0 {
            return;
        }
        let diagnostic = Diagnostic::InvalidRules {
            source: source.into(),
            count,
        };
        tracing::debug!("{diagnostic}");
        self.items.push(diagnostic);
    }

    /// Record a selector that contributed no styles.
    pub fn selector_skipped(&mut self, selector: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic::SelectorMatch {
            selector: selector.into(),
            message: message.into(),
        };
        tracing::debug!("{diagnostic}");
        self.items.push(diagnostic);
    }

    /// Number of CSS sources that were skipped entirely.
    pub fn sources_skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|d| matches!(d, Diagnostic::SourceParse { .. }))
            .count()
    }

    /// Number of selectors that were skipped.
    pub fn selectors_skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|d| matches!(d, Diagnostic::SelectorMatch { .. }))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
