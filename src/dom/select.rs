//! Selector compilation and document queries.

use cssparser::{Parser, ParserInput};
use selectors::context::{MatchingContext, QuirksMode, SelectorCaches};
use selectors::matching::{MatchingForInvalidation, MatchingMode, NeedsSelectorFlags};
use selectors::parser::{ParseRelative, SelectorList};

use super::arena::{ArenaDom, ArenaNodeId};
use super::element_ref::{ElementRef, FoldSelectors};

/// Selector text that the selector engine rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector `{selector}`: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

/// A parsed selector list, ready to match against any document.
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    text: String,
    list: SelectorList<FoldSelectors>,
}

impl CompiledSelector {
    /// Parse selector text, which may be a comma-separated list.
    pub fn parse(text: &str) -> Result<Self, SelectorError> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let list = SelectorList::parse(&FoldSelectors, &mut parser, ParseRelative::No).map_err(
            |e| SelectorError {
                selector: text.to_string(),
                message: format!("{:?} at column {}", e.kind, e.location.column),
            },
        )?;

        Ok(Self {
            text: text.to_string(),
            list,
        })
    }

    /// The selector text this was compiled from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the element matches any selector in the list.
    pub fn matches(&self, dom: &ArenaDom, id: ArenaNodeId) -> bool {
        let mut caches = SelectorCaches::default();
        self.matches_with_caches(ElementRef::new(dom, id), &mut caches)
    }

    fn matches_with_caches(&self, element: ElementRef<'_>, caches: &mut SelectorCaches) -> bool {
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            caches,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            MatchingForInvalidation::No,
        );
        self.list.slice().iter().any(|selector| {
            selectors::matching::matches_selector(selector, 0, None, &element, &mut context)
        })
    }

    /// Every matching element in document order.
    pub fn select(&self, dom: &ArenaDom) -> Vec<ArenaNodeId> {
        self.select_with_caches(dom, &mut SelectorCaches::default())
    }

    /// Like [`select`](Self::select), sharing caches across many selectors.
    pub(crate) fn select_with_caches(
        &self,
        dom: &ArenaDom,
        caches: &mut SelectorCaches,
    ) -> Vec<ArenaNodeId> {
        dom.elements()
            .filter(|&id| self.matches_with_caches(ElementRef::new(dom, id), caches))
            .collect()
    }
}

/// Parse `selector` and return every matching element in document order.
pub fn select(dom: &ArenaDom, selector: &str) -> Result<Vec<ArenaNodeId>, SelectorError> {
    Ok(CompiledSelector::parse(selector)?.select(dom))
}

#[cfg(test)]
mod tests {
    use super::super::parse_html;
    use super::*;

    #[test]
    fn test_select_document_order() {
        let dom = parse_html(r#"<div class="a"><p class="a">1</p></div><p class="a">2</p>"#);
        let found = select(&dom, ".a").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|&id| dom.element_name(id).unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["div", "p", "p"]);
    }

    #[test]
    fn test_selector_list() {
        let dom = parse_html("<h1>a</h1><h2>b</h2><h3>c</h3>");
        assert_eq!(select(&dom, "h1, h3").unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_selectors_rejected() {
        for text in ["", "p >", "..a", "p::before", "a:unknown-state"] {
            let err = CompiledSelector::parse(text).unwrap_err();
            assert_eq!(err.selector, text);
            assert!(err.to_string().starts_with("invalid selector"));
        }
    }

    #[test]
    fn test_no_match_is_empty() {
        let dom = parse_html("<p>x</p>");
        assert!(select(&dom, ".nothing").unwrap().is_empty());
    }
}
