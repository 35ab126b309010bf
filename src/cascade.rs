//! Resolving per-element styles and cascading them to text.
//!
//! Resolution happens in three steps:
//!
//! 1. Every selector of the [`SelectorStyleMap`] is matched against the
//!    document in map order. Matches merge the selector's properties into the
//!    element's accumulated map, so a later selector beats an earlier one.
//!    There is no specificity.
//! 2. Each element's [`ElementStyle`] merges, in increasing precedence, the
//!    selector-derived map, its inline `style` attribute and the formatting
//!    its tag implies.
//! 3. One top-down pass carries each element's cascaded map to its children.
//!    Every non-blank text node gets the labels of its parent's cascaded map.

use std::collections::BTreeMap;

use selectors::context::SelectorCaches;

use crate::css::SelectorStyleMap;
use crate::diagnostics::Diagnostics;
use crate::dom::{ArenaDom, ArenaNodeData, ArenaNodeId, CompiledSelector, is_raw_text_element};
use crate::style::{LabelSet, PropertyMap, ToCss, parse_inline_style, tag_implied_style};
use crate::util::collapse_whitespace;

/// Computed style of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementStyle {
    /// Tracked properties after selector, inline and tag precedence.
    pub tracked: PropertyMap,
    /// Untracked inline declarations, keyed by lower-cased property name.
    pub passthrough: BTreeMap<String, String>,
}

impl ElementStyle {
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty() && self.passthrough.is_empty()
    }
}

impl ToCss for ElementStyle {
    /// All declarations sorted by property name, each as `key:value;`.
    fn to_css(&self, buf: &mut String) {
        let mut declarations: BTreeMap<&str, &str> = self
            .passthrough
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        for (property, value) in self.tracked.iter() {
            declarations.insert(property.as_str(), value);
        }

        for (name, value) in declarations {
            buf.push_str(name);
            buf.push(':');
            buf.push_str(value);
            buf.push(';');
        }
    }
}

/// A labeled piece of document text, before book/chapter tagging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftEntry {
    /// The text node this entry was built from.
    pub node: ArenaNodeId,
    /// Local name of the text node's parent element.
    pub element: String,
    /// Whitespace-collapsed text.
    pub text: String,
    pub labels: LabelSet,
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Dense table indexed by [`ArenaNodeId::index`]; non-elements stay empty.
    styles: Vec<ElementStyle>,
    drafts: Vec<DraftEntry>,
}

impl Resolution {
    /// Computed style of an element, `None` for ids outside the document.
    pub fn element_style(&self, id: ArenaNodeId) -> Option<&ElementStyle> {
        self.styles.get(id.index())
    }

    /// Labeled text in document order.
    pub fn drafts(&self) -> &[DraftEntry] {
        &self.drafts
    }

    pub fn into_drafts(self) -> Vec<DraftEntry> {
        self.drafts
    }

    /// Cascaded map for a node, computed by walking its ancestors.
    ///
    /// Merges the tracked maps of every ancestor element from the root down
    /// to the node's parent, nearer ancestors winning. This is the
    /// straightforward definition that the single top-down pass in
    /// [`resolve`] must agree with.
    pub fn ancestor_cascade(&self, dom: &ArenaDom, node: ArenaNodeId) -> PropertyMap {
        let mut chain = Vec::new();
        let mut current = dom.parent(node);
        while let Some(id) = current {
            if dom.is_element(id) {
                chain.push(id);
            }
            current = dom.parent(id);
        }

        let mut cascaded = PropertyMap::new();
        for id in chain.into_iter().rev() {
            if let Some(style) = self.element_style(id) {
                cascaded.merge(&style.tracked);
            }
        }
        cascaded
    }
}

/// Resolve element styles and labeled text for one document.
///
/// Selectors that fail to parse are recorded in `diagnostics` and skipped.
pub fn resolve(
    dom: &ArenaDom,
    selectors: &SelectorStyleMap,
    diagnostics: &mut Diagnostics,
) -> Resolution {
    let matched = match_selectors(dom, selectors, diagnostics);
    let styles = compute_element_styles(dom, matched);

    let mut ctx = CascadeContext {
        dom,
        styles: &styles,
        drafts: Vec::new(),
    };
    ctx.process_children(dom.document(), &PropertyMap::new());
    let drafts = ctx.drafts;

    tracing::debug!(
        selectors = selectors.len(),
        entries = drafts.len(),
        "resolved cascade"
    );

    Resolution { styles, drafts }
}

/// Accumulate selector-derived maps, indexed by node.
fn match_selectors(
    dom: &ArenaDom,
    selectors: &SelectorStyleMap,
    diagnostics: &mut Diagnostics,
) -> Vec<PropertyMap> {
    let mut matched = vec![PropertyMap::new(); dom.len()];
    let mut caches = SelectorCaches::default();

    for (text, properties) in selectors.iter() {
        let compiled = match CompiledSelector::parse(text) {
            Ok(compiled) => compiled,
            Err(e) => {
                diagnostics.selector_skipped(text, e.message);
                continue;
            }
        };

        for id in compiled.select_with_caches(dom, &mut caches) {
            matched[id.index()].merge(properties);
        }
    }

    matched
}

fn compute_element_styles(dom: &ArenaDom, mut matched: Vec<PropertyMap>) -> Vec<ElementStyle> {
    let mut styles = vec![ElementStyle::default(); dom.len()];

    for id in dom.elements() {
        let Some(name) = dom.element_name(id) else {
            continue;
        };
        let inline = dom
            .get_attr(id, "style")
            .map(parse_inline_style)
            .unwrap_or_default();

        let mut tracked = std::mem::take(&mut matched[id.index()]);
        tracked.merge(&inline.tracked);
        tracked.merge(&tag_implied_style(name));

        styles[id.index()] = ElementStyle {
            tracked,
            passthrough: inline.passthrough,
        };
    }

    styles
}

struct CascadeContext<'a> {
    dom: &'a ArenaDom,
    styles: &'a [ElementStyle],
    drafts: Vec<DraftEntry>,
}

impl CascadeContext<'_> {
    fn process_children(&mut self, parent: ArenaNodeId, cascaded: &PropertyMap) {
        let dom = self.dom;
        for child in dom.children(parent) {
            self.process_node(child, parent, cascaded);
        }
    }

    fn process_node(&mut self, id: ArenaNodeId, parent: ArenaNodeId, cascaded: &PropertyMap) {
        let (dom, styles) = (self.dom, self.styles);
        let Some(node) = dom.get(id) else {
            return;
        };

        match &node.data {
            ArenaNodeData::Element { .. } => {
                let own = &styles[id.index()].tracked;
                if own.is_empty() {
                    self.process_children(id, cascaded);
                } else {
                    let inherited = cascaded.merged(own);
                    self.process_children(id, &inherited);
                }
            }
            ArenaNodeData::Text(text) => self.process_text(id, parent, text, cascaded),
            _ => {}
        }
    }

    fn process_text(
        &mut self,
        id: ArenaNodeId,
        parent: ArenaNodeId,
        text: &str,
        cascaded: &PropertyMap,
    ) {
        // Text directly under the document has no element to report
        let dom = self.dom;
        let Some(element) = dom.element_name(parent) else {
            return;
        };
        if is_raw_text_element(element) {
            return;
        }

        let labels = cascaded.labels();
        if labels.is_empty() {
            return;
        }
        let text = collapse_whitespace(text);
        if text.is_empty() {
            return;
        }

        self.drafts.push(DraftEntry {
            node: id,
            element: element.to_string(),
            text,
            labels,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::{CssSource, parse_css_sources};
    use crate::diagnostics::Diagnostic;
    use crate::dom::parse_html;
    use crate::style::{Label, Property};

    fn resolve_with(css: &str, html: &str) -> (ArenaDom, Resolution, Diagnostics) {
        let parsed = parse_css_sources(&[CssSource::inline("test.css", css)]);
        let dom = parse_html(html);
        let mut diagnostics = Diagnostics::new();
        let resolution = resolve(&dom, &parsed.selectors, &mut diagnostics);
        (dom, resolution, diagnostics)
    }

    fn entries(resolution: &Resolution) -> Vec<(String, String, String)> {
        resolution
            .drafts()
            .iter()
            .map(|d| (d.element.clone(), d.text.clone(), d.labels.label_string()))
            .collect()
    }

    fn triple(element: &str, text: &str, format: &str) -> (String, String, String) {
        (element.into(), text.into(), format.into())
    }

    #[test]
    fn test_cascade_reaches_descendants() {
        let (_, resolution, _) = resolve_with(
            ".b { font-weight: bold }",
            r#"<div class="b"><p>Hello <span>world</span></p></div>"#,
        );
        assert_eq!(
            entries(&resolution),
            vec![triple("p", "Hello", "bold"), triple("span", "world", "bold")]
        );
    }

    #[test]
    fn test_inline_normal_overrides_inherited_bold() {
        let (_, resolution, _) = resolve_with(
            ".b { font-weight: bold }",
            r#"<div class="b"><p>Hello <span style="font-weight:400">world</span></p></div>"#,
        );
        assert_eq!(entries(&resolution), vec![triple("p", "Hello", "bold")]);
    }

    #[test]
    fn test_inline_beats_selector_on_same_element() {
        let (dom, resolution, _) = resolve_with(
            "p { font-weight: bold; text-align: center }",
            r#"<p style="font-weight: normal">x</p>"#,
        );
        let p = dom.find_by_tag("p").unwrap();
        let style = resolution.element_style(p).unwrap();
        assert_eq!(style.tracked.get(Property::FontWeight), Some("normal"));
        assert_eq!(entries(&resolution), vec![triple("p", "x", "text-align:center")]);
    }

    #[test]
    fn test_tag_beats_inline() {
        let (_, resolution, _) = resolve_with(
            "",
            r#"<p><b style="font-weight:normal">strong</b> <em>soft</em> <u>line</u></p>"#,
        );
        assert_eq!(
            entries(&resolution),
            vec![
                triple("b", "strong", "bold"),
                triple("em", "soft", "italic"),
                triple("u", "line", "underline"),
            ]
        );
    }

    #[test]
    fn test_later_selector_wins_without_specificity() {
        let (_, resolution, _) = resolve_with(
            "#x { text-align: left } p { text-align: right }",
            r#"<p id="x">t</p>"#,
        );
        assert_eq!(entries(&resolution), vec![triple("p", "t", "text-align:right")]);
    }

    #[test]
    fn test_labels_combined_and_sorted() {
        let (_, resolution, _) = resolve_with(
            ".c { text-align: center } .u { text-decoration: underline }",
            r#"<div class="c"><p class="u"><i>all</i></p></div>"#,
        );
        assert_eq!(
            entries(&resolution),
            vec![triple("i", "all", "italic, text-align:center, underline")]
        );
    }

    #[test]
    fn test_blank_text_and_unlabeled_text_skipped() {
        let (_, resolution, _) = resolve_with(
            "p { font-weight: bold }",
            "<p>   </p><div>plain</div><p>\n  spaced\n\t out </p>",
        );
        assert_eq!(entries(&resolution), vec![triple("p", "spaced out", "bold")]);
    }

    #[test]
    fn test_style_and_script_text_ignored() {
        let (_, resolution, _) = resolve_with(
            "body { font-weight: bold }",
            "<body><style>p{}</style><script>var x;</script><p>t</p></body>",
        );
        assert_eq!(entries(&resolution), vec![triple("p", "t", "bold")]);
    }

    #[test]
    fn test_element_style_keeps_passthrough() {
        let (dom, resolution, _) = resolve_with(
            ".x { font-style: italic }",
            r#"<p class="x" style="Color: red; margin-left: 2em">t</p>"#,
        );
        let p = dom.find_by_tag("p").unwrap();
        let style = resolution.element_style(p).unwrap();
        assert_eq!(
            style.to_css_string(),
            "color:red;font-style:italic;margin-left:2em;"
        );
    }

    #[test]
    fn test_bad_selector_recorded_and_skipped() {
        let (_, resolution, diagnostics) = resolve_with(
            "p::first-line { font-weight: bold } p { font-style: italic }",
            "<p>t</p>",
        );
        assert_eq!(diagnostics.selectors_skipped(), 1);
        assert!(matches!(
            diagnostics.iter().next(),
            Some(Diagnostic::SelectorMatch { selector, .. }) if selector == "p::first-line"
        ));
        assert_eq!(entries(&resolution), vec![triple("p", "t", "italic")]);
    }

    #[test]
    fn test_top_down_matches_ancestor_walk() {
        let (dom, resolution, _) = resolve_with(
            ".a { font-weight: bold } .b { text-align: center } .c { font-style: italic }",
            r#"<div class="a"><section class="b" style="font-weight: 300">
                 <p class="c">one <b>two</b> <span style="text-align: left">three</span></p>
               </section><p>four</p></div><aside>plain</aside>"#,
        );

        // Every text node is checked, so a node the top-down pass skipped
        // shows up as a mismatch too
        let mut checked = 0;
        for id in dom.descendants(dom.document()) {
            let Some(text) = dom.text_content(id) else {
                continue;
            };
            let parent = dom.parent(id).and_then(|p| dom.element_name(p));
            if text.trim().is_empty() || parent.is_none_or(|name| is_raw_text_element(name)) {
                continue;
            }

            let reference = resolution.ancestor_cascade(&dom, id).labels();
            let draft = resolution.drafts().iter().find(|d| d.node == id);
            match draft {
                Some(draft) => assert_eq!(reference, draft.labels, "{text}"),
                None => assert!(reference.is_empty(), "no entry for {text:?}"),
            }
            checked += 1;
        }
        assert_eq!(checked, 5);
        assert_eq!(resolution.drafts().len(), 4);
        assert!(
            resolution.drafts()[2]
                .labels
                .contains(&Label::Align("left".into()))
        );
    }
}
