//! Rule parsing and grouping tests.

use std::collections::BTreeSet;
use std::io::Write;

use proptest::prelude::*;

use super::*;
use crate::diagnostics::Diagnostic;
use crate::style::{Property, PropertyMap};

fn inline(text: &str) -> CssSource {
    CssSource::inline("inline", text)
}

fn map(pairs: &[(Property, &str)]) -> PropertyMap {
    pairs.iter().map(|(p, v)| (*p, v.to_string())).collect()
}

// ============================================================================
// Selector styles
// ============================================================================

#[test]
fn test_untracked_rules_skipped() {
    let parsed = parse_css_sources(&[inline(
        ".a { color: red; margin: 0 } .b { font-weight: 300 } .c { font-weight: 600 }",
    )]);

    assert_eq!(parsed.selectors.len(), 1);
    assert!(parsed.selectors.get(".a").is_none());
    assert!(parsed.selectors.get(".b").is_none());
    assert_eq!(
        parsed.selectors.get(".c"),
        Some(&map(&[(Property::FontWeight, "bold")]))
    );
    assert_eq!(parsed.groups.len(), 1);
}

#[test]
fn test_rightmost_declaration_wins_within_rule() {
    let parsed = parse_css_sources(&[inline(".a { text-align: left; text-align: right }")]);
    assert_eq!(
        parsed.selectors.get(".a"),
        Some(&map(&[(Property::TextAlign, "right")]))
    );
}

#[test]
fn test_same_selector_accumulates_across_rules() {
    let parsed = parse_css_sources(&[
        inline(".a { font-weight: bold; text-align: left }"),
        inline(".a { text-align: center } .a { font-style: italic }"),
    ]);

    assert_eq!(
        parsed.selectors.get(".a"),
        Some(&map(&[
            (Property::FontStyle, "italic"),
            (Property::FontWeight, "bold"),
            (Property::TextAlign, "center"),
        ]))
    );
}

#[test]
fn test_selector_order_is_first_encounter() {
    let parsed = parse_css_sources(&[inline(
        ".z { font-weight: bold } .a { font-style: italic } .z { text-align: left }",
    )]);
    let order: Vec<_> = parsed.selectors.iter().map(|(s, _)| s).collect();
    assert_eq!(order, vec![".z", ".a"]);
}

#[test]
fn test_files_then_inline_blocks() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, ".x {{ text-align: left }}").unwrap();

    let parsed = parse_css_sources(&[
        CssSource::file(file.path()),
        inline(".x { text-align: justify }"),
    ]);

    assert_eq!(
        parsed.selectors.get(".x"),
        Some(&map(&[(Property::TextAlign, "justify")]))
    );
    assert!(parsed.diagnostics.is_empty());
}

#[test]
fn test_overlay_replaces_entries() {
    let mut base = parse_css_sources(&[inline(
        ".a { font-weight: bold; text-align: left } .b { font-style: italic }",
    )])
    .selectors;
    let chapter = parse_css_sources(&[inline(".a { text-align: right } .c { font-weight: bold }")])
        .selectors;

    base.overlay(&chapter);

    assert_eq!(
        base.get(".a"),
        Some(&map(&[(Property::TextAlign, "right")]))
    );
    let order: Vec<_> = base.iter().map(|(s, _)| s).collect();
    assert_eq!(order, vec![".a", ".b", ".c"]);
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_missing_file_skipped() {
    let parsed = parse_css_sources(&[
        CssSource::file("/nonexistent/dir/missing.css"),
        inline(".ok { font-style: italic }"),
    ]);

    assert_eq!(parsed.diagnostics.sources_skipped(), 1);
    assert!(matches!(
        parsed.diagnostics.iter().next(),
        Some(Diagnostic::SourceParse { source, .. }) if source.ends_with("missing.css")
    ));
    assert!(parsed.selectors.get(".ok").is_some());
}

#[test]
fn test_unparseable_source_skipped() {
    let parsed = parse_css_sources(&[
        inline("{ font-weight: bold }"),
        inline(".ok { font-weight: bold }"),
    ]);
    assert_eq!(parsed.diagnostics.sources_skipped(), 1);
    assert_eq!(parsed.selectors.len(), 1);
}

#[test]
fn test_blank_inline_block_ignored() {
    let parsed = parse_css_sources(&[inline("  \n  ")]);
    assert!(parsed.selectors.is_empty());
    assert!(parsed.diagnostics.is_empty());
}

// ============================================================================
// Groups
// ============================================================================

#[test]
fn test_identical_properties_share_group() {
    let parsed = parse_css_sources(&[inline(
        ".b1 { font-weight: bold } .b2 { font-weight: 700 } h1, .b3 { font-weight: bolder }",
    )]);

    assert_eq!(parsed.groups.len(), 1);
    assert_eq!(parsed.groups[0].selectors, vec![".b1", ".b2", ".b3", "h1"]);
}

#[test]
fn test_groups_sorted_by_key_tuple() {
    let parsed = parse_css_sources(&[inline(
        ".t { text-align: center } .w { font-weight: bold } .s { font-style: italic } \
         .sw { font-style: italic; font-weight: bold }",
    )]);

    let keys: Vec<_> = parsed.groups.iter().map(|g| g.properties.key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(parsed.groups[0].selectors, vec![".s"]);
    assert_eq!(parsed.groups[1].selectors, vec![".sw"]);
}

#[test]
fn test_collapse_unions_selectors() {
    let a = StyleGroup {
        properties: map(&[(Property::FontStyle, "italic")]),
        selectors: vec![".a".to_string(), ".b".to_string()],
    };
    let b = StyleGroup {
        properties: map(&[(Property::TextAlign, "center")]),
        selectors: vec![".c".to_string()],
    };
    let c = StyleGroup {
        properties: map(&[(Property::FontStyle, "italic")]),
        selectors: vec![".b".to_string(), ".z".to_string()],
    };

    let collapsed = collapse_style_groups(vec![b, a, c]);
    assert_eq!(collapsed.len(), 2);
    assert_eq!(collapsed[0].selectors, vec![".a", ".b", ".z"]);
    assert_eq!(collapsed[1].selectors, vec![".c"]);
}

fn arb_declaration() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("font-weight: bold".to_string()),
        Just("font-weight: 300".to_string()),
        Just("font-style: italic".to_string()),
        Just("text-decoration: underline".to_string()),
        Just("text-align: center".to_string()),
        Just("text-align: left".to_string()),
        Just("color: red".to_string()),
    ]
}

fn arb_rule() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("\\.[a-e]", 1..3),
        prop::collection::vec(arb_declaration(), 0..4),
    )
        .prop_map(|(selectors, decls)| format!("{} {{ {} }}", selectors.join(", "), decls.join("; ")))
}

proptest! {
    #[test]
    fn prop_groups_never_share_properties(
        sheets in prop::collection::vec(prop::collection::vec(arb_rule(), 0..6), 1..4)
    ) {
        let mut all_groups = Vec::new();
        for rules in &sheets {
            let parsed = parse_css_sources(&[inline(&rules.join("\n"))]);
            let keys: BTreeSet<_> = parsed.groups.iter().map(|g| g.properties.key()).collect();
            prop_assert_eq!(keys.len(), parsed.groups.len());
            all_groups.extend(parsed.groups);
        }

        let collapsed = collapse_style_groups(all_groups.clone());
        let keys: BTreeSet<_> = collapsed.iter().map(|g| g.properties.key()).collect();
        prop_assert_eq!(keys.len(), collapsed.len());

        // Every selector survives the collapse
        let before: BTreeSet<_> = all_groups.iter().flat_map(|g| g.selectors.clone()).collect();
        let after: BTreeSet<_> = collapsed.iter().flat_map(|g| g.selectors.clone()).collect();
        prop_assert_eq!(before, after);
    }
}
