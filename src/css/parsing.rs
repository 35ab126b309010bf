//! Tokenizing stylesheets into raw style rules.
//!
//! Selectors and declaration values are kept as source text: selectors are
//! opaque matching keys, and values go through the property normalizer.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser,
};

/// A style rule as written: selector texts and raw declarations in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRule {
    pub selectors: Vec<String>,
    pub declarations: Vec<RawDeclaration>,
}

/// One `name: value` pair; the value still carries any `!important`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeclaration {
    pub name: String,
    pub value: String,
}

/// Result of tokenizing one stylesheet.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    /// Top-level style rules in source order.
    pub rules: Vec<RawRule>,
    /// Number of top-level rules that were malformed and dropped.
    pub invalid_rules: usize,
}

/// Parse CSS text into raw top-level style rules.
///
/// At-rules (`@media`, `@font-face`, `@import`, ...) are skipped along with
/// their blocks. Parsing is lenient: a malformed rule is counted and dropped.
pub fn parse_rules(css: &str) -> RawSheet {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut sheet = RawSheet::default();

    let mut rule_parser = TopLevelRuleParser;
    let stylesheet_parser = StyleSheetParser::new(&mut parser, &mut rule_parser);

    for result in stylesheet_parser {
        match result {
            Ok(SheetItem::Style(rule)) => sheet.rules.push(rule),
            Ok(SheetItem::Skipped) => {}
            Err((_, slice)) => {
                tracing::trace!(rule = slice, "dropping malformed CSS rule");
                sheet.invalid_rules += 1;
            }
        }
    }

    sheet
}

enum SheetItem {
    Style(RawRule),
    Skipped,
}

/// Parser for top-level stylesheet rules.
struct TopLevelRuleParser;

impl<'i> AtRuleParser<'i> for TopLevelRuleParser {
    type Prelude = ();
    type AtRule = SheetItem;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        while input.next().is_ok() {}
        Ok(())
    }

    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        Ok(SheetItem::Skipped)
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        // Media queries and other conditional blocks are not evaluated
        while input.next().is_ok() {}
        Ok(SheetItem::Skipped)
    }
}

impl<'i> QualifiedRuleParser<'i> for TopLevelRuleParser {
    type Prelude = Vec<String>;
    type QualifiedRule = SheetItem;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let selectors: Vec<String> = input
            .parse_comma_separated(|input: &mut Parser<'i, '_>| {
                Ok::<_, ParseError<'i, ()>>(consume_raw(input).trim().to_string())
            })?
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();

        if selectors.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(selectors)
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut declarations = Vec::new();
        let mut decl_parser = DeclarationListParser {
            declarations: &mut declarations,
        };

        for result in RuleBodyParser::new(input, &mut decl_parser) {
            // Ignore errors - lenient parsing
            let _ = result;
        }

        Ok(SheetItem::Style(RawRule {
            selectors: prelude,
            declarations,
        }))
    }
}

/// Consume every remaining token and return the source text they span.
fn consume_raw<'i>(input: &mut Parser<'i, '_>) -> &'i str {
    let start = input.position();
    while input.next().is_ok() {}
    input.slice_from(start)
}

struct DeclarationListParser<'a> {
    declarations: &'a mut Vec<RawDeclaration>,
}

impl<'i> AtRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> DeclarationParser<'i> for DeclarationListParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let value = consume_raw(input).trim();
        self.declarations.push(RawDeclaration {
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for DeclarationListParser<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}
