//! Selector parser using the `cssparser` crate.
//!
//! Supports the subset of Selectors Level 3 the widget and its tests need:
//! type, universal, class, id and attribute selectors, `:first-child`,
//! `:last-child`, `:selected`, `:not()` over a compound selector, all four
//! combinators, and comma-separated selector lists.

use cssparser::{ParseError as CssParseError, Parser, ParserInput, Token};

use super::{AttributeOperator, AttributeSelector, Combinator, PseudoClass, Selector, SelectorPart};
use crate::{Error, Result};

/// Parse a comma-separated selector list.
///
/// # Example
///
/// ```
/// use selleckt_dom::selector::parse_selector_list;
///
/// let selectors = parse_selector_list(".selleckt .items > li, select").unwrap();
/// assert_eq!(selectors.len(), 2);
/// assert_eq!(selectors[0].parts.len(), 3);
/// ```
pub fn parse_selector_list(source: &str) -> Result<Vec<Selector>> {
    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);
    let mut selectors = vec![];
    let mut builder = SelectorBuilder::default();

    parser.skip_whitespace();

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => builder.whitespace(),
            Token::Comma => {
                selectors.push(builder.finish(source)?);
                builder = SelectorBuilder::default();
                parser.skip_whitespace();
            }
            Token::Delim('>') => builder.combinator(Combinator::Child, source)?,
            Token::Delim('+') => builder.combinator(Combinator::AdjacentSibling, source)?,
            Token::Delim('~') => builder.combinator(Combinator::GeneralSibling, source)?,
            other => {
                let part = builder.compound();
                apply_simple_selector(&mut parser, part, other, source)?;
            }
        }
    }

    selectors.push(builder.finish(source)?);
    Ok(selectors)
}

/// Parse a single complex selector (no commas).
pub fn parse_selector(source: &str) -> Result<Selector> {
    let mut selectors = parse_selector_list(source)?;
    if selectors.len() != 1 {
        return Err(Error::invalid_selector(source, "Expected a single selector"));
    }
    Ok(selectors.remove(0))
}

/// Accumulates parts and combinators for one complex selector.
///
/// Whitespace only becomes a descendant combinator once another compound
/// selector follows it, so `a > b` and `a b ` parse as expected.
#[derive(Default)]
struct SelectorBuilder {
    parts: Vec<SelectorPart>,
    combinators: Vec<Combinator>,
    current: SelectorPart,
    pending_descendant: bool,
}

impl SelectorBuilder {
    fn whitespace(&mut self) {
        if !self.current.is_empty() {
            self.pending_descendant = true;
        }
    }

    fn combinator(&mut self, combinator: Combinator, source: &str) -> Result<()> {
        if self.current.is_empty() {
            return Err(Error::invalid_selector(
                source,
                format!("Unexpected combinator {combinator:?}"),
            ));
        }
        self.parts.push(std::mem::take(&mut self.current));
        self.combinators.push(combinator);
        self.pending_descendant = false;
        Ok(())
    }

    fn compound(&mut self) -> &mut SelectorPart {
        if self.pending_descendant && !self.current.is_empty() {
            self.parts.push(std::mem::take(&mut self.current));
            self.combinators.push(Combinator::Descendant);
        }
        self.pending_descendant = false;
        &mut self.current
    }

    fn finish(mut self, source: &str) -> Result<Selector> {
        if self.current.is_empty() {
            let message = if self.parts.is_empty() {
                "Empty selector"
            } else {
                "Selector ends with a combinator"
            };
            return Err(Error::invalid_selector(source, message));
        }
        self.parts.push(self.current);
        Ok(Selector {
            parts: self.parts,
            combinators: self.combinators,
        })
    }
}

fn apply_simple_selector<'i>(
    parser: &mut Parser<'i, '_>,
    part: &mut SelectorPart,
    token: Token<'i>,
    source: &str,
) -> Result<()> {
    match token {
        Token::Ident(name) => {
            if part.tag.is_some() || part.universal {
                return Err(Error::invalid_selector(source, "Unexpected identifier"));
            }
            part.tag = Some(name.to_ascii_lowercase());
        }

        Token::Delim('*') => {
            if part.tag.is_some() || part.universal {
                return Err(Error::invalid_selector(source, "Unexpected '*'"));
            }
            part.universal = true;
        }

        Token::Delim('.') => {
            let class = parser
                .expect_ident()
                .map(|class| class.to_string())
                .map_err(|_| Error::invalid_selector(source, "Expected class name after '.'"))?;
            part.classes.push(class);
        }

        Token::IDHash(id) | Token::Hash(id) => {
            if part.id.is_some() {
                return Err(Error::invalid_selector(source, "Multiple id selectors"));
            }
            part.id = Some(id.to_string());
        }

        Token::SquareBracketBlock => {
            let attribute = parser
                .parse_nested_block(parse_attribute)
                .map_err(|_: CssParseError<'_, ()>| {
                    Error::invalid_selector(source, "Invalid attribute selector")
                })?;
            part.attributes.push(attribute);
        }

        Token::Colon => {
            let next = parser
                .next_including_whitespace()
                .map(|t| t.clone())
                .map_err(|_| Error::invalid_selector(source, "Expected pseudo-class after ':'"))?;
            let pseudo = match next {
                Token::Ident(name) => PseudoClass::from_name(&name).ok_or_else(|| {
                    Error::invalid_selector(source, format!("Unknown pseudo-class ':{}'", &*name))
                })?,
                Token::Function(name) if name.eq_ignore_ascii_case("not") => {
                    let inner = parser
                        .parse_nested_block(parse_simple_selector)
                        .map_err(|_: CssParseError<'_, ()>| {
                            Error::invalid_selector(source, "Invalid :not() argument")
                        })?;
                    PseudoClass::Not(Box::new(inner))
                }
                other => {
                    return Err(Error::invalid_selector(
                        source,
                        format!("Unsupported pseudo-class {other:?}"),
                    ));
                }
            };
            part.pseudo_classes.push(pseudo);
        }

        other => {
            return Err(Error::invalid_selector(
                source,
                format!("Unexpected token {other:?}"),
            ));
        }
    }
    Ok(())
}

/// Parse the inside of `[...]`.
fn parse_attribute<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<AttributeSelector, CssParseError<'i, ()>> {
    let name = parser.expect_ident()?.to_ascii_lowercase();
    if parser.is_exhausted() {
        return Ok(AttributeSelector {
            name,
            operator: AttributeOperator::Exists,
        });
    }

    let operator = parser.next()?.clone();
    let value = match parser.next()?.clone() {
        Token::Ident(value) | Token::QuotedString(value) => value.to_string(),
        _ => return Err(parser.new_custom_error(())),
    };

    let operator = match operator {
        Token::Delim('=') => AttributeOperator::Equals(value),
        Token::IncludeMatch => AttributeOperator::Includes(value),
        Token::PrefixMatch => AttributeOperator::Prefix(value),
        Token::SuffixMatch => AttributeOperator::Suffix(value),
        Token::SubstringMatch => AttributeOperator::Substring(value),
        _ => return Err(parser.new_custom_error(())),
    };

    parser.expect_exhausted()?;
    Ok(AttributeSelector { name, operator })
}

/// Parse a compound selector (for the :not() argument).
fn parse_simple_selector<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<SelectorPart, CssParseError<'i, ()>> {
    let mut part = SelectorPart::default();

    parser.skip_whitespace();

    while let Ok(token) = parser.next() {
        match token.clone() {
            Token::Ident(name) => part.tag = Some(name.to_ascii_lowercase()),
            Token::Delim('*') => part.universal = true,
            Token::Delim('.') => {
                let class = parser.expect_ident()?;
                part.classes.push(class.to_string());
            }
            Token::IDHash(id) | Token::Hash(id) => {
                part.id = Some(id.to_string());
            }
            Token::SquareBracketBlock => {
                let attribute = parser.parse_nested_block(parse_attribute)?;
                part.attributes.push(attribute);
            }
            _ => return Err(parser.new_custom_error(())),
        }
    }

    if part.is_empty() {
        return Err(parser.new_custom_error(()));
    }
    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_class_selector() {
        let selector = parse_selector(".selectedText").unwrap();
        assert_eq!(selector.parts.len(), 1);
        assert_eq!(selector.parts[0].classes, vec!["selectedText".to_string()]);
    }

    #[test]
    fn parse_descendant_selector() {
        let selector = parse_selector(".items .item").unwrap();
        assert_eq!(selector.parts.len(), 2);
        assert_eq!(selector.combinators, vec![Combinator::Descendant]);
    }

    #[test]
    fn parse_compound_selector_stays_one_part() {
        let selector = parse_selector("li.item.highlighted").unwrap();
        assert_eq!(selector.parts.len(), 1);
        assert_eq!(selector.parts[0].classes.len(), 2);
    }

    #[test]
    fn parse_child_selector_with_spaces() {
        let selector = parse_selector("ul > li").unwrap();
        assert_eq!(selector.combinators, vec![Combinator::Child]);
        let selector = parse_selector("ul>li").unwrap();
        assert_eq!(selector.combinators, vec![Combinator::Child]);
    }

    #[test]
    fn parse_trailing_whitespace_is_ignored() {
        let selector = parse_selector("option ").unwrap();
        assert_eq!(selector.parts.len(), 1);
        assert!(selector.combinators.is_empty());
    }

    #[test]
    fn parse_attribute_selectors() {
        let selector = parse_selector("option[value=\"2\"]").unwrap();
        assert_eq!(selector.parts[0].tag.as_deref(), Some("option"));
        assert_eq!(selector.parts[0].attributes[0].name, "value");
        assert_eq!(
            selector.parts[0].attributes[0].operator,
            AttributeOperator::Equals("2".into())
        );

        let selector = parse_selector("[data-foo]").unwrap();
        assert_eq!(
            selector.parts[0].attributes[0].operator,
            AttributeOperator::Exists
        );

        let selector = parse_selector("li[class~=item]").unwrap();
        assert_eq!(
            selector.parts[0].attributes[0].operator,
            AttributeOperator::Includes("item".into())
        );
    }

    #[test]
    fn parse_pseudo_classes() {
        let selector = parse_selector("li:first-child").unwrap();
        assert_eq!(selector.parts[0].pseudo_classes, vec![PseudoClass::FirstChild]);

        let selector = parse_selector("li:not(.selected)").unwrap();
        let excluded = SelectorPart {
            classes: vec!["selected".into()],
            ..Default::default()
        };
        assert_eq!(
            selector.parts[0].pseudo_classes,
            vec![PseudoClass::Not(Box::new(excluded))]
        );

        let selector = parse_selector("option:selected").unwrap();
        assert_eq!(selector.parts[0].pseudo_classes, vec![PseudoClass::Selected]);

        let selector = parse_selector("*:last-child").unwrap();
        assert!(selector.parts[0].universal);
        assert_eq!(selector.parts[0].pseudo_classes, vec![PseudoClass::LastChild]);
    }

    #[test]
    fn parse_selector_list_splits_on_commas() {
        let selectors = parse_selector_list("div, .a > .b").unwrap();
        assert_eq!(selectors.len(), 2);
        assert_eq!(selectors[0].parts[0].tag.as_deref(), Some("div"));
        assert_eq!(selectors[1].combinators, vec![Combinator::Child]);
        assert_eq!(selectors[1].parts[1].classes, vec!["b".to_string()]);
    }

    #[test]
    fn parse_errors() {
        assert!(parse_selector("").is_err());
        assert!(parse_selector("> li").is_err());
        assert!(parse_selector("ul >").is_err());
        assert!(parse_selector("li:hover").is_err());
        assert!(parse_selector("li:nth-child(2)").is_err());
        assert!(parse_selector(".").is_err());
        assert!(parse_selector_list("a,,b").is_err());
    }
}
