//! Inline `style` attribute handling using the `cssparser` crate.
//!
//! Element styles live in the `style` attribute, so serialization and
//! attribute reads always agree with what the widget set. This module parses
//! that attribute into ordered declarations and writes it back.

use std::fmt;

use cssparser::{Delimiter, ParseError as CssParseError, Parser, ParserInput, Token};

/// Ordered `property: value` pairs from a `style` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    /// Parse a `style` attribute value.
    ///
    /// Malformed declarations are skipped; a later declaration of the same
    /// property replaces an earlier one.
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut style = Self::default();

        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }

            let name = match parser.expect_ident() {
                Ok(name) => name.to_ascii_lowercase(),
                Err(_) => {
                    skip_declaration(&mut parser);
                    continue;
                }
            };

            if parser.expect_colon().is_err() {
                skip_declaration(&mut parser);
                continue;
            }

            let start = parser.position();
            let consumed: Result<(), CssParseError<'_, ()>> =
                parser.parse_until_before(Delimiter::Semicolon, |p| {
                    while p.next().is_ok() {}
                    Ok(())
                });
            let value = parser.slice_from(start).trim().to_string();
            let _ = parser.try_parse(|p| p.expect_semicolon());

            if consumed.is_err() || value.is_empty() {
                tracing::trace!(target: selleckt_core::logging::targets::DOCUMENT, %name, "skipping empty declaration");
                continue;
            }
            style.set(&name, &value);
        }

        style
    }

    /// Value of a property, if declared.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    /// Declare or replace a property. Replacing keeps its position.
    pub fn set(&mut self, property: &str, value: &str) {
        let property = property.to_ascii_lowercase();
        match self.declarations.iter_mut().find(|(name, _)| *name == property) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.declarations.push((property, value.to_string())),
        }
    }

    /// Remove a property. Returns the old value.
    pub fn remove(&mut self, property: &str) -> Option<String> {
        let pos = self
            .declarations
            .iter()
            .position(|(name, _)| name == property)?;
        Some(self.declarations.remove(pos).1)
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Declarations in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.declarations.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{name}: {value};")?;
        }
        Ok(())
    }
}

/// Skip to the end of the current declaration (error recovery).
fn skip_declaration(parser: &mut Parser<'_, '_>) {
    loop {
        match parser.next() {
            Ok(Token::Semicolon) | Err(_) => return,
            _ => {}
        }
    }
}

/// Default `display` for elements without an inline override.
pub fn default_display(tag: &str) -> &'static str {
    match tag {
        "html" | "body" | "div" | "ul" | "ol" | "p" | "form" | "section" | "header"
        | "footer" | "nav" | "main" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "fieldset" => {
            "block"
        }
        "li" => "list-item",
        "select" | "button" | "input" => "inline-block",
        "option" | "optgroup" => "block",
        "table" => "table",
        "tr" => "table-row",
        "td" | "th" => "table-cell",
        _ => "inline",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_declarations() {
        let style = InlineStyle::parse("display: none; top:10px");
        assert_eq!(style.get("display"), Some("none"));
        assert_eq!(style.get("top"), Some("10px"));
        assert_eq!(style.to_string(), "display: none; top: 10px;");
    }

    #[test]
    fn later_declaration_wins() {
        let style = InlineStyle::parse("display: block; DISPLAY: inline-block;");
        assert_eq!(style.get("display"), Some("inline-block"));
        assert_eq!(style.iter().count(), 1);
    }

    #[test]
    fn malformed_declarations_are_skipped() {
        let style = InlineStyle::parse("42px; color red; overflow-y: scroll;");
        assert_eq!(style.get("overflow-y"), Some("scroll"));
        assert_eq!(style.iter().count(), 1);
    }

    #[test]
    fn set_and_remove_keep_order() {
        let mut style = InlineStyle::parse("position: absolute; top: 1px;");
        style.set("position", "fixed");
        style.set("left", "2px");
        assert_eq!(style.to_string(), "position: fixed; top: 1px; left: 2px;");
        assert_eq!(style.remove("top"), Some("1px".to_string()));
        assert_eq!(style.remove("top"), None);
        assert_eq!(style.to_string(), "position: fixed; left: 2px;");
    }

    #[test]
    fn default_display_values() {
        assert_eq!(default_display("li"), "list-item");
        assert_eq!(default_display("select"), "inline-block");
        assert_eq!(default_display("div"), "block");
        assert_eq!(default_display("mark"), "inline");
    }
}
