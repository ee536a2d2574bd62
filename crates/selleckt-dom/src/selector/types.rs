//! Parsed selector representation.

/// Compound parts joined by combinators.
///
/// `parts[i]` and `parts[i + 1]` are joined by `combinators[i]`; the last part
/// is the element the selector matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub parts: Vec<SelectorPart>,
    pub combinators: Vec<Combinator>,
}

/// Conditions that must all hold for a single element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectorPart {
    /// Tag name, lowercased. `None` for `*` or no tag.
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
    pub pseudo_classes: Vec<PseudoClass>,
    /// Set by `*`, so that a bare universal selector is not empty.
    pub universal: bool,
}

impl SelectorPart {
    pub fn is_empty(&self) -> bool {
        !self.universal
            && self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.pseudo_classes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    AdjacentSibling,
    /// `a ~ b`
    GeneralSibling,
}

/// `[name]` or `[name <op> value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub operator: AttributeOperator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeOperator {
    Exists,
    /// `=`
    Equals(String),
    /// `~=`, one of the whitespace-separated words
    Includes(String),
    /// `^=`
    Prefix(String),
    /// `$=`
    Suffix(String),
    /// `*=`
    Substring(String),
}

impl AttributeSelector {
    /// Test an attribute value; `None` means the attribute is absent.
    pub fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match &self.operator {
            AttributeOperator::Exists => true,
            AttributeOperator::Equals(expected) => value == expected,
            AttributeOperator::Includes(word) => value.split_ascii_whitespace().any(|w| w == word),
            AttributeOperator::Prefix(p) => !p.is_empty() && value.starts_with(p.as_str()),
            AttributeOperator::Suffix(s) => !s.is_empty() && value.ends_with(s.as_str()),
            AttributeOperator::Substring(s) => !s.is_empty() && value.contains(s.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
    /// `:checked` or `:selected`, for selected options.
    Selected,
    Not(Box<SelectorPart>),
}

impl PseudoClass {
    /// Look up a pseudo-class that takes no argument.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "first-child" => Some(Self::FirstChild),
            "last-child" => Some(Self::LastChild),
            "checked" | "selected" => Some(Self::Selected),
            _ => None,
        }
    }
}
