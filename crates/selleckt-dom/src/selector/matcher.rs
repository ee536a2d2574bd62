//! Selector matching against the document tree.

use super::{Combinator, PseudoClass, Selector, SelectorPart};
use crate::{Document, NodeId};

/// Selector matching engine.
pub struct SelectorMatcher;

impl SelectorMatcher {
    /// Check if a node matches a full selector, combinators included.
    pub fn matches(doc: &Document, node: NodeId, selector: &Selector) -> bool {
        match selector.parts.len() {
            0 => false,
            len => Self::matches_from(doc, node, selector, len - 1),
        }
    }

    /// Check if a node matches any selector of a list.
    pub fn matches_any(doc: &Document, node: NodeId, selectors: &[Selector]) -> bool {
        selectors.iter().any(|s| Self::matches(doc, node, s))
    }

    /// Match `selector.parts[..=index]` with `node` as the element for `index`.
    ///
    /// Descendant and general-sibling combinators try every candidate, so a
    /// failed match further left backtracks instead of giving up.
    fn matches_from(doc: &Document, node: NodeId, selector: &Selector, index: usize) -> bool {
        if !Self::part_matches(doc, node, &selector.parts[index]) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match selector.combinators[index - 1] {
            Combinator::Child => doc
                .parent_element(node)
                .is_some_and(|parent| Self::matches_from(doc, parent, selector, index - 1)),
            Combinator::Descendant => {
                let mut cursor = doc.parent_element(node);
                while let Some(ancestor) = cursor {
                    if Self::matches_from(doc, ancestor, selector, index - 1) {
                        return true;
                    }
                    cursor = doc.parent_element(ancestor);
                }
                false
            }
            Combinator::AdjacentSibling => doc
                .previous_element_sibling(node)
                .is_some_and(|sibling| Self::matches_from(doc, sibling, selector, index - 1)),
            Combinator::GeneralSibling => {
                let mut cursor = doc.previous_element_sibling(node);
                while let Some(sibling) = cursor {
                    if Self::matches_from(doc, sibling, selector, index - 1) {
                        return true;
                    }
                    cursor = doc.previous_element_sibling(sibling);
                }
                false
            }
        }
    }

    /// Check if a compound selector matches one element.
    pub fn part_matches(doc: &Document, node: NodeId, part: &SelectorPart) -> bool {
        let Some(element) = doc.element(node) else {
            return false;
        };

        if let Some(tag) = &part.tag
            && tag != element.tag_name()
        {
            return false;
        }

        if let Some(id) = &part.id
            && element.id() != Some(id.as_str())
        {
            return false;
        }

        if !part.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }

        if !part
            .attributes
            .iter()
            .all(|attribute| attribute.matches(element.attr(&attribute.name)))
        {
            return false;
        }

        part.pseudo_classes
            .iter()
            .all(|pseudo| Self::pseudo_matches(doc, node, pseudo))
    }

    fn pseudo_matches(doc: &Document, node: NodeId, pseudo: &PseudoClass) -> bool {
        match pseudo {
            PseudoClass::FirstChild => doc.previous_element_sibling(node).is_none(),
            PseudoClass::LastChild => doc.next_element_sibling(node).is_none(),
            PseudoClass::Selected => doc.element(node).is_some_and(|e| e.is_selected()),
            PseudoClass::Not(inner) => !Self::part_matches(doc, node, inner),
        }
    }
}
