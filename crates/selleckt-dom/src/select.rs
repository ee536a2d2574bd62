//! Form state of native `<select>` elements.
//!
//! A select's value is the value of its first selected option. Options
//! without a `value` attribute use their text. No option is selected
//! implicitly, so a select with nothing marked selected has no value.

use crate::error::Result;
use crate::{Document, NodeId};

/// The option elements of a select, in document order, including grouped ones.
pub fn options(doc: &Document, select: NodeId) -> Vec<NodeId> {
    doc.descendants(select)
        .into_iter()
        .filter(|n| doc.tag_name(*n) == Some("option"))
        .collect()
}

/// The submitted value of an option.
pub fn option_value(doc: &Document, option: NodeId) -> String {
    match doc.attr(option, "value") {
        Some(value) => value.to_string(),
        None => option_label(doc, option),
    }
}

/// The visible text of an option, trimmed.
pub fn option_label(doc: &Document, option: NodeId) -> String {
    doc.text_content(option).trim().to_string()
}

/// The first selected option.
pub fn selected_option(doc: &Document, select: NodeId) -> Option<NodeId> {
    options(doc, select)
        .into_iter()
        .find(|o| doc.is_selected(*o))
}

/// The select's current value.
pub fn value(doc: &Document, select: NodeId) -> Option<String> {
    selected_option(doc, select).map(|o| option_value(doc, o))
}

/// Select the first option whose value equals `value`.
///
/// Every other option is deselected. When nothing matches the select ends up
/// with no selection. Returns whether an option matched.
pub fn set_value(doc: &mut Document, select: NodeId, value: &str) -> Result<bool> {
    let target = options(doc, select)
        .into_iter()
        .find(|o| option_value(doc, *o) == value);
    set_selected_option(doc, select, target)?;
    Ok(target.is_some())
}

/// Make `option` the only selected option, or clear the selection with `None`.
pub fn set_selected_option(
    doc: &mut Document,
    select: NodeId,
    option: Option<NodeId>,
) -> Result<()> {
    for candidate in options(doc, select) {
        doc.set_selected(candidate, Some(candidate) == option)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Document, NodeId) {
        let doc = Document::from_html(
            r#"<select id="s">
                <option value="1">One</option>
                <optgroup label="g"><option value="2" selected>Two</option></optgroup>
                <option>Three</option>
            </select>"#,
        )
        .unwrap();
        let select = doc.query_selector(doc.body(), "#s").unwrap().unwrap();
        (doc, select)
    }

    #[test]
    fn test_options_include_grouped() {
        let (doc, select) = fixture();
        let values: Vec<String> = options(&doc, select)
            .into_iter()
            .map(|o| option_value(&doc, o))
            .collect();
        assert_eq!(values, vec!["1", "2", "Three"]);
    }

    #[test]
    fn test_value_reads_selected_option() {
        let (doc, select) = fixture();
        assert_eq!(value(&doc, select).as_deref(), Some("2"));
    }

    #[test]
    fn test_set_value_moves_selection() {
        let (mut doc, select) = fixture();
        assert!(set_value(&mut doc, select, "Three").unwrap());
        assert_eq!(value(&doc, select).as_deref(), Some("Three"));
        let selected: Vec<NodeId> = options(&doc, select)
            .into_iter()
            .filter(|o| doc.is_selected(*o))
            .collect();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_set_unknown_value_clears() {
        let (mut doc, select) = fixture();
        assert!(!set_value(&mut doc, select, "missing").unwrap());
        assert_eq!(value(&doc, select), None);
    }

    #[test]
    fn test_no_implicit_selection() {
        let doc = Document::from_html("<select><option value=a>A</option></select>").unwrap();
        let select = doc.query_selector(doc.body(), "select").unwrap().unwrap();
        assert_eq!(value(&doc, select), None);
    }
}
