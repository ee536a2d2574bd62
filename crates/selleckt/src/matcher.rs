//! Case-insensitive label matching for search-as-you-type.
//!
//! Matching never touches the items themselves: results are [`MatchedItem`]
//! views that borrow the item and carry the span of the first match.

use crate::item::Item;

/// Character offsets of a match within a label. `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

/// An item paired with where the search term matched its label, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedItem<'a> {
    pub item: &'a Item,
    pub span: Option<MatchSpan>,
}

impl MatchedItem<'_> {
    pub fn is_match(&self) -> bool {
        self.span.is_some()
    }
}

/// Annotate every item with the first case-insensitive match of `term` in its label.
///
/// All items appear in the result, in order. An empty term annotates nothing.
pub fn find_matches<'a, I>(items: I, term: &str) -> Vec<MatchedItem<'a>>
where
    I: IntoIterator<Item = &'a Item>,
{
    let needle: Vec<char> = term.chars().map(fold).collect();
    items
        .into_iter()
        .map(|item| MatchedItem {
            item,
            span: find_span(&item.label, &needle),
        })
        .collect()
}

/// Whether `term` matches `label` anywhere, ignoring case.
pub fn label_matches(label: &str, term: &str) -> bool {
    let needle: Vec<char> = term.chars().map(fold).collect();
    needle.is_empty() || find_span(label, &needle).is_some()
}

fn find_span(label: &str, needle: &[char]) -> Option<MatchSpan> {
    if needle.is_empty() {
        return None;
    }
    let haystack: Vec<char> = label.chars().map(fold).collect();
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|start| MatchSpan {
            start,
            end: start + needle.len() - 1,
        })
}

/// Simple per-character case folding, so offsets stay in label characters.
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Render `label` as HTML with the spanned characters wrapped in `<mark>`.
///
/// All label text is escaped, inside and outside the mark.
pub fn highlight_markup(label: &str, span: Option<MatchSpan>) -> String {
    let Some(span) = span else {
        return html_escape::encode_text(label).into_owned();
    };

    let chars: Vec<char> = label.chars().collect();
    let start = span.start.min(chars.len());
    let end = (span.end + 1).clamp(start, chars.len());

    let before: String = chars[..start].iter().collect();
    let marked: String = chars[start..end].iter().collect();
    let after: String = chars[end..].iter().collect();

    format!(
        "{}<mark>{}</mark>{}",
        html_escape::encode_text(&before),
        html_escape::encode_text(&marked),
        html_escape::encode_text(&after)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<Item> {
        vec![
            Item::new("", "Empty"),
            Item::new("foo", "foo"),
            Item::new("bar", "bar"),
            Item::new("baz", "baz"),
            Item::new("foofoo", "foofoo"),
            Item::new("foobaz", "foobaz"),
        ]
    }

    #[test]
    fn test_empty_term_keeps_everything_unannotated() {
        let items = items();
        let matches = find_matches(&items, "");
        assert_eq!(matches.len(), 6);
        assert!(matches.iter().all(|m| m.span.is_none()));
        assert_eq!(matches[0].item.value, "");
    }

    #[test]
    fn test_annotates_first_match() {
        let items = items();
        let spans: Vec<Option<MatchSpan>> =
            find_matches(&items, "ba").into_iter().map(|m| m.span).collect();
        assert_eq!(
            spans,
            vec![
                None,
                None,
                Some(MatchSpan { start: 0, end: 1 }),
                Some(MatchSpan { start: 0, end: 1 }),
                None,
                Some(MatchSpan { start: 3, end: 4 }),
            ]
        );
    }

    #[test]
    fn test_matching_ignores_case() {
        let items = vec![Item::new("x", "FooBAZ")];
        let matches = find_matches(&items, "bAz");
        assert_eq!(matches[0].span, Some(MatchSpan { start: 3, end: 5 }));
        assert!(label_matches("FooBAZ", "oob"));
        assert!(!label_matches("FooBAZ", "zz"));
    }

    #[test]
    fn test_offsets_count_characters() {
        let items = vec![Item::new("x", "crème brûlée")];
        let matches = find_matches(&items, "BRÛ");
        assert_eq!(matches[0].span, Some(MatchSpan { start: 6, end: 8 }));
        assert_eq!(
            highlight_markup("crème brûlée", matches[0].span),
            "crème <mark>brû</mark>lée"
        );
    }

    #[test]
    fn test_matching_does_not_mutate_items() {
        let items = items();
        let before = items.clone();
        let _ = find_matches(&items, "foo");
        assert_eq!(items, before);
    }

    #[test]
    fn test_highlight_escapes_label() {
        let span = Some(MatchSpan { start: 0, end: 2 });
        assert_eq!(
            highlight_markup("<b>some HTML</b>", span),
            "<mark>&lt;b&gt;</mark>some HTML&lt;/b&gt;"
        );
        assert_eq!(highlight_markup("a & b", None), "a &amp; b");
    }
}
