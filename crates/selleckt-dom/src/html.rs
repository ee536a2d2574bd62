//! HTML fragment parsing and serialization.
//!
//! The parser handles the markup widgets and templates produce: elements,
//! attributes (quoted, unquoted or bare), text with character references,
//! comments and void elements. It does not implement the HTML5 tree
//! construction algorithm; an unmatched end tag closes elements up to the
//! nearest open element with that name.

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::node::{Element, NodeKind};
use crate::{Document, NodeId};

/// Parse markup into detached nodes owned by `doc`.
///
/// Returns the top-level nodes in source order.
pub(crate) fn parse_fragment(doc: &mut Document, markup: &str) -> Result<Vec<NodeId>> {
    let bytes = markup.as_bytes();
    let mut top_level = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        if markup[i..].starts_with("<!--") {
            let end = markup[i + 4..]
                .find("-->")
                .ok_or_else(|| Error::html_parse("unclosed HTML comment", i))?;
            i += 4 + end + 3;
            continue;
        }

        if bytes[i] == b'<' && markup[i..].starts_with("</") {
            let (tag, next) = parse_end_tag(markup, i)?;
            i = next;
            if let Some(pos) = stack
                .iter()
                .rposition(|n| doc.tag_name(*n) == Some(tag.as_str()))
            {
                stack.truncate(pos);
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            let (tag, attrs, self_closing, next) = parse_start_tag(markup, i)?;
            i = next;
            let node = doc.insert_element(Element::new(&tag, attrs));
            attach(doc, &stack, &mut top_level, node)?;
            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        let text = decode_html_character_references(&markup[text_start..i]);
        let node = doc.create_text(&text);
        attach(doc, &stack, &mut top_level, node)?;
    }

    Ok(top_level)
}

fn attach(
    doc: &mut Document,
    stack: &[NodeId],
    top_level: &mut Vec<NodeId>,
    node: NodeId,
) -> Result<()> {
    match stack.last() {
        Some(parent) => doc.append_child(*parent, node),
        None => {
            top_level.push(node);
            Ok(())
        }
    }
}

fn parse_start_tag(markup: &str, at: usize) -> Result<(String, Vec<(String, String)>, bool, usize)> {
    let bytes = markup.as_bytes();
    let mut i = at + 1;

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = markup[tag_start..i].to_ascii_lowercase();
    if tag.is_empty() {
        return Err(Error::html_parse("empty tag name", at));
    }

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(Error::html_parse(format!("unclosed start tag <{tag}>"), at));
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>') {
            self_closing = true;
            i += 2;
            break;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }
        let name = markup[name_start..i].to_ascii_lowercase();
        if name.is_empty() {
            return Err(Error::html_parse("invalid attribute name", i));
        }

        skip_ws(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(markup, &mut i)?
        } else {
            String::new()
        };

        // First occurrence wins, as in browsers.
        if !attrs.iter().any(|(existing, _)| *existing == name) {
            attrs.push((name, value));
        }
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(markup: &str, at: usize) -> Result<(String, usize)> {
    let bytes = markup.as_bytes();
    let mut i = at + 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = markup[tag_start..i].to_ascii_lowercase();

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::html_parse("unclosed end tag", at));
    }

    Ok((tag, i + 1))
}

fn parse_attr_value(markup: &str, i: &mut usize) -> Result<String> {
    let bytes = markup.as_bytes();
    if *i >= bytes.len() {
        return Err(Error::html_parse("missing attribute value", *i));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        let start = *i + 1;
        let end = markup[start..]
            .bytes()
            .position(|b| b == quote)
            .map(|p| start + p)
            .ok_or_else(|| Error::html_parse("unclosed quoted attribute value", *i))?;
        *i = end + 1;
        return Ok(decode_html_character_references(&markup[start..end]).into_owned());
    }

    let start = *i;
    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !(bytes[*i] == b'/' && bytes.get(*i + 1) == Some(&b'>'))
    {
        *i += 1;
    }
    Ok(decode_html_character_references(&markup[start..*i]).into_owned())
}

fn decode_html_character_references(src: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(src)
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'<')
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Serialize a node and its subtree.
pub(crate) fn serialize(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let Some(node) = doc.node(id) else {
        return;
    };
    match node.kind() {
        NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
        NodeKind::Document => {
            for child in node.children() {
                write_node(doc, *child, out);
            }
        }
        NodeKind::Element(element) => {
            out.push('<');
            out.push_str(element.tag_name());
            for (name, value) in element.attrs() {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');
            if is_void_tag(element.tag_name()) {
                return;
            }
            for child in node.children() {
                write_node(doc, *child, out);
            }
            out.push_str("</");
            out.push_str(element.tag_name());
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(markup: &str) -> String {
        let mut doc = Document::new();
        let nodes = parse_fragment(&mut doc, markup).unwrap();
        nodes.iter().map(|n| serialize(&doc, *n)).collect()
    }

    #[test]
    fn parse_nested_elements() {
        let mut doc = Document::new();
        let nodes =
            parse_fragment(&mut doc, "<div class=\"a\"><span>x</span><span>y</span></div>")
                .unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(doc.element_children(nodes[0]).len(), 2);
        assert_eq!(doc.text_content(nodes[0]), "xy");
        assert!(doc.parent(nodes[0]).is_none());
    }

    #[test]
    fn parse_attribute_forms() {
        let mut doc = Document::new();
        let nodes =
            parse_fragment(&mut doc, "<input type=text value='a b' disabled data-x=\"&amp;\">")
                .unwrap();
        let input = nodes[0];
        assert_eq!(doc.attr(input, "type"), Some("text"));
        assert_eq!(doc.attr(input, "value"), Some("a b"));
        assert_eq!(doc.attr(input, "disabled"), Some(""));
        assert_eq!(doc.attr(input, "data-x"), Some("&"));
        assert_eq!(doc.value(input), Some("a b"));
    }

    #[test]
    fn parse_void_and_self_closing() {
        let mut doc = Document::new();
        let nodes = parse_fragment(&mut doc, "<p><br>a<span/>b</p>").unwrap();
        assert_eq!(doc.children(nodes[0]).len(), 4);
    }

    #[test]
    fn parse_comments_are_dropped() {
        assert_eq!(roundtrip("<p><!-- note -->x</p>"), "<p>x</p>");
    }

    #[test]
    fn parse_decodes_entities() {
        let mut doc = Document::new();
        let nodes = parse_fragment(&mut doc, "<p>Tom &amp; Jerry &lt;3</p>").unwrap();
        assert_eq!(doc.text_content(nodes[0]), "Tom & Jerry <3");
    }

    #[test]
    fn parse_errors() {
        let mut doc = Document::new();
        assert!(parse_fragment(&mut doc, "<div class=\"a").is_err());
        assert!(parse_fragment(&mut doc, "<!-- open").is_err());
        assert!(parse_fragment(&mut doc, "<div").is_err());
    }

    #[test]
    fn stray_less_than_is_text() {
        let mut doc = Document::new();
        let nodes = parse_fragment(&mut doc, "a < b").unwrap();
        let text: String = nodes.iter().map(|n| doc.text_content(*n)).collect();
        assert_eq!(text, "a < b");
    }

    #[test]
    fn serialize_escapes() {
        assert_eq!(
            roundtrip("<li data-label=\"a&quot;b\">x &amp; y</li>"),
            "<li data-label=\"a&quot;b\">x &amp; y</li>"
        );
    }

    #[test]
    fn unmatched_end_tag_is_ignored() {
        assert_eq!(roundtrip("<ul><li>a</b></li></ul>"), "<ul><li>a</li></ul>");
    }
}
