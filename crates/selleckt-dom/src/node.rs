//! Node storage for the host document.

use std::collections::BTreeMap;

use slotmap::new_key_type;

use crate::geometry::Rect;

new_key_type! {
    /// Handle to a node in a [`Document`](crate::Document).
    ///
    /// Handles stay valid until the node is removed from the document.
    pub struct NodeId;
}

/// What a node is.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// An element with a tag and attributes.
    Element(Element),
    /// A run of text.
    Text(String),
}

/// A node and its tree links.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) rect: Rect,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
            rect: Rect::default(),
        }
    }

    /// The node's parent, if attached.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The element payload, if this is an element.
    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn as_element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// The text payload, if this is a text node.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Element payload.
///
/// Attributes keep insertion order so serialized markup is stable.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) tag: String,
    pub(crate) attrs: Vec<(String, String)>,
    /// Current value of form controls; starts from the `value` attribute.
    pub(crate) value: String,
    /// Option selectedness; starts from the `selected` attribute.
    pub(crate) selected: bool,
    /// Script-side data store, never serialized.
    pub(crate) data: BTreeMap<String, String>,
}

impl Element {
    pub(crate) fn new(tag: &str, attrs: Vec<(String, String)>) -> Self {
        let value = attrs
            .iter()
            .find(|(name, _)| name == "value")
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        let selected = attrs.iter().any(|(name, _)| name == "selected");
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs,
            value,
            selected,
            data: BTreeMap::new(),
        }
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> &str {
        &self.tag
    }

    /// Look up an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// All attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(attr, _)| *attr == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }

    pub(crate) fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(attr, _)| attr == name)?;
        Some(self.attrs.remove(pos).1)
    }

    /// Class names from the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// The `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Current form-control value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether this option is selected.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Script-side data entry.
    pub fn data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}
