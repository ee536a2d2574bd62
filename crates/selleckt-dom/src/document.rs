//! The document tree.
//!
//! An arena of nodes addressed by [`NodeId`]. The document starts with a
//! root node holding a single `<body>` element; everything an embedder or a
//! widget creates hangs off that body or stays detached until inserted.

use std::collections::HashMap;

use slotmap::SlotMap;

use selleckt_core::logging::targets;

use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::html;
use crate::mutation::MutationRecord;
use crate::node::{Element, Node, NodeKind};
use crate::selector::{parse_selector_list, Selector, SelectorMatcher};
use crate::style::{default_display, InlineStyle};
use crate::NodeId;

/// A headless HTML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    body: NodeId,
    active_element: Option<NodeId>,
    viewport: Rect,
    /// Observed targets and how many observers watch each.
    observed: HashMap<NodeId, usize>,
    pending_records: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a `<body>` element.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Document));
        let mut body_node = Node::new(NodeKind::Element(Element::new("body", Vec::new())));
        body_node.parent = Some(root);
        let body = nodes.insert(body_node);
        nodes[root].children.push(body);

        Self {
            nodes,
            root,
            body,
            active_element: None,
            viewport: Rect::new(0.0, 0.0, 1024.0, 768.0),
            observed: HashMap::new(),
            pending_records: Vec::new(),
        }
    }

    /// Create a document whose body holds the given markup.
    pub fn from_html(markup: &str) -> Result<Self> {
        let mut doc = Self::new();
        doc.set_inner_html(doc.body, markup)?;
        Ok(doc)
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element.
    pub fn body(&self) -> NodeId {
        self.body
    }

    // -------------------------------------------------------------------------
    // Node access
    // -------------------------------------------------------------------------

    /// Get a node, if it still exists.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether the node exists (attached or not).
    pub fn exists(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get the element payload of a node.
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        self.nodes
            .get_mut(id)
            .ok_or(Error::NodeNotFound(id))?
            .as_element_mut()
            .ok_or(Error::NotAnElement(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or(Error::NodeNotFound(id))
    }

    /// Lowercase tag name of an element.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::tag_name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(Node::parent)
    }

    /// The parent if it is an element (not the document node).
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.element(*p).is_some())
    }

    /// Children in document order. Empty for missing nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(Node::children).unwrap_or(&[])
    }

    /// Element children in document order.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    fn sibling_elements(&self, id: NodeId) -> Option<(Vec<NodeId>, usize)> {
        let parent = self.parent(id)?;
        let siblings = self.element_children(parent);
        let index = siblings.iter().position(|s| *s == id)?;
        Some((siblings, index))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (siblings, index) = self.sibling_elements(id)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (siblings, index) = self.sibling_elements(id)?;
        siblings.get(index + 1).copied()
    }

    /// Zero-based position among element siblings.
    pub fn element_index(&self, id: NodeId) -> Option<usize> {
        self.sibling_elements(id).map(|(_, index)| index)
    }

    /// Ancestors from the parent outwards, ending with the document node when attached.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            out.push(current);
            cursor = self.parent(current);
        }
        out
    }

    /// Whether `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    /// Whether the node is part of the document tree.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.exists(id) && self.contains(self.root, id)
    }

    /// All descendants in pre-order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    // -------------------------------------------------------------------------
    // Creation and tree mutation
    // -------------------------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_element_with_attrs(tag, &[])
    }

    /// Create a detached element with attributes.
    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        self.insert_element(Element::new(tag, attrs))
    }

    pub(crate) fn insert_element(&mut self, element: Element) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Element(element)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Text(text.to_string())))
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (or at the end).
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        if !self.exists(parent) {
            return Err(Error::NodeNotFound(parent));
        }
        if !self.exists(child) {
            return Err(Error::NodeNotFound(child));
        }
        if self.contains(child, parent) {
            return Err(Error::HierarchyRequest { parent, child });
        }

        self.detach(child)?;

        let children = &self.nodes[parent].children;
        let index = match reference {
            Some(r) => children
                .iter()
                .position(|c| *c == r)
                .ok_or(Error::NodeNotFound(r))?,
            None => children.len(),
        };
        self.nodes[parent].children.insert(index, child);
        self.nodes[child].parent = Some(parent);
        self.record(MutationRecord::added(parent, vec![child]));
        Ok(())
    }

    /// Insert `child` right after `reference` under the same parent.
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> Result<()> {
        let parent = self.parent(reference).ok_or(Error::NodeNotFound(reference))?;
        let next = {
            let siblings = self.children(parent);
            siblings
                .iter()
                .position(|c| *c == reference)
                .and_then(|i| siblings.get(i + 1).copied())
        };
        // Moving `child` out first would shift positions if it is `next`.
        let next = next.filter(|n| *n != child);
        self.insert_before(parent, child, next)
    }

    /// Take a node out of its parent. The node stays alive.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.node_mut(id)?.parent.take();
        if let Some(parent) = parent {
            self.nodes[parent].children.retain(|c| *c != id);
            self.record(MutationRecord::removed(parent, vec![id]));
        }
        Ok(())
    }

    /// Detach a node and free it together with its subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.detach(id)?;
        self.free_subtree(id);
        Ok(())
    }

    /// Remove and free every child of a node.
    pub fn remove_children(&mut self, id: NodeId) -> Result<()> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        if children.is_empty() {
            return Ok(());
        }
        for child in &children {
            self.free_subtree(*child);
        }
        self.record(MutationRecord::removed(id, children));
        Ok(())
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in doomed {
            self.nodes.remove(node);
            self.observed.remove(&node);
            if self.active_element == Some(node) {
                self.active_element = None;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Attributes and classes
    // -------------------------------------------------------------------------

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    /// Set an attribute. Setting `selected` on an option also selects it.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        element.set_attr(name, value);
        if name.eq_ignore_ascii_case("selected") {
            element.selected = true;
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<Option<String>> {
        let element = self.element_mut(id)?;
        let old = element.remove_attr(&name.to_ascii_lowercase());
        if name.eq_ignore_ascii_case("selected") && old.is_some() {
            element.selected = false;
        }
        Ok(old)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    /// Class names of an element.
    pub fn classes(&self, id: NodeId) -> Vec<String> {
        self.element(id)
            .map(|e| e.classes().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        self.toggle_class(id, class, true)
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        self.toggle_class(id, class, false)
    }

    /// Add (`on`) or remove a class. Handles space-separated lists.
    pub fn toggle_class(&mut self, id: NodeId, classes: &str, on: bool) -> Result<()> {
        let element = self.element_mut(id)?;
        let mut current: Vec<String> = element.classes().map(str::to_string).collect();
        for class in classes.split_ascii_whitespace() {
            let present = current.iter().any(|c| c == class);
            if on && !present {
                current.push(class.to_string());
            } else if !on && present {
                current.retain(|c| c != class);
            }
        }
        if current.is_empty() && element.has_attr("class") {
            element.set_attr("class", "");
        } else if !current.is_empty() {
            element.set_attr("class", &current.join(" "));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Text and markup
    // -------------------------------------------------------------------------

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.nodes.get(id).map(Node::kind) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(_) => self
                .children(id)
                .iter()
                .map(|child| self.text_content(*child))
                .collect(),
            None => String::new(),
        }
    }

    /// Replace the children of an element with one text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.element_mut(id)?;
        self.remove_children(id)?;
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node)?;
        }
        Ok(())
    }

    /// Parse markup into detached top-level nodes owned by this document.
    pub fn parse_fragment(&mut self, markup: &str) -> Result<Vec<NodeId>> {
        html::parse_fragment(self, markup)
    }

    /// Replace the children of an element with parsed markup.
    ///
    /// Observers see one removal record and one addition record.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Result<()> {
        self.element_mut(id)?;
        let fresh = self.parse_fragment(markup)?;
        self.remove_children(id)?;
        for node in &fresh {
            self.nodes[*node].parent = Some(id);
        }
        self.nodes[id].children = fresh.clone();
        if !fresh.is_empty() {
            self.record(MutationRecord::added(id, fresh));
        }
        Ok(())
    }

    /// Serialized children.
    pub fn inner_html(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .map(|child| html::serialize(self, *child))
            .collect()
    }

    /// Serialized node including itself.
    pub fn outer_html(&self, id: NodeId) -> String {
        html::serialize(self, id)
    }

    // -------------------------------------------------------------------------
    // Inline styles and visibility
    // -------------------------------------------------------------------------

    /// Parsed inline style of an element.
    pub fn inline_style(&self, id: NodeId) -> InlineStyle {
        InlineStyle::parse(self.attr(id, "style").unwrap_or(""))
    }

    /// One inline style property.
    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        self.inline_style(id).get(property).map(str::to_string)
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<()> {
        let mut style = self.inline_style(id);
        style.set(property, value);
        self.write_style(id, &style)
    }

    pub fn remove_style(&mut self, id: NodeId, property: &str) -> Result<()> {
        let mut style = self.inline_style(id);
        if style.remove(property).is_some() {
            self.write_style(id, &style)?;
        }
        Ok(())
    }

    fn write_style(&mut self, id: NodeId, style: &InlineStyle) -> Result<()> {
        if style.is_empty() {
            self.remove_attr(id, "style").map(|_| ())
        } else {
            self.set_attr(id, "style", &style.to_string())
        }
    }

    /// Effective `display`: the inline value or the tag's default.
    pub fn display(&self, id: NodeId) -> String {
        self.style(id, "display").unwrap_or_else(|| {
            self.tag_name(id)
                .map(default_display)
                .unwrap_or("inline")
                .to_string()
        })
    }

    /// Effective overflow along the block axis.
    pub fn overflow_y(&self, id: NodeId) -> String {
        let style = self.inline_style(id);
        style
            .get("overflow-y")
            .or_else(|| style.get("overflow"))
            .unwrap_or("visible")
            .to_string()
    }

    /// Whether the element is connected and neither it nor an ancestor is `display: none`.
    pub fn is_displayed(&self, id: NodeId) -> bool {
        if !self.is_connected(id) {
            return false;
        }
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|n| self.element(*n).is_some())
            .all(|n| self.display(n) != "none")
    }

    // -------------------------------------------------------------------------
    // Form state, data and geometry
    // -------------------------------------------------------------------------

    /// Current value of a form control.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::value)
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<()> {
        self.element_mut(id)?.value = value.to_string();
        Ok(())
    }

    /// Option selectedness.
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(Element::is_selected)
    }

    pub fn set_selected(&mut self, id: NodeId, selected: bool) -> Result<()> {
        self.element_mut(id)?.selected = selected;
        Ok(())
    }

    /// Script-side data attached to an element.
    pub fn data(&self, id: NodeId, key: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.data(key))
    }

    pub fn set_data(&mut self, id: NodeId, key: &str, value: &str) -> Result<()> {
        self.element_mut(id)?
            .data
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_data(&mut self, id: NodeId, key: &str) -> Result<Option<String>> {
        Ok(self.element_mut(id)?.data.remove(key))
    }

    /// Border box in viewport coordinates.
    pub fn rect(&self, id: NodeId) -> Rect {
        self.nodes.get(id).map(|n| n.rect).unwrap_or_default()
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) -> Result<()> {
        self.node_mut(id)?.rect = rect;
        Ok(())
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// The focused element.
    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    pub(crate) fn set_active_element(&mut self, id: Option<NodeId>) {
        self.active_element = id;
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// First descendant of `scope` matching the selector list.
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let selectors = parse_selector_list(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .find(|n| SelectorMatcher::matches_any(self, *n, &selectors)))
    }

    /// Every descendant of `scope` matching the selector list, in document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let selectors = parse_selector_list(selector)?;
        Ok(self.query_parsed(scope, &selectors))
    }

    /// Like [`query_selector_all`](Self::query_selector_all) with a pre-parsed list.
    pub fn query_parsed(&self, scope: NodeId, selectors: &[Selector]) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| SelectorMatcher::matches_any(self, *n, selectors))
            .collect()
    }

    /// Whether an element matches the selector list.
    pub fn matches(&self, id: NodeId, selector: &str) -> Result<bool> {
        let selectors = parse_selector_list(selector)?;
        Ok(SelectorMatcher::matches_any(self, id, &selectors))
    }

    /// The node itself or its nearest ancestor matching the selector list.
    pub fn closest(&self, id: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let selectors = parse_selector_list(selector)?;
        Ok(std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| SelectorMatcher::matches_any(self, *n, &selectors)))
    }

    // -------------------------------------------------------------------------
    // Mutation observation
    // -------------------------------------------------------------------------

    pub(crate) fn observe_child_list(&mut self, target: NodeId) {
        *self.observed.entry(target).or_insert(0) += 1;
    }

    pub(crate) fn unobserve_child_list(&mut self, target: NodeId) {
        if let Some(count) = self.observed.get_mut(&target) {
            *count -= 1;
            if *count == 0 {
                self.observed.remove(&target);
            }
        }
    }

    /// Whether any observer watches the node's children.
    pub fn is_observed(&self, target: NodeId) -> bool {
        self.observed.contains_key(&target)
    }

    /// Drain queued records in mutation order.
    pub fn take_mutation_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending_records)
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.pending_records.is_empty()
    }

    fn record(&mut self, record: MutationRecord) {
        if self.observed.contains_key(&record.target) {
            tracing::trace!(
                target: targets::MUTATION,
                target_node = ?record.target,
                added = record.added.len(),
                removed = record.removed.len(),
                "child list changed"
            );
            self.pending_records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::from_html(
            r#"<div id="wrap" class="outer"><ul class="items"><li class="item">a</li><li class="item selected">b</li><li class="item">c</li></ul></div>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_html_builds_tree() {
        let doc = sample();
        let wrap = doc.query_selector(doc.body(), "#wrap").unwrap().unwrap();
        assert_eq!(doc.tag_name(wrap), Some("div"));
        assert_eq!(doc.parent(wrap), Some(doc.body()));
        assert_eq!(doc.text_content(wrap), "abc");
    }

    #[test]
    fn test_query_selector_all_in_document_order() {
        let doc = sample();
        let items = doc.query_selector_all(doc.body(), ".items > .item").unwrap();
        let texts: Vec<_> = items.iter().map(|n| doc.text_content(*n)).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);

        let selected = doc.query_selector_all(doc.body(), "li:not(.selected)").unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_closest_and_contains() {
        let doc = sample();
        let li = doc.query_selector(doc.body(), "li.selected").unwrap().unwrap();
        let wrap = doc.closest(li, ".outer").unwrap().unwrap();
        assert!(doc.contains(wrap, li));
        assert!(!doc.contains(li, wrap));
        assert_eq!(doc.closest(li, "li").unwrap(), Some(li));
    }

    #[test]
    fn test_class_toggling() {
        let mut doc = sample();
        let wrap = doc.query_selector(doc.body(), "#wrap").unwrap().unwrap();
        doc.add_class(wrap, "open").unwrap();
        doc.add_class(wrap, "open").unwrap();
        assert_eq!(doc.classes(wrap), vec!["outer", "open"]);
        doc.toggle_class(wrap, "open outer", false).unwrap();
        assert!(doc.classes(wrap).is_empty());
        assert!(!doc.has_class(doc.body(), "x"));
    }

    #[test]
    fn test_insert_after_and_remove() {
        let mut doc = sample();
        let first = doc.query_selector(doc.body(), "li").unwrap().unwrap();
        let ul = doc.parent(first).unwrap();
        let fresh = doc.create_element_with_attrs("li", &[("class", "item")]);
        doc.insert_after(first, fresh).unwrap();
        assert_eq!(doc.element_index(fresh), Some(1));

        doc.remove(first).unwrap();
        assert!(!doc.exists(first));
        assert_eq!(doc.element_children(ul).len(), 3);
        assert_eq!(doc.element_index(fresh), Some(0));
    }

    #[test]
    fn test_cannot_insert_into_own_subtree() {
        let mut doc = sample();
        let wrap = doc.query_selector(doc.body(), "#wrap").unwrap().unwrap();
        let ul = doc.query_selector(wrap, "ul").unwrap().unwrap();
        assert!(matches!(
            doc.append_child(ul, wrap),
            Err(Error::HierarchyRequest { .. })
        ));
    }

    #[test]
    fn test_inline_style_and_display() {
        let mut doc = sample();
        let li = doc.query_selector(doc.body(), "li").unwrap().unwrap();
        assert_eq!(doc.display(li), "list-item");
        assert!(doc.is_displayed(li));

        let ul = doc.parent(li).unwrap();
        doc.set_style(ul, "display", "none").unwrap();
        assert!(!doc.is_displayed(li));
        assert_eq!(doc.attr(ul, "style"), Some("display: none;"));

        doc.remove_style(ul, "display").unwrap();
        assert_eq!(doc.attr(ul, "style"), None);
        assert!(doc.is_displayed(li));
    }

    #[test]
    fn test_detached_nodes_are_not_displayed() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        assert!(!doc.is_displayed(div));
        doc.append_child(doc.body(), div).unwrap();
        assert!(doc.is_displayed(div));
    }

    #[test]
    fn test_selected_attribute_drives_selectedness() {
        let mut doc = Document::from_html("<select><option>a</option></select>").unwrap();
        let option = doc.query_selector(doc.body(), "option").unwrap().unwrap();
        assert!(!doc.is_selected(option));
        doc.set_attr(option, "selected", "").unwrap();
        assert!(doc.is_selected(option));
        assert!(doc.matches(option, "option:checked").unwrap());
        doc.remove_attr(option, "selected").unwrap();
        assert!(!doc.is_selected(option));
    }

    #[test]
    fn test_mutation_records_only_for_observed_targets() {
        let mut doc = sample();
        let ul = doc.query_selector(doc.body(), "ul").unwrap().unwrap();
        let li = doc.create_element("li");
        doc.append_child(ul, li).unwrap();
        assert!(!doc.has_pending_mutations());

        doc.observe_child_list(ul);
        let li2 = doc.create_element("li");
        doc.append_child(ul, li2).unwrap();
        doc.remove(li).unwrap();
        let records = doc.take_mutation_records();
        assert_eq!(
            records,
            vec![
                MutationRecord::added(ul, vec![li2]),
                MutationRecord::removed(ul, vec![li]),
            ]
        );

        doc.unobserve_child_list(ul);
        doc.remove(li2).unwrap();
        assert!(doc.take_mutation_records().is_empty());
    }

    #[test]
    fn test_set_text_content() {
        let mut doc = sample();
        let li = doc.query_selector(doc.body(), "li").unwrap().unwrap();
        doc.set_text_content(li, "<b>x</b>").unwrap();
        assert_eq!(doc.text_content(li), "<b>x</b>");
        assert_eq!(doc.inner_html(li), "&lt;b&gt;x&lt;/b&gt;");
    }
}
