//! Selectable items and the ordered model that mirrors the native options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use selleckt_dom::{select, Document, NodeId};

/// Attribute prefix whose attributes are carried into [`Item::data`].
pub const DATA_PREFIX: &str = "data-";

/// One selectable entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Lookup key. The first item with a given value wins.
    pub value: String,
    /// Text shown to the user.
    pub label: String,
    /// Auxiliary attributes, keyed without the `data-` prefix.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub is_selected: bool,
}

impl Item {
    /// Create an unselected item with no data.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            data: BTreeMap::new(),
            is_selected: false,
        }
    }

    /// Add a data entry using builder pattern.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Mark the item as selected using builder pattern.
    pub fn selected(mut self) -> Self {
        self.is_selected = true;
        self
    }

    /// Read an item from a native `<option>`.
    pub fn from_option(doc: &Document, option: NodeId) -> Self {
        let data = doc
            .element(option)
            .map(|element| {
                element
                    .attrs()
                    .filter_map(|(name, value)| {
                        name.strip_prefix(DATA_PREFIX)
                            .map(|key| (key.to_string(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            value: select::option_value(doc, option),
            label: select::option_label(doc, option),
            data,
            is_selected: doc.is_selected(option),
        }
    }

    /// Attributes for a native `<option>` mirroring this item.
    pub fn option_attrs(&self) -> Vec<(String, String)> {
        let mut attrs = vec![("value".to_string(), self.value.clone())];
        attrs.extend(
            self.data
                .iter()
                .map(|(key, value)| (format!("{DATA_PREFIX}{key}"), value.clone())),
        );
        attrs
    }

    /// The item as a template view-model entry.
    pub fn to_view(&self) -> Value {
        // Infallible: every field is a string, a string map or a bool.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    item: Item,
    option: NodeId,
    rendered: Option<NodeId>,
}

/// The ordered items of one widget, each paired with its native option.
///
/// At most one item is selected at a time.
#[derive(Debug, Clone, Default)]
pub struct ItemModel {
    entries: Vec<Entry>,
}

impl ItemModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the model from the options of a native select.
    ///
    /// Only the first option marked selected keeps its flag.
    pub fn from_select(doc: &Document, select_node: NodeId) -> Self {
        let mut model = Self::new();
        let mut first_selected = None;
        for (index, option) in select::options(doc, select_node).into_iter().enumerate() {
            let item = Item::from_option(doc, option);
            if item.is_selected && first_selected.is_none() {
                first_selected = Some(index);
            }
            model.push(item, option);
        }
        if let Some(index) = first_selected {
            model.select(index);
        }
        model
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Items in order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.entries.iter().map(|e| &e.item)
    }

    /// Snapshot of all items.
    pub fn items(&self) -> Vec<Item> {
        self.iter().cloned().collect()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.entries.get(index).map(|e| &e.item)
    }

    /// Index of the first item with `value`.
    pub fn position(&self, value: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.item.value == value)
    }

    /// The first item with `value`.
    pub fn find(&self, value: &str) -> Option<&Item> {
        self.position(value).and_then(|i| self.get(i))
    }

    /// Index of the item mirroring a native option.
    pub fn position_of_option(&self, option: NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.option == option)
    }

    /// Index of the item rendered as `node`.
    pub fn position_of_rendered(&self, node: NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.rendered == Some(node))
    }

    pub fn option(&self, index: usize) -> Option<NodeId> {
        self.entries.get(index).map(|e| e.option)
    }

    pub fn rendered(&self, index: usize) -> Option<NodeId> {
        self.entries.get(index).and_then(|e| e.rendered)
    }

    pub fn set_rendered(&mut self, index: usize, node: Option<NodeId>) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.rendered = node;
        }
    }

    /// Forget every rendered node.
    pub fn clear_rendered(&mut self) {
        for entry in &mut self.entries {
            entry.rendered = None;
        }
    }

    /// Append an item. Its selected flag is cleared; use [`select`](Self::select).
    pub fn push(&mut self, item: Item, option: NodeId) {
        self.insert(self.entries.len(), item, option);
    }

    /// Insert an item at `index`, clamped to the end.
    pub fn insert(&mut self, index: usize, mut item: Item, option: NodeId) {
        item.is_selected = false;
        let index = index.min(self.entries.len());
        self.entries.insert(
            index,
            Entry {
                item,
                option,
                rendered: None,
            },
        );
    }

    /// Remove the item at `index`, returning it with its option and rendered node.
    pub fn remove(&mut self, index: usize) -> Option<(Item, NodeId, Option<NodeId>)> {
        if index >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(index);
        Some((entry.item, entry.option, entry.rendered))
    }

    /// Index of the selected item.
    pub fn selected_index(&self) -> Option<usize> {
        self.entries.iter().position(|e| e.item.is_selected)
    }

    pub fn selected(&self) -> Option<&Item> {
        self.selected_index().and_then(|i| self.get(i))
    }

    /// Make the item at `index` the only selected one.
    pub fn select(&mut self, index: usize) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.item.is_selected = i == index;
        }
    }

    pub fn clear_selection(&mut self) {
        for entry in &mut self.entries {
            entry.item.is_selected = false;
        }
    }
}
