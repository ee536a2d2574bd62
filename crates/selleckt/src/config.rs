//! Widget configuration.
//!
//! Keys use camelCase so configuration documents read the same whether they
//! come from JSON or TOML:
//!
//! ```
//! use selleckt::SellecktConfig;
//!
//! let config = SellecktConfig::from_toml_str(r#"
//! enableSearch = true
//! searchThreshold = 5
//! placeholderText = "Pick one"
//! "#).unwrap();
//!
//! assert!(config.enable_search);
//! assert_eq!(config.class_name, "selleckt");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigurationError, TemplateKind};
use crate::item::Item;

/// Template used for the whole widget when none is configured.
pub const DEFAULT_MAIN_TEMPLATE: &str = concat!(
    r#"<div class="{{className}}" tabindex="1">"#,
    r#"<div class="{{selectedClass}}">"#,
    r#"<span class="{{selectedTextClass}}">{{selectedItemText}}</span><i class="icon-arrow-down"></i>"#,
    r#"</div>"#,
    r#"<div class="{{itemsClass}}">"#,
    r#"{{#showSearch}}<div class="searchContainer"><input class="{{searchInputClass}}"></div>{{/showSearch}}"#,
    r#"<ul class="{{itemslistClass}}">{{#items}}{{> item}}{{/items}}</ul>"#,
    r#"</div>"#,
    r#"</div>"#,
);

/// Template used for each item when none is configured.
pub const DEFAULT_ITEM_TEMPLATE: &str = concat!(
    r#"<li class="{{itemClass}}" data-text="{{label}}" data-value="{{value}}">"#,
    r#"<span class="{{itemTextClass}}">{{label}}</span>"#,
    r#"</li>"#,
);

/// Configuration for one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SellecktConfig {
    /// Mustache source for the whole widget.
    pub main_template: String,
    /// Mustache source for one item, also available as the `item` partial.
    pub item_template: String,
    /// Extra view-model keys. Keys the widget computes take precedence.
    pub main_template_data: Map<String, Value>,

    pub class_name: String,
    pub selected_class: String,
    pub selected_text_class: String,
    pub items_class: String,
    pub itemslist_class: String,
    pub item_class: String,
    pub item_text_class: String,
    pub highlight_class: String,
    pub search_input_class: String,

    pub enable_search: bool,
    /// The search box shows only when there are more items than this.
    pub search_threshold: usize,
    /// Shown when nothing is selected.
    pub placeholder_text: String,
    /// Delay between a keystroke in the search box and filtering.
    pub search_debounce_ms: u64,
    /// Items to show instead of the select's own options. The native options
    /// are rebuilt to match when the widget is created.
    pub items: Option<Vec<Item>>,
}

impl Default for SellecktConfig {
    fn default() -> Self {
        Self {
            main_template: DEFAULT_MAIN_TEMPLATE.to_string(),
            item_template: DEFAULT_ITEM_TEMPLATE.to_string(),
            main_template_data: Map::new(),
            class_name: "selleckt".to_string(),
            selected_class: "selected".to_string(),
            selected_text_class: "selectedText".to_string(),
            items_class: "items".to_string(),
            itemslist_class: "itemslist".to_string(),
            item_class: "item".to_string(),
            item_text_class: "itemText".to_string(),
            highlight_class: "highlighted".to_string(),
            search_input_class: "search".to_string(),
            enable_search: false,
            search_threshold: 0,
            placeholder_text: "Please select...".to_string(),
            search_debounce_ms: 10,
            items: None,
        }
    }
}

impl SellecktConfig {
    /// Build a configuration from a JSON value.
    ///
    /// Templates must be strings; anything else is rejected before the rest
    /// of the document is decoded.
    pub fn from_value(value: Value) -> Result<Self, ConfigurationError> {
        if let Some(object) = value.as_object() {
            for (key, kind) in [
                ("mainTemplate", TemplateKind::Main),
                ("itemTemplate", TemplateKind::Item),
            ] {
                if object.get(key).is_some_and(|v| !v.is_string()) {
                    return Err(ConfigurationError::TemplateNotString { template: kind });
                }
            }
        }
        serde_json::from_value(value).map_err(ConfigurationError::decode)
    }

    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigurationError> {
        let value: Value = serde_json::from_str(source).map_err(ConfigurationError::decode)?;
        Self::from_value(value)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigurationError> {
        let table: toml::Table = toml::from_str(source).map_err(ConfigurationError::decode)?;
        let value = serde_json::to_value(table).map_err(ConfigurationError::decode)?;
        Self::from_value(value)
    }

    /// Read a configuration file. `.toml` files are TOML; anything else is JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            _ => Self::from_json_str(&source),
        }
    }

    /// Set the main template using builder pattern.
    pub fn with_main_template(mut self, template: impl Into<String>) -> Self {
        self.main_template = template.into();
        self
    }

    /// Set the item template using builder pattern.
    pub fn with_item_template(mut self, template: impl Into<String>) -> Self {
        self.item_template = template.into();
        self
    }

    /// Enable the search box for lists longer than `threshold`.
    pub fn with_search(mut self, threshold: usize) -> Self {
        self.enable_search = true;
        self.search_threshold = threshold;
        self
    }

    /// Set the placeholder text using builder pattern.
    pub fn with_placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder_text = text.into();
        self
    }

    /// Supply the items up front using builder pattern.
    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items = Some(items.into_iter().collect());
        self
    }

    /// Add a caller view-model key using builder pattern.
    pub fn with_template_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.main_template_data.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = SellecktConfig::default();
        assert_eq!(config.class_name, "selleckt");
        assert_eq!(config.highlight_class, "highlighted");
        assert_eq!(config.placeholder_text, "Please select...");
        assert!(!config.enable_search);
        assert_eq!(config.search_debounce_ms, 10);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SellecktConfig::from_value(json!({
            "className": "sellecktTest",
            "itemslistClass": "options",
            "mainTemplateData": {"selectLabel": "Please selleckt"}
        }))
        .unwrap();
        assert_eq!(config.class_name, "sellecktTest");
        assert_eq!(config.itemslist_class, "options");
        assert_eq!(config.item_class, "item");
        assert_eq!(
            config.main_template_data.get("selectLabel"),
            Some(&json!("Please selleckt"))
        );
    }

    #[test]
    fn test_non_string_template_is_rejected() {
        let err = SellecktConfig::from_value(json!({"mainTemplate": {"template": "<div></div>"}}))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::TemplateNotString {
                template: TemplateKind::Main
            }
        ));
        assert_eq!(err.to_string(), "Please provide a valid mustache template.");

        let err = SellecktConfig::from_value(json!({"itemTemplate": 4})).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::TemplateNotString {
                template: TemplateKind::Item
            }
        ));
    }

    #[test]
    fn test_wrong_types_are_decode_errors() {
        let err = SellecktConfig::from_json_str(r#"{"enableSearch": "yes"}"#).unwrap_err();
        assert!(matches!(err, ConfigurationError::Decode(_)));
        assert!(SellecktConfig::from_json_str("{").is_err());
    }

    #[test]
    fn test_toml_template_table_is_rejected() {
        let err = SellecktConfig::from_toml_str("[mainTemplate]\ntemplate = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::TemplateNotString { .. }));
    }

    #[test]
    fn test_items_key() {
        let config = SellecktConfig::from_value(json!({
            "items": [
                {"value": "1", "label": "foo"},
                {"value": "2", "label": "bar", "isSelected": true, "data": {"meh": "x"}}
            ]
        }))
        .unwrap();
        let items = config.items.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[1].is_selected);
        assert_eq!(items[1].data.get("meh").map(String::as_str), Some("x"));
        assert!(SellecktConfig::default().items.is_none());
    }

    #[test]
    fn test_builders() {
        let config = SellecktConfig::default()
            .with_search(2)
            .with_placeholder("Pick")
            .with_template_data("required", false);
        assert!(config.enable_search);
        assert_eq!(config.search_threshold, 2);
        assert_eq!(config.placeholder_text, "Pick");
        assert_eq!(config.main_template_data.get("required"), Some(&json!(false)));
    }
}
