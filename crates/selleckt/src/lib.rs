//! Selleckt: a custom single-select dropdown kept in sync with a native `<select>`.
//!
//! A [`SingleSelleckt`] hides the native select, renders its own markup from
//! mustache templates right after it, and keeps three things consistent: the
//! native options, the widget's [`ItemModel`], and the rendered list.
//!
//! - Selecting in the widget writes the native select and fires one `change`
//!   event tagged with origin `"selleckt"`.
//! - An external `change` on the native select moves the widget's selection.
//! - Options added to or removed from the native select show up in the list
//!   on the next turn of the page's event loop.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use selleckt::{Item, SellecktConfig, SingleSelleckt};
//! use selleckt_dom::Page;
//!
//! let page = Page::from_html(r#"
//!     <select>
//!         <option value="1">foo</option>
//!         <option value="2">bar</option>
//!     </select>
//! "#).unwrap();
//! let select_node = {
//!     let doc = page.document();
//!     doc.query_selector(doc.body(), "select").unwrap().unwrap()
//! };
//!
//! let widget = SingleSelleckt::new(
//!     &page,
//!     select_node,
//!     SellecktConfig::default().with_placeholder("Pick one"),
//! ).unwrap();
//!
//! let picked = Rc::new(RefCell::new(Vec::new()));
//! let sink = picked.clone();
//! widget.item_selected().connect(move |item: &Item| sink.borrow_mut().push(item.value.clone()));
//!
//! widget.add_item(Item::new("3", "baz"));
//! page.run_until_idle();
//!
//! widget.select_item("3");
//! assert_eq!(*picked.borrow(), ["3"]);
//! assert_eq!(selleckt_dom::select::value(&page.document(), select_node).as_deref(), Some("3"));
//! ```
//!
//! # Modules
//!
//! - [`config`]: widget configuration, loadable from JSON or TOML
//! - [`item`]: items and the ordered item model
//! - [`matcher`]: case-insensitive label matching
//! - [`template`]: the mustache subset the widget renders with
//! - [`layout`]: panel placement
//! - [`engine`]: the widget itself

pub mod config;
pub mod engine;
mod error;
pub mod item;
pub mod layout;
pub mod matcher;
pub mod template;

pub use config::{SellecktConfig, DEFAULT_ITEM_TEMPLATE, DEFAULT_MAIN_TEMPLATE};
pub use engine::{SelectTarget, SingleSelleckt, WeakSelleckt};
pub use error::{ConfigurationError, Result, SellecktError, TemplateKind};
pub use item::{Item, ItemModel};
pub use layout::{LayoutInput, Placement, Positioning, ScrollParent};
pub use matcher::{find_matches, highlight_markup, MatchSpan, MatchedItem};
pub use template::{SyntaxError, Template, TemplateSet};
