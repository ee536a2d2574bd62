//! Headless host document for Selleckt.
//!
//! Widgets in the `selleckt` crate manipulate this model instead of a
//! browser:
//!
//! - **Document**: an arena-backed node tree with attributes, classes,
//!   inline styles, form state and per-element geometry
//! - **Selectors**: CSS selector parsing and matching for queries
//! - **Page**: event listeners with bubbling dispatch, mutation observers
//!   and the event loop that delivers deferred work
//!
//! # Example
//!
//! ```
//! use selleckt_dom::{EventKind, EventTarget, Page};
//!
//! let page = Page::from_html(r#"<button class="go">Go</button>"#).unwrap();
//! let button = {
//!     let doc = page.document();
//!     doc.query_selector(doc.body(), ".go").unwrap().unwrap()
//! };
//!
//! page.on(EventTarget::Document, EventKind::Click, Some("demo"), |page, event| {
//!     let node = event.target_node().unwrap();
//!     page.document_mut().add_class(node, "pressed").unwrap();
//! });
//!
//! page.click(button);
//! assert!(page.document().has_class(button, "pressed"));
//! ```

mod document;
mod error;
pub mod events;
pub mod geometry;
mod html;
mod mutation;
mod node;
mod page;
pub mod select;
pub mod selector;
pub mod style;

pub use document::Document;
pub use error::{Error, Result};
pub use events::{DomEvent, EventKind, EventTarget, Key};
pub use geometry::Rect;
pub use mutation::{MutationRecord, ObserverId};
pub use node::{Element, Node, NodeId, NodeKind};
pub use page::{ListenerFn, ListenerId, ObserverFn, Page, WeakPage};
pub use style::InlineStyle;
