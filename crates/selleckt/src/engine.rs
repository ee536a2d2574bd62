//! The synchronization engine.
//!
//! [`SingleSelleckt`] keeps a native `<select>`, its [`ItemModel`] and the
//! rendered widget consistent. Every operation follows the same shape:
//! borrow the widget state and the document, update the model, reconcile the
//! native element and the rendered nodes, then release both borrows and
//! deliver the collected effects (native `change`, signals). Observers may
//! therefore call back into the widget from any signal.

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;

use selleckt_core::logging::targets;
use selleckt_core::{Signal, TimerId};
use selleckt_dom::{
    select, Document, DomEvent, EventKind, EventTarget, Key, MutationRecord, NodeId, ObserverId,
    Page,
};

use crate::config::SellecktConfig;
use crate::error::{ConfigurationError, Result};
use crate::item::{Item, ItemModel};
use crate::layout::{self, LayoutInput, Placement, Positioning, ScrollParent};
use crate::matcher::{self, highlight_markup};
use crate::template::TemplateSet;

type DomResult<T> = selleckt_dom::Result<T>;

/// Data key under which the native select records the widget id.
pub const DATA_KEY: &str = "selleckt";
/// Namespace of the listener on the native select's `change` event.
pub const CHANGE_NAMESPACE: &str = "selleckt";
/// Origin tag on `change` events the widget fires itself.
pub const CHANGE_ORIGIN: &str = "selleckt";

pub const OPEN_CLASS: &str = "open";
pub const CLOSED_CLASS: &str = "closed";
pub const FLIPPED_CLASS: &str = "flipped";

const ROOT_EVENTS: [EventKind; 4] = [
    EventKind::Click,
    EventKind::MouseOver,
    EventKind::KeyDown,
    EventKind::KeyUp,
];

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// What [`SingleSelleckt::select_item`] should select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectTarget {
    /// The first item with this value.
    Value(String),
    /// The first item with this item's value.
    Item(Item),
    /// No item; the placeholder shows.
    Clear,
}

impl From<&str> for SelectTarget {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for SelectTarget {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<Item> for SelectTarget {
    fn from(item: Item) -> Self {
        Self::Item(item)
    }
}

impl From<&Item> for SelectTarget {
    fn from(item: &Item) -> Self {
        Self::Item(item.clone())
    }
}

/// Who asked for a selection change, which decides its side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// The widget API or user interaction: write the native select and fire `change`.
    Widget,
    /// An external `change` on the native select: emit signals only.
    NativeChange,
    /// Reconciling after option mutations: no side effects.
    Mutation,
}

/// Effects delivered after the state borrow is released.
#[derive(Debug, Default)]
struct Effects {
    fire_change: bool,
    item_selected: Option<Item>,
    closed: bool,
    filtered: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct RenderedNodes {
    root: NodeId,
    selected: NodeId,
    selected_text: Option<NodeId>,
    items: NodeId,
    /// Container new item nodes are appended to.
    list: NodeId,
    search: Option<NodeId>,
}

struct State {
    model: ItemModel,
    open: bool,
    search_term: String,
    /// Index into the visible items.
    highlighted: Option<usize>,
    nodes: Option<RenderedNodes>,
    original_display: Option<String>,
    scrolling_parent: ScrollParent,
    overflow_hidden_parent: Option<NodeId>,
    scroll_listener: Option<EventTarget>,
    observer: Option<ObserverId>,
    search_timer: Option<TimerId>,
    destroyed: bool,
}

struct Inner {
    id: u64,
    page: Page,
    select: NodeId,
    config: SellecktConfig,
    templates: TemplateSet,
    state: RefCell<State>,
    item_selected: Signal<Item>,
    closed: Signal<()>,
    options_filtered: Signal<String>,
}

enum ClickAction {
    Item(usize),
    Trigger,
}

/// A single-select dropdown bound to a native `<select>`.
///
/// The handle is cheap to clone; all clones refer to the same widget.
///
/// # Example
///
/// ```
/// use selleckt::{SellecktConfig, SingleSelleckt};
/// use selleckt_dom::Page;
///
/// let page = Page::from_html(
///     r#"<select><option value="1" selected>foo</option><option value="2">bar</option></select>"#,
/// ).unwrap();
/// let select_node = {
///     let doc = page.document();
///     doc.query_selector(doc.body(), "select").unwrap().unwrap()
/// };
///
/// let widget = SingleSelleckt::new(&page, select_node, SellecktConfig::default()).unwrap();
/// widget.item_selected().connect(|item| println!("selected {}", item.label));
///
/// widget.select_item("2");
/// assert_eq!(widget.get_selection().as_deref(), Some("2"));
/// ```
#[derive(Clone)]
pub struct SingleSelleckt {
    inner: Rc<Inner>,
}

/// Non-owning handle to a widget, held by its event listeners.
#[derive(Clone)]
pub struct WeakSelleckt {
    inner: Weak<Inner>,
}

impl WeakSelleckt {
    pub fn upgrade(&self) -> Option<SingleSelleckt> {
        self.inner.upgrade().map(|inner| SingleSelleckt { inner })
    }
}

impl fmt::Debug for SingleSelleckt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SingleSelleckt")
            .field("id", &self.inner.id)
            .field("select", &self.inner.select)
            .field("items", &state.model.len())
            .field("open", &state.open)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

impl SingleSelleckt {
    /// Replace a native select with a widget.
    ///
    /// Fails with a [`ConfigurationError`] when a template does not compile,
    /// the rendered markup lacks the selected or items region, or the node is
    /// not a `<select>`. Nothing is attached to the page on failure.
    pub fn new(page: &Page, select_node: NodeId, config: SellecktConfig) -> Result<Self> {
        let templates = TemplateSet::from_config(&config)?;

        if page.document().tag_name(select_node) != Some("select") {
            return Err(ConfigurationError::NotASelect.into());
        }
        if let Some(items) = &config.items {
            replace_options(&mut page.document_mut(), select_node, items)?;
        }
        let (model, original_display) = {
            let doc = page.document();
            (
                ItemModel::from_select(&doc, select_node),
                doc.style(select_node, "display"),
            )
        };

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let widget = Self {
            inner: Rc::new(Inner {
                id,
                page: page.clone(),
                select: select_node,
                config,
                templates,
                state: RefCell::new(State {
                    model,
                    open: false,
                    search_term: String::new(),
                    highlighted: None,
                    nodes: None,
                    original_display,
                    scrolling_parent: ScrollParent::Window,
                    overflow_hidden_parent: None,
                    scroll_listener: None,
                    observer: None,
                    search_timer: None,
                    destroyed: false,
                }),
                item_selected: Signal::new(),
                closed: Signal::new(),
                options_filtered: Signal::new(),
            }),
        };

        {
            let mut state = widget.inner.state.borrow_mut();
            let mut doc = page.document_mut();
            widget.inner.render_into(&mut state, &mut doc)?;
            doc.set_style(select_node, "display", "none")?;
            doc.set_data(select_node, DATA_KEY, &id.to_string())?;
        }
        widget.attach_listeners();

        tracing::debug!(
            target: targets::ENGINE,
            id,
            items = widget.inner.state.borrow().model.len(),
            "widget created"
        );
        Ok(widget)
    }

    /// Build a widget from a JSON configuration document.
    pub fn from_json(page: &Page, select_node: NodeId, config: Value) -> Result<Self> {
        Self::new(page, select_node, SellecktConfig::from_value(config)?)
    }

    pub fn downgrade(&self) -> WeakSelleckt {
        WeakSelleckt {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Unique id of this widget; listener namespaces are derived from it.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Namespace of the listeners this widget attaches to its own nodes,
    /// the document and the scrolling parent.
    pub fn namespace(&self) -> String {
        self.inner.namespace()
    }

    pub fn config(&self) -> &SellecktConfig {
        &self.inner.config
    }

    pub fn page(&self) -> &Page {
        &self.inner.page
    }

    /// The native select this widget mirrors.
    pub fn select_node(&self) -> NodeId {
        self.inner.select
    }

    pub fn placeholder_text(&self) -> &str {
        &self.inner.config.placeholder_text
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }

    /// Value of the selected item.
    pub fn get_selection(&self) -> Option<String> {
        self.state().model.selected().map(|item| item.value.clone())
    }

    pub fn selected_item(&self) -> Option<Item> {
        self.state().model.selected().cloned()
    }

    /// The first item with `value`.
    pub fn find_item(&self, value: &str) -> Option<Item> {
        self.state().model.find(value).cloned()
    }

    /// All items in order.
    pub fn items(&self) -> Vec<Item> {
        self.state().model.items()
    }

    /// The current search term.
    pub fn search_term(&self) -> String {
        self.state().search_term.clone()
    }

    /// Index of the highlighted item among the visible ones.
    pub fn highlighted_index(&self) -> Option<usize> {
        self.state().highlighted
    }

    pub fn scrolling_parent(&self) -> ScrollParent {
        self.state().scrolling_parent
    }

    pub fn overflow_hidden_parent(&self) -> Option<NodeId> {
        self.state().overflow_hidden_parent
    }

    pub fn root(&self) -> Option<NodeId> {
        self.state().nodes.map(|n| n.root)
    }

    /// The selected-display region that opens the panel.
    pub fn selected_node(&self) -> Option<NodeId> {
        self.state().nodes.map(|n| n.selected)
    }

    pub fn selected_text_node(&self) -> Option<NodeId> {
        self.state().nodes.and_then(|n| n.selected_text)
    }

    /// The options panel.
    pub fn items_node(&self) -> Option<NodeId> {
        self.state().nodes.map(|n| n.items)
    }

    pub fn search_input_node(&self) -> Option<NodeId> {
        self.state().nodes.and_then(|n| n.search)
    }

    /// The rendered node of the first item with `value`.
    pub fn item_node(&self, value: &str) -> Option<NodeId> {
        let state = self.state();
        state
            .model
            .position(value)
            .and_then(|index| state.model.rendered(index))
    }

    /// The view-model handed to the main template.
    pub fn template_data(&self) -> Value {
        self.inner.template_data(&self.state())
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Emitted with the newly selected item.
    pub fn item_selected(&self) -> &Signal<Item> {
        &self.inner.item_selected
    }

    /// Emitted on every transition from open to closed.
    pub fn closed(&self) -> &Signal<()> {
        &self.inner.closed
    }

    /// Emitted with the raw term after filtering.
    pub fn options_filtered(&self) -> &Signal<String> {
        &self.inner.options_filtered
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Select an item by value, or clear the selection.
    ///
    /// Values that match no item are ignored, as is re-selecting the current
    /// item. A change fires one tagged `change` event on the native select.
    pub fn select_item(&self, target: impl Into<SelectTarget>) {
        let target = target.into();
        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }
            let mut doc = self.inner.page.document_mut();
            let value = match &target {
                SelectTarget::Value(value) => Some(value.as_str()),
                SelectTarget::Item(item) => Some(item.value.as_str()),
                SelectTarget::Clear => None,
            };
            let result = match value {
                None => self.inner.clear_selection(
                    &mut state,
                    &mut doc,
                    Origin::Widget,
                    &mut effects,
                ),
                Some(value) => match state.model.position(value) {
                    Some(index) => self.inner.select_index(
                        &mut state,
                        &mut doc,
                        index,
                        Origin::Widget,
                        &mut effects,
                    ),
                    None => {
                        tracing::debug!(target: targets::ENGINE, id = self.inner.id, value, "no item to select");
                        Ok(())
                    }
                },
            };
            self.inner.log_failure("select item", result);
        }
        self.flush(effects);
    }

    /// Append one item to the model and the native select.
    ///
    /// The rendered list picks it up when the page next delivers mutations.
    pub fn add_item(&self, item: Item) {
        self.add_items(std::iter::once(item));
    }

    /// Append items in order. A selected item becomes the selection.
    pub fn add_items(&self, items: impl IntoIterator<Item = Item>) {
        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }
            let mut doc = self.inner.page.document_mut();
            for item in items {
                let result = self.inner.append_item(&mut state, &mut doc, item, &mut effects);
                self.inner.log_failure("add item", result);
            }
        }
        self.flush(effects);
    }

    /// Remove the first item with `value` and its native option.
    ///
    /// Removing the selected item clears the selection without emitting
    /// `item_selected`.
    pub fn remove_item(&self, value: &str) {
        let mut state = self.inner.state.borrow_mut();
        if state.destroyed {
            return;
        }
        let Some(index) = state.model.position(value) else {
            return;
        };
        let mut doc = self.inner.page.document_mut();
        let result = self.inner.remove_index(&mut state, &mut doc, index);
        self.inner.log_failure("remove item", result);
    }

    /// Show only items whose label contains `term`, highlighting the match.
    pub fn filter_options(&self, term: &str) {
        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.search_term = term.to_string();
            state.highlighted = None;
            let mut doc = self.inner.page.document_mut();
            let result = self.inner.apply_items(&state, &mut doc);
            self.inner.log_failure("filter options", result);
            effects.filtered = Some(term.to_string());
        }
        tracing::debug!(target: targets::ENGINE, id = self.inner.id, term, "options filtered");
        self.flush(effects);
    }

    /// Rebuild the widget markup from the current state.
    ///
    /// An open widget closes first.
    pub fn render(&self) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        self.close();
        let previous_root = {
            let mut state = self.inner.state.borrow_mut();
            let mut doc = self.inner.page.document_mut();
            self.inner.render_into(&mut state, &mut doc)?
        };
        if let Some(previous_root) = previous_root {
            let namespace = self.inner.namespace();
            for kind in ROOT_EVENTS {
                self.inner.page.off(previous_root, kind, Some(&namespace));
            }
        }
        self.attach_root_listeners();
        Ok(())
    }

    /// Show the options panel.
    pub fn open(&self) {
        let (placement, scroll_target) = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed || state.open {
                return;
            }
            let Some(nodes) = state.nodes else {
                return;
            };
            let mut doc = self.inner.page.document_mut();
            match self.inner.enter_open(&mut state, &mut doc, nodes) {
                Ok(placement) => {
                    let scroll_target = (placement.positioning == Positioning::Fixed)
                        .then(|| EventTarget::from(state.scrolling_parent));
                    state.scroll_listener = scroll_target;
                    (placement, scroll_target)
                }
                Err(err) => {
                    tracing::warn!(target: targets::ENGINE, id = self.inner.id, %err, "failed to open");
                    return;
                }
            }
        };

        let namespace = self.inner.namespace();
        let weak = self.downgrade();
        self.inner.page.on(
            EventTarget::Document,
            EventKind::Click,
            Some(&namespace),
            move |_, event| {
                if let Some(widget) = weak.upgrade() {
                    widget.handle_document_click(event);
                }
            },
        );
        if let Some(target) = scroll_target {
            let weak = self.downgrade();
            self.inner
                .page
                .on(target, EventKind::Scroll, Some(&namespace), move |_, _| {
                    if let Some(widget) = weak.upgrade() {
                        widget.close();
                    }
                });
        }

        tracing::debug!(
            target: targets::ENGINE,
            id = self.inner.id,
            positioning = placement.positioning.as_css(),
            flipped = placement.flipped,
            "opened"
        );
    }

    /// Hide the options panel. Does nothing when already closed.
    pub fn close(&self) {
        let mut effects = Effects::default();
        let (scroll_target, timer) = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed || !state.open {
                return;
            }
            let mut doc = self.inner.page.document_mut();
            let result = self.inner.enter_closed(&mut state, &mut doc);
            self.inner.log_failure("close", result);
            effects.closed = true;
            (state.scroll_listener.take(), state.search_timer.take())
        };

        let namespace = self.inner.namespace();
        self.inner
            .page
            .off(EventTarget::Document, EventKind::Click, Some(&namespace));
        if let Some(target) = scroll_target {
            self.inner.page.off(target, EventKind::Scroll, Some(&namespace));
        }
        self.stop_timer(timer);

        tracing::debug!(target: targets::ENGINE, id = self.inner.id, "closed");
        self.flush(effects);
    }

    /// Tear the widget down and give the page back its native select.
    ///
    /// Safe to call more than once.
    pub fn destroy(&self) {
        let (observer, timer) = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.open = false;
            state.scroll_listener = None;

            let mut doc = self.inner.page.document_mut();
            if let Some(nodes) = state.nodes.take()
                && doc.exists(nodes.root)
            {
                let result = doc.remove(nodes.root);
                self.inner.log_failure("remove widget markup", result);
            }
            state.model.clear_rendered();

            let select_node = self.inner.select;
            let result = match state.original_display.take() {
                Some(display) => doc.set_style(select_node, "display", &display),
                None => doc.remove_style(select_node, "display"),
            };
            self.inner.log_failure("restore display", result);
            let result = doc.remove_data(select_node, DATA_KEY).map(|_| ());
            self.inner.log_failure("clear back-reference", result);

            (state.observer.take(), state.search_timer.take())
        };

        if let Some(observer) = observer {
            self.inner.page.disconnect_observer(observer);
        }
        self.stop_timer(timer);
        self.inner.page.off(
            self.inner.select,
            EventKind::Change,
            Some(CHANGE_NAMESPACE),
        );
        self.inner.page.off_namespace(&self.inner.namespace());

        tracing::debug!(target: targets::ENGINE, id = self.inner.id, "destroyed");
    }

    // =========================================================================
    // Event handling
    // =========================================================================

    fn attach_listeners(&self) {
        let weak = self.downgrade();
        self.inner.page.on(
            self.inner.select,
            EventKind::Change,
            Some(CHANGE_NAMESPACE),
            move |_, event| {
                if let Some(widget) = weak.upgrade() {
                    widget.handle_native_change(event);
                }
            },
        );

        self.attach_root_listeners();

        let weak = self.downgrade();
        let observer = self.inner.page.observe(self.inner.select, move |_, records| {
            if let Some(widget) = weak.upgrade() {
                widget.handle_mutations(records);
            }
        });
        self.inner.state.borrow_mut().observer = Some(observer);
    }

    fn attach_root_listeners(&self) {
        let Some(root) = self.root() else {
            return;
        };
        let namespace = self.inner.namespace();
        for kind in ROOT_EVENTS {
            let weak = self.downgrade();
            self.inner.page.on(root, kind, Some(&namespace), move |_, event| {
                if let Some(widget) = weak.upgrade() {
                    widget.handle_root_event(event);
                }
            });
        }
    }

    fn handle_root_event(&self, event: &DomEvent) {
        if self.is_destroyed() {
            return;
        }
        match event.kind {
            EventKind::Click => self.handle_click(event),
            EventKind::MouseOver => self.handle_mouse_over(event),
            EventKind::KeyDown => self.handle_key_down(event),
            EventKind::KeyUp => self.handle_key_up(event),
            _ => {}
        }
    }

    fn handle_click(&self, event: &DomEvent) {
        let Some(target) = event.target_node() else {
            return;
        };
        let action = {
            let state = self.state();
            let Some(nodes) = state.nodes else {
                return;
            };
            let doc = self.inner.page.document();
            if doc.contains(nodes.items, target) {
                self.inner
                    .item_index_at(&state, &doc, target)
                    .map(ClickAction::Item)
            } else if doc.contains(nodes.selected, target) {
                Some(ClickAction::Trigger)
            } else {
                None
            }
        };

        match action {
            Some(ClickAction::Item(index)) => self.activate(index),
            Some(ClickAction::Trigger) => self.open(),
            None => {}
        }
    }

    fn handle_mouse_over(&self, event: &DomEvent) {
        let Some(target) = event.target_node() else {
            return;
        };
        let mut state = self.inner.state.borrow_mut();
        let mut doc = self.inner.page.document_mut();
        let Some(index) = self.inner.item_index_at(&state, &doc, target) else {
            return;
        };
        let Some(position) = self
            .inner
            .visible_indices(&state)
            .iter()
            .position(|i| *i == index)
        else {
            return;
        };
        if state.highlighted != Some(position) {
            state.highlighted = Some(position);
            let result = self.inner.apply_highlight(&state, &mut doc);
            self.inner.log_failure("highlight", result);
        }
    }

    fn handle_key_down(&self, event: &DomEvent) {
        match event.key {
            Some(Key::ArrowDown) => self.move_highlight(true),
            Some(Key::ArrowUp) => self.move_highlight(false),
            Some(Key::Enter) => {
                if !self.is_open() {
                    self.open();
                    return;
                }
                let highlighted = {
                    let state = self.state();
                    state
                        .highlighted
                        .and_then(|h| self.inner.visible_indices(&state).get(h).copied())
                };
                if let Some(index) = highlighted {
                    self.activate(index);
                }
            }
            _ => {}
        }
    }

    fn handle_key_up(&self, event: &DomEvent) {
        match event.key {
            Some(Key::Escape) => self.close(),
            Some(Key::ArrowDown | Key::ArrowUp | Key::Enter) | None => {}
            Some(_) => {
                let search = self.search_input_node();
                if search.is_some() && event.target_node() == search {
                    self.schedule_filter();
                }
            }
        }
    }

    fn handle_document_click(&self, event: &DomEvent) {
        let Some(root) = self.root() else {
            return;
        };
        if let Some(target) = event.target_node()
            && self.inner.page.document().contains(root, target)
        {
            return;
        }
        self.close();
    }

    fn handle_native_change(&self, event: &DomEvent) {
        if event.origin.as_deref() == Some(CHANGE_ORIGIN) {
            tracing::trace!(target: targets::ENGINE, id = self.inner.id, "ignoring own change event");
            return;
        }

        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                return;
            }
            let mut doc = self.inner.page.document_mut();
            let result = self.inner.adopt_native_selection(
                &mut state,
                &mut doc,
                Origin::NativeChange,
                &mut effects,
            );
            self.inner.log_failure("reconcile native change", result);
        }
        self.flush(effects);
    }

    fn handle_mutations(&self, records: &[MutationRecord]) {
        let mut state = self.inner.state.borrow_mut();
        if state.destroyed {
            return;
        }
        let mut doc = self.inner.page.document_mut();
        let result = self.inner.reconcile_mutations(&mut state, &mut doc, records);
        self.inner.log_failure("reconcile option mutations", result);
    }

    /// Select an item as a click on it would: select, close, refocus the root.
    fn activate(&self, index: usize) {
        let root = {
            let state = self.state();
            if state.model.selected_index() == Some(index) {
                return;
            }
            state.nodes.map(|n| n.root)
        };

        let mut effects = Effects::default();
        {
            let mut state = self.inner.state.borrow_mut();
            let mut doc = self.inner.page.document_mut();
            let result =
                self.inner
                    .select_index(&mut state, &mut doc, index, Origin::Widget, &mut effects);
            self.inner.log_failure("select item", result);
        }
        self.flush(effects);
        self.close();

        if let Some(root) = root {
            self.inner.page.focus(root);
        }
    }

    fn move_highlight(&self, forward: bool) {
        let mut state = self.inner.state.borrow_mut();
        if state.destroyed || !state.open {
            return;
        }
        let visible = self.inner.visible_indices(&state).len();
        if visible == 0 {
            return;
        }
        let next = match (state.highlighted, forward) {
            (None, true) => Some(0),
            (None, false) => None,
            (Some(i), true) => Some((i + 1).min(visible - 1)),
            (Some(i), false) => Some(i.saturating_sub(1)),
        };
        if next == state.highlighted {
            return;
        }
        state.highlighted = next;
        let mut doc = self.inner.page.document_mut();
        let result = self.inner.apply_highlight(&state, &mut doc);
        self.inner.log_failure("highlight", result);
    }

    fn schedule_filter(&self) {
        let previous = self.inner.state.borrow_mut().search_timer.take();
        self.stop_timer(previous);

        let weak = self.downgrade();
        let delay = Duration::from_millis(self.inner.config.search_debounce_ms);
        let timer = self.inner.page.event_loop().start_timer(delay, move || {
            if let Some(widget) = weak.upgrade() {
                widget.run_scheduled_filter();
            }
        });
        self.inner.state.borrow_mut().search_timer = Some(timer);
    }

    fn run_scheduled_filter(&self) {
        let term = {
            let mut state = self.inner.state.borrow_mut();
            state.search_timer = None;
            if state.destroyed {
                return;
            }
            let Some(search) = state.nodes.and_then(|n| n.search) else {
                return;
            };
            let doc = self.inner.page.document();
            let term = doc.value(search).unwrap_or_default().to_string();
            if !state.open || term == state.search_term {
                return;
            }
            term
        };
        self.filter_options(&term);
    }

    fn stop_timer(&self, timer: Option<TimerId>) {
        if let Some(timer) = timer
            && let Err(err) = self.inner.page.event_loop().stop_timer(timer)
        {
            tracing::trace!(target: targets::ENGINE, id = self.inner.id, %err, "search timer already gone");
        }
    }

    fn flush(&self, effects: Effects) {
        if effects.fire_change {
            self.inner.page.change(self.inner.select, Some(CHANGE_ORIGIN));
        }
        if let Some(item) = effects.item_selected {
            self.inner.item_selected.emit(item);
        }
        if effects.closed {
            self.inner.closed.emit(());
        }
        if let Some(term) = effects.filtered {
            self.inner.options_filtered.emit(term);
        }
    }

    fn state(&self) -> Ref<'_, State> {
        self.inner.state.borrow()
    }
}

/// Rebuild a select's options from caller-supplied items.
///
/// Only the first item marked selected is selected natively.
fn replace_options(doc: &mut Document, select_node: NodeId, items: &[Item]) -> DomResult<()> {
    doc.remove_children(select_node)?;
    let mut selected = false;
    for item in items {
        let option = new_option(doc, item)?;
        doc.append_child(select_node, option)?;
        if item.is_selected && !selected {
            doc.set_selected(option, true)?;
            selected = true;
        }
    }
    Ok(())
}

/// A detached `<option>` mirroring `item`.
fn new_option(doc: &mut Document, item: &Item) -> DomResult<NodeId> {
    let attrs = item.option_attrs();
    let attrs: Vec<(&str, &str)> = attrs
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    let option = doc.create_element_with_attrs("option", &attrs);
    doc.set_text_content(option, &item.label)?;
    Ok(option)
}

impl Inner {
    fn namespace(&self) -> String {
        format!("selleckt-{}", self.id)
    }

    fn log_failure(&self, action: &str, result: DomResult<()>) {
        if let Err(err) = result {
            tracing::warn!(target: targets::ENGINE, id = self.id, action, %err, "document operation failed");
        }
    }

    fn template_data(&self, state: &State) -> Value {
        let config = &self.config;
        let selected_text = state
            .model
            .selected()
            .map_or(config.placeholder_text.as_str(), |item| item.label.as_str());

        let mut data = config.main_template_data.clone();
        let computed: [(&str, Value); 11] = [
            (
                "items",
                Value::Array(state.model.iter().map(Item::to_view).collect()),
            ),
            (
                "showSearch",
                Value::Bool(config.enable_search && state.model.len() > config.search_threshold),
            ),
            ("selectedItemText", selected_text.into()),
            ("className", config.class_name.as_str().into()),
            ("selectedClass", config.selected_class.as_str().into()),
            ("selectedTextClass", config.selected_text_class.as_str().into()),
            ("itemsClass", config.items_class.as_str().into()),
            ("itemslistClass", config.itemslist_class.as_str().into()),
            ("itemClass", config.item_class.as_str().into()),
            ("itemTextClass", config.item_text_class.as_str().into()),
            ("searchInputClass", config.search_input_class.as_str().into()),
        ];
        for (key, value) in computed {
            data.insert(key.to_string(), value);
        }
        Value::Object(data)
    }

    /// Render the main template and swap it in after the native select.
    ///
    /// Returns the root it replaced.
    fn render_into(&self, state: &mut State, doc: &mut Document) -> Result<Option<NodeId>> {
        let view = self.template_data(state);
        let markup = self.templates.render_main(&view);
        let fragment = doc
            .parse_fragment(&markup)
            .map_err(ConfigurationError::Markup)?;
        let Some(root) = fragment.iter().copied().find(|n| doc.element(*n).is_some()) else {
            return Err(ConfigurationError::MissingElement {
                class: self.config.class_name.clone(),
            }
            .into());
        };
        for node in fragment {
            if node != root {
                doc.remove(node)?;
            }
        }

        let nodes = match self.locate_nodes(doc, root) {
            Ok(nodes) => nodes,
            Err(err) => {
                doc.remove(root)?;
                return Err(err.into());
            }
        };

        doc.insert_after(self.select, root)?;
        let previous = state.nodes.replace(nodes).map(|n| n.root);
        if let Some(previous) = previous
            && doc.exists(previous)
        {
            doc.remove(previous)?;
        }

        state.model.clear_rendered();
        let item_nodes: Vec<NodeId> = doc
            .descendants(nodes.items)
            .into_iter()
            .filter(|n| doc.has_class(*n, &self.config.item_class))
            .collect();
        for (index, node) in item_nodes.into_iter().take(state.model.len()).enumerate() {
            state.model.set_rendered(index, Some(node));
        }

        doc.toggle_class(root, CLOSED_CLASS, true)?;
        doc.toggle_class(root, OPEN_CLASS, false)?;
        state.highlighted = None;
        self.apply_items(state, doc)?;

        state.scrolling_parent = layout::scrolling_parent(doc, root);
        state.overflow_hidden_parent = layout::overflow_hidden_parent(doc, root);

        tracing::debug!(target: targets::ENGINE, id = self.id, "rendered");
        Ok(previous)
    }

    fn locate_nodes(
        &self,
        doc: &Document,
        root: NodeId,
    ) -> std::result::Result<RenderedNodes, ConfigurationError> {
        let find = |scope: NodeId, class: &str| {
            std::iter::once(scope)
                .chain(doc.descendants(scope))
                .find(|n| doc.has_class(*n, class))
        };
        let missing = |class: &str| ConfigurationError::MissingElement {
            class: class.to_string(),
        };
        let config = &self.config;

        let selected = doc
            .descendants(root)
            .into_iter()
            .find(|n| doc.has_class(*n, &config.selected_class))
            .ok_or_else(|| missing(&config.selected_class))?;
        let items = doc
            .descendants(root)
            .into_iter()
            .find(|n| doc.has_class(*n, &config.items_class))
            .ok_or_else(|| missing(&config.items_class))?;

        Ok(RenderedNodes {
            root,
            selected,
            selected_text: find(selected, &config.selected_text_class),
            items,
            list: find(items, &config.itemslist_class).unwrap_or(items),
            search: find(root, &config.search_input_class),
        })
    }

    /// Model indices of the items currently shown in the list.
    fn visible_indices(&self, state: &State) -> Vec<usize> {
        state
            .model
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                !item.is_selected && matcher::label_matches(&item.label, &state.search_term)
            })
            .map(|(index, _)| index)
            .collect()
    }

    fn item_index_at(&self, state: &State, doc: &Document, node: NodeId) -> Option<usize> {
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .find_map(|n| state.model.position_of_rendered(n))
    }

    /// Apply visibility, match highlighting and the keyboard highlight to item nodes.
    fn apply_items(&self, state: &State, doc: &mut Document) -> DomResult<()> {
        let term = state.search_term.as_str();
        let matches = matcher::find_matches(state.model.iter(), term);

        for (index, matched) in matches.iter().enumerate() {
            let Some(node) = state.model.rendered(index).filter(|n| doc.exists(*n)) else {
                continue;
            };
            let visible = !matched.item.is_selected && (term.is_empty() || matched.is_match());
            if visible {
                doc.remove_style(node, "display")?;
            } else {
                doc.set_style(node, "display", "none")?;
            }

            let holder = doc
                .descendants(node)
                .into_iter()
                .find(|n| doc.has_class(*n, &self.config.item_text_class))
                .unwrap_or(node);
            if !term.is_empty() {
                doc.set_inner_html(holder, &highlight_markup(&matched.item.label, matched.span))?;
            } else if doc
                .descendants(holder)
                .iter()
                .any(|n| doc.tag_name(*n) == Some("mark"))
            {
                doc.set_text_content(holder, &matched.item.label)?;
            }
        }

        self.apply_highlight(state, doc)
    }

    fn apply_highlight(&self, state: &State, doc: &mut Document) -> DomResult<()> {
        let highlighted = state
            .highlighted
            .and_then(|h| self.visible_indices(state).get(h).copied())
            .and_then(|index| state.model.rendered(index));

        for index in 0..state.model.len() {
            if let Some(node) = state.model.rendered(index)
                && doc.exists(node)
            {
                doc.toggle_class(
                    node,
                    &self.config.highlight_class,
                    Some(node) == highlighted,
                )?;
            }
        }
        Ok(())
    }

    fn apply_selected_text(&self, state: &State, doc: &mut Document) -> DomResult<()> {
        let Some(nodes) = state.nodes else {
            return Ok(());
        };
        let text = state
            .model
            .selected()
            .map_or(self.config.placeholder_text.as_str(), |item| item.label.as_str());
        doc.set_text_content(nodes.selected_text.unwrap_or(nodes.selected), text)
    }

    fn select_index(
        &self,
        state: &mut State,
        doc: &mut Document,
        index: usize,
        origin: Origin,
        effects: &mut Effects,
    ) -> DomResult<()> {
        if state.model.selected_index() == Some(index) {
            return Ok(());
        }
        let Some(option) = state.model.option(index) else {
            return Ok(());
        };

        state.model.select(index);
        if origin == Origin::Widget {
            select::set_selected_option(doc, self.select, Some(option))?;
            effects.fire_change = true;
        }
        state.highlighted = None;
        self.apply_selected_text(state, doc)?;
        self.apply_items(state, doc)?;

        if origin != Origin::Mutation {
            effects.item_selected = state.model.get(index).cloned();
        }
        tracing::debug!(
            target: targets::ENGINE,
            id = self.id,
            index,
            ?origin,
            "item selected"
        );
        Ok(())
    }

    fn clear_selection(
        &self,
        state: &mut State,
        doc: &mut Document,
        origin: Origin,
        effects: &mut Effects,
    ) -> DomResult<()> {
        if state.model.selected_index().is_none() {
            return Ok(());
        }

        state.model.clear_selection();
        if origin == Origin::Widget {
            select::set_selected_option(doc, self.select, None)?;
            effects.fire_change = true;
        }
        state.highlighted = None;
        self.apply_selected_text(state, doc)?;
        self.apply_items(state, doc)?;

        tracing::debug!(target: targets::ENGINE, id = self.id, ?origin, "selection cleared");
        Ok(())
    }

    /// Make the model's selection follow the native select's value.
    ///
    /// An empty or missing native value clears the selection.
    fn adopt_native_selection(
        &self,
        state: &mut State,
        doc: &mut Document,
        origin: Origin,
        effects: &mut Effects,
    ) -> DomResult<()> {
        let wanted = select::value(doc, self.select)
            .filter(|value| !value.is_empty())
            .and_then(|value| state.model.position(&value));
        match wanted {
            Some(index) => self.select_index(state, doc, index, origin, effects),
            None => self.clear_selection(state, doc, origin, effects),
        }
    }

    fn append_item(
        &self,
        state: &mut State,
        doc: &mut Document,
        item: Item,
        effects: &mut Effects,
    ) -> DomResult<()> {
        let option = new_option(doc, &item)?;
        doc.append_child(self.select, option)?;

        let selected = item.is_selected;
        tracing::debug!(target: targets::ENGINE, id = self.id, value = %item.value, "item added");
        state.model.push(item, option);
        state.highlighted = None;

        if selected {
            let index = state.model.len() - 1;
            self.select_index(state, doc, index, Origin::Widget, effects)?;
        }
        Ok(())
    }

    fn remove_index(&self, state: &mut State, doc: &mut Document, index: usize) -> DomResult<()> {
        let was_selected = state.model.selected_index() == Some(index);
        let Some((item, option, _)) = state.model.remove(index) else {
            return Ok(());
        };
        if doc.exists(option) {
            doc.remove(option)?;
        }
        state.highlighted = None;
        if was_selected {
            self.apply_selected_text(state, doc)?;
        }
        tracing::debug!(target: targets::ENGINE, id = self.id, value = %item.value, "item removed");
        Ok(())
    }

    fn enter_open(
        &self,
        state: &mut State,
        doc: &mut Document,
        nodes: RenderedNodes,
    ) -> DomResult<Placement> {
        state.open = true;
        state.search_term.clear();
        state.highlighted = None;
        if let Some(search) = nodes.search {
            doc.set_value(search, "")?;
        }
        self.apply_items(state, doc)?;
        doc.toggle_class(nodes.root, OPEN_CLASS, true)?;
        doc.toggle_class(nodes.root, CLOSED_CLASS, false)?;

        let clip = state
            .overflow_hidden_parent
            .filter(|n| doc.exists(*n))
            .map(|n| doc.rect(n));
        let placement = layout::resolve(LayoutInput {
            trigger: doc.rect(nodes.selected),
            panel: doc.rect(nodes.items),
            clip,
            viewport: doc.viewport(),
        });

        let items = nodes.items;
        doc.set_style(items, "position", placement.positioning.as_css())?;
        match placement.positioning {
            Positioning::Fixed => {
                doc.set_style(items, "top", &format!("{}px", placement.rect.top()))?;
                doc.set_style(items, "left", &format!("{}px", placement.rect.left()))?;
                doc.set_style(items, "width", &format!("{}px", placement.rect.width()))?;
            }
            Positioning::Absolute => {
                for property in ["top", "left", "width"] {
                    doc.remove_style(items, property)?;
                }
            }
        }
        doc.toggle_class(items, FLIPPED_CLASS, placement.flipped)?;
        doc.set_rect(items, placement.rect)?;

        tracing::trace!(target: targets::LAYOUT, id = self.id, ?placement, "panel placed");
        Ok(placement)
    }

    fn enter_closed(&self, state: &mut State, doc: &mut Document) -> DomResult<()> {
        state.open = false;
        state.search_term.clear();
        state.highlighted = None;

        let Some(nodes) = state.nodes else {
            return Ok(());
        };
        if let Some(search) = nodes.search {
            doc.set_value(search, "")?;
        }
        self.apply_items(state, doc)?;
        doc.toggle_class(nodes.items, FLIPPED_CLASS, false)?;
        doc.toggle_class(nodes.root, OPEN_CLASS, false)?;
        doc.toggle_class(nodes.root, CLOSED_CLASS, true)
    }

    /// Mirror child-list changes of the native select into the model and the list.
    fn reconcile_mutations(
        &self,
        state: &mut State,
        doc: &mut Document,
        records: &[MutationRecord],
    ) -> DomResult<()> {
        for record in records {
            for removed in &record.removed {
                if let Some(index) = state.model.position_of_option(*removed)
                    && let Some((item, _, rendered)) = state.model.remove(index)
                {
                    if let Some(node) = rendered
                        && doc.exists(node)
                    {
                        doc.remove(node)?;
                    }
                    tracing::debug!(target: targets::ENGINE, id = self.id, value = %item.value, "option removed externally");
                }
            }

            for added in &record.added {
                let options: Vec<NodeId> = std::iter::once(*added)
                    .chain(doc.descendants(*added))
                    .filter(|n| doc.tag_name(*n) == Some("option"))
                    .collect();
                for option in options {
                    if state.model.position_of_option(option).is_some()
                        || !doc.contains(self.select, option)
                    {
                        continue;
                    }
                    let position = select::options(doc, self.select)
                        .into_iter()
                        .take_while(|o| *o != option)
                        .filter(|o| state.model.position_of_option(*o).is_some())
                        .count();
                    let item = Item::from_option(doc, option);
                    tracing::debug!(target: targets::ENGINE, id = self.id, value = %item.value, position, "option added externally");
                    state.model.insert(position, item, option);
                }
            }
        }

        let mut quiet = Effects::default();
        self.adopt_native_selection(state, doc, Origin::Mutation, &mut quiet)?;
        self.patch_list(state, doc)?;
        state.highlighted = None;
        self.apply_selected_text(state, doc)?;
        self.apply_items(state, doc)
    }

    /// Make the rendered list mirror the model: drop stale nodes, render missing ones.
    fn patch_list(&self, state: &mut State, doc: &mut Document) -> DomResult<()> {
        let Some(nodes) = state.nodes else {
            return Ok(());
        };

        let referenced: HashSet<NodeId> = (0..state.model.len())
            .filter_map(|index| state.model.rendered(index))
            .collect();
        let stale: Vec<NodeId> = doc
            .descendants(nodes.items)
            .into_iter()
            .filter(|n| doc.has_class(*n, &self.config.item_class) && !referenced.contains(n))
            .collect();
        for node in stale {
            if doc.exists(node) {
                doc.remove(node)?;
            }
        }

        let view = self.template_data(state);
        for index in 0..state.model.len() {
            if state.model.rendered(index).is_some_and(|n| doc.exists(n)) {
                continue;
            }
            let Some(item) = state.model.get(index) else {
                continue;
            };
            let markup = self.templates.render_item(&view, &item.to_view());
            let fragment = doc.parse_fragment(&markup)?;
            let Some(node) = fragment.iter().copied().find(|n| doc.element(*n).is_some()) else {
                tracing::warn!(target: targets::ENGINE, id = self.id, index, "item template rendered no element");
                continue;
            };
            for other in fragment {
                if other != node {
                    doc.remove(other)?;
                }
            }

            let previous = (0..index)
                .rev()
                .find_map(|i| state.model.rendered(i))
                .filter(|n| doc.exists(*n));
            let next = (index + 1..state.model.len())
                .find_map(|i| state.model.rendered(i))
                .filter(|n| doc.exists(*n));
            match (previous, next.and_then(|n| doc.parent(n).map(|p| (p, n)))) {
                (Some(previous), _) => doc.insert_after(previous, node)?,
                (None, Some((parent, next))) => doc.insert_before(parent, node, Some(next))?,
                (None, None) => doc.append_child(nodes.list, node)?,
            }
            state.model.set_rendered(index, Some(node));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(markup: &str) -> (Page, SingleSelleckt) {
        let page = Page::from_html(markup).unwrap();
        let select_node = {
            let doc = page.document();
            doc.query_selector(doc.body(), "select").unwrap().unwrap()
        };
        let widget = SingleSelleckt::new(&page, select_node, SellecktConfig::default()).unwrap();
        (page, widget)
    }

    #[test]
    fn test_select_target_conversions() {
        assert_eq!(SelectTarget::from("a"), SelectTarget::Value("a".to_string()));
        assert_eq!(
            SelectTarget::from(String::from("b")),
            SelectTarget::Value("b".to_string())
        );
        let item = Item::new("c", "C");
        assert_eq!(SelectTarget::from(&item), SelectTarget::Item(item.clone()));
        assert_eq!(SelectTarget::from(item.clone()), SelectTarget::Item(item));
    }

    #[test]
    fn test_ids_and_namespaces_are_unique() {
        let (_, a) = widget("<select><option>a</option></select>");
        let (_, b) = widget("<select><option>b</option></select>");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.namespace(), format!("selleckt-{}", a.id()));
    }

    #[test]
    fn test_inserted_item_lands_between_neighbours() {
        let (page, widget) = widget(
            r#"<select><option value="1">one</option><option value="3">three</option></select>"#,
        );
        let select_node = widget.select_node();
        {
            let mut doc = page.document_mut();
            let last = select::options(&doc, select_node)[1];
            let option = doc.create_element_with_attrs("option", &[("value", "2")]);
            doc.set_text_content(option, "two").unwrap();
            doc.insert_before(select_node, option, Some(last)).unwrap();
        }
        page.run_until_idle();

        let doc = page.document();
        let one = widget.item_node("1").unwrap();
        let two = widget.item_node("2").unwrap();
        assert_eq!(doc.next_element_sibling(one), Some(two));
        assert_eq!(doc.attr(two, "data-text"), Some("two"));
    }

    #[test]
    fn test_stale_rendered_items_are_dropped() {
        let (page, widget) =
            widget(r#"<select><option value="1">one</option><option value="2">two</option></select>"#);
        let list = widget.items_node().unwrap();
        {
            let mut doc = page.document_mut();
            let stray = doc.create_element_with_attrs("li", &[("class", "item")]);
            let ul = doc.query_selector(list, "ul").unwrap().unwrap();
            doc.append_child(ul, stray).unwrap();
        }
        widget.remove_item("2");
        page.run_until_idle();

        let doc = page.document();
        assert_eq!(doc.query_selector_all(list, ".item").unwrap().len(), 1);
        assert_eq!(widget.item_node("1").map(|n| doc.exists(n)), Some(true));
    }

    #[test]
    fn test_empty_list_is_total() {
        let (page, widget) = widget("<select></select>");
        widget.open();
        let root = widget.root().unwrap();
        page.key_down(root, Key::ArrowDown);
        page.key_down(root, Key::Enter);
        widget.filter_options("x");
        widget.close();
        widget.close();
        assert_eq!(widget.highlighted_index(), None);
        assert_eq!(widget.get_selection(), None);
    }
}
