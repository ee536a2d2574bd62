//! A page: one document, its event listeners, mutation observers and event loop.
//!
//! `Page` is a cheap clonable handle. Listener and observer callbacks receive
//! the page so they can read and modify the document; no document borrow is
//! held while a callback runs.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};
use std::time::Duration;

use slotmap::SlotMap;

use selleckt_core::logging::targets;
use selleckt_core::EventLoop;

use crate::error::Result;
use crate::events::{DomEvent, EventKind, EventTarget, Key};
use crate::mutation::{MutationRecord, ObserverId};
use crate::{Document, NodeId};

/// Callback type for event listeners.
pub type ListenerFn = Rc<dyn Fn(&Page, &DomEvent)>;

/// Callback type for mutation observers.
pub type ObserverFn = Rc<dyn Fn(&Page, &[MutationRecord])>;

/// Handle to a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    target: EventTarget,
    kind: EventKind,
    namespace: Option<String>,
    callback: ListenerFn,
}

struct Observer {
    target: NodeId,
    callback: ObserverFn,
}

struct PageInner {
    document: RefCell<Document>,
    event_loop: EventLoop,
    /// Registration order is dispatch order.
    listeners: RefCell<Vec<Listener>>,
    observers: RefCell<SlotMap<ObserverId, Observer>>,
    next_listener_id: Cell<u64>,
}

/// Shared handle to a page.
#[derive(Clone)]
pub struct Page {
    inner: Rc<PageInner>,
}

/// Non-owning handle to a page.
#[derive(Clone)]
pub struct WeakPage {
    inner: Weak<PageInner>,
}

impl WeakPage {
    pub fn upgrade(&self) -> Option<Page> {
        self.inner.upgrade().map(|inner| Page { inner })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// Create a page with an empty document.
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    /// Create a page around an existing document.
    pub fn with_document(document: Document) -> Self {
        Self {
            inner: Rc::new(PageInner {
                document: RefCell::new(document),
                event_loop: EventLoop::new(),
                listeners: RefCell::new(Vec::new()),
                observers: RefCell::new(SlotMap::with_key()),
                next_listener_id: Cell::new(1),
            }),
        }
    }

    /// Create a page whose body holds the given markup.
    pub fn from_html(markup: &str) -> Result<Self> {
        Ok(Self::with_document(Document::from_html(markup)?))
    }

    pub fn downgrade(&self) -> WeakPage {
        WeakPage {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Borrow the document.
    ///
    /// # Panics
    ///
    /// Panics if the document is mutably borrowed, which only happens when a
    /// caller holds a `document_mut()` guard across a call back into the page.
    pub fn document(&self) -> Ref<'_, Document> {
        self.inner.document.borrow()
    }

    /// Mutably borrow the document.
    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.inner.document.borrow_mut()
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.inner.event_loop
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Register a listener. `namespace` groups listeners for bulk removal.
    pub fn on<F>(
        &self,
        target: impl Into<EventTarget>,
        kind: EventKind,
        namespace: Option<&str>,
        callback: F,
    ) -> ListenerId
    where
        F: Fn(&Page, &DomEvent) + 'static,
    {
        let id = ListenerId(self.inner.next_listener_id.get());
        self.inner.next_listener_id.set(id.0 + 1);
        let target = target.into();
        tracing::trace!(target: targets::EVENTS, ?target, %kind, ?namespace, "listener added");
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            target,
            kind,
            namespace: namespace.map(str::to_string),
            callback: Rc::new(callback),
        });
        id
    }

    /// Remove listeners for a target and kind.
    ///
    /// With a namespace only that namespace's listeners go; without one, all
    /// of them do. Returns how many were removed.
    pub fn off(
        &self,
        target: impl Into<EventTarget>,
        kind: EventKind,
        namespace: Option<&str>,
    ) -> usize {
        let target = target.into();
        self.remove_where(|l| {
            l.target == target
                && l.kind == kind
                && namespace.is_none_or(|ns| l.namespace.as_deref() == Some(ns))
        })
    }

    /// Remove every listener in a namespace, on any target.
    pub fn off_namespace(&self, namespace: &str) -> usize {
        self.remove_where(|l| l.namespace.as_deref() == Some(namespace))
    }

    /// Remove one listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.remove_where(|l| l.id == id) > 0
    }

    fn remove_where(&self, predicate: impl Fn(&Listener) -> bool) -> usize {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| !predicate(l));
        before - listeners.len()
    }

    fn is_registered(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow().iter().any(|l| l.id == id)
    }

    /// Number of listeners for a target and kind.
    pub fn listener_count(&self, target: impl Into<EventTarget>, kind: EventKind) -> usize {
        let target = target.into();
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.target == target && l.kind == kind)
            .count()
    }

    /// Namespaces of the listeners for a target and kind, in registration order.
    pub fn listener_namespaces(
        &self,
        target: impl Into<EventTarget>,
        kind: EventKind,
    ) -> Vec<Option<String>> {
        let target = target.into();
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.target == target && l.kind == kind)
            .map(|l| l.namespace.clone())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Dispatch an event at its target, bubbling when the kind allows.
    ///
    /// Node targets bubble through their ancestors to the document and, when
    /// connected, the window. Events at a removed node go nowhere.
    pub fn dispatch(&self, event: DomEvent) {
        let path = self.propagation_path(event.target, event.kind);
        tracing::trace!(target: targets::EVENTS, kind = %event.kind, target_node = ?event.target, depth = path.len(), "dispatching");

        let mut event = event;
        for current in path {
            let callbacks: Vec<(ListenerId, ListenerFn)> = self
                .inner
                .listeners
                .borrow()
                .iter()
                .filter(|l| l.target == current && l.kind == event.kind)
                .map(|l| (l.id, l.callback.clone()))
                .collect();

            event.current_target = current;
            for (id, callback) in callbacks {
                // A listener removed by an earlier one in this dispatch is skipped.
                if self.is_registered(id) {
                    callback(self, &event);
                }
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
    }

    fn propagation_path(&self, target: EventTarget, kind: EventKind) -> Vec<EventTarget> {
        let node = match target {
            EventTarget::Window => return vec![EventTarget::Window],
            EventTarget::Document if kind.bubbles() => {
                return vec![EventTarget::Document, EventTarget::Window];
            }
            EventTarget::Document => return vec![EventTarget::Document],
            EventTarget::Node(node) => node,
        };

        let doc = self.document();
        if !doc.exists(node) {
            return Vec::new();
        }
        if !kind.bubbles() {
            return vec![EventTarget::Node(node)];
        }

        let mut path = vec![EventTarget::Node(node)];
        for ancestor in doc.ancestors(node) {
            if ancestor == doc.root() {
                path.push(EventTarget::Document);
                path.push(EventTarget::Window);
            } else {
                path.push(EventTarget::Node(ancestor));
            }
        }
        path
    }

    /// Dispatch an event of `kind` with no extra data.
    pub fn trigger(&self, target: impl Into<EventTarget>, kind: EventKind) {
        self.dispatch(DomEvent::new(kind, target));
    }

    pub fn click(&self, target: impl Into<EventTarget>) {
        self.trigger(target, EventKind::Click);
    }

    pub fn mouse_over(&self, node: NodeId) {
        self.trigger(node, EventKind::MouseOver);
    }

    pub fn mouse_out(&self, node: NodeId) {
        self.trigger(node, EventKind::MouseOut);
    }

    pub fn key_down(&self, node: NodeId, key: Key) {
        self.dispatch(DomEvent::new(EventKind::KeyDown, node).with_key(key));
    }

    pub fn key_up(&self, node: NodeId, key: Key) {
        self.dispatch(DomEvent::new(EventKind::KeyUp, node).with_key(key));
    }

    /// Fire `change` at a node, optionally tagged with an origin.
    pub fn change(&self, node: NodeId, origin: Option<&str>) {
        let mut event = DomEvent::new(EventKind::Change, node);
        event.origin = origin.map(str::to_string);
        self.dispatch(event);
    }

    pub fn scroll(&self, target: impl Into<EventTarget>) {
        self.trigger(target, EventKind::Scroll);
    }

    /// Move focus to a node and fire `focus` at it.
    pub fn focus(&self, node: NodeId) {
        {
            let mut doc = self.document_mut();
            if !doc.exists(node) {
                return;
            }
            doc.set_active_element(Some(node));
        }
        self.trigger(node, EventKind::Focus);
    }

    // -------------------------------------------------------------------------
    // Mutation observers
    // -------------------------------------------------------------------------

    /// Watch the child list of `target`.
    ///
    /// Records are delivered in batches on the next turn of the event loop.
    pub fn observe<F>(&self, target: NodeId, callback: F) -> ObserverId
    where
        F: Fn(&Page, &[MutationRecord]) + 'static,
    {
        self.document_mut().observe_child_list(target);
        self.inner.observers.borrow_mut().insert(Observer {
            target,
            callback: Rc::new(callback),
        })
    }

    /// Stop an observer. Undelivered records for it are dropped.
    pub fn disconnect_observer(&self, id: ObserverId) -> bool {
        let removed = self.inner.observers.borrow_mut().remove(id);
        match removed {
            Some(observer) => {
                self.document_mut().unobserve_child_list(observer.target);
                true
            }
            None => false,
        }
    }

    /// Deliver queued mutation records. Returns `true` if any were queued.
    pub fn deliver_mutations(&self) -> bool {
        let records = self.document_mut().take_mutation_records();
        if records.is_empty() {
            return false;
        }

        let observers: Vec<(ObserverId, NodeId, ObserverFn)> = self
            .inner
            .observers
            .borrow()
            .iter()
            .map(|(id, o)| (id, o.target, o.callback.clone()))
            .collect();

        for (id, target, callback) in observers {
            let batch: Vec<MutationRecord> = records
                .iter()
                .filter(|r| r.target == target)
                .cloned()
                .collect();
            if batch.is_empty() || !self.inner.observers.borrow().contains_key(id) {
                continue;
            }
            tracing::trace!(target: targets::MUTATION, ?id, records = batch.len(), "delivering records");
            callback(self, &batch);
        }
        true
    }

    /// Deliver mutations and run tasks until nothing is left to do.
    pub fn run_until_idle(&self) {
        loop {
            let delivered = self.deliver_mutations();
            let ran = self.inner.event_loop.run_one_task();
            if !delivered && !ran {
                break;
            }
        }
    }

    /// Advance virtual time, firing due timers and settling after each.
    pub fn advance(&self, duration: Duration) {
        self.inner.event_loop.advance(duration, || self.run_until_idle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Page {
        Page::from_html(r#"<div id="outer"><span id="inner">x</span></div>"#).unwrap()
    }

    fn by_id(page: &Page, id: &str) -> NodeId {
        let doc = page.document();
        doc.query_selector(doc.body(), &format!("#{id}"))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_click_bubbles_to_document_and_window() {
        let page = page();
        let inner = by_id(&page, "inner");
        let outer = by_id(&page, "outer");
        let log = Rc::new(RefCell::new(Vec::new()));

        for (target, label) in [
            (EventTarget::Node(inner), "inner"),
            (EventTarget::Node(outer), "outer"),
            (EventTarget::Document, "document"),
            (EventTarget::Window, "window"),
        ] {
            let log = log.clone();
            page.on(target, EventKind::Click, None, move |_, event| {
                assert_eq!(event.target, EventTarget::Node(inner));
                log.borrow_mut().push(label);
            });
        }

        page.click(inner);
        assert_eq!(*log.borrow(), vec!["inner", "outer", "document", "window"]);
    }

    #[test]
    fn test_scroll_does_not_bubble() {
        let page = page();
        let inner = by_id(&page, "inner");
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        page.on(EventTarget::Document, EventKind::Scroll, None, move |_, _| {
            hits_clone.set(hits_clone.get() + 1)
        });

        page.scroll(inner);
        assert_eq!(hits.get(), 0);
        page.scroll(EventTarget::Document);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_off_by_namespace() {
        let page = page();
        page.on(EventTarget::Document, EventKind::Click, Some("a"), |_, _| {});
        page.on(EventTarget::Document, EventKind::Click, Some("b"), |_, _| {});
        page.on(EventTarget::Document, EventKind::Click, None, |_, _| {});

        assert_eq!(page.off(EventTarget::Document, EventKind::Click, Some("a")), 1);
        assert_eq!(
            page.listener_namespaces(EventTarget::Document, EventKind::Click),
            vec![Some("b".to_string()), None]
        );
        assert_eq!(page.off_namespace("b"), 1);
        assert_eq!(page.off(EventTarget::Document, EventKind::Click, None), 1);
        assert_eq!(page.listener_count(EventTarget::Document, EventKind::Click), 0);
    }

    #[test]
    fn test_listener_may_remove_later_listener() {
        let page = page();
        let inner = by_id(&page, "inner");
        let second_ran = Rc::new(Cell::new(false));

        page.on(inner, EventKind::Click, Some("first"), |page, _| {
            page.off_namespace("second");
        });
        let flag = second_ran.clone();
        page.on(inner, EventKind::Click, Some("second"), move |_, _| flag.set(true));

        page.click(inner);
        assert!(!second_ran.get());
    }

    #[test]
    fn test_listener_may_mutate_document() {
        let page = page();
        let inner = by_id(&page, "inner");
        page.on(inner, EventKind::Click, None, |page, event| {
            let node = event.target_node().unwrap();
            page.document_mut().add_class(node, "clicked").unwrap();
        });
        page.click(inner);
        assert!(page.document().has_class(inner, "clicked"));
    }

    #[test]
    fn test_stop_propagation() {
        let page = page();
        let inner = by_id(&page, "inner");
        let reached = Rc::new(Cell::new(false));
        page.on(inner, EventKind::Click, None, |_, event| event.stop_propagation());
        let flag = reached.clone();
        page.on(EventTarget::Document, EventKind::Click, None, move |_, _| flag.set(true));

        page.click(inner);
        assert!(!reached.get());
    }

    #[test]
    fn test_mutations_delivered_once_per_turn() {
        let page = page();
        let outer = by_id(&page, "outer");
        let batches = Rc::new(RefCell::new(Vec::new()));
        let batches_clone = batches.clone();
        page.observe(outer, move |_, records| {
            batches_clone.borrow_mut().push(records.len());
        });

        {
            let mut doc = page.document_mut();
            let a = doc.create_element("b");
            let b = doc.create_element("i");
            doc.append_child(outer, a).unwrap();
            doc.append_child(outer, b).unwrap();
        }
        assert!(batches.borrow().is_empty());

        page.run_until_idle();
        assert_eq!(*batches.borrow(), vec![2]);
        page.run_until_idle();
        assert_eq!(*batches.borrow(), vec![2]);
    }

    #[test]
    fn test_disconnected_observer_gets_nothing() {
        let page = page();
        let outer = by_id(&page, "outer");
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        let id = page.observe(outer, move |_, _| hits_clone.set(hits_clone.get() + 1));

        {
            let mut doc = page.document_mut();
            let node = doc.create_element("b");
            doc.append_child(outer, node).unwrap();
        }
        assert!(page.disconnect_observer(id));
        page.run_until_idle();
        assert_eq!(hits.get(), 0);
        assert!(!page.document().is_observed(outer));
    }

    #[test]
    fn test_focus_sets_active_element() {
        let page = page();
        let inner = by_id(&page, "inner");
        let focused = Rc::new(Cell::new(false));
        let flag = focused.clone();
        page.on(inner, EventKind::Focus, None, move |_, _| flag.set(true));

        page.focus(inner);
        assert_eq!(page.document().active_element(), Some(inner));
        assert!(focused.get());
    }

    #[test]
    fn test_advance_runs_timers_and_tasks() {
        let page = page();
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        let weak = page.downgrade();
        page.event_loop().start_timer(Duration::from_millis(10), move || {
            log_clone.borrow_mut().push("timer");
            let log_task = log_clone.clone();
            if let Some(page) = weak.upgrade() {
                page.event_loop().post_task(move || log_task.borrow_mut().push("task"));
            }
        });

        page.advance(Duration::from_millis(9));
        assert!(log.borrow().is_empty());
        page.advance(Duration::from_millis(1));
        assert_eq!(*log.borrow(), vec!["timer", "task"]);
    }
}
