//! DOM-style events.

use std::cell::Cell;
use std::fmt;

use crate::NodeId;

/// Where a listener is attached or an event is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Document,
    Node(NodeId),
}

impl From<NodeId> for EventTarget {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl EventTarget {
    /// The node, if this target is one.
    pub fn node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            _ => None,
        }
    }
}

/// Event types the host understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    MouseOver,
    MouseOut,
    KeyDown,
    KeyUp,
    Change,
    Scroll,
    Focus,
}

impl EventKind {
    /// Whether dispatch continues up the ancestor chain.
    pub fn bubbles(self) -> bool {
        !matches!(self, Self::Scroll | Self::Focus)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::MouseOver => "mouseover",
            Self::MouseOut => "mouseout",
            Self::KeyDown => "keydown",
            Self::KeyUp => "keyup",
            Self::Change => "change",
            Self::Scroll => "scroll",
            Self::Focus => "focus",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyboard keys carried by key events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Escape,
    ArrowUp,
    ArrowDown,
    Tab,
    Backspace,
    Character(char),
}

impl Key {
    /// Legacy `keyCode` value.
    pub fn code(&self) -> u32 {
        match self {
            Self::Enter => 13,
            Self::Escape => 27,
            Self::ArrowUp => 38,
            Self::ArrowDown => 40,
            Self::Tab => 9,
            Self::Backspace => 8,
            Self::Character(c) => c.to_ascii_uppercase() as u32,
        }
    }
}

/// An event being dispatched.
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub kind: EventKind,
    /// Where the event was dispatched.
    pub target: EventTarget,
    /// The listener's own target during dispatch.
    pub current_target: EventTarget,
    pub key: Option<Key>,
    /// Free-form tag identifying who raised the event.
    pub origin: Option<String>,
    propagation_stopped: Cell<bool>,
}

impl DomEvent {
    pub fn new(kind: EventKind, target: impl Into<EventTarget>) -> Self {
        let target = target.into();
        Self {
            kind,
            target,
            current_target: target,
            key: None,
            origin: None,
            propagation_stopped: Cell::new(false),
        }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// The target node, if dispatched at a node.
    pub fn target_node(&self) -> Option<NodeId> {
        self.target.node()
    }

    /// Stop dispatch to targets further up the chain.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bubbling_kinds() {
        assert!(EventKind::Click.bubbles());
        assert!(EventKind::Change.bubbles());
        assert!(!EventKind::Scroll.bubbles());
        assert!(!EventKind::Focus.bubbles());
    }

    #[test]
    fn key_codes() {
        assert_eq!(Key::Enter.code(), 13);
        assert_eq!(Key::Escape.code(), 27);
        assert_eq!(Key::ArrowDown.code(), 40);
        assert_eq!(Key::Character('a').code(), 65);
    }

    #[test]
    fn builder_sets_origin() {
        let event = DomEvent::new(EventKind::Change, EventTarget::Document).with_origin("selleckt");
        assert_eq!(event.origin.as_deref(), Some("selleckt"));
        assert!(!event.is_propagation_stopped());
        event.stop_propagation();
        assert!(event.is_propagation_stopped());
    }
}
