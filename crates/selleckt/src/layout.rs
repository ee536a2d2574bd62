//! Placement of the options panel relative to its trigger.
//!
//! The panel normally hangs below the trigger with absolute positioning.
//! When a clipping ancestor would cut it off it switches to fixed
//! positioning, and flips above the trigger when the viewport has no room
//! below but enough above.

use selleckt_dom::{Document, EventTarget, NodeId, Rect};

/// The scroll container whose scrolling should close an open panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollParent {
    Window,
    Element(NodeId),
}

impl From<ScrollParent> for EventTarget {
    fn from(parent: ScrollParent) -> Self {
        match parent {
            ScrollParent::Window => EventTarget::Window,
            ScrollParent::Element(node) => EventTarget::Node(node),
        }
    }
}

/// Nearest ancestor that scrolls vertically, or the window.
pub fn scrolling_parent(doc: &Document, node: NodeId) -> ScrollParent {
    doc.ancestors(node)
        .into_iter()
        .filter(|n| doc.element(*n).is_some())
        .find(|n| matches!(doc.overflow_y(*n).as_str(), "scroll" | "auto"))
        .map_or(ScrollParent::Window, ScrollParent::Element)
}

/// Nearest ancestor that clips its overflow.
pub fn overflow_hidden_parent(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.ancestors(node)
        .into_iter()
        .filter(|n| doc.element(*n).is_some())
        .find(|n| doc.overflow_y(*n) == "hidden")
}

/// Geometry the placement decision depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutInput {
    /// The selected-display region the panel hangs from.
    pub trigger: Rect,
    /// The panel; only its size matters.
    pub panel: Rect,
    /// Bounds of the clipping ancestor, if any.
    pub clip: Option<Rect>,
    pub viewport: Rect,
}

/// CSS positioning scheme for the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Positioning {
    Absolute,
    Fixed,
}

impl Positioning {
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Absolute => "absolute",
            Self::Fixed => "fixed",
        }
    }
}

/// Where the panel goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub positioning: Positioning,
    /// Panel bounds in viewport coordinates.
    pub rect: Rect,
    /// Whether the panel sits above the trigger.
    pub flipped: bool,
}

/// Decide how to position the panel.
pub fn resolve(input: LayoutInput) -> Placement {
    let LayoutInput {
        trigger,
        panel,
        clip,
        viewport,
    } = input;
    let height = panel.height();

    let overflows_clip = clip.is_some_and(|clip| trigger.bottom() + height > clip.bottom());
    if !overflows_clip {
        return Placement {
            positioning: Positioning::Absolute,
            rect: Rect::new(trigger.left(), trigger.bottom(), panel.width(), height),
            flipped: false,
        };
    }

    let fits_below = trigger.bottom() + height <= viewport.bottom();
    let fits_above = trigger.top() - height >= viewport.top();
    let flipped = !fits_below && fits_above;
    let top = if flipped {
        trigger.top() - height
    } else {
        trigger.bottom()
    };

    Placement {
        positioning: Positioning::Fixed,
        rect: Rect::new(trigger.left(), top, trigger.width(), height),
        flipped,
    }
}
