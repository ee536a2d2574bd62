//! Error types for the host document.

use crate::NodeId;

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or querying a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTML fragment could not be parsed.
    #[error("HTML parse error at byte {offset}: {message}")]
    HtmlParse { message: String, offset: usize },

    /// Selector parsing error.
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// The node ID does not refer to a live node.
    #[error("Node {0:?} does not exist")]
    NodeNotFound(NodeId),

    /// The operation requires an element node.
    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// Inserting the node would create a cycle in the tree.
    #[error("Cannot insert {child:?} into its own subtree at {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
}

impl Error {
    /// Create an HTML parse error.
    pub fn html_parse(message: impl Into<String>, offset: usize) -> Self {
        Self::HtmlParse {
            message: message.into(),
            offset,
        }
    }

    /// Create a selector error.
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }
}
