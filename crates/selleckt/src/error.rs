//! Error types for the widget.

use std::path::PathBuf;

/// Result type alias for widget operations.
pub type Result<T> = std::result::Result<T, SellecktError>;

/// Which template a configuration error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Main,
    Item,
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Main => f.write_str("mainTemplate"),
            Self::Item => f.write_str("itemTemplate"),
        }
    }
}

/// A structural precondition of construction failed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A template was supplied as something other than a string.
    #[error("Please provide a valid mustache template.")]
    TemplateNotString { template: TemplateKind },

    /// A template string does not compile.
    #[error("Invalid {template} at byte {offset}: {message}")]
    TemplateSyntax {
        template: TemplateKind,
        message: String,
        offset: usize,
    },

    /// The configuration document could not be decoded.
    #[error("Invalid configuration: {0}")]
    Decode(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The templates rendered markup the document cannot parse.
    #[error("Rendered markup is invalid: {0}")]
    Markup(#[source] selleckt_dom::Error),

    /// The rendered markup lacks an element the widget needs.
    #[error("Rendered markup has no element matching '.{class}'")]
    MissingElement { class: String },

    /// The element handed to the widget is not a `<select>`.
    #[error("Expected a <select> element")]
    NotASelect,
}

impl ConfigurationError {
    /// Create a template syntax error.
    pub fn template_syntax(
        template: TemplateKind,
        message: impl Into<String>,
        offset: usize,
    ) -> Self {
        Self::TemplateSyntax {
            template,
            message: message.into(),
            offset,
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl std::fmt::Display) -> Self {
        Self::Decode(message.to_string())
    }
}

/// Errors surfaced by widget operations.
#[derive(Debug, thiserror::Error)]
pub enum SellecktError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The host document rejected an operation.
    #[error("Document error: {0}")]
    Dom(#[from] selleckt_dom::Error),
}
