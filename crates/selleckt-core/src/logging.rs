//! Logging facilities for Selleckt.
//!
//! Selleckt uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("selleckt::engine=debug,selleckt_dom=trace")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Event loop target.
    pub const EVENT_LOOP: &str = "selleckt_core::event_loop";
    /// Timer system target.
    pub const TIMER: &str = "selleckt_core::timer";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "selleckt_core::signal";
    /// Host document tree target.
    pub const DOCUMENT: &str = "selleckt_dom::document";
    /// Event dispatch target.
    pub const EVENTS: &str = "selleckt_dom::events";
    /// Mutation observer target.
    pub const MUTATION: &str = "selleckt_dom::mutation";
    /// Widget synchronization engine target.
    pub const ENGINE: &str = "selleckt::engine";
    /// Template rendering target.
    pub const TEMPLATE: &str = "selleckt::template";
    /// Panel layout target.
    pub const LAYOUT: &str = "selleckt::layout";
}
