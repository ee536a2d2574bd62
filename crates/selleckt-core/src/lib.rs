//! Core systems for Selleckt.
//!
//! This crate provides the single-threaded runtime the widget engine is
//! built on:
//!
//! - [`Signal`]: typed notifications from a widget to its observers
//! - [`TaskQueue`]: deferred work run on the next loop turn
//! - [`TimerManager`]: one-shot timers on a virtual clock
//! - [`EventLoop`]: drives tasks and timers explicitly
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use selleckt_core::{EventLoop, Signal};
//!
//! let event_loop = EventLoop::new();
//! let closed = std::rc::Rc::new(Signal::<()>::new());
//! closed.connect(|_| println!("closed"));
//!
//! let signal = closed.clone();
//! event_loop.start_timer(Duration::from_millis(10), move || signal.emit(()));
//! event_loop.advance(Duration::from_millis(10), || {});
//! assert!(event_loop.active_timers() == 0);
//! ```

mod error;
mod event_loop;
pub mod logging;
pub mod signal;
mod task;
mod timer;

pub use error::{CoreError, Result, TaskError, TimerError};
pub use event_loop::EventLoop;
pub use signal::{ConnectionId, Signal};
pub use task::{BoxedTask, TaskId, TaskQueue};
pub use timer::{TimerId, TimerManager};
