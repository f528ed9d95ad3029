//! Thenable: deferred values for single-threaded Rust hosts
//!
//! A [`Future`] stands for a value that is not available yet. It settles
//! exactly once, fulfilled with a value or rejected with a reason, and
//! notifies continuations registered through [`Future::then`],
//! [`Future::catch`] and [`Future::finally`]. Settlement and notification are
//! always deferred to a [`Scheduler`], so code that creates or settles a
//! future never observes the outcome synchronously.
//!
//! # Features
//!
//! - **Assimilation**: settling with another future (or any [`Thenable`]) makes
//!   the outer future follow it, flattening nested futures
//! - **Combinators**: [`Future::all`], [`Future::all_settled`], [`Future::race`]
//!   and [`Future::any`]
//! - **Deterministic host**: [`EventLoop`] runs microtasks and virtual-time
//!   timers, so timer-driven code is testable without sleeping
//!
//! # Quick Start
//!
//! ```no_run
//! use thenable::{EventLoop, Value};
//!
//! fn main() -> thenable::Result<()> {
//!     let el = EventLoop::new();
//!     let answer = el
//!         .delay(100, 21)
//!         .then(|v| Ok(Value::from(v.as_number()? * 2.0)));
//!     println!("Result: {}", el.block_on(&answer)?);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! | Category | Modules |
//! |----------|---------|
//! | **Core** | [`runtime`], [`error`](Error) |
//! | **Host** | [`event_loop`] |
//! | **Tooling** | [`logging`] |
#![allow(clippy::type_complexity)]

pub mod event_loop;
pub mod logging;
pub mod prelude;
pub mod runtime;

mod error;

pub use error::{messages, Error, ErrorKind, ResourceLimitKind, Result};
pub use event_loop::{
    EventLoop, EventLoopConfig, EventLoopStats, Microtask, RunResult, Scheduler, SchedulerRef,
    TimerId,
};
pub use runtime::{
    Completion, Continuation, ErrorObject, Future, FutureState, Resolver, SettleKind, Settled,
    Thenable, Value,
};

/// Thenable version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
