//! Prelude module for convenient imports
//!
//! ```no_run
//! use thenable::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let el = EventLoop::new();
//!     let both = el.all(vec![el.resolved(1), el.delay(10, 2)]);
//!     println!("{}", el.block_on(&both)?);
//!     Ok(())
//! }
//! ```

// Futures and their payloads
pub use crate::runtime::{
    Completion, ErrorObject, Future, FutureState, Resolver, Settled, Thenable, Value,
};

// Error handling
pub use crate::error::{Error, ErrorKind, Result};

// Host
pub use crate::event_loop::{EventLoop, EventLoopConfig, Scheduler, SchedulerRef};

// Version constant
pub use crate::VERSION;
