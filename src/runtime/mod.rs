//! Future runtime
//!
//! This module provides the deferred-value primitive, its chaining operators,
//! the aggregate combinators and the value type futures carry.

mod chain;
mod combinators;
mod future;
mod value;

pub use chain::Continuation;
pub use future::{Completion, Future, FutureState, Resolver, SettleKind, Thenable};
pub use value::{ErrorObject, Settled, Value};
