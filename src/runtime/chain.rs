//! Continuation chaining: `then`, `catch` and `finally`
//!
//! Every operator here returns a new derived future. A missing handler passes
//! the value or reason through unchanged; a handler returning `Err` rejects
//! the derived future instead of unwinding into the caller.

use super::future::{Completion, Future, Resolver, SettleKind};
use super::value::Value;
use std::cell::Cell;
use std::rc::Rc;

/// A boxed settlement handler for [`Future::chain`]
pub type Continuation = Box<dyn FnOnce(Value) -> Completion>;

impl Future {
    /// The general chaining operator: either handler may be absent.
    pub fn chain(
        &self,
        on_fulfilled: Option<Continuation>,
        on_rejected: Option<Continuation>,
    ) -> Future {
        let source = self.clone();
        Future::new(self.scheduler(), move |resolve, reject| {
            let (resolve_value, reject_value) = (resolve.clone(), reject.clone());
            source.register(
                Box::new(move |value| {
                    react(on_fulfilled, value, SettleKind::Fulfill, &resolve_value, &reject_value)
                }),
                Box::new(move |reason| {
                    react(on_rejected, reason, SettleKind::Reject, &resolve, &reject)
                }),
            );
            Ok(())
        })
    }

    /// Transform the fulfillment value; rejections pass through.
    pub fn then<F>(&self, on_fulfilled: F) -> Future
    where
        F: FnOnce(Value) -> Completion + 'static,
    {
        self.chain(Some(Box::new(on_fulfilled)), None)
    }

    /// Handle both outcomes.
    pub fn then_or_else<F, R>(&self, on_fulfilled: F, on_rejected: R) -> Future
    where
        F: FnOnce(Value) -> Completion + 'static,
        R: FnOnce(Value) -> Completion + 'static,
    {
        self.chain(Some(Box::new(on_fulfilled)), Some(Box::new(on_rejected)))
    }

    /// Recover from a rejection; fulfillments pass through.
    pub fn catch<R>(&self, on_rejected: R) -> Future
    where
        R: FnOnce(Value) -> Completion + 'static,
    {
        self.chain(None, Some(Box::new(on_rejected)))
    }

    /// Observe settlement without changing it.
    ///
    /// `on_finally` runs once on either path and the original value or
    /// reason is passed on with its kind intact. If `on_finally` itself
    /// fails, the derived future rejects with that failure.
    pub fn finally<C>(&self, on_finally: C) -> Future
    where
        C: FnOnce() -> std::result::Result<(), Value> + 'static,
    {
        let on_value = Rc::new(Cell::new(Some(on_finally)));
        let on_reason = on_value.clone();
        self.then_or_else(
            move |value| {
                run_once(&on_value)?;
                Ok(value)
            },
            move |reason| {
                run_once(&on_reason)?;
                Err(reason)
            },
        )
    }
}

fn run_once<C>(slot: &Cell<Option<C>>) -> std::result::Result<(), Value>
where
    C: FnOnce() -> std::result::Result<(), Value>,
{
    match slot.take() {
        Some(callback) => callback(),
        None => Ok(()),
    }
}

/// Settle the derived future from one source outcome.
fn react(
    handler: Option<Continuation>,
    payload: Value,
    kind: SettleKind,
    resolve: &Resolver,
    reject: &Resolver,
) {
    match handler {
        Some(handler) => match handler(payload) {
            Ok(value) => resolve.settle(value),
            Err(reason) => reject.settle(reason),
        },
        None => match kind {
            SettleKind::Fulfill => resolve.settle(payload),
            SettleKind::Reject => reject.settle(payload),
        },
    }
}
