//! Future Implementation
//!
//! A [`Future`] is a handle to a value that is not available yet. It settles
//! at most once, either fulfilled with a value or rejected with a reason.
//!
//! Settlement never takes effect synchronously: both settlement functions
//! handed to the executor queue their work on the injected [`Scheduler`], and
//! continuations registered on an already-settled future are notified from a
//! fresh microtask as well. No `RefCell` borrow is held while user callbacks
//! run, so callbacks may freely register continuations or settle futures.
//!
//! [`Scheduler`]: crate::event_loop::Scheduler

use super::value::{Settled, Value};
use crate::error::messages;
use crate::event_loop::SchedulerRef;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// ID counter for future tracking in log events
static FUTURE_ID: AtomicU64 = AtomicU64::new(1);

/// What a continuation or executor produces: `Ok` fulfills, `Err` rejects
pub type Completion = std::result::Result<Value, Value>;

/// Callback waiting for one kind of settlement
pub(crate) type Waiter = Box<dyn FnOnce(Value)>;

/// Future state
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FutureState {
    /// Not settled yet
    Pending,
    /// Settled with a value
    Fulfilled,
    /// Settled with a reason
    Rejected,
}

/// Which settlement function a [`Resolver`] is
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SettleKind {
    Fulfill,
    Reject,
}

impl From<SettleKind> for FutureState {
    fn from(kind: SettleKind) -> Self {
        match kind {
            SettleKind::Fulfill => FutureState::Fulfilled,
            SettleKind::Reject => FutureState::Rejected,
        }
    }
}

/// Who is allowed to settle through a resolver
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Origin {
    /// Handed to the executor (or to `with_resolvers` callers)
    Producer,
    /// Handed to the thenable adopted in the given epoch
    Adopted(u64),
}

/// Anything that can register a pair of settlement callbacks.
///
/// Values implementing this are assimilated: settling a future with one makes
/// the future follow it instead of storing it.
pub trait Thenable {
    /// Arrange for exactly one of the resolvers to be called once the
    /// thenable settles.
    fn subscribe(&self, on_fulfilled: Resolver, on_rejected: Resolver);
}

struct FutureInner {
    id: u64,
    state: FutureState,
    result: Option<Value>,
    /// Epoch of the thenable currently being followed
    following: Option<u64>,
    adoptions: u64,
    fulfillment_waiters: Vec<Waiter>,
    rejection_waiters: Vec<Waiter>,
}

/// A deferred value that settles exactly once
#[derive(Clone)]
pub struct Future {
    inner: Rc<RefCell<FutureInner>>,
    scheduler: SchedulerRef,
}

impl Future {
    /// Create a future and run `executor` synchronously with its two
    /// settlement functions. An `Err` returned by the executor rejects the
    /// future through the same path as calling `reject`.
    pub fn new<F>(scheduler: &SchedulerRef, executor: F) -> Future
    where
        F: FnOnce(Resolver, Resolver) -> std::result::Result<(), Value>,
    {
        let future = Future::pending(scheduler);
        let (resolve, reject) = future.resolvers(Origin::Producer);
        if let Err(reason) = executor(resolve, reject.clone()) {
            debug!(future = future.id(), "executor failed");
            reject.settle(reason);
        }
        future
    }

    /// Create a pending future and hand back its settlement functions.
    pub fn with_resolvers(scheduler: &SchedulerRef) -> (Future, Resolver, Resolver) {
        let future = Future::pending(scheduler);
        let (resolve, reject) = future.resolvers(Origin::Producer);
        (future, resolve, reject)
    }

    /// A future fulfilled with `value` (or following it, if it is a thenable)
    pub fn resolved(scheduler: &SchedulerRef, value: impl Into<Value>) -> Future {
        let value = value.into();
        Future::new(scheduler, move |resolve, _reject| {
            resolve.settle(value);
            Ok(())
        })
    }

    /// A future rejected with `reason`
    pub fn rejected(scheduler: &SchedulerRef, reason: impl Into<Value>) -> Future {
        let reason = reason.into();
        Future::new(scheduler, move |_resolve, reject| {
            reject.settle(reason);
            Ok(())
        })
    }

    fn pending(scheduler: &SchedulerRef) -> Future {
        let id = FUTURE_ID.fetch_add(1, Ordering::Relaxed);
        trace!(future = id, "created");
        Future {
            inner: Rc::new(RefCell::new(FutureInner {
                id,
                state: FutureState::Pending,
                result: None,
                following: None,
                adoptions: 0,
                fulfillment_waiters: Vec::new(),
                rejection_waiters: Vec::new(),
            })),
            scheduler: scheduler.clone(),
        }
    }

    fn resolvers(&self, origin: Origin) -> (Resolver, Resolver) {
        (
            Resolver {
                future: self.clone(),
                kind: SettleKind::Fulfill,
                origin,
            },
            Resolver {
                future: self.clone(),
                kind: SettleKind::Reject,
                origin,
            },
        )
    }

    /// Process-unique id, as it appears in log events
    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    /// Current state
    pub fn state(&self) -> FutureState {
        self.inner.borrow().state
    }

    /// Whether the future has not settled yet
    pub fn is_pending(&self) -> bool {
        self.state() == FutureState::Pending
    }

    /// The settled outcome, or `None` while pending
    pub fn outcome(&self) -> Option<Settled> {
        let inner = self.inner.borrow();
        let payload = inner.result.clone().unwrap_or(Value::Undefined);
        match inner.state {
            FutureState::Pending => None,
            FutureState::Fulfilled => Some(Settled::Fulfilled { value: payload }),
            FutureState::Rejected => Some(Settled::Rejected { reason: payload }),
        }
    }

    /// The scheduler this future defers its work to
    pub fn scheduler(&self) -> &SchedulerRef {
        &self.scheduler
    }

    /// Whether both handles refer to the same future
    pub fn ptr_eq(&self, other: &Future) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The deferred half of a settlement call.
    fn settle_now(&self, kind: SettleKind, payload: Value, origin: Origin) {
        let adoption = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != FutureState::Pending {
                debug!(future = inner.id, ?kind, "ignoring settlement of a settled future");
                return;
            }
            let accepted = match origin {
                Origin::Producer => inner.following.is_none(),
                Origin::Adopted(epoch) => inner.following == Some(epoch),
            };
            if !accepted {
                debug!(future = inner.id, ?kind, "ignoring settlement while following a thenable");
                return;
            }

            let self_adoption = payload.as_future().is_some_and(|target| target.ptr_eq(self));
            match payload.as_thenable() {
                Some(_) if self_adoption => {
                    inner.state = FutureState::Rejected;
                    inner.result = Some(Value::type_error(messages::CHAINING_CYCLE));
                    None
                }
                Some(thenable) => {
                    inner.adoptions += 1;
                    inner.following = Some(inner.adoptions);
                    Some((thenable, inner.adoptions))
                }
                None => {
                    inner.state = kind.into();
                    inner.result = Some(payload);
                    None
                }
            }
        };

        match adoption {
            Some((thenable, epoch)) => {
                trace!(future = self.id(), epoch, "following thenable");
                let (resolve, reject) = self.resolvers(Origin::Adopted(epoch));
                thenable.subscribe(resolve, reject);
            }
            None => {
                trace!(future = self.id(), state = ?self.state(), "settled");
                self.dispatch();
            }
        }
    }

    /// Invoke and clear the waiters matching the settled state.
    fn dispatch(&self) {
        let (waiters, discarded, payload) = {
            let mut inner = self.inner.borrow_mut();
            let (waiters, discarded) = match inner.state {
                FutureState::Pending => return,
                FutureState::Fulfilled => (
                    std::mem::take(&mut inner.fulfillment_waiters),
                    std::mem::take(&mut inner.rejection_waiters),
                ),
                FutureState::Rejected => (
                    std::mem::take(&mut inner.rejection_waiters),
                    std::mem::take(&mut inner.fulfillment_waiters),
                ),
            };
            let payload = inner.result.clone().unwrap_or(Value::Undefined);
            (waiters, discarded, payload)
        };
        drop(discarded);

        if waiters.is_empty() {
            return;
        }
        trace!(future = self.id(), waiters = waiters.len(), "dispatching");
        for waiter in waiters {
            waiter(payload.clone());
        }
    }

    /// Append one waiter per settlement kind. If the future has already
    /// settled, dispatch is queued so the new waiter still fires, later.
    pub(crate) fn register(&self, on_fulfilled: Waiter, on_rejected: Waiter) {
        let settled = {
            let mut inner = self.inner.borrow_mut();
            inner.fulfillment_waiters.push(on_fulfilled);
            inner.rejection_waiters.push(on_rejected);
            inner.state != FutureState::Pending
        };
        if settled {
            let this = self.clone();
            self.scheduler.schedule(Box::new(move || this.dispatch()));
        }
    }
}

impl Thenable for Future {
    fn subscribe(&self, on_fulfilled: Resolver, on_rejected: Resolver) {
        self.then_or_else(
            move |value| {
                on_fulfilled.settle(value);
                Ok(Value::Undefined)
            },
            move |reason| {
                on_rejected.settle(reason);
                Ok(Value::Undefined)
            },
        );
    }
}

impl fmt::Debug for Future {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Future")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("result", &inner.result)
            .finish()
    }
}

/// One of a future's two settlement functions.
///
/// Calling [`Resolver::settle`] never settles synchronously; the effect is
/// queued on the future's scheduler. Only the first processed call wins.
#[derive(Clone)]
pub struct Resolver {
    future: Future,
    kind: SettleKind,
    origin: Origin,
}

impl Resolver {
    /// Queue settlement of the future with `payload`.
    pub fn settle(&self, payload: impl Into<Value>) {
        let payload = payload.into();
        let future = self.future.clone();
        let (kind, origin) = (self.kind, self.origin);
        self.future
            .scheduler
            .schedule(Box::new(move || future.settle_now(kind, payload, origin)));
    }

    /// Whether this resolver fulfills or rejects
    pub fn kind(&self) -> SettleKind {
        self.kind
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("future", &self.future.id())
            .field("kind", &self.kind)
            .finish()
    }
}
