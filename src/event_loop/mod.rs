//! Event Loop Implementation
//!
//! Futures never settle synchronously; they hand their work to a
//! [`Scheduler`]. This module defines that capability and ships
//! [`EventLoop`], a single-threaded host with a FIFO microtask queue and
//! virtual-time timers (macrotasks). Time only moves when the loop advances
//! it, which keeps timer-driven tests deterministic.
//!
//! Each iteration drains microtasks (up to the per-tick budget) and then runs
//! at most one timer, jumping virtual time forward when nothing is ready yet.

use crate::error::{Error, Result};
use crate::runtime::{Future, Resolver, Value};
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

/// A deferred zero-argument callback
pub type Microtask = Box<dyn FnOnce()>;

/// Timer identifier returned by `set_timeout`/`set_interval`
pub type TimerId = u64;

/// The deferred-callback capability futures depend on.
///
/// Implementations must run every scheduled task later, after the current
/// synchronous code, in FIFO order relative to other scheduled tasks.
pub trait Scheduler {
    /// Queue `task` to run later
    fn schedule(&self, task: Microtask);
}

/// Shared handle to a scheduler, as stored by every future
pub type SchedulerRef = Rc<dyn Scheduler>;

/// Event loop configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLoopConfig {
    /// Microtasks drained per tick before a timer gets to run
    pub max_microtasks_per_tick: usize,
    /// Iterations a single run may take before it is aborted
    pub max_ticks: u64,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            max_microtasks_per_tick: 10_000,
            max_ticks: 1_000_000,
        }
    }
}

impl EventLoopConfig {
    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every limit allows progress
    pub fn validate(&self) -> Result<()> {
        if self.max_microtasks_per_tick == 0 {
            return Err(Error::range_error("max_microtasks_per_tick must be at least 1"));
        }
        if self.max_ticks == 0 {
            return Err(Error::range_error("max_ticks must be at least 1"));
        }
        Ok(())
    }

    /// Set the per-tick microtask budget
    pub fn with_microtask_budget(mut self, limit: usize) -> Self {
        self.max_microtasks_per_tick = limit;
        self
    }

    /// Set the iteration limit
    pub fn with_max_ticks(mut self, limit: u64) -> Self {
        self.max_ticks = limit;
        self
    }
}

/// Result of running the event loop to completion via `run_to_completion()`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Total number of microtasks that were dequeued and processed
    pub microtasks_processed: usize,
    /// Total number of timers that fired
    pub macrotasks_processed: usize,
    /// Number of event loop iterations
    pub iterations: usize,
    /// The virtual time when the event loop finished
    pub final_time: u64,
}

/// Runtime statistics for the event loop
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EventLoopStats {
    /// Total microtasks processed across all ticks
    pub total_microtasks: u64,
    /// Total timers fired
    pub total_macrotasks: u64,
    /// Total number of event loop ticks
    pub total_ticks: u64,
    /// Maximum microtasks drained in a single tick
    pub max_microtasks_per_tick: u64,
    /// Timers created
    pub timers_scheduled: u64,
    /// Timers cancelled before firing
    pub timers_cancelled: u64,
}

enum TimerCallback {
    Once(Box<dyn FnOnce()>),
    Repeating(Rc<dyn Fn()>),
}

struct Macrotask {
    id: TimerId,
    callback: TimerCallback,
    /// Virtual time at which the timer is due
    fire_at: u64,
    delay: u64,
}

struct EventLoopInner {
    config: Cell<EventLoopConfig>,
    microtask_queue: RefCell<VecDeque<Microtask>>,
    timers: RefCell<HashMap<TimerId, Macrotask>>,
    virtual_time: Cell<u64>,
    next_timer_id: Cell<TimerId>,
    stats: RefCell<EventLoopStats>,
}

impl EventLoopInner {
    fn enqueue(&self, task: Microtask) {
        self.microtask_queue.borrow_mut().push_back(task);
    }
}

/// Scheduler handed to futures. Holds the loop weakly, so queued work never
/// keeps a dropped loop alive; tasks scheduled after that are discarded.
struct LoopHandle(Weak<EventLoopInner>);

impl Scheduler for LoopHandle {
    fn schedule(&self, task: Microtask) {
        match self.0.upgrade() {
            Some(inner) => inner.enqueue(task),
            None => trace!("event loop dropped, discarding microtask"),
        }
    }
}

/// A single-threaded virtual-time event loop.
///
/// Cloning yields another handle to the same loop.
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<EventLoopInner>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    /// Create a new event loop with the default configuration
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Create a new event loop
    pub fn with_config(config: EventLoopConfig) -> Self {
        Self {
            inner: Rc::new(EventLoopInner {
                config: Cell::new(config),
                microtask_queue: RefCell::new(VecDeque::new()),
                timers: RefCell::new(HashMap::default()),
                virtual_time: Cell::new(0),
                next_timer_id: Cell::new(1),
                stats: RefCell::new(EventLoopStats::default()),
            }),
        }
    }

    /// Current configuration
    pub fn config(&self) -> EventLoopConfig {
        self.inner.config.get()
    }

    /// This loop as the scheduler capability futures are built with
    pub fn scheduler(&self) -> SchedulerRef {
        Rc::new(LoopHandle(Rc::downgrade(&self.inner)))
    }

    /// Get current virtual time
    pub fn current_time(&self) -> u64 {
        self.inner.virtual_time.get()
    }

    /// Advance virtual time without running anything
    pub fn advance_time(&self, ms: u64) {
        self.inner.virtual_time.set(self.current_time().saturating_add(ms));
    }

    /// Enqueue a microtask
    pub fn queue_microtask<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        self.schedule(Box::new(callback));
    }

    /// Number of queued microtasks
    pub fn pending_microtasks(&self) -> usize {
        self.inner.microtask_queue.borrow().len()
    }

    /// Run `callback` once, `delay` ms of virtual time from now
    pub fn set_timeout<F>(&self, delay: u64, callback: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        self.insert_timer(delay, TimerCallback::Once(Box::new(callback)))
    }

    /// Run `callback` every `delay` ms until cleared
    pub fn set_interval<F>(&self, delay: u64, callback: F) -> TimerId
    where
        F: Fn() + 'static,
    {
        self.insert_timer(delay, TimerCallback::Repeating(Rc::new(callback)))
    }

    /// Schedule a timer with 0ms delay; it fires after all queued microtasks
    pub fn set_immediate<F>(&self, callback: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        self.set_timeout(0, callback)
    }

    fn insert_timer(&self, delay: u64, callback: TimerCallback) -> TimerId {
        let id = self.inner.next_timer_id.get();
        self.inner.next_timer_id.set(id + 1);

        let fire_at = self.current_time().saturating_add(delay);
        self.inner.timers.borrow_mut().insert(
            id,
            Macrotask {
                id,
                callback,
                fire_at,
                delay,
            },
        );
        self.inner.stats.borrow_mut().timers_scheduled += 1;
        trace!(timer = id, fire_at, "timer scheduled");
        id
    }

    /// Cancel a timer by ID. Returns whether a pending timer was removed.
    pub fn clear_timer(&self, id: TimerId) -> bool {
        let removed = self.inner.timers.borrow_mut().remove(&id).is_some();
        if removed {
            self.inner.stats.borrow_mut().timers_cancelled += 1;
        }
        removed
    }

    /// Check if there are pending microtasks
    pub fn has_pending_microtasks(&self) -> bool {
        !self.inner.microtask_queue.borrow().is_empty()
    }

    /// Check if there are pending timers
    pub fn has_pending_macrotasks(&self) -> bool {
        !self.inner.timers.borrow().is_empty()
    }

    /// Check if the event loop has any pending work
    pub fn has_pending_work(&self) -> bool {
        self.has_pending_microtasks() || self.has_pending_macrotasks()
    }

    /// Get the time of the next scheduled timer
    pub fn next_macrotask_time(&self) -> Option<u64> {
        self.inner.timers.borrow().values().map(|t| t.fire_at).min()
    }

    /// Drain microtasks in FIFO order up to the per-tick budget, including
    /// ones queued while draining. Returns how many ran.
    pub fn run_microtasks(&self) -> usize {
        let budget = self.config().max_microtasks_per_tick.max(1);
        let mut count = 0;

        while count < budget {
            let task = self.inner.microtask_queue.borrow_mut().pop_front();
            let Some(task) = task else { break };
            task();
            count += 1;
        }

        if count > 0 {
            let mut stats = self.inner.stats.borrow_mut();
            stats.total_microtasks += count as u64;
            stats.max_microtasks_per_tick = stats.max_microtasks_per_tick.max(count as u64);
            trace!(count, "microtasks drained");
        }
        count
    }

    /// Remove the next due timer, rescheduling it first if it repeats.
    fn take_ready_macrotask(&self) -> Option<Box<dyn FnOnce()>> {
        let now = self.current_time();
        let mut timers = self.inner.timers.borrow_mut();
        let id = timers
            .values()
            .filter(|t| t.fire_at <= now)
            .min_by_key(|t| (t.fire_at, t.id))
            .map(|t| t.id)?;
        let task = timers.remove(&id)?;

        match task.callback {
            TimerCallback::Once(callback) => Some(callback),
            TimerCallback::Repeating(callback) => {
                timers.insert(
                    id,
                    Macrotask {
                        id,
                        callback: TimerCallback::Repeating(callback.clone()),
                        fire_at: now.saturating_add(task.delay),
                        delay: task.delay,
                    },
                );
                Some(Box::new(move || callback()))
            }
        }
    }

    /// Fire the next timer, advancing virtual time to it if nothing is due.
    /// Returns whether a timer ran.
    pub fn run_next_macrotask(&self) -> bool {
        let task = match self.take_ready_macrotask() {
            Some(task) => Some(task),
            None => match self.next_macrotask_time() {
                Some(fire_at) => {
                    self.inner.virtual_time.set(fire_at.max(self.current_time()));
                    self.take_ready_macrotask()
                }
                None => None,
            },
        };

        match task {
            Some(task) => {
                trace!(time = self.current_time(), "timer fired");
                task();
                self.inner.stats.borrow_mut().total_macrotasks += 1;
                true
            }
            None => false,
        }
    }

    /// Run the event loop until no microtasks and no timers remain:
    ///   1. Drain microtasks (budget-limited)
    ///   2. Fire one timer, advancing time if needed
    ///   3. Repeat
    ///
    /// Fails once `max_ticks` iterations have run, e.g. with a live interval.
    pub fn run_to_completion(&self) -> Result<RunResult> {
        let max_ticks = self.config().max_ticks;
        let mut result = RunResult::default();
        let mut ticks = 0u64;

        while self.has_pending_work() {
            if ticks >= max_ticks {
                warn!(ticks, "event loop tick limit reached");
                return Err(Error::tick_limit_exceeded(ticks, max_ticks));
            }
            ticks += 1;
            self.inner.stats.borrow_mut().total_ticks += 1;
            result.iterations += 1;

            result.microtasks_processed += self.run_microtasks();
            if self.run_next_macrotask() {
                result.macrotasks_processed += 1;
            }
        }

        result.final_time = self.current_time();
        debug!(
            microtasks = result.microtasks_processed,
            macrotasks = result.macrotasks_processed,
            iterations = result.iterations,
            final_time = result.final_time,
            "event loop idle"
        );
        Ok(result)
    }

    /// Drive the loop until `future` settles.
    ///
    /// Returns the fulfillment value, `Error::Rejected` with the reason, or
    /// `Error::Stalled` if the loop runs out of work first.
    pub fn block_on(&self, future: &Future) -> Result<Value> {
        let max_ticks = self.config().max_ticks;
        let mut ticks = 0u64;

        loop {
            if let Some(outcome) = future.outcome() {
                return outcome.into_result().map_err(|reason| Error::Rejected { reason });
            }
            if !self.has_pending_work() {
                debug!(future = future.id(), "event loop idle with future pending");
                return Err(Error::Stalled);
            }
            if ticks >= max_ticks {
                warn!(ticks, future = future.id(), "event loop tick limit reached");
                return Err(Error::tick_limit_exceeded(ticks, max_ticks));
            }
            ticks += 1;
            self.inner.stats.borrow_mut().total_ticks += 1;

            if self.run_microtasks() == 0 {
                self.run_next_macrotask();
            }
        }
    }

    /// Set the maximum number of microtasks to drain per tick
    pub fn set_microtask_budget(&self, limit: usize) {
        let config = self.config().with_microtask_budget(limit);
        self.inner.config.set(config);
    }

    /// Get the current microtask budget limit
    pub fn microtask_budget(&self) -> usize {
        self.config().max_microtasks_per_tick
    }

    /// Get a snapshot of the current event loop statistics
    pub fn stats(&self) -> EventLoopStats {
        self.inner.stats.borrow().clone()
    }

    /// Reset all event loop statistics to zero
    pub fn reset_stats(&self) {
        *self.inner.stats.borrow_mut() = EventLoopStats::default();
    }

    // ─── Future factories bound to this loop ───────────────────────────────

    /// `Future::new` on this loop
    pub fn future<F>(&self, executor: F) -> Future
    where
        F: FnOnce(Resolver, Resolver) -> std::result::Result<(), Value>,
    {
        Future::new(&self.scheduler(), executor)
    }

    /// `Future::resolved` on this loop
    pub fn resolved(&self, value: impl Into<Value>) -> Future {
        Future::resolved(&self.scheduler(), value)
    }

    /// `Future::rejected` on this loop
    pub fn rejected(&self, reason: impl Into<Value>) -> Future {
        Future::rejected(&self.scheduler(), reason)
    }

    /// `Future::with_resolvers` on this loop
    pub fn with_resolvers(&self) -> (Future, Resolver, Resolver) {
        Future::with_resolvers(&self.scheduler())
    }

    /// A future fulfilled with `value` by a timer `ms` from now
    pub fn delay(&self, ms: u64, value: impl Into<Value>) -> Future {
        let value = value.into();
        self.future(|resolve, _reject| {
            self.set_timeout(ms, move || resolve.settle(value));
            Ok(())
        })
    }

    /// A future rejected with `reason` by a timer `ms` from now
    pub fn delay_reject(&self, ms: u64, reason: impl Into<Value>) -> Future {
        let reason = reason.into();
        self.future(|_resolve, reject| {
            self.set_timeout(ms, move || reject.settle(reason));
            Ok(())
        })
    }

    /// `Future::all` on this loop
    pub fn all<I>(&self, inputs: I) -> Future
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Future::all(&self.scheduler(), inputs)
    }

    /// `Future::all_settled` on this loop
    pub fn all_settled<I>(&self, inputs: I) -> Future
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Future::all_settled(&self.scheduler(), inputs)
    }

    /// `Future::race` on this loop
    pub fn race<I>(&self, inputs: I) -> Future
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Future::race(&self.scheduler(), inputs)
    }

    /// `Future::any` on this loop
    pub fn any<I>(&self, inputs: I) -> Future
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Future::any(&self.scheduler(), inputs)
    }
}

impl Scheduler for EventLoop {
    fn schedule(&self, task: Microtask) {
        self.inner.enqueue(task);
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("time", &self.current_time())
            .field("microtasks", &self.pending_microtasks())
            .field("timers", &self.inner.timers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let record = move |label: &'static str| -> Box<dyn FnOnce()> {
            let sink = sink.clone();
            Box::new(move || sink.borrow_mut().push(label))
        };
        (log, record)
    }

    #[test]
    fn test_event_loop_creation() {
        let el = EventLoop::new();
        assert_eq!(el.current_time(), 0);
        assert!(!el.has_pending_work());
    }

    #[test]
    fn test_microtasks_run_fifo() {
        let el = EventLoop::new();
        let (log, record) = recorder();
        el.schedule(record("a"));
        el.schedule(record("b"));
        el.queue_microtask(record("c"));
        assert_eq!(el.pending_microtasks(), 3);

        assert_eq!(el.run_microtasks(), 3);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert!(!el.has_pending_microtasks());
    }

    #[test]
    fn test_microtasks_queued_while_draining_run_same_tick() {
        let el = EventLoop::new();
        let (log, record) = recorder();
        let inner = el.clone();
        let nested = record("nested");
        el.queue_microtask(move || inner.schedule(nested));

        assert_eq!(el.run_microtasks(), 2);
        assert_eq!(*log.borrow(), vec!["nested"]);
    }

    #[test]
    fn test_timer_scheduling() {
        let el = EventLoop::new();
        let (log, record) = recorder();
        let id = el.set_timeout(100, record("timer"));
        assert_eq!(id, 1);
        assert!(el.has_pending_macrotasks());
        assert_eq!(el.next_macrotask_time(), Some(100));

        assert!(el.run_next_macrotask());
        assert_eq!(el.current_time(), 100);
        assert_eq!(*log.borrow(), vec!["timer"]);
    }

    #[test]
    fn test_timer_cancellation() {
        let el = EventLoop::new();
        let (log, record) = recorder();
        let id = el.set_timeout(100, record("cancelled"));
        assert!(el.clear_timer(id));
        assert!(!el.clear_timer(id));

        el.run_to_completion().unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(el.stats().timers_cancelled, 1);
    }

    #[test]
    fn test_timers_fire_in_time_then_id_order() {
        let el = EventLoop::new();
        let (log, record) = recorder();
        el.set_timeout(200, record("200"));
        el.set_timeout(100, record("100a"));
        el.set_timeout(100, record("100b"));
        el.set_immediate(record("0"));

        el.run_to_completion().unwrap();
        assert_eq!(*log.borrow(), vec!["0", "100a", "100b", "200"]);
    }

    #[test]
    fn test_microtasks_run_before_timers() {
        let el = EventLoop::new();
        let (log, record) = recorder();
        el.set_immediate(record("timer"));
        el.queue_microtask(record("microtask"));

        el.run_to_completion().unwrap();
        assert_eq!(*log.borrow(), vec!["microtask", "timer"]);
    }

    #[test]
    fn test_run_to_completion_empty() {
        let el = EventLoop::new();
        let result = el.run_to_completion().unwrap();
        assert_eq!(result, RunResult::default());
    }

    #[test]
    fn test_run_to_completion_mixed() {
        let el = EventLoop::new();
        el.queue_microtask(|| {});
        el.queue_microtask(|| {});
        el.set_timeout(50, || {});
        el.set_timeout(500, || {});

        let result = el.run_to_completion().unwrap();
        assert_eq!(result.microtasks_processed, 2);
        assert_eq!(result.macrotasks_processed, 2);
        assert_eq!(result.final_time, 500);
        assert!(!el.has_pending_work());
    }

    #[test]
    fn test_interval_hits_tick_limit() {
        let el = EventLoop::with_config(EventLoopConfig::default().with_max_ticks(5));
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        el.set_interval(10, move || counter.set(counter.get() + 1));

        let err = el.run_to_completion().unwrap_err();
        assert!(matches!(
            err,
            Error::ResourceLimitError {
                kind: crate::error::ResourceLimitKind::TickLimit,
                ..
            }
        ));
        assert_eq!(fired.get(), 5);
        assert_eq!(el.current_time(), 50);
    }

    #[test]
    fn test_interval_can_be_cleared() {
        let el = EventLoop::new();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        let id = el.set_interval(10, move || counter.set(counter.get() + 1));
        el.run_next_macrotask();
        el.run_next_macrotask();
        assert!(el.clear_timer(id));

        el.run_to_completion().unwrap();
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_microtask_budget() {
        let el = EventLoop::new();
        assert_eq!(el.microtask_budget(), 10_000);
        el.set_microtask_budget(3);
        assert_eq!(el.microtask_budget(), 3);

        for _ in 0..10 {
            el.queue_microtask(|| {});
        }
        assert_eq!(el.run_microtasks(), 3);
        assert_eq!(el.pending_microtasks(), 7);
        assert_eq!(el.run_microtasks(), 3);
        assert_eq!(el.run_microtasks(), 3);
        assert_eq!(el.run_microtasks(), 1);
        assert!(!el.has_pending_microtasks());
    }

    #[test]
    fn test_stats_tracking() {
        let el = EventLoop::new();
        el.queue_microtask(|| {});
        el.queue_microtask(|| {});
        el.set_timeout(100, || {});

        el.run_to_completion().unwrap();
        let stats = el.stats();
        assert_eq!(stats.total_microtasks, 2);
        assert_eq!(stats.total_macrotasks, 1);
        assert_eq!(stats.max_microtasks_per_tick, 2);
        assert_eq!(stats.timers_scheduled, 1);
        assert!(stats.total_ticks >= 1);

        el.reset_stats();
        assert_eq!(el.stats(), EventLoopStats::default());
    }

    #[test]
    fn test_config_from_json_defaults_missing_fields() {
        let config = EventLoopConfig::from_json(r#"{"max_ticks": 42}"#).unwrap();
        assert_eq!(config.max_ticks, 42);
        assert_eq!(config.max_microtasks_per_tick, 10_000);
    }

    #[test]
    fn test_config_round_trip() {
        let config = EventLoopConfig::default().with_microtask_budget(7);
        let json = config.to_json().unwrap();
        assert_eq!(EventLoopConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_config_rejects_zero_budget() {
        let err = EventLoopConfig::from_json(r#"{"max_microtasks_per_tick": 0}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "RangeError: max_microtasks_per_tick must be at least 1"
        );
        assert!(matches!(
            EventLoopConfig::from_json(r#"{"max_ticks": "many"}"#),
            Err(Error::ConfigError { .. })
        ));
    }

    #[test]
    fn test_block_on_fulfilled() {
        let el = EventLoop::new();
        let future = el.delay(250, "done");
        assert_eq!(el.block_on(&future).unwrap(), Value::from("done"));
        assert_eq!(el.current_time(), 250);
    }

    #[test]
    fn test_block_on_rejected() {
        let el = EventLoop::new();
        let future = el.rejected("nope");
        match el.block_on(&future) {
            Err(Error::Rejected { reason }) => assert_eq!(reason, Value::from("nope")),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_block_on_stalls_on_never_settling_future() {
        let el = EventLoop::new();
        let (future, _resolve, _reject) = el.with_resolvers();
        assert!(matches!(el.block_on(&future), Err(Error::Stalled)));
    }

    #[test]
    fn test_block_on_leaves_later_timers_pending() {
        let el = EventLoop::new();
        let fast = el.delay(10, 1);
        let _slow = el.delay(1_000, 2);
        el.block_on(&fast).unwrap();
        assert_eq!(el.current_time(), 10);
        assert!(el.has_pending_macrotasks());
    }

    struct DropFlag(Rc<Cell<bool>>);

    impl crate::runtime::Thenable for DropFlag {
        fn subscribe(&self, _on_fulfilled: Resolver, _on_rejected: Resolver) {}
    }

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn test_dropping_loop_frees_pending_work() {
        let dropped = Rc::new(Cell::new(false));
        {
            let el = EventLoop::new();
            let payload = Value::Thenable(Rc::new(DropFlag(dropped.clone())));
            let winner = el.race(vec![el.delay(10, 1), el.delay(1_000, payload)]);
            assert_eq!(el.block_on(&winner).unwrap(), Value::from(1));
            assert!(el.has_pending_macrotasks());
            assert!(!dropped.get());
        }
        assert!(dropped.get());
    }

    #[test]
    fn test_scheduler_outliving_loop_discards_tasks() {
        let el = EventLoop::new();
        let scheduler = el.scheduler();
        drop(el);

        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        scheduler.schedule(Box::new(move || flag.set(true)));
        assert!(!ran.get());
    }

    #[test]
    fn test_huge_delays_saturate() {
        let el = EventLoop::new();
        el.advance_time(5);
        let never = el.delay(u64::MAX, 1);
        let soon = el.delay(10, 2);
        assert_eq!(el.next_macrotask_time(), Some(15));

        assert_eq!(el.block_on(&soon).unwrap(), Value::from(2));
        assert_eq!(el.current_time(), 15);
        assert!(never.is_pending());

        el.advance_time(u64::MAX);
        assert_eq!(el.current_time(), u64::MAX);
    }

    #[test]
    fn test_interval_reschedule_saturates() {
        let el = EventLoop::with_config(EventLoopConfig::default().with_max_ticks(3));
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        el.advance_time(u64::MAX - 1);
        el.set_interval(1, move || counter.set(counter.get() + 1));

        assert!(el.run_to_completion().is_err());
        assert_eq!(fired.get(), 3);
        assert_eq!(el.current_time(), u64::MAX);
    }

    #[test]
    fn test_debug_output() {
        let el = EventLoop::new();
        el.set_timeout(5, || {});
        assert_eq!(format!("{:?}", el), "EventLoop { time: 0, microtasks: 0, timers: 1 }");
    }
}
