//! Shared test helpers for integration tests

use std::cell::RefCell;
use std::rc::Rc;
use thenable::{EventLoop, Future, Settled, Value};

/// Fresh event loop with test logging enabled
pub fn setup() -> EventLoop {
    thenable::logging::init_test_logging();
    EventLoop::new()
}

/// Drive `future` to settlement and return its outcome
pub fn settle(el: &EventLoop, future: &Future) -> Settled {
    el.run_to_completion().unwrap();
    future
        .outcome()
        .unwrap_or_else(|| panic!("future {} never settled", future.id()))
}

/// Outcome serialized as JSON, for structural comparisons
#[allow(dead_code)]
pub fn settle_json(el: &EventLoop, future: &Future) -> serde_json::Value {
    serde_json::to_value(settle(el, future)).unwrap()
}

/// Shared ordered log of events
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

#[allow(dead_code)]
impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// A continuation that records `label` and passes the value on
    pub fn tap(&self, label: &'static str) -> impl FnOnce(Value) -> thenable::Completion {
        let log = self.clone();
        move |value| {
            log.push(format!("{} {}", label, value));
            Ok(value)
        }
    }
}
