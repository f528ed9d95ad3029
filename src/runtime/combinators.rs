//! Aggregate combinators: `all`, `all_settled`, `race` and `any`
//!
//! Each combinator accepts futures or plain values (plain values are wrapped
//! with [`Future::resolved`]) and is built only on the public chaining API.
//! Inputs are dense: every position holds a value, which `IntoIterator`
//! guarantees.

use super::future::{Completion, Future};
use super::value::{Settled, Value};
use crate::error::messages;
use crate::event_loop::SchedulerRef;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Normalize each input into a future
fn normalize<I>(scheduler: &SchedulerRef, inputs: I) -> Vec<Future>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    inputs
        .into_iter()
        .map(|input| Future::resolved(scheduler, input))
        .collect()
}

impl Future {
    /// Fulfill with every input's value, in input order, once all have
    /// fulfilled. Reject with the first reason to arrive.
    pub fn all<I>(scheduler: &SchedulerRef, inputs: I) -> Future
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let inputs = normalize(scheduler, inputs);
        Future::new(scheduler, move |resolve, reject| {
            let total = inputs.len();
            if total == 0 {
                resolve.settle(Value::Array(Vec::new()));
                return Ok(());
            }

            let values = Rc::new(RefCell::new(vec![Value::Undefined; total]));
            let fulfilled = Rc::new(Cell::new(0usize));
            for (index, input) in inputs.into_iter().enumerate() {
                let (values, fulfilled) = (values.clone(), fulfilled.clone());
                let (resolve, reject) = (resolve.clone(), reject.clone());
                input.then_or_else(
                    move |value| {
                        values.borrow_mut()[index] = value;
                        fulfilled.set(fulfilled.get() + 1);
                        if fulfilled.get() == total {
                            resolve.settle(Value::Array(values.take()));
                        }
                        Ok(Value::Undefined)
                    },
                    move |reason| {
                        reject.settle(reason);
                        Ok(Value::Undefined)
                    },
                );
            }
            Ok(())
        })
    }

    /// Fulfill with one [`Settled`] record per input, in input order, once
    /// every input has settled. Never rejects.
    pub fn all_settled<I>(scheduler: &SchedulerRef, inputs: I) -> Future
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let inputs = normalize(scheduler, inputs);
        Future::new(scheduler, move |resolve, _reject| {
            let total = inputs.len();
            if total == 0 {
                resolve.settle(Value::Array(Vec::new()));
                return Ok(());
            }

            let records = Rc::new(RefCell::new(vec![Value::Undefined; total]));
            let settled = Rc::new(Cell::new(0usize));
            let record = move |index: usize, outcome: Settled| -> Completion {
                records.borrow_mut()[index] = Value::from(outcome);
                settled.set(settled.get() + 1);
                if settled.get() == total {
                    resolve.settle(Value::Array(records.take()));
                }
                Ok(Value::Undefined)
            };
            let record = Rc::new(record);

            for (index, input) in inputs.into_iter().enumerate() {
                let on_value = record.clone();
                let on_reason = record.clone();
                input.then_or_else(
                    move |value| on_value(index, Settled::Fulfilled { value }),
                    move |reason| on_reason(index, Settled::Rejected { reason }),
                );
            }
            Ok(())
        })
    }

    /// Adopt the outcome of whichever input settles first. With no inputs
    /// the result stays pending forever.
    pub fn race<I>(scheduler: &SchedulerRef, inputs: I) -> Future
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let inputs = normalize(scheduler, inputs);
        Future::new(scheduler, move |resolve, reject| {
            for input in inputs {
                let (resolve, reject) = (resolve.clone(), reject.clone());
                input.then_or_else(
                    move |value| {
                        resolve.settle(value);
                        Ok(Value::Undefined)
                    },
                    move |reason| {
                        reject.settle(reason);
                        Ok(Value::Undefined)
                    },
                );
            }
            Ok(())
        })
    }

    /// Fulfill with the first fulfillment. If every input rejects, reject
    /// with an AggregateError listing the reasons in input order.
    pub fn any<I>(scheduler: &SchedulerRef, inputs: I) -> Future
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let inputs = normalize(scheduler, inputs);
        Future::new(scheduler, move |resolve, reject| {
            let total = inputs.len();
            if total == 0 {
                reject.settle(Value::aggregate_error(Vec::new(), messages::ALL_REJECTED));
                return Ok(());
            }

            let reasons = Rc::new(RefCell::new(vec![Value::Undefined; total]));
            let rejected = Rc::new(Cell::new(0usize));
            for (index, input) in inputs.into_iter().enumerate() {
                let (reasons, rejected) = (reasons.clone(), rejected.clone());
                let (resolve, reject) = (resolve.clone(), reject.clone());
                input.then_or_else(
                    move |value| {
                        resolve.settle(value);
                        Ok(Value::Undefined)
                    },
                    move |reason| {
                        reasons.borrow_mut()[index] = reason;
                        rejected.set(rejected.get() + 1);
                        if rejected.get() == total {
                            let reasons = reasons.take();
                            reject.settle(Value::aggregate_error(reasons, messages::ALL_REJECTED));
                        }
                        Ok(Value::Undefined)
                    },
                );
            }
            Ok(())
        })
    }
}
