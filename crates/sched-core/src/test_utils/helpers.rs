//! Test fixtures: execution logs and canned callee ports.

use std::cell::RefCell;
use std::rc::Rc;

use crate::block::{CalleePort, UpdateBlock};
use crate::value::SignalValue;

/// A shared append-only log of executed step names.
///
/// Blocks created through [`ExecLog::block`] append their own name on every
/// run; tests assert on the resulting sequence.
#[derive(Clone, Default)]
pub struct ExecLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl ExecLog {
    pub fn new() -> Self {
        ExecLog::default()
    }

    /// An update block that logs its name each time it runs.
    pub fn block(&self, name: &str) -> Rc<UpdateBlock> {
        let entries = self.entries.clone();
        let logged = name.to_string();
        UpdateBlock::new(name, move || entries.borrow_mut().push(logged.clone()))
    }

    /// Append an arbitrary marker (used by method bodies).
    pub fn mark(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    /// Current log contents.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Drain and return the log.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

/// A callee port that logs `name` on invocation and echoes its argument.
pub fn method_port(log: &ExecLog, name: &str) -> Rc<CalleePort> {
    let log = log.clone();
    let logged = name.to_string();
    CalleePort::new(name, move |args| {
        log.mark(logged.clone());
        args
    })
}

/// A ready-guard port that logs `name` and always answers true.
pub fn rdy_port(log: &ExecLog, name: &str) -> Rc<CalleePort> {
    let log = log.clone();
    let logged = name.to_string();
    CalleePort::new(name, move |_| {
        log.mark(logged.clone());
        SignalValue::Bool(true)
    })
}
