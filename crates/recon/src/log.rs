//! Run log handed to the pipeline by its caller.

use std::cell::RefCell;

use crate::model::Warning;

pub trait RunLog {
    /// Progress line ("Merging with list prices").
    fn step(&self, message: &str);
    /// Non-fatal condition the operator should fix upstream.
    fn warn(&self, warning: &Warning);
}

/// Forwards to `tracing`; the binary's subscriber decides where lines go.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl RunLog for TracingLog {
    fn step(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, warning: &Warning) {
        tracing::warn!("{warning}");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Step(String),
    Warn(Warning),
}

/// Keeps every entry in memory. Used by tests.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: RefCell<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    pub fn steps(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| match e {
                LogEntry::Step(s) => Some(s.clone()),
                LogEntry::Warn(_) => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| match e {
                LogEntry::Warn(w) => Some(w.clone()),
                LogEntry::Step(_) => None,
            })
            .collect()
    }
}

impl RunLog for MemoryLog {
    fn step(&self, message: &str) {
        self.entries.borrow_mut().push(LogEntry::Step(message.to_string()));
    }

    fn warn(&self, warning: &Warning) {
        self.entries.borrow_mut().push(LogEntry::Warn(warning.clone()));
    }
}
