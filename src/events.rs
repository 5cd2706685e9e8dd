//! Outbound notifications: tree change events, import/export progress, and the
//! observer list that delivers them.
//!
//! Collaborators subscribe explicitly and receive events synchronously on the
//! thread that performed the operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Handle returned by [`Observers::subscribe`].
pub type SubscriptionId = u64;

type Callback<E> = Box<dyn Fn(&E) + Send + Sync>;

/// An ordered list of event callbacks.
pub struct Observers<E> {
    next_id: SubscriptionId,
    callbacks: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            callbacks: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    pub fn emit(&self, event: &E) {
        for (_, callback) in &self.callbacks {
            callback(event);
        }
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A successful tree mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeChange {
    Added { parent: Vec<String>, name: String },
    Renamed { parent: Vec<String>, old_name: String, new_name: String },
    Updated { parent: Vec<String>, name: String },
    Visited { parent: Vec<String>, name: String },
    Deleted { parent: Vec<String>, name: String },
    Moved { from: Vec<String>, name: String, to: Vec<String> },
    Imported { name: String, count: usize },
    Replaced,
}

/// Which interchange operation a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Import,
    Export,
}

/// Advisory progress report. `percent` never decreases within one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub operation: Operation,
    pub percent: u8,
    pub phase: String,
}

/// Cooperative cancellation flag shared between a caller and a long decode.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
