//! Import progress events and observer dispatch
//!
//! Each milestone transition emits one event carrying the full task
//! snapshot. Events fan out two ways: a `tokio::broadcast` channel any
//! number of subscribers can tap, and per-task observer callbacks
//! registered at submission. A misbehaving observer must never corrupt
//! tracker state or abort a worker, so observer panics are caught and
//! logged here.

use crate::import::types::ImportTask;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Caller-supplied progress callback, invoked with the task snapshot at
/// each milestone
pub type ProgressObserver = Arc<dyn Fn(&ImportTask) + Send + Sync>;

/// Events emitted during import tracking
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    /// Task registered and scheduled
    TaskSubmitted { task: ImportTask },

    /// Milestone progress update
    TaskProgress { task: ImportTask },

    /// Terminal: import succeeded
    TaskCompleted { task: ImportTask },

    /// Terminal: import failed or faulted
    TaskFailed { task: ImportTask },

    /// Terminal: task cancelled by the caller
    TaskCancelled { task: ImportTask },
}

impl ImportEvent {
    /// The snapshot carried by this event
    pub fn task(&self) -> &ImportTask {
        match self {
            ImportEvent::TaskSubmitted { task }
            | ImportEvent::TaskProgress { task }
            | ImportEvent::TaskCompleted { task }
            | ImportEvent::TaskFailed { task }
            | ImportEvent::TaskCancelled { task } => task,
        }
    }
}

/// Milestone event fan-out: broadcast channel + per-task observers
pub struct ImportNotifier {
    tx: broadcast::Sender<ImportEvent>,
    observers: RwLock<HashMap<String, Vec<ProgressObserver>>>,
}

impl ImportNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            observers: RwLock::new(HashMap::new()),
        }
    }

    /// New broadcast receiver for this notifier's events
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Register an observer for a task id (multiple observers per task are
    /// supported)
    pub fn register(&self, task_id: &str, observer: ProgressObserver) {
        self.observers
            .write()
            .expect("observer registry poisoned")
            .entry(task_id.to_string())
            .or_default()
            .push(observer);
    }

    /// Drop all observers registered for a task id
    pub fn unregister(&self, task_id: &str) {
        self.observers
            .write()
            .expect("observer registry poisoned")
            .remove(task_id);
    }

    /// Broadcast an event without invoking per-task observers
    ///
    /// Used for lifecycle events that are not milestones (submission).
    pub fn emit(&self, event: ImportEvent) {
        // No receivers is fine
        let _ = self.tx.send(event);
    }

    /// Broadcast a milestone event and invoke the task's observers
    pub fn notify(&self, event: ImportEvent) {
        let task = event.task().clone();

        let _ = self.tx.send(event);

        let observers: Vec<ProgressObserver> = {
            let registry = self.observers.read().expect("observer registry poisoned");
            match registry.get(&task.id) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        for observer in observers {
            let result = catch_unwind(AssertUnwindSafe(|| observer(&task)));
            if result.is_err() {
                warn!(task_id = %task.id, "Progress observer panicked; ignoring");
            } else {
                debug!(task_id = %task.id, progress = task.progress, "Observer notified");
            }
        }
    }
}
