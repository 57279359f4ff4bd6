//! Asynchronous import task tracking
//!
//! The tracker originates, tracks, and reports on import operations
//! without blocking the submitting thread, keeping at most one canonical
//! record per submitted operation. Each task owns a fine-grained lock on
//! its mutable record, a cancellation token, and a watch-channel outcome
//! slot that serves as the queryable, waitable operation handle; the
//! registry never serializes unrelated tasks.
//!
//! Workers advance a task through fixed milestones (0.1 preparing, 0.3
//! sending, 0.8 response received, 1.0 terminal) and notify observers at
//! each one. A bounded semaphore caps concurrently in-flight remote calls.
//!
//! Cancellation is best-effort beyond the local record: once the remote
//! call has been dispatched, cancelling drops the in-flight request future
//! but the server may still complete the import on its side. The local
//! guarantee is only that the record is marked inactive and no success
//! notification is delivered afterwards.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::import::events::{ImportEvent, ImportNotifier, ProgressObserver};
use crate::import::types::{BatchSubmission, ImportOptions, ImportResult, ImportTask};
use crate::service::ImportService;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Terminal outcome delivered through a task's operation handle
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// The remote call returned; carries the service outcome (which may
    /// itself report failure)
    Completed(ImportResult),
    /// The worker hit an unhandled fault
    Faulted(String),
    /// The task was cancelled before producing a result
    Cancelled,
}

/// Per-task bookkeeping: record lock, operation handle, cancellation
struct TaskEntry {
    record: Arc<Mutex<ImportTask>>,
    outcome_rx: watch::Receiver<Option<TaskOutcome>>,
    cancel: CancellationToken,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl TaskEntry {
    fn snapshot(&self) -> ImportTask {
        self.record.lock().expect("task record poisoned").clone()
    }

    fn is_complete(&self) -> bool {
        self.outcome_rx.borrow().is_some()
    }
}

/// Tracker for asynchronous model imports
///
/// All registries are instance-scoped; independent trackers share nothing
/// and are independently disposable via [`ImportTracker::shutdown`].
pub struct ImportTracker {
    service: Arc<dyn ImportService>,
    notifier: Arc<ImportNotifier>,
    tasks: RwLock<HashMap<String, Arc<TaskEntry>>>,
    limiter: Arc<Semaphore>,
    next_id: AtomicU64,
}

impl ImportTracker {
    pub fn new(service: Arc<dyn ImportService>, config: &ClientConfig) -> Self {
        Self::with_limits(
            service,
            config.max_concurrent_imports,
            config.event_capacity,
        )
    }

    pub fn with_limits(
        service: Arc<dyn ImportService>,
        max_concurrent: usize,
        event_capacity: usize,
    ) -> Self {
        Self {
            service,
            notifier: Arc::new(ImportNotifier::new(event_capacity)),
            tasks: RwLock::new(HashMap::new()),
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscribe to milestone events for all tasks
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ImportEvent> {
        self.notifier.subscribe()
    }

    /// Submit a model file for asynchronous import
    ///
    /// Returns immediately with the new task id; the path is not checked
    /// for existence here (the remote call reports missing files). Must be
    /// called from within a tokio runtime.
    pub fn submit(
        &self,
        path: impl AsRef<Path>,
        options: ImportOptions,
        observer: Option<ProgressObserver>,
    ) -> String {
        let path = path.as_ref().to_path_buf();
        let id = format!("import-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);

        let task = ImportTask::new(id.clone(), &path);
        let record = Arc::new(Mutex::new(task.clone()));
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        if let Some(observer) = observer {
            self.notifier.register(&id, observer);
        }

        let entry = Arc::new(TaskEntry {
            record: Arc::clone(&record),
            outcome_rx,
            cancel: cancel.clone(),
            join: Mutex::new(None),
        });
        self.tasks
            .write()
            .expect("task registry poisoned")
            .insert(id.clone(), Arc::clone(&entry));

        self.notifier.emit(ImportEvent::TaskSubmitted { task });

        let handle = tokio::spawn(run_worker(
            Arc::clone(&self.service),
            Arc::clone(&self.notifier),
            Arc::clone(&self.limiter),
            record,
            cancel,
            outcome_tx,
            path.clone(),
            options,
        ));
        *entry.join.lock().expect("join slot poisoned") = Some(handle);

        info!(task_id = %id, file = %path.display(), "Scheduled async import");
        id
    }

    /// Submit one task per existing path; missing paths are skipped and
    /// reported, not submitted
    pub fn submit_many(&self, paths: &[PathBuf], options: &ImportOptions) -> BatchSubmission {
        let mut batch = BatchSubmission::default();
        for path in paths {
            if path.exists() {
                let id = self.submit(path, options.clone(), None);
                batch.tasks.push((path.clone(), id));
            } else {
                warn!(file = %path.display(), "File not found; skipping import");
                batch.skipped.push(path.clone());
            }
        }
        batch
    }

    /// Non-blocking snapshot of one task; `None` for unknown ids
    pub fn status(&self, task_id: &str) -> Option<ImportTask> {
        let entry = self
            .tasks
            .read()
            .expect("task registry poisoned")
            .get(task_id)
            .cloned()?;
        Some(entry.snapshot())
    }

    /// Snapshot of all tasks currently active, in no particular order
    pub fn active_tasks(&self) -> Vec<ImportTask> {
        self.tasks
            .read()
            .expect("task registry poisoned")
            .values()
            .map(|entry| entry.snapshot())
            .filter(|task| task.is_active)
            .collect()
    }

    /// Total registered tasks (active and finished, pre-cleanup)
    pub fn task_count(&self) -> usize {
        self.tasks.read().expect("task registry poisoned").len()
    }

    /// Request cancellation of a task
    ///
    /// Applied iff the task is still active: the record is marked
    /// inactive/Cancelled, the worker is signalled, and a TaskCancelled
    /// notification fires. Returns whether cancellation was applied. A
    /// remote call already dispatched may still complete server-side.
    pub fn cancel(&self, task_id: &str) -> bool {
        let Some(entry) = self
            .tasks
            .read()
            .expect("task registry poisoned")
            .get(task_id)
            .cloned()
        else {
            return false;
        };

        let snapshot = {
            let mut task = entry.record.lock().expect("task record poisoned");
            if !task.is_active {
                return false;
            }
            task.is_active = false;
            task.status_message = "Cancelled".to_string();
            task.error = Some("cancelled by caller".to_string());
            task.clone()
        };

        entry.cancel.cancel();
        self.notifier.notify(ImportEvent::TaskCancelled { task: snapshot });
        info!(task_id = %task_id, "Import task cancelled");
        true
    }

    /// Block the calling task until the import completes or the deadline
    /// elapses
    ///
    /// Only the caller suspends; workers and other callers are unaffected.
    /// A remote failure is returned as a normal `ImportResult` with
    /// `success == false`; worker faults re-raise as `TaskFault`.
    pub async fn wait(&self, task_id: &str, timeout: Duration) -> Result<ImportResult> {
        let mut outcome_rx = {
            let tasks = self.tasks.read().expect("task registry poisoned");
            let entry = tasks
                .get(task_id)
                .ok_or_else(|| ClientError::TaskNotFound(task_id.to_string()))?;
            entry.outcome_rx.clone()
        };

        let outcome = match tokio::time::timeout(timeout, outcome_rx.wait_for(|o| o.is_some())).await
        {
            Err(_) => return Err(ClientError::WaitTimeout(task_id.to_string())),
            Ok(Err(_)) => {
                // Worker dropped its sender without reporting; should not
                // happen under the milestone protocol
                return Err(ClientError::TaskFault {
                    id: task_id.to_string(),
                    message: "import worker terminated without reporting an outcome".to_string(),
                });
            }
            Ok(Ok(guard)) => (*guard).clone().expect("predicate guarantees an outcome"),
        };

        match outcome {
            TaskOutcome::Completed(result) => Ok(result),
            TaskOutcome::Faulted(message) => Err(ClientError::TaskFault {
                id: task_id.to_string(),
                message,
            }),
            TaskOutcome::Cancelled => Err(ClientError::TaskCancelled(task_id.to_string())),
        }
    }

    /// Remove every task that is inactive and whose operation handle
    /// reports completion; never removes an active task
    pub fn cleanup(&self) -> usize {
        let removed: Vec<String> = {
            let mut tasks = self.tasks.write().expect("task registry poisoned");
            let finished: Vec<String> = tasks
                .iter()
                .filter(|(_, entry)| !entry.snapshot().is_active && entry.is_complete())
                .map(|(id, _)| id.clone())
                .collect();
            for id in &finished {
                tasks.remove(id);
            }
            finished
        };

        for id in &removed {
            self.notifier.unregister(id);
        }
        if !removed.is_empty() {
            info!(count = removed.len(), "Cleaned up completed import tasks");
        }
        removed.len()
    }

    /// Cancel outstanding work and join every worker
    ///
    /// Returns only after in-flight workers have finished or acknowledged
    /// cancellation. Call once, when the tracker is being retired.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = {
            let tasks = self.tasks.read().expect("task registry poisoned");
            tasks.keys().cloned().collect()
        };
        for id in &ids {
            self.cancel(id);
        }

        let handles: Vec<JoinHandle<()>> = {
            let tasks = self.tasks.read().expect("task registry poisoned");
            tasks
                .values()
                .filter_map(|entry| entry.join.lock().expect("join slot poisoned").take())
                .collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    warn!("Import worker panicked during shutdown");
                }
            }
        }
        info!("Import tracker shut down");
    }
}

/// Advance the record to a milestone and notify observers
///
/// Returns `None` when the record has already left the Active state
/// (cancelled out from under the worker), in which case the worker must
/// stop without further notifications.
fn milestone(
    record: &Mutex<ImportTask>,
    notifier: &ImportNotifier,
    progress: f64,
    message: Option<&str>,
) -> Option<ImportTask> {
    let snapshot = {
        let mut task = record.lock().expect("task record poisoned");
        if !task.is_active {
            return None;
        }
        task.progress = task.progress.max(progress);
        if let Some(message) = message {
            task.status_message = message.to_string();
        }
        task.clone()
    };
    notifier.notify(ImportEvent::TaskProgress {
        task: snapshot.clone(),
    });
    Some(snapshot)
}

#[allow(clippy::too_many_arguments)]
async fn run_worker(
    service: Arc<dyn ImportService>,
    notifier: Arc<ImportNotifier>,
    limiter: Arc<Semaphore>,
    record: Arc<Mutex<ImportTask>>,
    cancel: CancellationToken,
    outcome_tx: watch::Sender<Option<TaskOutcome>>,
    path: PathBuf,
    options: ImportOptions,
) {
    // Wait for a pool slot; cancellation before start exits here
    let _permit = tokio::select! {
        _ = cancel.cancelled() => {
            let _ = outcome_tx.send(Some(TaskOutcome::Cancelled));
            return;
        }
        permit = Arc::clone(&limiter).acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                let _ = outcome_tx.send(Some(TaskOutcome::Cancelled));
                return;
            }
        }
    };

    if milestone(&record, &notifier, 0.1, Some("Preparing import...")).is_none() {
        let _ = outcome_tx.send(Some(TaskOutcome::Cancelled));
        return;
    }
    if milestone(&record, &notifier, 0.3, Some("Sending to server...")).is_none() {
        let _ = outcome_tx.send(Some(TaskOutcome::Cancelled));
        return;
    }

    let response = tokio::select! {
        _ = cancel.cancelled() => {
            // Dropping the request future aborts the client side only; the
            // server may still finish the import. The record was already
            // marked inactive by cancel().
            let _ = outcome_tx.send(Some(TaskOutcome::Cancelled));
            return;
        }
        response = service.import_file(&path, &options) => response,
    };

    match response {
        Ok(result) => {
            if milestone(&record, &notifier, 0.8, None).is_none() {
                let _ = outcome_tx.send(Some(TaskOutcome::Cancelled));
                return;
            }

            let terminal = {
                let mut task = record.lock().expect("task record poisoned");
                if !task.is_active {
                    None
                } else {
                    if result.success {
                        task.shape_ids = result.shape_ids.clone();
                        task.progress = 1.0;
                        task.status_message =
                            format!("Import completed: {} shapes", result.shape_ids.len());
                    } else {
                        task.error = Some(result.message.clone());
                        task.status_message = format!("Import failed: {}", result.message);
                    }
                    task.is_active = false;
                    Some(task.clone())
                }
            };

            match terminal {
                Some(task) if result.success => {
                    notifier.notify(ImportEvent::TaskCompleted { task });
                }
                Some(task) => {
                    notifier.notify(ImportEvent::TaskFailed { task });
                }
                None => {
                    let _ = outcome_tx.send(Some(TaskOutcome::Cancelled));
                    return;
                }
            }
            let _ = outcome_tx.send(Some(TaskOutcome::Completed(result)));
        }
        Err(e) => {
            let message = e.to_string();
            let terminal = {
                let mut task = record.lock().expect("task record poisoned");
                if !task.is_active {
                    None
                } else {
                    task.error = Some(message.clone());
                    task.status_message = format!("Import fault: {}", message);
                    task.is_active = false;
                    Some(task.clone())
                }
            };
            if let Some(task) = terminal {
                notifier.notify(ImportEvent::TaskFailed { task });
                let _ = outcome_tx.send(Some(TaskOutcome::Faulted(message)));
            } else {
                let _ = outcome_tx.send(Some(TaskOutcome::Cancelled));
            }
        }
    }
}
