//! Integration tests for the asynchronous import tracker
//!
//! A scriptable mock stands in for the remote service so every milestone,
//! failure, fault, cancellation, and timeout path can be driven
//! deterministically.

use async_trait::async_trait;
use glink_client::error::{ClientError, Result};
use glink_client::import::{ImportEvent, ImportOptions, ImportResult, ImportTracker, TaskState};
use glink_client::service::ImportService;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted behavior for one file name
#[derive(Debug, Clone)]
enum Behavior {
    /// Return success with these shape ids after the delay
    Success(Vec<&'static str>, Duration),
    /// Return a failure outcome with this message
    Failure(&'static str),
    /// Fail the call itself (worker-level fault)
    Fault(&'static str),
}

/// Mock remote service keyed by submitted file name
struct MockService {
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: AtomicUsize,
}

impl MockService {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            behaviors: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn script(self: Arc<Self>, file_name: &str, behavior: Behavior) -> Arc<Self> {
        self.behaviors
            .lock()
            .unwrap()
            .insert(file_name.to_string(), behavior);
        self
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImportService for MockService {
    async fn import_file(&self, path: &Path, _options: &ImportOptions) -> Result<ImportResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or(Behavior::Success(vec!["S1"], Duration::from_millis(0)));

        match behavior {
            Behavior::Success(shape_ids, delay) => {
                tokio::time::sleep(delay).await;
                Ok(ImportResult {
                    success: true,
                    message: "imported".to_string(),
                    detected_format: "STEP".to_string(),
                    shape_ids: shape_ids.iter().map(|s| s.to_string()).collect(),
                    file_info: None,
                })
            }
            Behavior::Failure(message) => Ok(ImportResult {
                success: false,
                message: message.to_string(),
                ..ImportResult::default()
            }),
            Behavior::Fault(message) => Err(ClientError::Remote(message.to_string())),
        }
    }
}

fn tracker_with(service: Arc<MockService>, max_concurrent: usize) -> ImportTracker {
    ImportTracker::with_limits(service, max_concurrent, 64)
}

#[tokio::test]
async fn successful_import_follows_milestones() {
    let service = MockService::new().script(
        "a.step",
        Behavior::Success(vec!["S1", "S2"], Duration::from_millis(10)),
    );
    let tracker = tracker_with(service, 5);

    let seen: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let task_id = tracker.submit(
        "a.step",
        ImportOptions::default(),
        Some(Arc::new(move |task| {
            seen_clone.lock().unwrap().push(task.progress);
        })),
    );

    let result = tracker
        .wait(&task_id, Duration::from_secs(5))
        .await
        .expect("import should succeed");
    assert!(result.success);
    assert_eq!(result.shape_ids, vec!["S1", "S2"]);

    let task = tracker.status(&task_id).expect("task still registered");
    assert!(!task.is_active);
    assert_eq!(task.state(), TaskState::Succeeded);
    assert_eq!(task.progress, 1.0);
    assert_eq!(task.shape_ids, vec!["S1", "S2"]);
    assert!(task.error.is_none());
    assert_eq!(task.status_message, "Import completed: 2 shapes");

    // Observer saw the fixed milestones, in non-decreasing order
    let progresses = seen.lock().unwrap().clone();
    assert!(progresses.windows(2).all(|w| w[0] <= w[1]));
    for expected in [0.1, 0.3, 0.8, 1.0] {
        assert!(
            progresses.iter().any(|p| (p - expected).abs() < 1e-9),
            "missing milestone {expected} in {progresses:?}"
        );
    }
}

#[tokio::test]
async fn failed_import_records_error() {
    let service = MockService::new().script("missing.step", Behavior::Failure("file not found"));
    let tracker = tracker_with(service, 5);

    let task_id = tracker.submit("missing.step", ImportOptions::default(), None);

    // A remote failure is a normal result, not an error
    let result = tracker
        .wait(&task_id, Duration::from_secs(5))
        .await
        .expect("remote failure is not a wait error");
    assert!(!result.success);
    assert_eq!(result.message, "file not found");

    let task = tracker.status(&task_id).unwrap();
    assert!(!task.is_active);
    assert_eq!(task.state(), TaskState::Failed);
    assert_eq!(task.error.as_deref(), Some("file not found"));
    assert!(task.shape_ids.is_empty());
    assert_eq!(task.status_message, "Import failed: file not found");
}

#[tokio::test]
async fn fault_is_reraised_to_the_waiter() {
    let service = MockService::new().script("bad.step", Behavior::Fault("connection reset"));
    let tracker = tracker_with(service, 5);

    let task_id = tracker.submit("bad.step", ImportOptions::default(), None);

    let err = tracker
        .wait(&task_id, Duration::from_secs(5))
        .await
        .expect_err("fault must re-raise");
    match err {
        ClientError::TaskFault { id, message } => {
            assert_eq!(id, task_id);
            assert!(message.contains("connection reset"));
        }
        other => panic!("expected TaskFault, got {other:?}"),
    }

    let task = tracker.status(&task_id).unwrap();
    assert!(!task.is_active);
    assert_eq!(task.state(), TaskState::Failed);
    assert!(task.error.as_deref().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn wait_on_unknown_id_is_not_found() {
    let tracker = tracker_with(MockService::new(), 5);
    let err = tracker
        .wait("import-999", Duration::from_secs(1))
        .await
        .expect_err("unknown id");
    assert!(matches!(err, ClientError::TaskNotFound(_)));
}

#[tokio::test]
async fn wait_times_out_without_mutating_the_task() {
    let service = MockService::new().script(
        "slow.step",
        Behavior::Success(vec!["S1"], Duration::from_secs(30)),
    );
    let tracker = tracker_with(service, 5);

    let task_id = tracker.submit("slow.step", ImportOptions::default(), None);

    let err = tracker
        .wait(&task_id, Duration::from_millis(50))
        .await
        .expect_err("deadline must pass first");
    assert!(matches!(err, ClientError::WaitTimeout(_)));

    // The task itself is untouched by the timed-out wait
    let task = tracker.status(&task_id).unwrap();
    assert!(task.is_active);
    assert_eq!(task.state(), TaskState::Active);
    assert!(task.error.is_none());

    tracker.shutdown().await;
}

#[tokio::test]
async fn concurrent_submissions_get_distinct_ids() {
    let mut service = MockService::new();
    for i in 0..10 {
        service = service.script(
            &format!("f{i}.step"),
            Behavior::Success(vec!["S1"], Duration::from_millis(100)),
        );
    }
    let tracker = tracker_with(service, 4);

    let mut ids = Vec::new();
    for i in 0..10 {
        ids.push(tracker.submit(format!("f{i}.step"), ImportOptions::default(), None));
    }

    let distinct: HashSet<&String> = ids.iter().collect();
    assert_eq!(distinct.len(), 10);

    // All still registered, none completed yet given the service delay
    assert_eq!(tracker.active_tasks().len(), 10);

    for id in &ids {
        let result = tracker.wait(id, Duration::from_secs(10)).await.unwrap();
        assert!(result.success);
    }
    assert!(tracker.active_tasks().is_empty());
}

#[tokio::test]
async fn cancel_before_start_prevents_the_remote_call() {
    // One permit: the first task occupies the pool while the second waits
    let service = MockService::new()
        .script(
            "first.step",
            Behavior::Success(vec!["S1"], Duration::from_millis(300)),
        )
        .script(
            "second.step",
            Behavior::Success(vec!["S2"], Duration::from_millis(0)),
        );
    let tracker = tracker_with(Arc::clone(&service), 1);

    let first = tracker.submit("first.step", ImportOptions::default(), None);
    let second = tracker.submit("second.step", ImportOptions::default(), None);

    assert!(tracker.cancel(&second), "cancel should apply");

    let task = tracker.status(&second).unwrap();
    assert!(!task.is_active);
    assert_eq!(task.status_message, "Cancelled");

    let err = tracker
        .wait(&second, Duration::from_secs(5))
        .await
        .expect_err("cancelled task has no result");
    assert!(matches!(err, ClientError::TaskCancelled(_)));

    // First task is unaffected
    let result = tracker.wait(&first, Duration::from_secs(5)).await.unwrap();
    assert!(result.success);

    // The cancelled worker never reached the service
    assert_eq!(service.call_count(), 1);

    // Cancelling a terminal task is a no-op
    assert!(!tracker.cancel(&second));
    assert!(!tracker.cancel(&first));
}

#[tokio::test]
async fn cleanup_never_removes_active_tasks() {
    let service = MockService::new().script(
        "slow.step",
        Behavior::Success(vec!["S1"], Duration::from_millis(200)),
    );
    let tracker = tracker_with(service, 5);

    let task_id = tracker.submit("slow.step", ImportOptions::default(), None);

    // Still running: cleanup must not touch it
    assert_eq!(tracker.cleanup(), 0);
    assert_eq!(tracker.task_count(), 1);

    tracker.wait(&task_id, Duration::from_secs(5)).await.unwrap();

    assert_eq!(tracker.cleanup(), 1);
    assert_eq!(tracker.task_count(), 0);
    assert!(tracker.status(&task_id).is_none());
}

#[tokio::test]
async fn observer_panic_does_not_abort_the_worker() {
    let service = MockService::new().script(
        "a.step",
        Behavior::Success(vec!["S1"], Duration::from_millis(10)),
    );
    let tracker = tracker_with(service, 5);

    let task_id = tracker.submit(
        "a.step",
        ImportOptions::default(),
        Some(Arc::new(|_task| panic!("observer bug"))),
    );

    let result = tracker
        .wait(&task_id, Duration::from_secs(5))
        .await
        .expect("worker must survive observer panics");
    assert!(result.success);

    let task = tracker.status(&task_id).unwrap();
    assert_eq!(task.state(), TaskState::Succeeded);
    assert_eq!(task.progress, 1.0);
}

#[tokio::test]
async fn submit_many_skips_missing_paths() {
    let dir = tempfile::tempdir().unwrap();
    let existing_a = dir.path().join("a.step");
    let existing_b = dir.path().join("b.brep");
    std::fs::write(&existing_a, b"step data").unwrap();
    std::fs::write(&existing_b, b"brep data").unwrap();
    let missing = dir.path().join("ghost.step");

    let tracker = tracker_with(MockService::new(), 5);
    let batch = tracker.submit_many(
        &[existing_a.clone(), missing.clone(), existing_b.clone()],
        &ImportOptions::default(),
    );

    assert_eq!(batch.tasks.len(), 2);
    assert_eq!(batch.skipped, vec![missing]);
    assert_eq!(batch.task_ids().len(), 2);

    for id in batch.task_ids() {
        tracker.wait(&id, Duration::from_secs(5)).await.unwrap();
    }
}

#[tokio::test]
async fn shutdown_waits_for_workers() {
    let service = MockService::new()
        .script(
            "a.step",
            Behavior::Success(vec!["S1"], Duration::from_secs(30)),
        )
        .script(
            "b.step",
            Behavior::Success(vec!["S2"], Duration::from_secs(30)),
        );
    let tracker = tracker_with(service, 5);

    let a = tracker.submit("a.step", ImportOptions::default(), None);
    let b = tracker.submit("b.step", ImportOptions::default(), None);

    // Must return once workers acknowledge cancellation, not after 30s
    tokio::time::timeout(Duration::from_secs(5), tracker.shutdown())
        .await
        .expect("shutdown must not hang");

    for id in [&a, &b] {
        let task = tracker.status(id).unwrap();
        assert!(!task.is_active);
        assert_eq!(task.status_message, "Cancelled");
    }
}

#[tokio::test]
async fn events_carry_full_snapshots() {
    let service = MockService::new().script(
        "a.step",
        Behavior::Success(vec!["S1"], Duration::from_millis(10)),
    );
    let tracker = tracker_with(service, 5);
    let mut events = tracker.subscribe();

    let task_id = tracker.submit("a.step", ImportOptions::default(), None);
    tracker.wait(&task_id, Duration::from_secs(5)).await.unwrap();

    let mut saw_submitted = false;
    let mut saw_completed = false;
    let mut last_progress = 0.0f64;

    while let Ok(Ok(event)) =
        tokio::time::timeout(Duration::from_millis(200), events.recv()).await
    {
        let task = event.task().clone();
        assert_eq!(task.id, task_id);
        assert!(task.progress >= last_progress, "progress regressed");
        last_progress = task.progress;
        match event {
            ImportEvent::TaskSubmitted { .. } => saw_submitted = true,
            ImportEvent::TaskCompleted { task } => {
                saw_completed = true;
                assert_eq!(task.shape_ids, vec!["S1"]);
            }
            _ => {}
        }
    }

    assert!(saw_submitted);
    assert!(saw_completed);
}
