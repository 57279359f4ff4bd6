//! Import task data model
//!
//! Shared contracts between the tracker, its workers, and callers. A task
//! snapshot is a plain value; the tracker owns the mutable record and hands
//! out clones, so callers never observe a half-applied milestone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options passed at import submission time
///
/// Immutable after construction; `Default` supplies the service defaults
/// and nothing is inferred later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Let the service detect the file format from content
    pub auto_detect_format: bool,
    /// Forced format override (empty = none)
    pub force_format: String,
    /// Import color attributes where the format carries them
    pub import_colors: bool,
    /// Import shape names where the format carries them
    pub import_names: bool,
    /// Numeric precision tolerance for the import
    pub precision: f64,
    /// Merge imported shapes into a single compound
    pub merge_shapes: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            auto_detect_format: true,
            force_format: String::new(),
            import_colors: true,
            import_names: true,
            precision: 0.01,
            merge_shapes: false,
        }
    }
}

/// Metadata about an imported model file, reported by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFileInfo {
    pub filename: String,
    pub file_size: u64,
    pub shape_count: u32,
    pub format: String,
    pub creation_time: String,
}

/// Outcome of one import operation
///
/// Only the fields relevant to the observed outcome are set; check
/// `success` before trusting `shape_ids`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub message: String,
    pub detected_format: String,
    pub shape_ids: Vec<String>,
    pub file_info: Option<ModelFileInfo>,
}

/// Task state derived from the record fields
///
/// A task is in exactly one of these states at every observation point;
/// `is_active` is true iff the state is `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Active,
    Succeeded,
    Failed,
}

/// One tracked import operation (caller-facing snapshot)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportTask {
    /// Tracker-scoped identifier ("import-N")
    pub id: String,
    /// Path submitted for import
    pub source_path: String,
    /// File name portion of the path
    pub display_name: String,
    /// Uppercased extension captured at creation; advisory only
    pub format_hint: String,
    /// Milestone progress in [0.0, 1.0], non-decreasing
    pub progress: f64,
    /// True from creation until the operation terminates
    pub is_active: bool,
    /// Last human-readable status; overwritten at each milestone
    pub status_message: String,
    /// Resulting shape identifiers; populated only on success
    pub shape_ids: Vec<String>,
    /// Terminal failure description; mutually exclusive with success
    pub error: Option<String>,
    /// Creation timestamp, informational only
    pub started_at: DateTime<Utc>,
}

impl ImportTask {
    /// Build a fresh Active record for a submitted path
    pub fn new(id: String, path: &Path) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let format_hint = path
            .extension()
            .map(|e| e.to_string_lossy().to_uppercase())
            .unwrap_or_default();

        Self {
            id,
            source_path: path.display().to_string(),
            display_name,
            format_hint,
            progress: 0.0,
            is_active: true,
            status_message: "Starting...".to_string(),
            shape_ids: Vec::new(),
            error: None,
            started_at: Utc::now(),
        }
    }

    /// Current state per the Active/Succeeded/Failed invariant
    pub fn state(&self) -> TaskState {
        if self.is_active {
            TaskState::Active
        } else if self.error.is_some() {
            TaskState::Failed
        } else {
            TaskState::Succeeded
        }
    }
}

/// Result of a batch submission
///
/// Paths that did not exist locally are skipped, not submitted; they are
/// reported here rather than surfaced as worker failures.
#[derive(Debug, Clone, Default)]
pub struct BatchSubmission {
    /// Submitted path → task id
    pub tasks: Vec<(std::path::PathBuf, String)>,
    /// Paths skipped because they do not exist
    pub skipped: Vec<std::path::PathBuf>,
}

impl BatchSubmission {
    /// Task ids in submission order
    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|(_, id)| id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_options_match_service_defaults() {
        let options = ImportOptions::default();
        assert!(options.auto_detect_format);
        assert!(options.force_format.is_empty());
        assert!(options.import_colors);
        assert!(options.import_names);
        assert!((options.precision - 0.01).abs() < f64::EPSILON);
        assert!(!options.merge_shapes);
    }

    #[test]
    fn new_task_captures_name_and_format_hint() {
        let task = ImportTask::new("import-1".to_string(), &PathBuf::from("/models/part.step"));
        assert_eq!(task.display_name, "part.step");
        assert_eq!(task.format_hint, "STEP");
        assert_eq!(task.progress, 0.0);
        assert_eq!(task.state(), TaskState::Active);
    }

    #[test]
    fn state_follows_record_fields() {
        let mut task = ImportTask::new("import-1".to_string(), &PathBuf::from("a.brep"));
        assert_eq!(task.state(), TaskState::Active);

        task.is_active = false;
        task.shape_ids = vec!["S1".to_string()];
        assert_eq!(task.state(), TaskState::Succeeded);

        task.error = Some("boom".to_string());
        assert_eq!(task.state(), TaskState::Failed);
    }
}
