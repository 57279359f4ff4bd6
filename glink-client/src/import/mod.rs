//! Asynchronous model import subsystem
//!
//! [`tracker::ImportTracker`] is the entry point: submit files, poll or
//! wait for outcomes, observe milestone progress, cancel, and clean up.
//! Supporting modules carry the data contracts, the event fan-out, and
//! directory scanning for batch submission.

pub mod events;
pub mod scanner;
pub mod tracker;
pub mod types;

pub use events::{ImportEvent, ImportNotifier, ProgressObserver};
pub use scanner::{ModelFileScanner, ScanResult};
pub use tracker::{ImportTracker, TaskOutcome};
pub use types::{
    BatchSubmission, ImportOptions, ImportResult, ImportTask, ModelFileInfo, TaskState,
};
