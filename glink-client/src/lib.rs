//! glink-client — client library for the GeomLink geometry-modeling service
//!
//! Talks to a remote geometry server: primitive creation, mesh retrieval,
//! CAD model import/export. The centerpiece is the asynchronous import
//! tracker ([`import::ImportTracker`]): submit a file, get a task id back
//! immediately, then poll, wait, observe milestone progress, cancel, and
//! clean up finished tasks.

pub mod client;
pub mod config;
pub mod error;
pub mod import;
pub mod service;
pub mod types;

pub use client::GeometryClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use import::{
    ImportEvent, ImportOptions, ImportResult, ImportTask, ImportTracker, TaskState,
};
pub use types::{MeshData, Point3, SystemInfo};
