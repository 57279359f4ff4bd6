//! Remote geometry service interface
//!
//! The import tracker depends on one collaborator: something that can
//! perform a blocking-from-the-worker's-view `import_file` call and
//! eventually return an outcome or fault. That seam is the [`ImportService`]
//! trait; the production implementation is [`http::HttpGeometryService`],
//! which also carries the non-core request/response endpoints (primitives,
//! meshes, export, session control).

pub mod http;

pub use http::HttpGeometryService;

use crate::error::Result;
use crate::import::types::{ImportOptions, ImportResult};
use async_trait::async_trait;
use std::path::Path;

/// The one operation the import tracker requires of the remote service
///
/// No latency bound is assumed; the call must eventually return an outcome
/// or fail with a transport/processing error.
#[async_trait]
pub trait ImportService: Send + Sync {
    /// Import a model file on the server; returns the service's outcome
    ///
    /// A `success == false` outcome is a normal result (the server
    /// processed the request and reports failure, e.g. file not found).
    /// An `Err` is a fault: transport breakage, malformed response, and
    /// similar.
    async fn import_file(&self, path: &Path, options: &ImportOptions) -> Result<ImportResult>;
}

// ============================================================================
// Wire payloads (HTTP/JSON transport detail, mirroring the service API)
// ============================================================================

pub(crate) mod wire {
    use crate::types::Point3;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct BoxRequest {
        pub position: Point3,
        pub width: f64,
        pub height: f64,
        pub depth: f64,
    }

    #[derive(Debug, Serialize)]
    pub struct SphereRequest {
        pub center: Point3,
        pub radius: f64,
    }

    #[derive(Debug, Serialize)]
    pub struct CylinderRequest {
        pub base: Point3,
        pub radius: f64,
        pub height: f64,
    }

    #[derive(Debug, Serialize)]
    pub struct ConeRequest {
        pub base: Point3,
        pub bottom_radius: f64,
        pub top_radius: f64,
        pub height: f64,
    }

    /// Response for shape-creation calls
    #[derive(Debug, Deserialize)]
    pub struct ShapeResponse {
        pub success: bool,
        #[serde(default)]
        pub message: String,
        #[serde(default)]
        pub shape_id: String,
    }

    /// Response for fire-and-report calls (clear, demo scene, disconnect)
    #[derive(Debug, Deserialize)]
    pub struct StatusResponse {
        pub success: bool,
        #[serde(default)]
        pub message: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct SystemInfoResponse {
        pub version: String,
        #[serde(default)]
        pub kernel_version: String,
    }

    /// One mesh as the service streams it
    #[derive(Debug, Deserialize)]
    pub struct MeshPayload {
        pub shape_id: String,
        pub vertices: Vec<[f32; 3]>,
        pub normals: Vec<[f32; 3]>,
        pub indices: Vec<u32>,
    }

    #[derive(Debug, Serialize)]
    pub struct ImportFileRequest<'a> {
        pub file_path: &'a str,
        pub options: &'a crate::import::types::ImportOptions,
    }

    #[derive(Debug, Deserialize)]
    pub struct ImportFileResponse {
        pub success: bool,
        #[serde(default)]
        pub message: String,
        #[serde(default)]
        pub detected_format: String,
        #[serde(default)]
        pub shape_ids: Vec<String>,
        #[serde(default)]
        pub file_info: Option<crate::import::types::ModelFileInfo>,
    }

    #[derive(Debug, Serialize)]
    pub struct ExportRequest<'a> {
        pub shape_ids: &'a [String],
        pub format: &'a str,
    }

    #[derive(Debug, Deserialize)]
    pub struct ExportResponse {
        pub success: bool,
        #[serde(default)]
        pub message: String,
        /// Base64-encoded model file bytes
        #[serde(default)]
        pub model_data: String,
    }
}
