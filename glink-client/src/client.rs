//! High-level geometry service client
//!
//! Wraps the HTTP transport and the import tracker behind one connected
//! object. Construction probes the service so a bad address fails at
//! connect time, not on the first real call.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::import::events::{ImportEvent, ProgressObserver};
use crate::import::types::{BatchSubmission, ImportOptions, ImportResult, ImportTask};
use crate::import::{ImportTracker, ModelFileScanner};
use crate::service::{HttpGeometryService, ImportService};
use crate::types::{MeshData, Point3, SystemInfo};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Connected client for the remote geometry-modeling service
pub struct GeometryClient {
    config: ClientConfig,
    service: Arc<HttpGeometryService>,
    tracker: ImportTracker,
    system_info: SystemInfo,
}

impl GeometryClient {
    /// Connect to the service and probe its system-info endpoint
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let service = Arc::new(HttpGeometryService::new(&config)?);
        let system_info = service.system_info().await?;
        info!(
            server = %config.server_url,
            version = %system_info.version,
            kernel = %system_info.kernel_version,
            "Connected to geometry service"
        );

        let tracker = ImportTracker::new(
            Arc::clone(&service) as Arc<dyn ImportService>,
            &config,
        );

        Ok(Self {
            config,
            service,
            tracker,
            system_info,
        })
    }

    /// Service identification captured at connect time
    pub fn system_info(&self) -> &SystemInfo {
        &self.system_info
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Shape creation and scene control
    // ------------------------------------------------------------------

    pub async fn create_box(
        &self,
        position: Point3,
        width: f64,
        height: f64,
        depth: f64,
    ) -> Result<String> {
        self.service.create_box(position, width, height, depth).await
    }

    pub async fn create_sphere(&self, center: Point3, radius: f64) -> Result<String> {
        self.service.create_sphere(center, radius).await
    }

    pub async fn create_cylinder(&self, base: Point3, radius: f64, height: f64) -> Result<String> {
        self.service.create_cylinder(base, radius, height).await
    }

    pub async fn create_cone(
        &self,
        base: Point3,
        bottom_radius: f64,
        top_radius: f64,
        height: f64,
    ) -> Result<String> {
        self.service
            .create_cone(base, bottom_radius, top_radius, height)
            .await
    }

    /// Remove all shapes in this client's session
    pub async fn clear_all(&self) -> Result<String> {
        self.service.clear_all().await
    }

    /// Populate the server-side demo scene
    pub async fn create_demo_scene(&self) -> Result<String> {
        self.service.create_demo_scene().await
    }

    // ------------------------------------------------------------------
    // Mesh retrieval
    // ------------------------------------------------------------------

    /// Tessellated mesh for one shape
    pub async fn mesh_data(&self, shape_id: &str) -> Result<MeshData> {
        self.service.mesh_data(shape_id).await
    }

    /// All meshes in the session, streamed from the server
    pub async fn all_meshes(&self) -> Result<Vec<MeshData>> {
        self.service.all_meshes().await
    }

    // ------------------------------------------------------------------
    // Model import / export
    // ------------------------------------------------------------------

    /// Import a model file and block until it finishes
    ///
    /// Convenience over submit + wait; use [`import_model_async`] to keep
    /// the caller free.
    ///
    /// [`import_model_async`]: Self::import_model_async
    pub async fn import_model(
        &self,
        path: impl AsRef<Path>,
        options: ImportOptions,
        timeout: Duration,
    ) -> Result<ImportResult> {
        let task_id = self.tracker.submit(path, options, None);
        self.tracker.wait(&task_id, timeout).await
    }

    /// Submit an asynchronous import; returns the task id for tracking
    pub fn import_model_async(
        &self,
        path: impl AsRef<Path>,
        options: ImportOptions,
        observer: Option<ProgressObserver>,
    ) -> String {
        self.tracker.submit(path, options, observer)
    }

    /// Submit one import per existing path
    pub fn import_many(&self, paths: &[std::path::PathBuf], options: &ImportOptions) -> BatchSubmission {
        self.tracker.submit_many(paths, options)
    }

    /// Scan a directory for model files and submit them all
    pub fn import_directory(
        &self,
        root: impl AsRef<Path>,
        options: &ImportOptions,
    ) -> Result<BatchSubmission> {
        let scan = ModelFileScanner::new().scan(root.as_ref())?;
        info!(
            files = scan.files.len(),
            total_size = scan.total_size,
            "Submitting scanned model files"
        );
        Ok(self.tracker.submit_many(&scan.files, options))
    }

    /// Export shapes and write the model file locally
    pub async fn export_model(
        &self,
        shape_ids: &[String],
        format: &str,
        output: impl AsRef<Path>,
    ) -> Result<u64> {
        let bytes = self.service.export_model(shape_ids, format).await?;
        tokio::fs::write(output.as_ref(), &bytes).await?;
        info!(
            file = %output.as_ref().display(),
            size = bytes.len(),
            "Exported model"
        );
        Ok(bytes.len() as u64)
    }

    // ------------------------------------------------------------------
    // Import tracking pass-through
    // ------------------------------------------------------------------

    pub fn import_status(&self, task_id: &str) -> Option<ImportTask> {
        self.tracker.status(task_id)
    }

    pub fn cancel_import(&self, task_id: &str) -> bool {
        self.tracker.cancel(task_id)
    }

    pub fn active_imports(&self) -> Vec<ImportTask> {
        self.tracker.active_tasks()
    }

    pub async fn wait_for_import(&self, task_id: &str, timeout: Duration) -> Result<ImportResult> {
        self.tracker.wait(task_id, timeout).await
    }

    pub fn cleanup_completed_imports(&self) -> usize {
        self.tracker.cleanup()
    }

    /// Subscribe to milestone events for all import tasks
    pub fn subscribe_import_events(&self) -> tokio::sync::broadcast::Receiver<ImportEvent> {
        self.tracker.subscribe()
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Cancel outstanding imports, join workers, and notify the server
    pub async fn disconnect(self) {
        self.tracker.shutdown().await;
        match self.service.notify_disconnect().await {
            Ok(message) => info!(%message, "Server notified of disconnect"),
            Err(e) => warn!(error = %e, "Disconnect notification failed"),
        }
    }
}
