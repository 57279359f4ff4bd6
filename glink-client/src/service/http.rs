//! HTTP/JSON implementation of the geometry service API
//!
//! One reqwest client, one base URL, and an `x-client-id` header on every
//! request so the server can keep per-client sessions apart. Mesh listing
//! streams newline-delimited JSON so large scenes do not have to be
//! buffered whole before the first mesh is usable.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::import::types::{ImportOptions, ImportResult};
use crate::service::wire;
use crate::service::ImportService;
use crate::types::{MeshData, Point3, SystemInfo};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const CLIENT_ID_HEADER: &str = "x-client-id";
const USER_AGENT: &str = concat!("glink-client/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the remote geometry service
pub struct HttpGeometryService {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    connect_timeout: Duration,
}

impl HttpGeometryService {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            connect_timeout: config.connect_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self
            .http
            .get(self.url(path))
            .header(CLIENT_ID_HEADER, &self.client_id)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .http
            .post(self.url(path))
            .header(CLIENT_ID_HEADER, &self.client_id)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, body));
        }
        Ok(response.json().await?)
    }

    fn status_error(status: StatusCode, body: String) -> ClientError {
        ClientError::Remote(format!("HTTP {}: {}", status.as_u16(), body.trim()))
    }

    /// Probe the service and return its identification
    ///
    /// Uses the short connect timeout so a down server fails fast.
    pub async fn system_info(&self) -> Result<SystemInfo> {
        let response = self
            .http
            .get(self.url("/api/system"))
            .header(CLIENT_ID_HEADER, &self.client_id)
            .timeout(self.connect_timeout)
            .send()
            .await?;
        let info: wire::SystemInfoResponse = Self::decode(response).await?;
        Ok(SystemInfo {
            version: info.version,
            kernel_version: info.kernel_version,
        })
    }

    /// Create a box primitive; returns the new shape id
    pub async fn create_box(
        &self,
        position: Point3,
        width: f64,
        height: f64,
        depth: f64,
    ) -> Result<String> {
        let request = wire::BoxRequest {
            position,
            width,
            height,
            depth,
        };
        self.shape_call("/api/shapes/box", &request).await
    }

    /// Create a sphere primitive; returns the new shape id
    pub async fn create_sphere(&self, center: Point3, radius: f64) -> Result<String> {
        let request = wire::SphereRequest { center, radius };
        self.shape_call("/api/shapes/sphere", &request).await
    }

    /// Create a cylinder primitive; returns the new shape id
    pub async fn create_cylinder(&self, base: Point3, radius: f64, height: f64) -> Result<String> {
        let request = wire::CylinderRequest {
            base,
            radius,
            height,
        };
        self.shape_call("/api/shapes/cylinder", &request).await
    }

    /// Create a cone primitive; returns the new shape id
    pub async fn create_cone(
        &self,
        base: Point3,
        bottom_radius: f64,
        top_radius: f64,
        height: f64,
    ) -> Result<String> {
        let request = wire::ConeRequest {
            base,
            bottom_radius,
            top_radius,
            height,
        };
        self.shape_call("/api/shapes/cone", &request).await
    }

    async fn shape_call<B: Serialize>(&self, path: &str, body: &B) -> Result<String> {
        let response: wire::ShapeResponse = self.post_json(path, body).await?;
        if response.success {
            debug!(shape_id = %response.shape_id, "Shape created");
            Ok(response.shape_id)
        } else {
            Err(ClientError::Remote(response.message))
        }
    }

    /// Remove all shapes in this client's session
    pub async fn clear_all(&self) -> Result<String> {
        let response: wire::StatusResponse =
            self.post_json("/api/shapes/clear", &serde_json::json!({})).await?;
        if response.success {
            Ok(response.message)
        } else {
            Err(ClientError::Remote(response.message))
        }
    }

    /// Ask the server to populate a demo scene
    pub async fn create_demo_scene(&self) -> Result<String> {
        let response: wire::StatusResponse =
            self.post_json("/api/shapes/demo", &serde_json::json!({})).await?;
        if response.success {
            Ok(response.message)
        } else {
            Err(ClientError::Remote(response.message))
        }
    }

    /// Fetch the tessellated mesh for one shape
    pub async fn mesh_data(&self, shape_id: &str) -> Result<MeshData> {
        let payload: wire::MeshPayload = self
            .get_json(&format!("/api/meshes/{}", shape_id))
            .await?;
        Ok(mesh_from_payload(payload))
    }

    /// Fetch all meshes as a newline-delimited JSON stream
    pub async fn all_meshes(&self) -> Result<Vec<MeshData>> {
        let response = self
            .http
            .get(self.url("/api/meshes"))
            .header(CLIENT_ID_HEADER, &self.client_id)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, body));
        }

        let mut meshes = Vec::new();
        let mut buffer = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
            while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                if let Some(mesh) = parse_mesh_line(&line)? {
                    debug!(shape_id = %mesh.shape_id, vertices = mesh.vertices.len(), "Received mesh");
                    meshes.push(mesh);
                }
            }
        }
        // Trailing line without a newline terminator
        if let Some(mesh) = parse_mesh_line(&buffer)? {
            meshes.push(mesh);
        }

        info!(count = meshes.len(), "Mesh stream complete");
        Ok(meshes)
    }

    /// Export shapes to a model format; returns the raw file bytes
    pub async fn export_model(&self, shape_ids: &[String], format: &str) -> Result<Vec<u8>> {
        let request = wire::ExportRequest { shape_ids, format };
        let response: wire::ExportResponse =
            self.post_json("/api/models/export", &request).await?;
        if !response.success {
            return Err(ClientError::Remote(response.message));
        }
        BASE64
            .decode(response.model_data.as_bytes())
            .map_err(|e| ClientError::Parse(format!("Invalid export payload: {}", e)))
    }

    /// Notify the server this client is going away (best-effort)
    pub async fn notify_disconnect(&self) -> Result<String> {
        let response: wire::StatusResponse = self
            .post_json("/api/session/disconnect", &serde_json::json!({}))
            .await?;
        if response.success {
            Ok(response.message)
        } else {
            Err(ClientError::Remote(response.message))
        }
    }
}

#[async_trait]
impl ImportService for HttpGeometryService {
    async fn import_file(&self, path: &Path, options: &ImportOptions) -> Result<ImportResult> {
        let file_path = path.display().to_string();
        let request = wire::ImportFileRequest {
            file_path: &file_path,
            options,
        };
        let response: wire::ImportFileResponse =
            self.post_json("/api/models/import", &request).await?;
        Ok(ImportResult {
            success: response.success,
            message: response.message,
            detected_format: response.detected_format,
            shape_ids: response.shape_ids,
            file_info: response.file_info,
        })
    }
}

fn mesh_from_payload(payload: wire::MeshPayload) -> MeshData {
    MeshData {
        shape_id: payload.shape_id,
        vertices: payload.vertices,
        normals: payload.normals,
        indices: payload.indices,
    }
}

fn parse_mesh_line(line: &[u8]) -> Result<Option<MeshData>> {
    let text = std::str::from_utf8(line)
        .map_err(|e| ClientError::Parse(format!("Non-UTF8 mesh stream: {}", e)))?
        .trim();
    if text.is_empty() {
        return Ok(None);
    }
    let payload: wire::MeshPayload = serde_json::from_str(text)
        .map_err(|e| ClientError::Parse(format!("Invalid mesh payload: {}", e)))?;
    Ok(Some(mesh_from_payload(payload)))
}
