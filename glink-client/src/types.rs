//! Shared geometry data types
//!
//! Typed values the client exposes to callers after converting remote
//! response payloads. Coordinates are f64 throughout; mesh arrays are kept
//! flat and index-based the way the service tessellates them.

use serde::{Deserialize, Serialize};

/// 3D point (also used for vectors in request payloads)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Tessellated mesh for one shape
///
/// `vertices` and `normals` are parallel arrays; `indices` refer into them
/// three per triangle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshData {
    /// Shape identifier assigned by the service
    pub shape_id: String,
    /// Vertex positions
    pub vertices: Vec<[f32; 3]>,
    /// Per-vertex normals
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of triangles in the mesh
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Service identification returned by the system-info probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Service version string
    pub version: String,
    /// Geometry kernel version string
    pub kernel_version: String,
}
