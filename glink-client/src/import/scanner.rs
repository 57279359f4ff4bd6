//! Model file scanner
//!
//! Recursive discovery of CAD model files under a root folder, feeding
//! batch import submission. Identification is by extension; the service
//! performs its own content detection at import time, so a stray file with
//! a model extension costs one failed task, not a crash.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Extensions the remote service can import
const MODEL_EXTENSIONS: &[&str] = &["step", "stp", "iges", "igs", "brep", "stl", "obj"];

/// Model file scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Scan result with statistics
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Model file paths found, in traversal order
    pub files: Vec<PathBuf>,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Count of files by extension (uppercased)
    pub by_format: HashMap<String, usize>,
    /// Non-fatal traversal errors encountered
    pub errors: Vec<String>,
}

/// Recursive model file scanner
pub struct ModelFileScanner {
    ignore_patterns: Vec<String>,
    max_depth: Option<usize>,
}

impl ModelFileScanner {
    /// Scanner with default ignore patterns (VCS and OS metadata dirs)
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".git".to_string(),
                ".svn".to_string(),
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
            ],
            max_depth: None,
        }
    }

    /// Limit traversal depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Add an ignore pattern (exact file/directory name match)
    pub fn with_ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_patterns.push(pattern.into());
        self
    }

    /// Scan a directory tree for model files
    pub fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut result = ScanResult::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    result.errors.push(e.to_string());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(format) = model_format(path) else {
                continue;
            };

            if let Ok(metadata) = entry.metadata() {
                result.total_size += metadata.len();
            }
            *result.by_format.entry(format).or_insert(0) += 1;
            result.files.push(path.to_path_buf());
        }

        tracing::debug!(
            files = result.files.len(),
            total_size = result.total_size,
            "Model file scan complete"
        );
        Ok(result)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        entry
            .file_name()
            .to_str()
            .map(|name| self.ignore_patterns.iter().any(|p| p == name))
            .unwrap_or(false)
    }
}

impl Default for ModelFileScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Uppercased model format for a path, or `None` if the extension is not a
/// known model format
fn model_format(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    MODEL_EXTENSIONS
        .contains(&ext.as_str())
        .then(|| ext.to_uppercase())
}
