//! Checkpoint store implementation
//!
//! Provides file-based checkpoint persistence with atomic writes.

use super::types::{Checkpoint, CheckpointRef};
use crate::config::CheckpointConfig;
use crate::error::{Error, Result};
use crate::stats::RunStats;
use crate::types::Record;
use chrono::Local;
use serde::Deserialize;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Saves and loads checkpoint files
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    /// Fixed file overwritten on every save
    path: Option<PathBuf>,
    /// Directory for generated file names
    dir: PathBuf,
}

/// Only the parts of a checkpoint needed to resume
#[derive(Deserialize)]
struct ResumeDocument {
    data: Vec<Record>,
    count: Option<usize>,
}

impl CheckpointStore {
    /// Create a store from configuration
    pub fn new(config: &CheckpointConfig) -> Self {
        Self {
            path: config.path.clone(),
            dir: config.dir.clone(),
        }
    }

    /// Store that always writes to `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            dir: PathBuf::from("."),
        }
    }

    /// Store that writes timestamped files under `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: None,
            dir: dir.into(),
        }
    }

    /// The fixed checkpoint path, if configured
    pub fn fixed_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Directory used for generated names
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the next save with `label` will write to
    pub fn resolve_path(&self, label: &str) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => {
                let stamp = Local::now().format("%Y%m%d_%H%M%S");
                self.dir
                    .join(format!("{}_{stamp}.json", sanitize_label(label)))
            }
        }
    }

    /// Write a checkpoint and return where it went.
    ///
    /// The document is written to a sibling temp file and renamed over the
    /// target, so readers never observe a half-written checkpoint.
    pub async fn save(&self, items: &[Record], stats: &RunStats, label: &str) -> Result<PathBuf> {
        let path = self.resolve_path(label);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::checkpoint(format!(
                    "Failed to create checkpoint directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let contents = serde_json::to_vec_pretty(&CheckpointRef::new(items, stats))?;

        let temp_path = temp_sibling(&path);
        tokio::fs::write(&temp_path, &contents).await.map_err(|e| {
            Error::checkpoint(format!(
                "Failed to write checkpoint {}: {e}",
                temp_path.display()
            ))
        })?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            // best effort; the rename error is what matters
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::checkpoint(format!(
                "Failed to replace checkpoint {}: {e}",
                path.display()
            )));
        }

        info!(
            "Checkpoint saved: {} ({} results)",
            path.display(),
            items.len()
        );
        Ok(path)
    }

    /// Load the items of a checkpoint for resuming.
    ///
    /// Never fails: a missing or unreadable file yields an empty vector and a
    /// warning.
    pub async fn load(&self, path: impl AsRef<Path>) -> Vec<Record> {
        let path = path.as_ref();

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Checkpoint file not found: {}", path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read checkpoint {}: {e}", path.display());
                return Vec::new();
            }
        };

        let document: ResumeDocument = match serde_json::from_str(&contents) {
            Ok(document) => document,
            Err(e) => {
                warn!("Ignoring invalid checkpoint {}: {e}", path.display());
                return Vec::new();
            }
        };

        if let Some(count) = document.count.filter(|c| *c != document.data.len()) {
            warn!(
                "Checkpoint {} records count {count} but holds {} results",
                path.display(),
                document.data.len()
            );
        }

        info!(
            "Loaded {} results from checkpoint {}",
            document.data.len(),
            path.display()
        );
        document.data
    }

    /// Load a complete checkpoint, failing on any problem
    pub async fn load_checkpoint(&self, path: impl AsRef<Path>) -> Result<Checkpoint> {
        let path = path.as_ref();
        debug!("Reading checkpoint {}", path.display());

        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::checkpoint(format!(
                "Failed to read checkpoint {}: {e}",
                path.display()
            ))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            Error::checkpoint(format!(
                "Failed to parse checkpoint {}: {e}",
                path.display()
            ))
        })
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new(&CheckpointConfig::default())
    }
}

/// Whitespace and path separators become underscores
fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();

    if cleaned.is_empty() {
        "checkpoint".to_string()
    } else {
        cleaned
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
