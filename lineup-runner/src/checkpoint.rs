//! Checkpoint persistence: a result wrapped in a timestamped envelope and
//! written as pretty JSON.
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write never leaves a truncated checkpoint behind.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::result::{OptimizationResult, OptimizerKind, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("checkpoint is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("checkpoint schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub saved_at: DateTime<Utc>,
    pub optimizer: OptimizerKind,
    pub result: OptimizationResult,
}

impl Checkpoint {
    pub fn new(result: OptimizationResult) -> Self {
        Self {
            saved_at: Utc::now(),
            optimizer: result.optimizer,
            result,
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Persist `result` to `path`, creating parent directories as needed.
pub fn save_checkpoint(path: &Path, result: &OptimizationResult) -> Result<(), CheckpointError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let checkpoint = Checkpoint::new(result.clone());
    let json = serde_json::to_string_pretty(&checkpoint)?;

    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    tracing::debug!(
        event = "checkpoint_saved",
        path = %path.display(),
        optimizer = %checkpoint.optimizer,
        completed = result.count_completed,
        total = result.count_total,
    );
    Ok(())
}

pub fn load_checkpoint(path: &Path) -> Result<Checkpoint, CheckpointError> {
    let contents = fs::read_to_string(path)?;
    let checkpoint: Checkpoint = serde_json::from_str(&contents)?;
    if checkpoint.result.schema_version > SCHEMA_VERSION {
        return Err(CheckpointError::UnsupportedSchema {
            found: checkpoint.result.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(checkpoint)
}

// ─── Tests ───────────────────────────────────────────────────────────
