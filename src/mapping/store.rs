//! JSON persistence of the mapping tables inside a data directory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::MappingError;
use crate::mapping::MappingTable;

pub const FORWARD_FILE: &str = "monarch-omim.json";
pub const REVERSE_FILE: &str = "omim-monarch.json";
pub const BACKUP_FILE: &str = "monarch-omim.backup.json";
pub const PARTIAL_FILE: &str = "monarch-omim.partial.json";

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn forward_path(&self) -> PathBuf {
        self.root.join(FORWARD_FILE)
    }

    pub fn reverse_path(&self) -> PathBuf {
        self.root.join(REVERSE_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.root.join(BACKUP_FILE)
    }

    pub fn partial_path(&self) -> PathBuf {
        self.root.join(PARTIAL_FILE)
    }
}

pub async fn read_table<V: DeserializeOwned>(
    path: &Path,
) -> Result<MappingTable<V>, MappingError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Replaces `path` with the pretty-printed table via a temp file and rename.
pub async fn write_table<V: Serialize>(
    path: &Path,
    table: &MappingTable<V>,
) -> Result<(), MappingError> {
    let mut body = serde_json::to_vec_pretty(table)?;
    body.push(b'\n');
    crate::utils::fs::write_atomic(path, &body).await
}

/// Copies an existing file at `path` to `backup`. Returns false when there was nothing to copy.
pub async fn backup_existing(path: &Path, backup: &Path) -> Result<bool, MappingError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            crate::utils::fs::write_atomic(backup, &bytes).await?;
            Ok(true)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
