//! Atomic file helpers.

use codex_error::{CodexResult, JsonError, StorageError, StorageErrorKind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Write bytes to `path` via a temp file and rename.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> CodexResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                parent.display(),
                e
            )))
        })?;
    }

    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, data).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            temp_path.display(),
            e
        )))
    })?;

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        )))
    })?;
    Ok(())
}

/// Read a file, `None` if it does not exist.
pub(crate) async fn read_optional(path: &Path) -> CodexResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::new(StorageErrorKind::FileRead(format!(
            "{}: {}",
            path.display(),
            e
        )))
        .into()),
    }
}

pub(crate) async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> CodexResult<()> {
    let data = serde_json::to_vec_pretty(value)
        .map_err(|e| JsonError::new(format!("serialize {}: {}", path.display(), e)))?;
    write_atomic(path, &data).await
}

pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> CodexResult<Option<T>> {
    let Some(data) = read_optional(path).await? else {
        return Ok(None);
    };
    let value = serde_json::from_slice(&data)
        .map_err(|e| JsonError::new(format!("parse {}: {}", path.display(), e)))?;
    Ok(Some(value))
}
