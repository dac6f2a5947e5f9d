//! Exclusive lock on a data directory.

use codex_error::{CodexResult, StorageError, StorageErrorKind};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock on a data directory, released on drop.
///
/// A session that loads the whole codex and writes it back holds this lock
/// for its lifetime. A second session on the same directory is rejected with
/// a conflict instead of overwriting the first one's work.
///
/// # Examples
///
/// ```
/// use codex_error::ErrorClass;
/// use codex_storage::DirectoryLock;
///
/// let dir = tempfile::TempDir::new().unwrap();
/// let held = DirectoryLock::acquire(dir.path()).unwrap();
/// let err = DirectoryLock::acquire(dir.path()).unwrap_err();
/// assert_eq!(err.class(), ErrorClass::Conflict);
///
/// drop(held);
/// assert!(DirectoryLock::acquire(dir.path()).is_ok());
/// ```
#[derive(Debug)]
pub struct DirectoryLock {
    file: File,
    path: PathBuf,
}

impl DirectoryLock {
    /// Name of the lock file inside the data directory.
    pub const FILE_NAME: &'static str = "codex.lock";

    /// Take the lock on `root`, creating the directory if needed.
    ///
    /// Never blocks.
    ///
    /// # Errors
    ///
    /// `Locked` (a conflict) when another session holds the directory;
    /// `DirectoryCreation` or `FileWrite` when the lock file cannot be
    /// opened.
    #[tracing::instrument(skip(root), fields(root = %root.display()))]
    pub fn acquire(root: &Path) -> CodexResult<Self> {
        std::fs::create_dir_all(root).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;
        let path = root.join(Self::FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            })?;

        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            let kind = if e.raw_os_error() == fs4::lock_contended_error().raw_os_error() {
                StorageErrorKind::Locked(root.display().to_string())
            } else {
                StorageErrorKind::FileWrite(format!("{}: {}", path.display(), e))
            };
            return Err(StorageError::new(kind).into());
        }
        tracing::debug!(path = %path.display(), "Locked data directory");
        Ok(Self { file, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        match FileExt::unlock(&self.file) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Released data directory"),
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "Failed to release data directory"),
        }
    }
}
