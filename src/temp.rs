//! Temporary file management module
//!
//! This module provides RAII-based temporary file handling with automatic
//! cleanup. It backs the atomic write used for persisting the catalog: data is
//! written to a temp file next to the target and then renamed over it.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Guard for temporary resources that automatically cleans up on drop
#[derive(Debug)]
pub(crate) enum TempGuard {
    /// Temporary file that will be deleted when dropped
    ///
    /// An empty path means the file was moved away and nothing is deleted.
    File(PathBuf),
}

impl TempGuard {
    /// Get the path to the temporary resource
    pub(crate) fn path(&self) -> &Path {
        match self {
            TempGuard::File(path) => path,
        }
    }

    /// Atomically moves the temporary file to `target`
    ///
    /// On success the guard no longer deletes anything. On failure the
    /// temporary file is still removed when the guard is dropped.
    pub(crate) fn persist(mut self, target: &Path) -> io::Result<()> {
        match &mut self {
            TempGuard::File(path) => {
                fs::rename(&*path, target)?;
                *path = PathBuf::new();
            }
        }
        Ok(())
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        match self {
            TempGuard::File(path) if path.as_os_str().is_empty() => {}
            TempGuard::File(path) => {
                // Silently ignore errors during cleanup
                let _ = fs::remove_file(path);
            }
        }
    }
}

/// Creates a temporary file in `dir` holding `contents`
///
/// The file gets a unique name generated using ULID (monotonic, sortable
/// unique identifier) and is flushed to disk before the guard is returned.
/// Keeping it in the same directory as the final target makes the later
/// rename atomic.
///
/// # Examples
///
/// ```ignore
/// let temp = write_temp_file(dir, "streamiz_db", "tmp", b"{}")?;
/// temp.persist(&dir.join("streamiz_db.json"))?;
/// ```
pub(crate) fn write_temp_file(
    dir: &Path,
    prefix: &str,
    extension: &str,
    contents: &[u8],
) -> io::Result<TempGuard> {
    let ulid = ulid::Ulid::new();
    let filename = format!(".{}_{}.{}", prefix, ulid, extension);
    let path = dir.join(filename);

    let mut file = File::create(&path)?;
    // Guard first so a failed write still cleans up
    let guard = TempGuard::File(path);
    file.write_all(contents)?;
    file.sync_all()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = write_temp_file(dir.path(), "test", "tmp", b"hello").unwrap();
        let path = temp.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

        let filename = path.file_name().unwrap().to_str().unwrap();
        assert!(filename.starts_with(".test_"));
        assert!(filename.ends_with(".tmp"));

        drop(temp);
        assert!(!path.exists());
    }

    #[test]
    fn test_persist_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.json");
        fs::write(&target, "old").unwrap();

        let temp = write_temp_file(dir.path(), "test", "tmp", b"new").unwrap();
        let temp_path = temp.path().to_path_buf();
        temp.persist(&target).unwrap();

        assert!(!temp_path.exists());
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn test_persisted_file_survives_guard() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.json");

        for contents in [&b"first"[..], b"second"] {
            let temp = write_temp_file(dir.path(), "test", "tmp", contents).unwrap();
            temp.persist(&target).unwrap();
        }

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_multiple_temp_files_unique() {
        let dir = tempfile::tempdir().unwrap();
        let temp1 = write_temp_file(dir.path(), "test", "tmp", b"").unwrap();
        let temp2 = write_temp_file(dir.path(), "test", "tmp", b"").unwrap();

        assert_ne!(temp1.path(), temp2.path());
        assert!(temp1.path().exists());
        assert!(temp2.path().exists());
    }

    #[test]
    fn test_failed_persist_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let temp = write_temp_file(dir.path(), "test", "tmp", b"x").unwrap();
        let temp_path = temp.path().to_path_buf();

        let missing = dir.path().join("missing").join("target.json");
        assert!(temp.persist(&missing).is_err());
        assert!(!temp_path.exists());
    }
}
