//! Debug copies of received uploads

use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// How debug images are named on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugImagePolicy {
    /// Always write `debug_image.jpg`, keeping only the latest upload
    #[default]
    Overwrite,
    /// Write `debug_image_<n>.jpg`, one file per upload, `n` starting at 1
    Sequence,
}

/// Writes raw upload bytes for offline inspection.
///
/// The sequence counter lives for the lifetime of the store, so it restarts
/// at 1 only when the process does.
pub struct DebugImageStore {
    dir: PathBuf,
    policy: DebugImagePolicy,
    counter: AtomicU64,
    overwrite_lock: Mutex<()>,
}

impl DebugImageStore {
    pub fn new(dir: impl Into<PathBuf>, policy: DebugImagePolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
            counter: AtomicU64::new(0),
            overwrite_lock: Mutex::new(()),
        }
    }

    /// Persist one upload, returning the path written
    pub fn save(&self, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let path = match self.policy {
            DebugImagePolicy::Overwrite => {
                let path = self.dir.join("debug_image.jpg");
                let _guard = self
                    .overwrite_lock
                    .lock()
                    .map_err(|e| StorageError::Lock(e.to_string()))?;
                std::fs::write(&path, bytes).map_err(|e| StorageError::io(&path, e))?;
                path
            }
            DebugImagePolicy::Sequence => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
                let path = self.dir.join(format!("debug_image_{}.jpg", n));
                std::fs::write(&path, bytes).map_err(|e| StorageError::io(&path, e))?;
                path
            }
        };

        debug!("Wrote {} byte debug image to {}", bytes.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_overwrite_keeps_latest() {
        let dir = TempDir::new().unwrap();
        let store = DebugImageStore::new(dir.path(), DebugImagePolicy::Overwrite);

        let first = store.save(b"first").unwrap();
        let second = store.save(b"second").unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_sequence_starts_at_one() {
        let dir = TempDir::new().unwrap();
        let store = DebugImageStore::new(dir.path(), DebugImagePolicy::Sequence);

        assert_eq!(store.save(b"a").unwrap(), dir.path().join("debug_image_1.jpg"));
        assert_eq!(store.save(b"b").unwrap(), dir.path().join("debug_image_2.jpg"));
    }

    #[test]
    fn test_sequence_is_unique_under_concurrency() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DebugImageStore::new(dir.path(), DebugImagePolicy::Sequence));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..10).map(|_| store.save(b"x").unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut paths = HashSet::new();
        for handle in handles {
            paths.extend(handle.join().unwrap());
        }
        assert_eq!(paths.len(), 80);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 80);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = DebugImageStore::new(dir.path().join("gone"), DebugImagePolicy::Overwrite);
        assert!(matches!(store.save(b"x"), Err(StorageError::Io { .. })));
    }
}
