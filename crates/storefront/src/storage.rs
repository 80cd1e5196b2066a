//! Local key/value storage for shopper state.
//!
//! Each key is one JSON file in the storage directory, the server-side
//! counterpart of the browser's `localStorage`. Writes go to a temporary file
//! that is renamed into place, so a crash never leaves a half-written blob.
//!
//! Calls are synchronous and usually made with the session lock held. Inside
//! a multi-threaded tokio runtime the file I/O runs under
//! [`tokio::task::block_in_place`], so other tasks move to another worker
//! while a blob is read or written.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Errors from the local storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing a blob failed.
    #[error("Storage I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A blob is not valid JSON for the requested type.
    #[error("Storage JSON error for {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Keys become file names, so only `[A-Za-z0-9_-]` is allowed.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Directory-backed key/value store of JSON blobs.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    /// Open (and create if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the blobs.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Read and decode a blob. `Ok(None)` when the key was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not decode as `T`.
    pub fn get_item<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.path_for(key)?;
        let bytes = match blocking_io(|| fs::read(&path)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    key: key.to_string(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Json {
                key: key.to_string(),
                source,
            })
    }

    /// Read a blob, falling back to `T::default()` when it is missing or broken.
    ///
    /// Failures are logged; callers never see them.
    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.get_item(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable storage entry");
                T::default()
            }
        }
    }

    /// Encode and write a blob, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn set_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let json = serde_json::to_vec(value).map_err(|source| StorageError::Json {
            key: key.to_string(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        blocking_io(|| fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, &path)))
            .map_err(|source| StorageError::Io {
                key: key.to_string(),
                source,
            })
    }

    /// Delete a blob. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match blocking_io(|| fs::remove_file(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Run blocking file I/O without stalling a runtime worker.
///
/// `block_in_place` panics on a current-thread runtime, where `f` runs
/// directly instead.
fn blocking_io<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::temp_storage;

    #[test]
    fn test_set_get_remove() {
        let storage = temp_storage();

        assert_eq!(storage.get_item::<Vec<u32>>("numbers").unwrap(), None);

        storage.set_item("numbers", &vec![1, 2, 3]).unwrap();
        assert_eq!(
            storage.get_item::<Vec<u32>>("numbers").unwrap(),
            Some(vec![1, 2, 3])
        );

        storage.remove_item("numbers").unwrap();
        storage.remove_item("numbers").unwrap();
        assert_eq!(storage.get_item::<Vec<u32>>("numbers").unwrap(), None);
    }

    #[test]
    fn test_corrupt_blob_falls_back_to_default() {
        let storage = temp_storage();
        fs::write(storage.dir().join("shopping_cart.json"), b"{not json").unwrap();

        assert!(matches!(
            storage.get_item::<Vec<u32>>("shopping_cart"),
            Err(StorageError::Json { .. })
        ));
        assert_eq!(storage.get_or_default::<Vec<u32>>("shopping_cart"), Vec::<u32>::new());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_io_inside_multi_thread_runtime() {
        let storage = temp_storage();
        storage.set_item("numbers", &vec![4, 5]).unwrap();
        assert_eq!(storage.get_item::<Vec<u32>>("numbers").unwrap(), Some(vec![4, 5]));

        storage.remove_item("numbers").unwrap();
        assert_eq!(storage.get_item::<Vec<u32>>("numbers").unwrap(), None);
    }

    #[tokio::test]
    async fn test_io_inside_current_thread_runtime() {
        let storage = temp_storage();
        storage.set_item("numbers", &vec![1]).unwrap();
        assert_eq!(storage.get_item::<Vec<u32>>("numbers").unwrap(), Some(vec![1]));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let storage = temp_storage();
        assert!(matches!(
            storage.set_item("../escape", &1),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.get_item::<u32>(""),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
