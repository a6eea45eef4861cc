//! File-per-key store
//!
//! The `FileStore` keeps one file per key under the configured storage
//! root. It owns the live configuration and the readiness gate of the
//! current root, and swaps both together when the configuration changes.
//!
//! ## Operation flow
//!
//! Every operation takes a snapshot of (configuration, gate) when it starts,
//! waits for the gate, maps the key to a path and calls one filesystem
//! primitive. A concurrent `config()` call never changes the snapshot an
//! operation is already working with.
//!
//! ## Usage
//!
//! ```ignore
//! let store = FileStore::new(Config::with_storage_path("/tmp/store"));
//!
//! store.set_item("persist:root", "{}").await?;
//! let value = store.get_item("persist:root").await?;
//! let keys = store.get_all_keys().await?;
//! ```
//!
//! Results are plain futures. Callback-style consumers can attach one with
//! `futures_util::FutureExt::inspect`.

use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigUpdate};
use crate::fs::{FileSystem, TokioFs};
use crate::storage::{Operation, RootGate, RootState, StorageError, StorageResult};

/// Configuration and the gate of its storage root, read together
#[derive(Clone)]
struct Snapshot {
    config: Arc<Config>,
    gate: Arc<RootGate>,
}

/// Asynchronous key-value store backed by one file per key
pub struct FileStore {
    fs: Arc<dyn FileSystem>,
    current: RwLock<Snapshot>,
}

/// Outcome of [`FileStore::clear`]
#[derive(Debug, Default)]
pub struct ClearReport {
    /// Keys found when the clear started
    pub keys: Vec<String>,
    /// Removals that failed
    pub failures: Vec<KeyFailure>,
}

/// A key that could not be removed
#[derive(Debug)]
pub struct KeyFailure {
    pub key: String,
    pub error: StorageError,
}

impl ClearReport {
    /// True when there was something to remove and all of it was removed
    ///
    /// An empty store reports `false` without any failure.
    pub fn removed(&self) -> bool {
        !self.keys.is_empty() && self.failures.is_empty()
    }

    /// Number of keys actually removed
    pub fn removed_count(&self) -> usize {
        self.keys.len() - self.failures.len()
    }
}

impl FileStore {
    /// Create a store on the local disk
    pub fn new(config: Config) -> Self {
        Self::with_fs(config, Arc::new(TokioFs::new()))
    }

    /// Create a store over any filesystem implementation
    pub fn with_fs(config: Config, fs: Arc<dyn FileSystem>) -> Self {
        let snapshot = Snapshot {
            gate: Arc::new(RootGate::new(config.storage_path.clone())),
            config: Arc::new(config),
        };
        let store = Self {
            fs,
            current: RwLock::new(snapshot.clone()),
        };
        store.prepare_in_background(&snapshot);
        store
    }

    /// Open a store with configuration from the default location
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Ok(Self::new(config))
    }

    /// Merge `update` into the live configuration
    ///
    /// Switching to a different storage root installs a new readiness gate;
    /// files under the previous root are left alone.
    pub fn config(&self, update: ConfigUpdate) {
        let snapshot = {
            let mut current = self.current.write();
            let mut config = (*current.config).clone();
            let root_changed = config.apply(update);

            current.config = Arc::new(config);
            if root_changed {
                info!("Switching storage root to {:?}", current.config.storage_path);
                current.gate = Arc::new(RootGate::new(current.config.storage_path.clone()));
                Some((*current).clone())
            } else {
                None
            }
        };

        if let Some(snapshot) = snapshot {
            self.prepare_in_background(&snapshot);
        }
    }

    /// Current configuration
    pub fn config_snapshot(&self) -> Arc<Config> {
        self.current.read().config.clone()
    }

    /// Readiness of the current storage root
    pub fn root_state(&self) -> RootState {
        self.current.read().gate.state()
    }

    /// Wait until the current storage root exists
    pub async fn ready(&self) -> StorageResult<()> {
        self.ready_snapshot().await.map(|_| ())
    }

    /// Store `value` under `key`, replacing any previous value
    pub async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let snapshot = self.ready_snapshot().await?;
        let config = &snapshot.config;
        let path = config.path_for_key(key);
        debug!("set_item {:?} -> {:?}", key, path);

        let data = config
            .encoding
            .encode(value)
            .map_err(|details| StorageError::InvalidEncoding {
                path: path.clone(),
                encoding: config.encoding,
                details,
            })?;

        call(config, Operation::Write, &path, self.fs.write_file(&path, &data)).await
    }

    /// Read the value stored under `key`
    ///
    /// A missing key is reported as [`StorageError::NotFound`] wrapping the
    /// original read error.
    pub async fn get_item(&self, key: &str) -> StorageResult<String> {
        let snapshot = self.ready_snapshot().await?;
        let config = &snapshot.config;
        let path = config.path_for_key(key);
        debug!("get_item {:?} -> {:?}", key, path);

        let bytes = call(config, Operation::Read, &path, self.fs.read_file(&path)).await?;
        config
            .encoding
            .decode(bytes)
            .map_err(|details| StorageError::InvalidEncoding {
                path,
                encoding: config.encoding,
                details,
            })
    }

    /// Read the value stored under `key`, or `None` if there is none
    pub async fn try_get_item(&self, key: &str) -> StorageResult<Option<String>> {
        match self.get_item(key).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete the value stored under `key`
    ///
    /// Removing a key that does not exist is an error.
    pub async fn remove_item(&self, key: &str) -> StorageResult<()> {
        let snapshot = self.ready_snapshot().await?;
        self.remove_in(&snapshot, key).await
    }

    /// List every key in the store, in directory listing order
    pub async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        let snapshot = self.ready_snapshot().await?;
        self.list_in(&snapshot).await
    }

    /// Remove every key
    ///
    /// Not atomic: removals run concurrently and each may fail on its own.
    /// A listing failure is returned as an error before anything is
    /// deleted; removal failures are collected in the report.
    pub async fn clear(&self) -> StorageResult<ClearReport> {
        let snapshot = self.ready_snapshot().await?;
        let keys = self.list_in(&snapshot).await?;
        if keys.is_empty() {
            debug!("clear: store is already empty");
            return Ok(ClearReport::default());
        }

        let outcomes = join_all(keys.iter().map(|key| self.remove_in(&snapshot, key))).await;

        let failures: Vec<KeyFailure> = keys
            .iter()
            .zip(outcomes)
            .filter_map(|(key, outcome)| {
                outcome.err().map(|error| KeyFailure {
                    key: key.clone(),
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            info!("Cleared {} keys from {:?}", keys.len(), snapshot.gate.path());
        } else {
            warn!(
                "Clear of {:?} removed {} of {} keys",
                snapshot.gate.path(),
                keys.len() - failures.len(),
                keys.len()
            );
        }

        Ok(ClearReport { keys, failures })
    }

    async fn ready_snapshot(&self) -> StorageResult<Snapshot> {
        let snapshot = self.current.read().clone();
        let gate = &snapshot.gate;

        match snapshot.config.timeout() {
            Some(timeout) => tokio::time::timeout(timeout, gate.ready(self.fs.as_ref()))
                .await
                .map_err(|_| StorageError::TimedOut {
                    op: Operation::CreateDirectory,
                    path: gate.path().to_path_buf(),
                    timeout,
                })??,
            None => gate.ready(self.fs.as_ref()).await?,
        }

        Ok(snapshot)
    }

    async fn remove_in(&self, snapshot: &Snapshot, key: &str) -> StorageResult<()> {
        let config = &snapshot.config;
        let path = config.path_for_key(key);
        debug!("remove_item {:?} -> {:?}", key, path);

        call(config, Operation::Delete, &path, self.fs.unlink(&path)).await
    }

    async fn list_in(&self, snapshot: &Snapshot) -> StorageResult<Vec<String>> {
        let config = &snapshot.config;
        let root = &config.storage_path;

        let names = call(config, Operation::List, root, self.fs.ls(root)).await?;
        let keys: Vec<String> = names
            .iter()
            .map(|name| config.from_file_name.apply(name))
            .collect();
        debug!("get_all_keys found {} keys in {:?}", keys.len(), root);
        Ok(keys)
    }

    /// Start checking a fresh root right away when a runtime is available
    fn prepare_in_background(&self, snapshot: &Snapshot) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let gate = snapshot.gate.clone();
        let fs = self.fs.clone();
        handle.spawn(async move {
            // Failures stay on the gate and surface on the next operation
            let _ = gate.ready(fs.as_ref()).await;
        });
    }
}

/// Run one filesystem call with the configured timeout and classify errors
async fn call<T, F>(config: &Config, op: Operation, path: &Path, fut: F) -> StorageResult<T>
where
    F: Future<Output = io::Result<T>>,
{
    let result = match config.timeout() {
        Some(timeout) => match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                return Err(StorageError::TimedOut {
                    op,
                    path: path.to_path_buf(),
                    timeout,
                })
            }
        },
        None => fut.await,
    };

    result.map_err(|error| {
        let error = StorageError::from_io(error, path.to_path_buf(), op);
        if error.is_not_found() {
            debug!("{}", error);
        } else {
            warn!("{}", error);
        }
        error
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Encoding;
    use crate::fs::MemoryFs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn memory_store(root: &str) -> (FileStore, MemoryFs) {
        let fs = MemoryFs::new();
        let store = FileStore::with_fs(Config::with_storage_path(root), Arc::new(fs.clone()));
        (store, fs)
    }

    fn disk_store(temp_dir: &TempDir) -> FileStore {
        FileStore::new(Config::with_storage_path(
            temp_dir.path().join("persistStore"),
        ))
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = disk_store(&temp_dir);

        store.set_item("persist:root", "{\"a\":1}").await.unwrap();
        assert_eq!(store.get_item("persist:root").await.unwrap(), "{\"a\":1}");

        // Stored under the mapped name
        let file = temp_dir.path().join("persistStore").join("persist-root");
        assert_eq!(std::fs::read_to_string(file).unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = disk_store(&temp_dir);

        store.set_item("key", "first").await.unwrap();
        store.set_item("key", "second").await.unwrap();
        store.set_item("key", "second").await.unwrap();

        assert_eq!(store.get_item("key").await.unwrap(), "second");
        assert_eq!(store.get_all_keys().await.unwrap(), vec!["key"]);
    }

    #[tokio::test]
    async fn test_root_created_lazily() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("a").join("b").join("persistStore");
        let store = FileStore::new(Config::with_storage_path(&root));

        assert!(store.get_all_keys().await.unwrap().is_empty());
        assert!(root.is_dir());
        assert!(store.root_state().is_ready());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (store, _fs) = memory_store("/store");

        let err = store.get_item("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(std::error::Error::source(&err).is_some());

        assert_eq!(store.try_get_item("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_other_failures_are_not_not_found() {
        let (store, fs) = memory_store("/store");
        store.set_item("locked", "v").await.unwrap();
        fs.fail("/store/locked", Operation::Read, io::ErrorKind::PermissionDenied);

        let err = store.get_item("locked").await.unwrap_err();
        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(store.try_get_item("locked").await.is_err());
    }

    #[tokio::test]
    async fn test_remove_is_not_idempotent() {
        let (store, _fs) = memory_store("/store");
        store.set_item("key", "v").await.unwrap();

        store.remove_item("key").await.unwrap();
        let err = store.remove_item("key").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.get_item("key").await.is_err());
    }

    #[tokio::test]
    async fn test_get_all_keys_maps_names_back() {
        let (store, _fs) = memory_store("/store");
        store.set_item("persist:root", "1").await.unwrap();
        store.set_item("persist:auth", "2").await.unwrap();

        let mut keys = store.get_all_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["persist:auth", "persist:root"]);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (store, _fs) = memory_store("/store");
        for i in 0..10 {
            store.set_item(&format!("key:{}", i), "v").await.unwrap();
        }

        let report = store.clear().await.unwrap();
        assert!(report.removed());
        assert_eq!(report.removed_count(), 10);
        assert!(store.get_all_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_empty_store() {
        let (store, _fs) = memory_store("/store");

        let report = store.clear().await.unwrap();
        assert!(!report.removed());
        assert!(report.failures.is_empty());
        assert!(report.keys.is_empty());
    }

    #[tokio::test]
    async fn test_clear_collects_every_failure() {
        let (store, fs) = memory_store("/store");
        for key in ["a", "b", "c", "d"] {
            store.set_item(key, "v").await.unwrap();
        }
        fs.fail("/store/b", Operation::Delete, io::ErrorKind::PermissionDenied);
        fs.fail("/store/d", Operation::Delete, io::ErrorKind::Other);

        let report = store.clear().await.unwrap();
        assert!(!report.removed());
        assert_eq!(report.removed_count(), 2);

        let mut failed: Vec<&str> = report.failures.iter().map(|f| f.key.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["b", "d"]);

        let mut left = store.get_all_keys().await.unwrap();
        left.sort();
        assert_eq!(left, vec!["b", "d"]);
    }

    #[tokio::test]
    async fn test_clear_stops_when_listing_fails() {
        let (store, fs) = memory_store("/store");
        store.set_item("a", "v").await.unwrap();
        fs.fail("/store", Operation::List, io::ErrorKind::PermissionDenied);

        assert!(store.clear().await.is_err());
        assert!(fs.contains_file("/store/a"));
    }

    #[tokio::test]
    async fn test_config_switches_root() {
        let temp_dir = TempDir::new().unwrap();
        let store = disk_store(&temp_dir);
        store.set_item("old", "1").await.unwrap();

        let new_root = temp_dir.path().join("other");
        store.config(ConfigUpdate::new().storage_path(&new_root));
        store.set_item("new", "2").await.unwrap();

        assert_eq!(store.get_all_keys().await.unwrap(), vec!["new"]);
        assert!(store.get_item("old").await.unwrap_err().is_not_found());
        assert!(temp_dir.path().join("persistStore").join("old").exists());
        assert_eq!(store.config_snapshot().storage_path, new_root);
    }

    #[tokio::test]
    async fn test_failed_root_reported_by_every_operation() {
        let fs = MemoryFs::new();
        fs.fail("/denied", Operation::CreateDirectory, io::ErrorKind::PermissionDenied);
        let store = FileStore::with_fs(Config::with_storage_path("/denied"), Arc::new(fs.clone()));

        assert!(matches!(
            store.set_item("k", "v").await.unwrap_err(),
            StorageError::RootUnavailable { .. }
        ));
        assert!(store.get_item("k").await.is_err());
        assert!(store.remove_item("k").await.is_err());
        assert!(store.get_all_keys().await.is_err());
        assert!(store.clear().await.is_err());
        assert!(matches!(store.root_state(), RootState::Failed(_)));

        // A new root gets a fresh gate
        store.config(ConfigUpdate::new().storage_path("/allowed"));
        store.set_item("k", "v").await.unwrap();
        assert!(fs.contains_file("/allowed/k"));
    }

    #[tokio::test]
    async fn test_encoding_change_applies_to_later_calls() {
        let (store, fs) = memory_store("/store");
        store.set_item("text", "hello").await.unwrap();

        store.config(ConfigUpdate::new().encoding(Encoding::Base64));
        assert_eq!(store.get_item("text").await.unwrap(), "aGVsbG8=");

        store.set_item("bin", "AAEC").await.unwrap();
        assert_eq!(
            fs.read_file(Path::new("/store/bin")).await.unwrap(),
            vec![0u8, 1, 2]
        );
    }

    #[tokio::test]
    async fn test_invalid_value_for_encoding() {
        let (store, fs) = memory_store("/store");
        store.config(ConfigUpdate::new().encoding(Encoding::Ascii));

        let err = store.set_item("k", "naïve").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidEncoding { .. }));
        assert!(!fs.contains_file("/store/k"));
    }

    #[tokio::test]
    async fn test_custom_mapping() {
        let (store, fs) = memory_store("/store");
        store.config(
            ConfigUpdate::new()
                .to_file_name(|key| format!("{}.json", key.replace('/', "_")))
                .from_file_name(|name| name.trim_end_matches(".json").replace('_', "/")),
        );

        store.set_item("users/42", "{}").await.unwrap();
        assert!(fs.contains_file("/store/users_42.json"));
        assert_eq!(store.get_all_keys().await.unwrap(), vec!["users/42"]);
    }

    #[tokio::test]
    async fn test_timeout() {
        let (store, fs) = memory_store("/store");
        store.ready().await.unwrap();

        fs.set_latency(Some(Duration::from_secs(60)));
        store.config(ConfigUpdate::new().timeout(Some(Duration::from_millis(20))));

        let err = store.get_item("slow").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::TimedOut {
                op: Operation::Read,
                ..
            }
        ));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_callback_style_continuation() {
        use futures_util::FutureExt;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (store, _fs) = memory_store("/store");
        let calls = AtomicUsize::new(0);

        store
            .set_item("k", "v")
            .inspect(|result| {
                assert!(result.is_ok());
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_config_snapshot_is_stable() {
        let (store, _fs) = memory_store("/store");
        let before = store.config_snapshot();

        store.config(ConfigUpdate::new().storage_path("/elsewhere"));

        assert_eq!(before.storage_path, PathBuf::from("/store"));
        assert_eq!(
            store.config_snapshot().storage_path,
            PathBuf::from("/elsewhere")
        );
    }
}
