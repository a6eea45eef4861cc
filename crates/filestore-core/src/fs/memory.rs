//! In-memory filesystem
//!
//! Keeps directories and files in maps behind a mutex. Useful for embedding
//! the store without touching the disk, and for tests: failures can be
//! injected per path and operation, calls can be slowed down, and directory
//! creations are counted.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::FileSystem;
use crate::storage::Operation;

#[derive(Debug, Default)]
struct MemoryState {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    failures: HashMap<(PathBuf, &'static str), io::ErrorKind>,
    latency: Option<Duration>,
    mkdir_calls: usize,
}

/// [`FileSystem`] held entirely in memory
///
/// Cloning shares the underlying tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `op` on `path` fail with `kind` until cleared
    pub fn fail(&self, path: impl Into<PathBuf>, op: Operation, kind: io::ErrorKind) {
        self.state
            .lock()
            .failures
            .insert((path.into(), op.as_str()), kind);
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().latency = latency;
    }

    /// Number of `mkdir` calls seen so far
    pub fn mkdir_calls(&self) -> usize {
        self.state.lock().mkdir_calls
    }

    /// Whether a file exists at `path`
    pub fn contains_file(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().files.contains_key(path.as_ref())
    }

    async fn enter(&self, path: &Path, op: Operation) -> io::Result<()> {
        let (latency, failure) = {
            let state = self.state.lock();
            let failure = state
                .failures
                .get(&(path.to_path_buf(), op.as_str()))
                .copied();
            (state.latency, failure)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match failure {
            Some(kind) => Err(io::Error::new(
                kind,
                format!("injected {} failure for {}", op.as_str(), path.display()),
            )),
            None => Ok(()),
        }
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        self.enter(path, Operation::Exists).await?;
        let state = self.state.lock();
        Ok(state.dirs.contains(path) || state.files.contains_key(path))
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        self.state.lock().mkdir_calls += 1;
        self.enter(path, Operation::CreateDirectory).await?;

        let mut state = self.state.lock();
        if state.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", path.display()),
            ));
        }
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                state.dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.enter(path, Operation::Write).await?;

        let mut state = self.state.lock();
        let parent_exists = path.parent().map_or(false, |p| state.dirs.contains(p));
        if !parent_exists {
            return Err(not_found(path));
        }
        if state.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("is a directory: {}", path.display()),
            ));
        }
        state.files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.enter(path, Operation::Read).await?;
        self.state
            .lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    async fn unlink(&self, path: &Path) -> io::Result<()> {
        self.enter(path, Operation::Delete).await?;
        self.state
            .lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    async fn ls(&self, path: &Path) -> io::Result<Vec<String>> {
        self.enter(path, Operation::List).await?;

        let state = self.state.lock();
        if !state.dirs.contains(path) {
            return Err(not_found(path));
        }

        let children = state
            .dirs
            .iter()
            .chain(state.files.keys())
            .filter(|entry| entry.parent() == Some(path))
            .filter_map(|entry| entry.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_requires_directory() {
        let fs = MemoryFs::new();
        let err = fs
            .write_file(Path::new("/store/key"), b"v")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        fs.mkdir(Path::new("/store")).await.unwrap();
        fs.write_file(Path::new("/store/key"), b"v").await.unwrap();
        assert_eq!(fs.read_file(Path::new("/store/key")).await.unwrap(), b"v");
    }

    #[tokio::test]
    async fn test_ls_lists_direct_children_only() {
        let fs = MemoryFs::new();
        fs.mkdir(Path::new("/store/nested")).await.unwrap();
        fs.write_file(Path::new("/store/a"), b"1").await.unwrap();
        fs.write_file(Path::new("/store/nested/b"), b"2").await.unwrap();

        let mut names = fs.ls(Path::new("/store")).await.unwrap();
        names.sort();
        assert_eq!(names, vec!["a", "nested"]);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let fs = MemoryFs::new();
        fs.mkdir(Path::new("/store")).await.unwrap();
        fs.write_file(Path::new("/store/a"), b"1").await.unwrap();
        fs.fail("/store/a", Operation::Delete, io::ErrorKind::PermissionDenied);

        let err = fs.unlink(Path::new("/store/a")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(fs.contains_file("/store/a"));

        fs.clear_failures();
        fs.unlink(Path::new("/store/a")).await.unwrap();
        assert!(!fs.contains_file("/store/a"));
    }

    #[tokio::test]
    async fn test_mkdir_counter() {
        let fs = MemoryFs::new();
        assert_eq!(fs.mkdir_calls(), 0);
        fs.mkdir(Path::new("/one")).await.unwrap();
        fs.mkdir(Path::new("/two")).await.unwrap();
        assert_eq!(fs.mkdir_calls(), 2);
        assert!(fs.exists(Path::new("/two")).await.unwrap());
    }
}
