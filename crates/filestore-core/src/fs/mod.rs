//! Filesystem primitives
//!
//! The store only needs six primitives: existence check, directory
//! creation, whole-file write, whole-file read, unlink and a flat listing.
//! They sit behind [`FileSystem`] so the store can run against the real
//! disk ([`TokioFs`]) or an in-memory tree ([`MemoryFs`]).

mod local;
mod memory;

use std::io;
use std::path::Path;

use async_trait::async_trait;

pub use local::{TokioFs, TEMP_FILE_PREFIX};
pub use memory::MemoryFs;

/// Asynchronous filesystem capability used by the store
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Check whether anything exists at `path`
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Create `path` and any missing parents
    async fn mkdir(&self, path: &Path) -> io::Result<()>;

    /// Replace the contents of `path` with `data`
    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Read the full contents of `path`
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Delete the file at `path`; fails if it does not exist
    async fn unlink(&self, path: &Path) -> io::Result<()>;

    /// Names of the entries directly under `path`
    async fn ls(&self, path: &Path) -> io::Result<Vec<String>>;
}
