//! Disk-backed filesystem using `tokio::fs`
//!
//! Writes are atomic: data goes to a uniquely named temporary file in the
//! same directory, is synced, and is then renamed over the target. Readers
//! and concurrent writers see either the old or the new content in full.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::FileSystem;

/// Prefix of in-flight temporary files; such entries are never listed
pub const TEMP_FILE_PREFIX: &str = ".filestore-tmp-";

/// [`FileSystem`] backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

impl TokioFs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFs {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        fs::try_exists(path).await
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        atomic_write(path, data).await
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    async fn unlink(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }

    async fn ls(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = fs::read_dir(path).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(TEMP_FILE_PREFIX) {
                names.push(name);
            }
        }

        Ok(names)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The parent directory is not created; a missing parent is an error.
///
/// The write runs to completion on the blocking pool even if the returned
/// future is dropped. No temp file outlives it.
async fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let path = path.to_path_buf();
    let data = data.to_vec();

    tokio::task::spawn_blocking(move || atomic_write_blocking(&path, &data))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

fn atomic_write_blocking(path: &Path, data: &[u8]) -> io::Result<()> {
    let temp = TempFile::new(temp_path_for(path));

    let mut file = std::fs::File::create(&temp.path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&temp.path, path)?;
    temp.persisted();
    Ok(())
}

/// Staged write that removes its file on drop unless it was renamed
struct TempFile {
    path: PathBuf,
    persisted: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            persisted: false,
        }
    }

    fn persisted(mut self) {
        self.persisted = true;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Unique sibling of `path` for staging a write
fn temp_path_for(path: &Path) -> PathBuf {
    let name = format!("{}{}", TEMP_FILE_PREFIX, uuid::Uuid::new_v4().simple());
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
