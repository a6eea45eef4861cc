//! Storage root readiness
//!
//! Every storage root gets a [`RootGate`]: a small state machine recording
//! whether the root directory is known to exist. The first operation to
//! reach an `Uninitialized` gate claims it, checks for the directory and
//! creates it if needed; everyone else waits on a watch channel for the
//! outcome. A failure is sticky for the lifetime of the gate. Switching the
//! store to another root installs a fresh gate.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::error::{StorageError, StorageResult};
use crate::fs::FileSystem;

/// Readiness of a storage root
#[derive(Debug, Clone)]
pub enum RootState {
    /// Nobody has checked the directory yet
    Uninitialized,
    /// A check or creation is in flight
    Initializing,
    /// The directory exists
    Ready,
    /// The directory could not be verified or created
    Failed(Arc<io::Error>),
}

impl RootState {
    pub fn is_ready(&self) -> bool {
        matches!(self, RootState::Ready)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RootState::Uninitialized => "uninitialized",
            RootState::Initializing => "initializing",
            RootState::Ready => "ready",
            RootState::Failed(_) => "failed",
        }
    }
}

/// Readiness gate for one storage root
#[derive(Debug)]
pub struct RootGate {
    path: PathBuf,
    state: watch::Sender<RootState>,
}

impl RootGate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (state, _) = watch::channel(RootState::Uninitialized);
        Self {
            path: path.into(),
            state,
        }
    }

    /// The root this gate guards
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state
    pub fn state(&self) -> RootState {
        self.state.borrow().clone()
    }

    /// Wait until the root directory exists, creating it on first use
    pub async fn ready(&self, fs: &dyn FileSystem) -> StorageResult<()> {
        let mut rx = self.state.subscribe();

        loop {
            let claimed = self.state.send_if_modified(|state| {
                if matches!(state, RootState::Uninitialized) {
                    *state = RootState::Initializing;
                    true
                } else {
                    false
                }
            });

            if claimed {
                return self.initialize(fs).await;
            }

            let current = rx.borrow_and_update().clone();
            match current {
                RootState::Ready => return Ok(()),
                RootState::Failed(source) => {
                    return Err(StorageError::RootUnavailable {
                        path: self.path.clone(),
                        source,
                    })
                }
                RootState::Uninitialized | RootState::Initializing => {}
            }

            // The sender lives as long as `self`, so this only waits
            let _ = rx.changed().await;
        }
    }

    async fn initialize(&self, fs: &dyn FileSystem) -> StorageResult<()> {
        let mut guard = InitGuard {
            gate: self,
            done: false,
        };

        let outcome = ensure_dir(fs, &self.path).await;
        guard.done = true;

        match outcome {
            Ok(()) => {
                self.state.send_replace(RootState::Ready);
                Ok(())
            }
            Err(error) => {
                warn!("Storage root {:?} is unavailable: {}", self.path, error);
                let shared = Arc::new(error);
                self.state.send_replace(RootState::Failed(shared.clone()));
                Err(StorageError::RootUnavailable {
                    path: self.path.clone(),
                    source: shared,
                })
            }
        }
    }
}

/// Resets an abandoned initialization so the next caller retries
struct InitGuard<'a> {
    gate: &'a RootGate,
    done: bool,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            debug!("Initialization of {:?} was cancelled", self.gate.path);
            self.gate.state.send_replace(RootState::Uninitialized);
        }
    }
}

async fn ensure_dir(fs: &dyn FileSystem, path: &Path) -> io::Result<()> {
    if fs.exists(path).await? {
        debug!("Storage root {:?} already exists", path);
        return Ok(());
    }

    fs.mkdir(path).await?;
    info!("Created storage root {:?}", path);
    Ok(())
}
