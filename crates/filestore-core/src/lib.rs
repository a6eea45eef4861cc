//! filestore core library
//!
//! An asynchronous key-value storage engine that keeps one file per key in
//! a directory. It is meant to sit underneath a higher-level persistence or
//! caching layer; the directory listing is the whole index.
//!
//! # Quick Start
//!
//! ```text
//! let store = FileStore::new(Config::with_storage_path("/tmp/persistStore"));
//!
//! store.set_item("persist:root", "{}").await?;
//! let value = store.get_item("persist:root").await?;
//! let report = store.clear().await?;
//! ```
//!
//! # Modules
//!
//! - `store`: The `FileStore` facade (main entry point)
//! - `mapper`: Key ↔ file name mapping
//! - `encoding`: Value codecs
//! - `fs`: Filesystem primitives (disk and in-memory)
//! - `storage`: Errors and storage root readiness
//! - `config`: Store configuration

pub mod config;
pub mod encoding;
pub mod fs;
pub mod mapper;
pub mod storage;
pub mod store;

pub use config::{Config, ConfigUpdate};
pub use encoding::Encoding;
pub use fs::{FileSystem, MemoryFs, TokioFs};
pub use mapper::NameMapping;
pub use storage::{RootState, StorageError, StorageResult};
pub use store::{ClearReport, FileStore, KeyFailure};
