//! Storage layer
//!
//! Error taxonomy for store operations and readiness tracking for the
//! storage root.

pub mod error;
pub mod readiness;

pub use error::{Operation, StorageError, StorageResult};
pub use readiness::{RootGate, RootState};
