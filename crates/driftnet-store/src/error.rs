//! Store-specific error types

use thiserror::Error;

/// Errors from bundle store operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Store is full and the arrival does not outrank any resident
    #[error("Buffer full (capacity: {capacity})")]
    BufferFull { capacity: usize },

    /// Bundle id not present in the store
    #[error("Bundle not found: {0}")]
    NotFound(String),

    /// Bundle id already resident
    #[error("Duplicate bundle: {0}")]
    Duplicate(String),

    /// Capacity must be at least 1
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(usize),
}
