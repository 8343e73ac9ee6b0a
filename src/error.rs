//! Error types for LogDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LogDbError
pub type Result<T> = std::result::Result<T, LogDbError>;

/// Unified error type for LogDB operations
///
/// Every variant is fatal to the call that raised it. Nothing is retried
/// internally, and a failure part-way through an append may leave the file
/// with a header that disagrees with its table (there is no journal).
#[derive(Debug, Error)]
pub enum LogDbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    /// A magic tag or structural field did not match what was expected at
    /// this position.
    #[error("Corruption detected at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    // -------------------------------------------------------------------------
    // Allocation Errors
    // -------------------------------------------------------------------------
    /// A page table has no free slot left. The store's allocation policy
    /// should have moved on to a new page before this point.
    #[error("Capacity exceeded: page at offset {offset} is full ({capacity} entries)")]
    CapacityExceeded { offset: u64, capacity: u16 },

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogDbError {
    /// Shorthand for building a `Corruption` error.
    pub(crate) fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        LogDbError::Corruption {
            offset,
            reason: reason.into(),
        }
    }
}
