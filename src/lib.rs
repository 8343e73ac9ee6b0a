//! # LogDB
//!
//! An append-only, time-indexed binary log store with:
//! - A two-level paging index embedded in the data file itself
//! - Bounded-cost appends that only ever touch the file's tail
//! - Timestamp-ordered traversal through page time ranges
//! - One coarse lock serializing all access to the shared handle
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                               │
//! │          (file header, page list, allocation, lock)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ owns, in file order
//!                       ▼
//!               ┌───────────────┐      rows      ┌─────────────────┐
//!               │  Major Page   │ ─────────────▶ │ Major Index Row │
//!               └───────────────┘                └────────┬────────┘
//!                                                         │ references
//!                                                         ▼
//!               ┌───────────────┐      rows      ┌─────────────────┐
//!               │  Minor Page   │ ─────────────▶ │ Record Index Row│
//!               └───────────────┘                └────────┬────────┘
//!                                                         │ references
//!                                                         ▼
//!                                                ┌─────────────────┐
//!                                                │     Record      │
//!                                                └─────────────────┘
//! ```
//!
//! Appends flow top-down to the tail Minor Page, then size and time-range
//! changes propagate back up to its Major Page header.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod tick;
pub mod page;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogDbError, Result};
pub use config::StoreConfig;
pub use codec::{ByteOrder, Codec, RandomAccess};
pub use page::{
    LogRecordEntry, MajorIndexEntry, MajorPage, MinorPage, PayloadSource, Record, Seekable,
    Streamed,
};
pub use store::{ContentAudit, FileHeader, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LogDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
