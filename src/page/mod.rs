//! Page Module
//!
//! The two-level paging index embedded in the store file.
//!
//! ## Responsibilities
//! - Encode and decode Major/Minor page headers and their table entries
//! - Append records into the tail Minor Page
//! - Propagate size and time-range changes up to the owning Major Page
//! - Derive every offset from a handful of stored fields plus [`Geometry`]
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ File header (66)                                                 │
//! │   "LogDB"(5) | version(2) | majorCap(2) | minorCap(2)            │
//! │   reserved(4) | flags(2) | padding(49)                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Major page                                                       │
//! │ ┌──────────────────────────────────────────────────────────────┐ │
//! │ │ Header (18): "PAGE"(4) | version(2) | contentSize(8)         │ │
//! │ │              usedEntries(2) | flags(2)                       │ │
//! │ ├──────────────────────────────────────────────────────────────┤ │
//! │ │ Table: majorCap × 26                                         │ │
//! │ │   start(8) | end(8) | contentOffset(8) | flags(2)            │ │
//! │ ├──────────────────────────────────────────────────────────────┤ │
//! │ │ Content: Minor pages, back to back                           │ │
//! │ │ ┌──────────────────────────────────────────────────────────┐ │ │
//! │ │ │ Header (34): "page"(4) | start(8) | end(8) | version(2)  │ │ │
//! │ │ │              contentSize(8) | usedEntries(2) | flags(2)  │ │ │
//! │ │ ├──────────────────────────────────────────────────────────┤ │ │
//! │ │ │ Table: minorCap × 18                                     │ │ │
//! │ │ │   timestamp(8) | contentOffset(8) | flags(2)             │ │ │
//! │ │ ├──────────────────────────────────────────────────────────┤ │ │
//! │ │ │ Content: records                                         │ │ │
//! │ │ │   timestamp(8) | version(2) | len(4) | flags(1) | bytes  │ │ │
//! │ │ └──────────────────────────────────────────────────────────┘ │ │
//! │ └──────────────────────────────────────────────────────────────┘ │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Major page ...                                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Content offsets in table entries are relative to the owning page's
//! content region. Nothing is ever moved once written, so the only page
//! that may grow is the last Minor Page of the last Major Page.

mod major;
mod major_entry;
mod minor;
mod record;

pub use major::MajorPage;
pub use major_entry::MajorIndexEntry;
pub use minor::{MinorPage, ParentLink};
pub use record::{LogRecordEntry, PayloadSource, Record, RecordDraft, Seekable, Streamed};

use crate::error::{LogDbError, Result};

// =============================================================================
// Format Constants
// =============================================================================

/// Format version written into every header
pub const FORMAT_VERSION: u16 = 0;

/// Tag at the start of the file header
pub const FILE_TAG: &[u8; 5] = b"LogDB";

/// Tag at the start of every Major Page header
pub const MAJOR_TAG: &[u8; 4] = b"PAGE";

/// Tag at the start of every Minor Page header
pub const MINOR_TAG: &[u8; 4] = b"page";

/// File header size, reserved space included
pub const FILE_HEADER_SIZE: u64 = 66;

/// Major Page header: tag(4) + version(2) + contentSize(8) + used(2) + flags(2)
pub const MAJOR_HEADER_SIZE: u64 = 18;

/// Major Page table entry: start(8) + end(8) + contentOffset(8) + flags(2)
pub const MAJOR_ENTRY_SIZE: u64 = 26;

/// Minor Page header: tag(4) + start(8) + end(8) + version(2) + contentSize(8) + used(2) + flags(2)
pub const MINOR_HEADER_SIZE: u64 = 34;

/// Minor Page table entry: timestamp(8) + contentOffset(8) + flags(2)
pub const MINOR_ENTRY_SIZE: u64 = 18;

/// Record header: timestamp(8) + version(2) + length(4) + flags(1)
pub const RECORD_HEADER_SIZE: u64 = 15;

/// Offset of `contentSize` inside a Minor Page header
pub const MINOR_CONTENT_SIZE_FIELD: u64 = 4 + 8 + 8 + 2;

/// Largest payload a single record may carry
pub const MAX_PAYLOAD_LEN: u64 = u32::MAX as u64 - 1;

/// Number of flag bits in page headers and table entries
pub const HEADER_FLAG_BITS: usize = 16;

/// Number of flag bits carried by a record
pub const RECORD_FLAG_BITS: usize = 8;

// =============================================================================
// Geometry
// =============================================================================

/// Page table capacities of one file, and everything derived from them
///
/// Sizes are computed on demand and never stored, so they cannot drift from
/// the capacities they come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Minor Page slots per Major Page
    pub major_capacity: u16,
    /// Record slots per Minor Page
    pub minor_capacity: u16,
}

impl Geometry {
    pub fn new(major_capacity: u16, minor_capacity: u16) -> Self {
        Self {
            major_capacity,
            minor_capacity,
        }
    }

    /// Bytes reserved for a Major Page table
    pub fn major_table_size(&self) -> u64 {
        u64::from(self.major_capacity) * MAJOR_ENTRY_SIZE
    }

    /// Major Page header plus table, excluding content
    pub fn major_page_size(&self) -> u64 {
        MAJOR_HEADER_SIZE + self.major_table_size()
    }

    /// Bytes reserved for a Minor Page table
    pub fn minor_table_size(&self) -> u64 {
        u64::from(self.minor_capacity) * MINOR_ENTRY_SIZE
    }

    /// Minor Page header plus table: the size of an empty Minor Page
    pub fn minor_page_size(&self) -> u64 {
        MINOR_HEADER_SIZE + self.minor_table_size()
    }
}

/// `base + len` for a size or offset read from disk.
///
/// A sum past `u64::MAX` can only come from a corrupt field, so it is
/// reported as `Corruption` at `offset` (the position of the structure that
/// holds the field).
pub(crate) fn checked_span(offset: u64, base: u64, len: u64, field: &str) -> Result<u64> {
    base.checked_add(len).ok_or_else(|| {
        tracing::warn!(offset, base, len, field, "size field overflows the address space");
        LogDbError::corruption(offset, format!("{} {} overflows from {}", field, len, base))
    })
}
