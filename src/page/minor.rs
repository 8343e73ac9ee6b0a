//! Minor Page
//!
//! A fixed-capacity table of record entries followed by an appendable
//! content region holding the records themselves.
//!
//! ## Append Path
//! ```text
//! create_entry(ts, payload)
//!   ├─ table row   @ table_offset + 18 × used
//!   ├─ record      @ content_start + content_size
//!   ├─ own header  (used, end time, content size)
//!   └─ parent      MajorPage::apply_minor_update
//!                    ├─ index row (start, end, offset)
//!                    └─ major header (content size)
//! ```
//! The whole sequence runs against one `&mut Codec`, i.e. under the single
//! store lock. Nothing makes it atomic: a failure part-way leaves the
//! headers behind the table.

use std::io::{Read, Seek, Write};

use tracing::{trace, warn};

use crate::codec::Codec;
use crate::error::{LogDbError, Result};

use super::major::MajorPage;
use super::record::{LogRecordEntry, PayloadSource, Record, RecordDraft};
use super::{
    checked_span, Geometry, FORMAT_VERSION, HEADER_FLAG_BITS, MINOR_CONTENT_SIZE_FIELD,
    MINOR_ENTRY_SIZE, MINOR_HEADER_SIZE, MINOR_TAG,
};

/// Non-owning link from a Minor Page to the Major Page row that references it
///
/// Positions never change once written, so the link stays valid for the
/// life of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    /// Absolute offset of the owning Major Page
    pub major_offset: u64,
    /// Row in the owning Major Page's table
    pub slot: u16,
}

/// A decoded Minor Page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinorPage {
    /// Absolute offset of the page header
    pub offset: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub version: u16,
    /// Sum of the encoded sizes of every record in the content region
    pub content_size: u64,
    pub used_entries: u16,
    pub flags: Vec<bool>,
    /// Table rows `0..used_entries`
    pub entries: Vec<LogRecordEntry>,
    pub parent: ParentLink,
    geometry: Geometry,
}

impl MinorPage {
    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decode the Minor Page at the current position
    pub fn decode<H: Read + Seek>(
        codec: &mut Codec<H>,
        geometry: Geometry,
        parent: ParentLink,
    ) -> Result<Self> {
        let offset = codec.position()?;

        if !codec.read_constant_string(MINOR_TAG)? {
            warn!(offset, "minor page tag mismatch");
            return Err(LogDbError::corruption(offset, "minor page tag mismatch"));
        }

        let start_time = codec.read_u64()?;
        let end_time = codec.read_u64()?;
        let version = codec.read_u16()?;
        let content_size = codec.read_u64()?;
        let used_entries = codec.read_u16()?;
        let flags = codec.read_bit_flags(HEADER_FLAG_BITS / 8)?;

        if used_entries > geometry.minor_capacity {
            warn!(offset, used_entries, "minor page table overflows its capacity");
            return Err(LogDbError::corruption(
                offset,
                format!(
                    "minor page claims {} entries with capacity {}",
                    used_entries, geometry.minor_capacity
                ),
            ));
        }

        let content_start = offset + geometry.minor_page_size();
        checked_span(offset, content_start, content_size, "minor page content size")?;

        let entries = (0..used_entries)
            .map(|_| LogRecordEntry::decode(codec))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            offset,
            start_time,
            end_time,
            version,
            content_size,
            used_entries,
            flags,
            entries,
            parent,
            geometry,
        })
    }

    /// Read the total size of the Minor Page at `offset` straight from its
    /// header, without decoding the table.
    pub fn absolute_size_at<H: Read + Seek>(
        codec: &mut Codec<H>,
        geometry: Geometry,
        offset: u64,
    ) -> Result<u64> {
        codec.seek_to(offset + MINOR_CONTENT_SIZE_FIELD)?;
        let content_size = codec.read_u64()?;
        checked_span(offset, geometry.minor_page_size(), content_size, "minor page content size")
    }

    // =========================================================================
    // Derived Offsets
    // =========================================================================

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Absolute offset of the first table row
    pub fn table_offset(&self) -> u64 {
        self.offset + MINOR_HEADER_SIZE
    }

    /// Absolute offset of the content region
    pub fn content_start(&self) -> u64 {
        self.offset + self.geometry.minor_page_size()
    }

    /// Absolute offset just past the last record
    pub fn end(&self) -> u64 {
        self.content_start() + self.content_size
    }

    /// Header, table, and content together
    pub fn absolute_size(&self) -> u64 {
        self.geometry.minor_page_size() + self.content_size
    }

    /// Free table rows
    pub fn remaining_capacity(&self) -> u16 {
        self.geometry.minor_capacity.saturating_sub(self.used_entries)
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Write a fresh, empty Minor Page at `offset`: header plus a zeroed table.
    pub(crate) fn write_empty<H: Write + Seek>(
        codec: &mut Codec<H>,
        geometry: Geometry,
        offset: u64,
        start_time: u64,
    ) -> Result<()> {
        codec.seek_to(offset)?;
        codec.write_fixed_chars(MINOR_TAG)?;
        codec.write_u64(start_time)?;
        codec.write_u64(start_time)?;
        codec.write_u16(FORMAT_VERSION)?;
        codec.write_u64(0)?;
        codec.write_u16(0)?;
        codec.write_bit_flags(&[false; HEADER_FLAG_BITS])?;
        codec.write_zeros(geometry.minor_table_size())?;
        Ok(())
    }

    /// Rewrite this page's header fields (the tag is left alone).
    pub fn rewrite_header<H: Write + Seek>(&self, codec: &mut Codec<H>) -> Result<()> {
        codec.seek_to(self.offset + MINOR_TAG.len() as u64)?;
        codec.write_u64(self.start_time)?;
        codec.write_u64(self.end_time)?;
        codec.write_u16(self.version)?;
        codec.write_u64(self.content_size)?;
        codec.write_u16(self.used_entries)?;
        codec.write_bit_flags(&self.flags)?;
        Ok(())
    }

    /// Append one record to this page and propagate the change to `parent`.
    ///
    /// `parent` must be the Major Page this page belongs to, and this page
    /// must be the physical tail of the file.
    pub fn create_entry<H, P>(
        &mut self,
        codec: &mut Codec<H>,
        parent: &mut MajorPage,
        timestamp: u64,
        payload: &mut P,
        flags: Option<&[bool]>,
    ) -> Result<LogRecordEntry>
    where
        H: Read + Write + Seek,
        P: PayloadSource + ?Sized,
    {
        self.ensure_capacity()?;
        let draft = RecordDraft::new(timestamp, payload, flags)?;
        self.append_draft(codec, parent, &draft, payload)
    }

    /// Append an already validated record.
    pub(crate) fn append_draft<H, P>(
        &mut self,
        codec: &mut Codec<H>,
        parent: &mut MajorPage,
        draft: &RecordDraft,
        payload: &mut P,
    ) -> Result<LogRecordEntry>
    where
        H: Read + Write + Seek,
        P: PayloadSource + ?Sized,
    {
        self.ensure_capacity()?;
        if parent.offset != self.parent.major_offset {
            return Err(LogDbError::InvalidArgument(format!(
                "minor page at {} belongs to major page {}, not {}",
                self.offset, self.parent.major_offset, parent.offset
            )));
        }

        // Step 1: Table row at the next free slot
        let entry = LogRecordEntry {
            offset: self.table_offset() + MINOR_ENTRY_SIZE * u64::from(self.used_entries),
            timestamp: draft.timestamp,
            content_offset: self.content_size,
            flags: draft.entry_flags(),
        };
        entry.write(codec)?;

        // Step 2: Record bytes at the end of the content region
        codec.seek_to(self.content_start() + self.content_size)?;
        draft.write(codec, payload)?;

        // Step 3: Own header. The end time keeps the smaller of the two.
        let delta = draft.encoded_size();
        self.entries.push(entry.clone());
        self.used_entries += 1;
        self.end_time = self.end_time.min(draft.timestamp);
        self.content_size += delta;
        self.rewrite_header(codec)?;

        // Step 4: Parent row and parent header
        parent.apply_minor_update(
            codec,
            self.parent.slot,
            delta,
            self.start_time,
            self.end_time,
        )?;

        trace!(
            page = self.offset,
            slot = self.used_entries - 1,
            timestamp = draft.timestamp,
            len = draft.payload_len,
            "record appended"
        );

        Ok(entry)
    }

    fn ensure_capacity(&self) -> Result<()> {
        if self.remaining_capacity() == 0 {
            return Err(LogDbError::CapacityExceeded {
                offset: self.offset,
                capacity: self.geometry.minor_capacity,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Decode the record one of this page's rows points at
    pub fn read_record<H: Read + Seek>(
        &self,
        codec: &mut Codec<H>,
        entry: &LogRecordEntry,
    ) -> Result<Record> {
        let at = checked_span(
            entry.offset,
            self.content_start(),
            entry.content_offset,
            "record content offset",
        )?;
        codec.seek_to(at)?;
        Record::decode(codec)
    }

    /// Decode every record on this page in table order
    pub fn read_records<H: Read + Seek>(&self, codec: &mut Codec<H>) -> Result<Vec<Record>> {
        self.entries
            .iter()
            .map(|entry| self.read_record(codec, entry))
            .collect()
    }
}
