//! Major Page
//!
//! A fixed-capacity table of [`MajorIndexEntry`] rows followed by a content
//! region holding Minor Pages back to back. Only the store creates Major
//! Pages; only the Major Page creates Minor Pages.

use std::io::{Read, Seek, Write};

use tracing::{debug, warn};

use crate::codec::Codec;
use crate::error::{LogDbError, Result};

use super::major_entry::MajorIndexEntry;
use super::minor::MinorPage;
use super::{
    checked_span, Geometry, FORMAT_VERSION, HEADER_FLAG_BITS, MAJOR_ENTRY_SIZE, MAJOR_HEADER_SIZE,
    MAJOR_TAG,
};

/// A decoded Major Page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MajorPage {
    /// Absolute offset of the page header
    pub offset: u64,
    pub version: u16,
    /// Sum of the absolute sizes of every Minor Page in the content region
    pub content_size: u64,
    pub used_entries: u16,
    pub flags: Vec<bool>,
    /// Table rows `0..used_entries`
    pub entries: Vec<MajorIndexEntry>,
    geometry: Geometry,
}

impl MajorPage {
    // =========================================================================
    // Creation & Decoding
    // =========================================================================

    /// Write an empty Major Page (header plus zeroed table) at `offset` and
    /// decode it back.
    pub(crate) fn create_at<H: Read + Write + Seek>(
        codec: &mut Codec<H>,
        geometry: Geometry,
        offset: u64,
    ) -> Result<Self> {
        codec.seek_to(offset)?;
        codec.write_fixed_chars(MAJOR_TAG)?;
        codec.write_u16(FORMAT_VERSION)?;
        codec.write_u64(0)?;
        codec.write_u16(0)?;
        codec.write_bit_flags(&[false; HEADER_FLAG_BITS])?;
        codec.write_zeros(geometry.major_table_size())?;

        debug!(offset, capacity = geometry.major_capacity, "major page created");

        codec.seek_to(offset)?;
        Self::decode(codec, geometry)
    }

    /// Decode the Major Page at the current position, table included
    pub fn decode<H: Read + Seek>(codec: &mut Codec<H>, geometry: Geometry) -> Result<Self> {
        let offset = codec.position()?;

        if !codec.read_constant_string(MAJOR_TAG)? {
            warn!(offset, "major page tag mismatch");
            return Err(LogDbError::corruption(offset, "major page tag mismatch"));
        }

        let version = codec.read_u16()?;
        let content_size = codec.read_u64()?;
        let used_entries = codec.read_u16()?;
        let flags = codec.read_bit_flags(HEADER_FLAG_BITS / 8)?;

        if used_entries > geometry.major_capacity {
            warn!(offset, used_entries, "major page table overflows its capacity");
            return Err(LogDbError::corruption(
                offset,
                format!(
                    "major page claims {} entries with capacity {}",
                    used_entries, geometry.major_capacity
                ),
            ));
        }

        // Keeps end() and absolute_size() total for every decoded page
        checked_span(
            offset,
            offset + geometry.major_page_size(),
            content_size,
            "major page content size",
        )?;

        let entries = (0..used_entries)
            .map(|slot| MajorIndexEntry::decode(codec, geometry, offset, slot))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            offset,
            version,
            content_size,
            used_entries,
            flags,
            entries,
            geometry,
        })
    }

    // =========================================================================
    // Derived Offsets
    // =========================================================================

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Absolute offset of the first table row
    pub fn table_offset(&self) -> u64 {
        self.offset + MAJOR_HEADER_SIZE
    }

    /// Absolute offset of the content region
    pub fn content_start(&self) -> u64 {
        self.offset + self.geometry.major_page_size()
    }

    /// Absolute offset just past this page and all of its Minor Pages
    pub fn end(&self) -> u64 {
        self.content_start() + self.content_size
    }

    /// Header, table, and content together
    pub fn absolute_size(&self) -> u64 {
        self.geometry.major_page_size() + self.content_size
    }

    /// Free table rows
    pub fn remaining_capacity(&self) -> u16 {
        self.geometry.major_capacity.saturating_sub(self.used_entries)
    }

    /// The row referencing the physically last Minor Page, if any
    pub fn last_entry(&self) -> Option<&MajorIndexEntry> {
        self.entries.last()
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Rewrite this page's header fields (the tag is left alone).
    pub fn rewrite_header<H: Write + Seek>(&self, codec: &mut Codec<H>) -> Result<()> {
        codec.seek_to(self.offset + MAJOR_TAG.len() as u64)?;
        codec.write_u16(FORMAT_VERSION)?;
        codec.write_u64(self.content_size)?;
        codec.write_u16(self.used_entries)?;
        codec.write_bit_flags(&self.flags)?;
        Ok(())
    }

    /// Rewrite one table row, then this page's header.
    pub fn rewrite_entry<H: Write + Seek>(&self, codec: &mut Codec<H>, slot: u16) -> Result<()> {
        let entry = self.entry(slot)?;
        entry.write(codec)?;
        self.rewrite_header(codec)
    }

    /// Allocate a table row and the empty Minor Page it references.
    ///
    /// The new Minor Page lands at the end of the content region; both its
    /// start and end time are `start_time` until records arrive.
    pub fn create_entry<H: Read + Write + Seek>(
        &mut self,
        codec: &mut Codec<H>,
        start_time: u64,
    ) -> Result<&MajorIndexEntry> {
        if self.remaining_capacity() == 0 {
            return Err(LogDbError::CapacityExceeded {
                offset: self.offset,
                capacity: self.geometry.major_capacity,
            });
        }

        // Step 1: Row at the next free slot, pointing past current content
        let slot = self.used_entries;
        let entry = MajorIndexEntry::new(
            self.table_offset() + MAJOR_ENTRY_SIZE * u64::from(slot),
            slot,
            start_time,
            self.content_size,
            self.offset,
            self.geometry,
        );
        entry.write(codec)?;

        // Step 2: Reserve room for an empty Minor Page and commit the header
        self.content_size += self.geometry.minor_page_size();
        self.used_entries += 1;
        self.rewrite_header(codec)?;

        // Step 3: The Minor Page itself
        let minor_offset = entry.referenced_page_offset();
        MinorPage::write_empty(codec, self.geometry, minor_offset, start_time)?;

        debug!(
            major = self.offset,
            slot,
            offset = minor_offset,
            capacity = self.geometry.minor_capacity,
            "minor page created"
        );

        self.entries.push(entry);
        Ok(&self.entries[usize::from(slot)])
    }

    /// Fold a Minor Page change into this page: grow the content size by
    /// `delta`, mirror the Minor Page's time range into its row, and rewrite
    /// both row and header.
    pub(crate) fn apply_minor_update<H: Write + Seek>(
        &mut self,
        codec: &mut Codec<H>,
        slot: u16,
        delta: u64,
        start_time: u64,
        end_time: u64,
    ) -> Result<()> {
        let offset = self.offset;
        let entry = self
            .entries
            .get_mut(usize::from(slot))
            .ok_or_else(|| LogDbError::corruption(offset, format!("no table row {}", slot)))?;

        entry.start_time = start_time;
        entry.end_time = end_time;
        self.content_size += delta;

        self.rewrite_entry(codec, slot)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Decode the Minor Page referenced by the last row, if any
    pub fn last_minor_page<H: Read + Seek>(
        &self,
        codec: &mut Codec<H>,
    ) -> Result<Option<MinorPage>> {
        self.last_entry()
            .map(|entry| entry.read_referenced_minor_page(codec))
            .transpose()
    }

    /// Recompute the content size from the Minor Page headers on disk.
    ///
    /// Nothing is mutated and the handle position is restored afterwards.
    /// Taking `&mut Codec` means the caller already holds the store lock.
    pub fn live_content_size<H: Read + Seek>(&self, codec: &mut Codec<H>) -> Result<u64> {
        let pos = codec.position()?;

        let mut size = 0u64;
        for entry in &self.entries {
            let page_size = entry.absolute_size_of_referenced_page(codec)?;
            size = checked_span(self.offset, size, page_size, "live content size")?;
        }

        codec.seek_to(pos)?;
        Ok(size)
    }

    fn entry(&self, slot: u16) -> Result<&MajorIndexEntry> {
        self.entries
            .get(usize::from(slot))
            .ok_or_else(|| LogDbError::corruption(self.offset, format!("no table row {}", slot)))
    }
}
