//! Major Page Index Entry
//!
//! One row of a Major Page table. It references a single Minor Page by
//! offset into the Major Page's content region and mirrors that page's time
//! range.

use std::io::{Read, Seek, Write};

use crate::codec::Codec;
use crate::error::Result;

use super::minor::{MinorPage, ParentLink};
use super::{checked_span, Geometry, HEADER_FLAG_BITS};

/// A decoded Major Page table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MajorIndexEntry {
    /// Absolute position of this table row
    pub offset: u64,
    /// Row index within the owning table
    pub slot: u16,
    pub start_time: u64,
    pub end_time: u64,
    /// Minor Page position relative to the Major Page's content region
    pub content_offset: u64,
    pub flags: Vec<bool>,
    major_offset: u64,
    geometry: Geometry,
}

impl MajorIndexEntry {
    /// A row that has not been written yet
    pub(crate) fn new(
        offset: u64,
        slot: u16,
        start_time: u64,
        content_offset: u64,
        major_offset: u64,
        geometry: Geometry,
    ) -> Self {
        Self {
            offset,
            slot,
            start_time,
            end_time: start_time,
            content_offset,
            flags: vec![false; HEADER_FLAG_BITS],
            major_offset,
            geometry,
        }
    }

    /// Decode the row at the current position
    pub fn decode<H: Read + Seek>(
        codec: &mut Codec<H>,
        geometry: Geometry,
        major_offset: u64,
        slot: u16,
    ) -> Result<Self> {
        let offset = codec.position()?;
        let start_time = codec.read_u64()?;
        let end_time = codec.read_u64()?;
        let content_offset = codec.read_u64()?;
        let flags = codec.read_bit_flags(HEADER_FLAG_BITS / 8)?;

        // Keeps referenced_page_offset() total for every decoded row
        checked_span(
            offset,
            major_offset + geometry.major_page_size(),
            content_offset,
            "minor page content offset",
        )?;

        Ok(Self {
            offset,
            slot,
            start_time,
            end_time,
            content_offset,
            flags,
            major_offset,
            geometry,
        })
    }

    /// Absolute offset of the owning Major Page
    pub fn major_offset(&self) -> u64 {
        self.major_offset
    }

    /// Absolute offset of the referenced Minor Page
    pub fn referenced_page_offset(&self) -> u64 {
        self.major_offset + self.geometry.major_page_size() + self.content_offset
    }

    /// Jump to the referenced Minor Page and decode it
    pub fn read_referenced_minor_page<H: Read + Seek>(
        &self,
        codec: &mut Codec<H>,
    ) -> Result<MinorPage> {
        codec.seek_to(self.referenced_page_offset())?;
        MinorPage::decode(
            codec,
            self.geometry,
            ParentLink {
                major_offset: self.major_offset,
                slot: self.slot,
            },
        )
    }

    /// Size of the referenced Minor Page as currently recorded on disk.
    ///
    /// Reads the page's own content-size field rather than trusting any
    /// in-memory copy; used to reconcile Major Page headers.
    pub fn absolute_size_of_referenced_page<H: Read + Seek>(
        &self,
        codec: &mut Codec<H>,
    ) -> Result<u64> {
        MinorPage::absolute_size_at(codec, self.geometry, self.referenced_page_offset())
    }

    /// Write this row at its own offset. Callers go through
    /// `MajorPage::rewrite_entry` so the owner's header follows.
    pub(crate) fn write<H: Write + Seek>(&self, codec: &mut Codec<H>) -> Result<()> {
        codec.seek_to(self.offset)?;
        codec.write_u64(self.start_time)?;
        codec.write_u64(self.end_time)?;
        codec.write_u64(self.content_offset)?;
        codec.write_bit_flags(&self.flags)?;
        Ok(())
    }
}
