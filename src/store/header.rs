//! File header
//!
//! The fixed 66-byte block at offset 0 that names the format and records
//! the page capacities shared by every page in the file.

use std::io::{Read, Seek, Write};

use tracing::warn;

use crate::codec::Codec;
use crate::error::{LogDbError, Result};
use crate::page::{Geometry, FILE_HEADER_SIZE, FILE_TAG, FORMAT_VERSION, HEADER_FLAG_BITS};

/// Reserved zero bytes closing out the header
const PADDING: u64 = 49;

/// Decoded file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u16,
    pub major_capacity: u16,
    pub minor_capacity: u16,
    /// Reserved, written as zero
    pub reserved: u32,
    /// Reserved, written as all clear
    pub flags: Vec<bool>,
}

impl FileHeader {
    pub fn new(major_capacity: u16, minor_capacity: u16) -> Self {
        Self {
            version: FORMAT_VERSION,
            major_capacity,
            minor_capacity,
            reserved: 0,
            flags: vec![false; HEADER_FLAG_BITS],
        }
    }

    /// Page geometry every page in the file shares
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.major_capacity, self.minor_capacity)
    }

    /// Write the header at offset 0
    pub fn write<H: Write + Seek>(&self, codec: &mut Codec<H>) -> Result<()> {
        codec.seek_to(0)?;
        codec.write_fixed_chars(FILE_TAG)?;
        codec.write_u16(self.version)?;
        codec.write_u16(self.major_capacity)?;
        codec.write_u16(self.minor_capacity)?;
        codec.write_u32(self.reserved)?;
        codec.write_bit_flags(&self.flags)?;
        codec.write_zeros(PADDING)?;
        Ok(())
    }

    /// Decode the header at offset 0, leaving the handle at the first Major Page.
    pub fn decode<H: Read + Seek>(codec: &mut Codec<H>) -> Result<Self> {
        codec.seek_to(0)?;

        if !codec.read_constant_string(FILE_TAG)? {
            warn!("file header tag mismatch");
            return Err(LogDbError::corruption(0, "file header tag mismatch"));
        }

        let version = codec.read_u16()?;
        let major_capacity = codec.read_u16()?;
        let minor_capacity = codec.read_u16()?;
        let reserved = codec.read_u32()?;
        let flags = codec.read_bit_flags(HEADER_FLAG_BITS / 8)?;

        if major_capacity == 0 || minor_capacity == 0 {
            warn!(major_capacity, minor_capacity, "file header has a zero capacity");
            return Err(LogDbError::corruption(
                0,
                format!(
                    "file header capacities {}/{} must be non-zero",
                    major_capacity, minor_capacity
                ),
            ));
        }

        codec.seek_to(FILE_HEADER_SIZE)?;

        Ok(Self {
            version,
            major_capacity,
            minor_capacity,
            reserved,
            flags,
        })
    }
}
