//! Records and their Minor Page table entries
//!
//! A record is written once into a Minor Page's content region and never
//! touched again. Its table entry points at it by offset relative to that
//! content region.

use std::io::{self, Read, Seek, SeekFrom, Write};

use bytes::Bytes;

use crate::codec::Codec;
use crate::error::{LogDbError, Result};

use super::{FORMAT_VERSION, HEADER_FLAG_BITS, MAX_PAYLOAD_LEN, RECORD_FLAG_BITS, RECORD_HEADER_SIZE};

// =============================================================================
// Payload Sources
// =============================================================================

/// Where record bytes come from
///
/// The length must be known before anything is written, so a source has to
/// be measurable up front. Sources that can only be drained report `None`
/// and are rejected.
pub trait PayloadSource {
    /// Remaining payload length, or `None` if it cannot be determined
    /// without consuming the source.
    fn measure(&mut self) -> io::Result<Option<u64>>;

    /// Copy up to `len` bytes into `out`, returning how many were copied.
    fn copy_into(&mut self, out: &mut dyn Write, len: u64) -> io::Result<u64>;
}

impl PayloadSource for &[u8] {
    fn measure(&mut self) -> io::Result<Option<u64>> {
        Ok(Some(self.len() as u64))
    }

    fn copy_into(&mut self, out: &mut dyn Write, len: u64) -> io::Result<u64> {
        let n = self.len().min(usize::try_from(len).unwrap_or(usize::MAX));
        out.write_all(&self[..n])?;
        Ok(n as u64)
    }
}

impl PayloadSource for Vec<u8> {
    fn measure(&mut self) -> io::Result<Option<u64>> {
        self.as_slice().measure()
    }

    fn copy_into(&mut self, out: &mut dyn Write, len: u64) -> io::Result<u64> {
        self.as_slice().copy_into(out, len)
    }
}

/// A seekable reader used as a payload
///
/// The payload runs from the reader's current position to its end. The
/// position is restored after measuring and after copying, so the same
/// source can be appended again.
#[derive(Debug)]
pub struct Seekable<R>(pub R);

impl<R> Seekable<R> {
    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R: Read + Seek> PayloadSource for Seekable<R> {
    fn measure(&mut self) -> io::Result<Option<u64>> {
        let start = self.0.stream_position()?;
        let end = self.0.seek(SeekFrom::End(0))?;
        self.0.seek(SeekFrom::Start(start))?;
        Ok(Some(end.saturating_sub(start)))
    }

    fn copy_into(&mut self, out: &mut dyn Write, len: u64) -> io::Result<u64> {
        let start = self.0.stream_position()?;
        let copied = io::copy(&mut (&mut self.0).take(len), out)?;
        self.0.seek(SeekFrom::Start(start))?;
        Ok(copied)
    }
}

/// A forward-only reader used as a payload
///
/// Its length is never known up front, so appending it always fails with
/// `InvalidArgument`.
#[derive(Debug)]
pub struct Streamed<R>(pub R);

impl<R: Read> PayloadSource for Streamed<R> {
    fn measure(&mut self) -> io::Result<Option<u64>> {
        Ok(None)
    }

    fn copy_into(&mut self, out: &mut dyn Write, len: u64) -> io::Result<u64> {
        io::copy(&mut (&mut self.0).take(len), out)
    }
}

// =============================================================================
// Record Draft
// =============================================================================

/// A validated, not yet written record
///
/// Building a draft performs every argument check an append needs, so a
/// rejected append never touches the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDraft {
    pub timestamp: u64,
    pub payload_len: u64,
    pub flags: [bool; RECORD_FLAG_BITS],
}

impl RecordDraft {
    /// Validate flags and measure the payload.
    ///
    /// `flags` defaults to all clear and must otherwise hold exactly 8 bits.
    pub fn new<P: PayloadSource + ?Sized>(
        timestamp: u64,
        payload: &mut P,
        flags: Option<&[bool]>,
    ) -> Result<Self> {
        let flags = match flags {
            None => [false; RECORD_FLAG_BITS],
            Some(given) => <[bool; RECORD_FLAG_BITS]>::try_from(given).map_err(|_| {
                LogDbError::InvalidArgument(format!(
                    "record flags must be exactly {} bits, got {}",
                    RECORD_FLAG_BITS,
                    given.len()
                ))
            })?,
        };

        let payload_len = payload.measure()?.ok_or_else(|| {
            LogDbError::InvalidArgument(
                "payload source must be measurable and re-readable".to_string(),
            )
        })?;

        if payload_len > MAX_PAYLOAD_LEN {
            return Err(LogDbError::InvalidArgument(format!(
                "payload is {} bytes; the limit is {}",
                payload_len, MAX_PAYLOAD_LEN
            )));
        }

        Ok(Self {
            timestamp,
            payload_len,
            flags,
        })
    }

    /// Bytes this record occupies in a content region
    pub fn encoded_size(&self) -> u64 {
        RECORD_HEADER_SIZE + self.payload_len
    }

    /// The 16 flag bits stored in the record's table entry: the record flags
    /// followed by 8 clear bits.
    pub fn entry_flags(&self) -> Vec<bool> {
        let mut bits = self.flags.to_vec();
        bits.resize(HEADER_FLAG_BITS, false);
        bits
    }

    /// Write the record at the current position, pulling bytes from `payload`.
    pub(crate) fn write<H: Write, P: PayloadSource + ?Sized>(
        &self,
        codec: &mut Codec<H>,
        payload: &mut P,
    ) -> Result<()> {
        codec.write_u64(self.timestamp)?;
        codec.write_u16(FORMAT_VERSION)?;
        codec.write_u32(self.payload_len as u32)?;
        codec.write_bit_flags(&self.flags)?;

        let copied = payload.copy_into(codec.get_mut(), self.payload_len)?;
        if copied != self.payload_len {
            return Err(LogDbError::InvalidArgument(format!(
                "payload source yielded {} bytes after measuring {}",
                copied, self.payload_len
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Log Record Index Entry
// =============================================================================

/// One row of a Minor Page table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecordEntry {
    /// Absolute position of this table row
    pub offset: u64,
    pub timestamp: u64,
    /// Record position relative to the Minor Page's content region
    pub content_offset: u64,
    pub flags: Vec<bool>,
}

impl LogRecordEntry {
    /// Decode the table row at the current position
    pub fn decode<H: Read + Seek>(codec: &mut Codec<H>) -> Result<Self> {
        let offset = codec.position()?;
        let timestamp = codec.read_u64()?;
        let content_offset = codec.read_u64()?;
        let flags = codec.read_bit_flags(HEADER_FLAG_BITS / 8)?;

        Ok(Self {
            offset,
            timestamp,
            content_offset,
            flags,
        })
    }

    /// Write this row at its own offset
    pub(crate) fn write<H: Write + Seek>(&self, codec: &mut Codec<H>) -> Result<()> {
        codec.seek_to(self.offset)?;
        codec.write_u64(self.timestamp)?;
        codec.write_u64(self.content_offset)?;
        codec.write_bit_flags(&self.flags)?;
        Ok(())
    }
}

// =============================================================================
// Record
// =============================================================================

/// A decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: u64,
    pub version: u16,
    pub flags: [bool; RECORD_FLAG_BITS],
    pub payload: Bytes,
}

impl Record {
    /// Decode the record at the current position
    pub fn decode<H: Read>(codec: &mut Codec<H>) -> Result<Self> {
        let timestamp = codec.read_u64()?;
        let version = codec.read_u16()?;
        let len = codec.read_u32()?;

        let mut flags = [false; RECORD_FLAG_BITS];
        flags.copy_from_slice(&codec.read_bit_flags(1)?);

        let payload = codec.read_fixed_string(len as usize)?;

        Ok(Self {
            timestamp,
            version,
            flags,
            payload: Bytes::from(payload),
        })
    }

    /// Bytes this record occupies in a content region
    pub fn encoded_size(&self) -> u64 {
        RECORD_HEADER_SIZE + self.payload.len() as u64
    }
}

