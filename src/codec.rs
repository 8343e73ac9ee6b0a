//! Byte codec
//!
//! Fixed-width integers, fixed-length tags, and packed bit flags over a
//! random-access handle.
//!
//! ## Encoding Rules
//! - Every multi-byte integer honours the codec's [`ByteOrder`].
//! - Fixed-length strings are raw bytes, one byte per character, no length prefix.
//! - Bit flags are packed 8 per byte, least significant bit first, and are
//!   never byte-swapped.
//!
//! All reads and writes happen at the handle's current position and advance
//! it. Decoding assumes well-formed input; structural checks (magic tags,
//! table bounds) are made by the page types on top of this.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{LogDbError, Result};

// =============================================================================
// Byte Order
// =============================================================================

/// Byte order applied uniformly to every multi-byte field in a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Least significant byte first (the format's default)
    #[default]
    Little,

    /// Most significant byte first
    Big,
}

/// Anything the store can sit on: a seekable, readable, writable byte handle.
pub trait RandomAccess: Read + Write + Seek {}

impl<T: Read + Write + Seek + ?Sized> RandomAccess for T {}

// =============================================================================
// Codec
// =============================================================================

/// A byte handle paired with the byte order used for every field on it
#[derive(Debug)]
pub struct Codec<H> {
    inner: H,
    order: ByteOrder,
}

/// Expands to a read through `byteorder` in the codec's configured order.
macro_rules! read_ordered {
    ($self:ident, $method:ident) => {
        match $self.order {
            ByteOrder::Little => $self.inner.$method::<LittleEndian>(),
            ByteOrder::Big => $self.inner.$method::<BigEndian>(),
        }
    };
}

/// Expands to a write through `byteorder` in the codec's configured order.
macro_rules! write_ordered {
    ($self:ident, $method:ident, $value:expr) => {
        match $self.order {
            ByteOrder::Little => $self.inner.$method::<LittleEndian>($value),
            ByteOrder::Big => $self.inner.$method::<BigEndian>($value),
        }
    };
}

impl<H> Codec<H> {
    /// Wrap a handle
    pub fn new(inner: H, order: ByteOrder) -> Self {
        Self { inner, order }
    }

    /// The byte order applied to multi-byte fields
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn get_ref(&self) -> &H {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    /// Unwrap the handle
    pub fn into_inner(self) -> H {
        self.inner
    }
}

// -----------------------------------------------------------------------------
// Positioning
// -----------------------------------------------------------------------------

impl<H: Seek> Codec<H> {
    /// Current absolute position of the handle
    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    /// Move to an absolute position
    pub fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Total length of the underlying storage; the position is left unchanged.
    pub fn stream_len(&mut self) -> io::Result<u64> {
        let pos = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }
}

// -----------------------------------------------------------------------------
// Decoding
// -----------------------------------------------------------------------------

impl<H: Read> Codec<H> {
    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.inner.read_u8()
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        read_ordered!(self, read_u16)
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        read_ordered!(self, read_i16)
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        read_ordered!(self, read_u32)
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        read_ordered!(self, read_i32)
    }

    pub fn read_u64(&mut self) -> io::Result<u64> {
        read_ordered!(self, read_u64)
    }

    pub fn read_i64(&mut self) -> io::Result<i64> {
        read_ordered!(self, read_i64)
    }

    /// Read `len` raw bytes.
    ///
    /// The buffer grows with the bytes actually read, so a corrupt length
    /// runs into end of file instead of a huge up-front allocation.
    pub fn read_fixed_string(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        if read != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, found {}", len, read),
            ));
        }
        Ok(buf)
    }

    /// Read a tag of `expected.len()` bytes and report whether it matches.
    ///
    /// A mismatch is not an error here; the caller decides what it means.
    pub fn read_constant_string(&mut self, expected: &[u8]) -> io::Result<bool> {
        let actual = self.read_fixed_string(expected.len())?;
        Ok(actual == expected)
    }

    /// Read `bytes` bytes of packed flags, yielding `bytes * 8` booleans.
    pub fn read_bit_flags(&mut self, bytes: usize) -> io::Result<Vec<bool>> {
        let raw = self.read_fixed_string(bytes)?;
        Ok(unpack_flags(&raw))
    }
}

// -----------------------------------------------------------------------------
// Encoding
// -----------------------------------------------------------------------------

impl<H: Write> Codec<H> {
    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.inner.write_u8(value)
    }

    pub fn write_u16(&mut self, value: u16) -> io::Result<()> {
        write_ordered!(self, write_u16, value)
    }

    pub fn write_i16(&mut self, value: i16) -> io::Result<()> {
        write_ordered!(self, write_i16, value)
    }

    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        write_ordered!(self, write_u32, value)
    }

    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        write_ordered!(self, write_i32, value)
    }

    pub fn write_u64(&mut self, value: u64) -> io::Result<()> {
        write_ordered!(self, write_u64, value)
    }

    pub fn write_i64(&mut self, value: i64) -> io::Result<()> {
        write_ordered!(self, write_i64, value)
    }

    /// Write a fixed-length character array verbatim
    pub fn write_fixed_chars(&mut self, chars: &[u8]) -> io::Result<()> {
        self.inner.write_all(chars)
    }

    /// Write packed flags. The flag count must be a multiple of 8.
    pub fn write_bit_flags(&mut self, flags: &[bool]) -> Result<()> {
        let packed = pack_flags(flags)?;
        self.inner.write_all(&packed)?;
        Ok(())
    }

    /// Write `count` zero bytes (reserved space, empty tables)
    pub fn write_zeros(&mut self, count: u64) -> io::Result<()> {
        io::copy(&mut io::repeat(0).take(count), &mut self.inner)?;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// =============================================================================
// Flag Packing
// =============================================================================

/// Pack booleans 8 per byte, LSB first.
///
/// Fails with `InvalidArgument` when the count does not land on a byte boundary.
pub fn pack_flags(flags: &[bool]) -> Result<Vec<u8>> {
    if flags.len() % 8 != 0 {
        return Err(LogDbError::InvalidArgument(format!(
            "flag count {} does not line up on a byte boundary",
            flags.len()
        )));
    }

    let packed = flags
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (bit, &set)| byte | (u8::from(set) << bit))
        })
        .collect();

    Ok(packed)
}

/// Unpack bytes into booleans, LSB first.
pub fn unpack_flags(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).map(move |bit| byte & (1 << bit) != 0))
        .collect()
}
