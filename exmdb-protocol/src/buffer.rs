//! Growable byte buffer with an append-only write end and an independent
//! read cursor.
//!
//! All multi-byte integers are little-endian. Text is written as raw bytes
//! followed by a single zero byte, with no length field. Floating point values
//! use their IEEE-754 bit pattern in little-endian order.
//!
//! Invariant: `0 <= tell() <= len()` at all times. Every `pop_*` checks the
//! unread window before touching the cursor, so a failed pop leaves the buffer
//! exactly as it was.

use crate::error::ProtocolError;
use bytes::{Buf, BufMut, BytesMut};

/// Size of the little-endian length prefix reserved by [`ByteBuffer::start`].
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Upper bound on elements reserved ahead of decoding a counted list.
const MAX_PREALLOCATION: usize = 1024;

/// Types that know how to write themselves to a [`ByteBuffer`].
pub trait Encode {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError>;
}

/// Types that can be read back from a [`ByteBuffer`].
pub trait Decode: Sized {
    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError>;
}

/// Byte sequence plus read cursor, reused for both directions of a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: BytesMut,
    rpos: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            rpos: 0,
        }
    }

    /// Creates a buffer holding a copy of `data`, cursor at the start.
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: BytesMut::from(data),
            rpos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Everything written so far, including bytes already read.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Offset of the read cursor.
    pub fn tell(&self) -> usize {
        self.rpos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.rpos
    }

    /// Capacity to reserve for a list of `count` elements that are about to
    /// be decoded. Counts come off the wire, so the reservation is bounded by
    /// the unread window and by a fixed ceiling; the vector still grows if
    /// the elements really are there.
    pub fn initial_capacity(&self, count: usize) -> usize {
        count.min(self.remaining()).min(MAX_PREALLOCATION)
    }

    /// The unread window, without advancing the cursor.
    pub fn unread(&self) -> &[u8] {
        &self.data[self.rpos..]
    }

    // ------------------------------------------------------------------
    // Write side
    // ------------------------------------------------------------------

    pub fn push_u8(&mut self, value: u8) {
        self.data.put_u8(value);
    }

    pub fn push_u16(&mut self, value: u16) {
        self.data.put_u16_le(value);
    }

    pub fn push_u32(&mut self, value: u32) {
        self.data.put_u32_le(value);
    }

    pub fn push_u64(&mut self, value: u64) {
        self.data.put_u64_le(value);
    }

    pub fn push_f32(&mut self, value: f32) {
        self.data.put_f32_le(value);
    }

    pub fn push_f64(&mut self, value: f64) {
        self.data.put_f64_le(value);
    }

    pub fn push_bool(&mut self, value: bool) {
        self.data.put_u8(u8::from(value));
    }

    /// Writes `value` followed by a zero terminator.
    ///
    /// Fails without writing anything if `value` contains a zero byte, since
    /// the reader would stop there.
    pub fn push_str(&mut self, value: &str) -> Result<(), ProtocolError> {
        if let Some(position) = value.bytes().position(|b| b == 0) {
            return Err(ProtocolError::InteriorNul { position });
        }
        self.data.put_slice(value.as_bytes());
        self.data.put_u8(0);
        Ok(())
    }

    /// Appends raw bytes without any framing.
    pub fn push_raw(&mut self, data: &[u8]) {
        self.data.put_slice(data);
    }

    pub fn push<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), ProtocolError> {
        value.encode(self)
    }

    /// Writes a 16-bit element count followed by each element.
    pub fn push_list_u16<T: Encode>(&mut self, items: &[T]) -> Result<(), ProtocolError> {
        let count = checked_count::<u16>(items.len())?;
        self.push_u16(count);
        items.iter().try_for_each(|item| item.encode(self))
    }

    /// Writes a 32-bit element count followed by each element.
    pub fn push_list_u32<T: Encode>(&mut self, items: &[T]) -> Result<(), ProtocolError> {
        let count = checked_count::<u32>(items.len())?;
        self.push_u32(count);
        items.iter().try_for_each(|item| item.encode(self))
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    /// Returns the next `length` bytes and advances the cursor.
    pub fn pop_raw(&mut self, length: usize) -> Result<&[u8], ProtocolError> {
        let available = self.remaining();
        if length > available {
            return Err(ProtocolError::BufferUnderrun {
                requested: length,
                available,
            });
        }
        let start = self.rpos;
        self.rpos += length;
        Ok(&self.data[start..self.rpos])
    }

    pub fn pop_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.pop_raw(1)?.get_u8())
    }

    pub fn pop_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(self.pop_raw(2)?.get_u16_le())
    }

    pub fn pop_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.pop_raw(4)?.get_u32_le())
    }

    pub fn pop_u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(self.pop_raw(8)?.get_u64_le())
    }

    pub fn pop_f32(&mut self) -> Result<f32, ProtocolError> {
        Ok(self.pop_raw(4)?.get_f32_le())
    }

    pub fn pop_f64(&mut self) -> Result<f64, ProtocolError> {
        Ok(self.pop_raw(8)?.get_f64_le())
    }

    /// Any nonzero byte reads as `true`.
    pub fn pop_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.pop_u8()? != 0)
    }

    /// Returns the bytes up to (not including) the next zero byte and moves
    /// the cursor past the terminator.
    pub fn pop_cstr(&mut self) -> Result<&[u8], ProtocolError> {
        let offset = self.rpos;
        let end = self.terminator()?;
        self.rpos += end + 1;
        Ok(&self.data[offset..offset + end])
    }

    /// Zero-terminated UTF-8 text, borrowed from the buffer.
    pub fn pop_str(&mut self) -> Result<&str, ProtocolError> {
        let offset = self.rpos;
        let end = self.terminator()?;
        let text = std::str::from_utf8(&self.data[offset..offset + end])
            .map_err(|_| ProtocolError::InvalidUtf8)?;
        self.rpos += end + 1;
        Ok(text)
    }

    /// Position of the next zero byte relative to the cursor.
    fn terminator(&self) -> Result<usize, ProtocolError> {
        self.unread()
            .iter()
            .position(|&b| b == 0)
            .ok_or(ProtocolError::UnterminatedString { offset: self.rpos })
    }

    /// Zero-terminated UTF-8 text, copied out of the buffer.
    pub fn pop_string(&mut self) -> Result<String, ProtocolError> {
        self.pop_str().map(str::to_owned)
    }

    pub fn pop<T: Decode>(&mut self) -> Result<T, ProtocolError> {
        T::decode(self)
    }

    /// Reads a 16-bit element count followed by that many elements.
    pub fn pop_list_u16<T: Decode>(&mut self) -> Result<Vec<T>, ProtocolError> {
        let count = self.pop_u16()? as usize;
        self.pop_elements(count)
    }

    /// Reads a 32-bit element count followed by that many elements.
    pub fn pop_list_u32<T: Decode>(&mut self) -> Result<Vec<T>, ProtocolError> {
        let count = self.pop_u32()? as usize;
        self.pop_elements(count)
    }

    fn pop_elements<T: Decode>(&mut self, count: usize) -> Result<Vec<T>, ProtocolError> {
        let mut items = Vec::with_capacity(self.initial_capacity(count));
        for _ in 0..count {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Framing and lifecycle
    // ------------------------------------------------------------------

    /// Begins a length-prefixed message: the buffer is truncated to exactly
    /// four zero bytes that [`finalize`](Self::finalize) later overwrites.
    pub fn start(&mut self) {
        self.data.clear();
        self.data.put_u32_le(0);
        self.rpos = 0;
    }

    /// Writes `len() - 4` as little-endian `u32` into the first four bytes.
    pub fn finalize(&mut self) -> Result<(), ProtocolError> {
        let len = self.data.len();
        if len < LENGTH_PREFIX_SIZE {
            return Err(ProtocolError::BufferUnderrun {
                requested: LENGTH_PREFIX_SIZE,
                available: len,
            });
        }
        let body = checked_count::<u32>(len - LENGTH_PREFIX_SIZE).map_err(|_| {
            ProtocolError::FrameTooLarge {
                size: (len - LENGTH_PREFIX_SIZE) as u64,
                max: u32::MAX as u64,
            }
        })?;
        self.data[..LENGTH_PREFIX_SIZE].copy_from_slice(&body.to_le_bytes());
        Ok(())
    }

    /// Drops all content and rewinds the cursor; the allocation is kept.
    pub fn clear(&mut self) {
        self.data.clear();
        self.rpos = 0;
    }

    /// Rewinds only the read cursor.
    pub fn reset(&mut self) {
        self.rpos = 0;
    }

    /// Replaces the content with `length` zero bytes and returns them for
    /// filling, e.g. straight from a socket.
    pub fn receive_window(&mut self, length: usize) -> &mut [u8] {
        self.data.clear();
        self.data.resize(length, 0);
        self.rpos = 0;
        &mut self.data[..]
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self {
            data: BytesMut::from(&data[..]),
            rpos: 0,
        }
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

fn checked_count<T: TryFrom<usize>>(count: usize) -> Result<T, ProtocolError> {
    T::try_from(count).map_err(|_| ProtocolError::TooManyElements {
        count,
        max: max_of::<T>(),
    })
}

fn max_of<T>() -> usize {
    match std::mem::size_of::<T>() {
        1 => u8::MAX as usize,
        2 => u16::MAX as usize,
        4 => u32::MAX as usize,
        _ => usize::MAX,
    }
}

// ----------------------------------------------------------------------
// Primitive implementations
// ----------------------------------------------------------------------

macro_rules! primitive_codec {
    ($($ty:ty => $push:ident, $pop:ident);* $(;)?) => {
        $(
            impl Encode for $ty {
                fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
                    buf.$push(*self);
                    Ok(())
                }
            }

            impl Decode for $ty {
                fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
                    buf.$pop()
                }
            }
        )*
    };
}

primitive_codec! {
    u8 => push_u8, pop_u8;
    u16 => push_u16, pop_u16;
    u32 => push_u32, pop_u32;
    u64 => push_u64, pop_u64;
    f32 => push_f32, pop_f32;
    f64 => push_f64, pop_f64;
    bool => push_bool, pop_bool;
}

impl Encode for str {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self)
    }
}

impl Encode for String {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self)
    }
}

impl Decode for String {
    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        buf.pop_string()
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        (**self).encode(buf)
    }
}
