// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Linear read/write cursor over an owned byte sequence.
//!
//! A [`ByteBuffer`] has an exact length fixed at construction (or by a
//! destructive [`ByteBuffer::resize`]) and a single cursor shared by reads and
//! writes. Every typed read takes a `peek` flag: a peeked read returns the
//! value without moving the cursor, and a failed peek leaves it untouched too.
//!
//! All multi-byte values are little-endian.

use crate::error::{BufResult, BufferError};
use byteorder::{ByteOrder, LittleEndian};
use std::ops::Range;

/// Width of the header ordinal that prefixes every top-level payload.
pub const HEADER_WIDTH: usize = 2;

/// Generate a little-endian write/read pair for a fixed-width primitive.
///
/// The write checks bounds (`BufferError::WriteFailed`), encodes in place and
/// advances. The read checks bounds (`BufferError::ReadFailed`), decodes and
/// advances unless `peek` is set.
macro_rules! impl_fixed_le {
    ($write:ident, $read:ident, $ty:ty, $size:expr, $put:path, $get:path) => {
        pub fn $write(&mut self, value: $ty) -> BufResult<()> {
            let range = self.reserve($size)?;
            $put(&mut self.data[range], value);
            Ok(())
        }

        pub fn $read(&mut self, peek: bool) -> BufResult<$ty> {
            let range = self.claim($size, peek)?;
            Ok($get(&self.data[range]))
        }
    };
}

/// Owned byte buffer with a read/write cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    offset: usize,
}

impl ByteBuffer {
    /// Zero-filled buffer of exactly `len` bytes, cursor at 0.
    pub fn with_len(len: usize) -> Self {
        Self {
            data: vec![0; len],
            offset: 0,
        }
    }

    /// Wrap received bytes for decoding, cursor at 0.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: bytes.into(),
            offset: 0,
        }
    }

    /// Set the length to exactly `len`. Prior contents are discarded and the
    /// cursor returns to 0.
    pub fn resize(&mut self, len: usize) {
        self.data.clear();
        self.data.resize(len, 0);
        self.offset = 0;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Move the cursor. Positions past the end are rejected.
    pub fn set_position(&mut self, position: usize) -> BufResult<()> {
        if position > self.data.len() {
            return Err(BufferError::ReadFailed {
                offset: position,
                reason: "position past end of buffer".into(),
            });
        }
        self.offset = position;
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.offset = 0;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Run a multi-step read. When `peek` is set the cursor is restored to
    /// where it was found, whether `f` succeeds or not.
    pub fn peeking<T, E>(
        &mut self,
        peek: bool,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let start = self.offset;
        let result = f(self);
        if peek {
            self.offset = start;
        }
        result
    }

    // Bounds-check a write of `len` bytes and advance past it.
    fn reserve(&mut self, len: usize) -> BufResult<Range<usize>> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| BufferError::WriteFailed {
                offset: self.offset,
                reason: "buffer too small".into(),
            })?;
        let range = self.offset..end;
        self.offset = end;
        Ok(range)
    }

    // Bounds-check a read of `len` bytes; advance unless peeking.
    fn claim(&mut self, len: usize, peek: bool) -> BufResult<Range<usize>> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| BufferError::ReadFailed {
                offset: self.offset,
                reason: "unexpected end of buffer".into(),
            })?;
        let range = self.offset..end;
        if !peek {
            self.offset = end;
        }
        Ok(range)
    }

    impl_fixed_le!(write_u16, read_u16, u16, 2, LittleEndian::write_u16, LittleEndian::read_u16);
    impl_fixed_le!(write_i16, read_i16, i16, 2, LittleEndian::write_i16, LittleEndian::read_i16);
    impl_fixed_le!(write_u32, read_u32, u32, 4, LittleEndian::write_u32, LittleEndian::read_u32);
    impl_fixed_le!(write_i32, read_i32, i32, 4, LittleEndian::write_i32, LittleEndian::read_i32);
    impl_fixed_le!(write_u64, read_u64, u64, 8, LittleEndian::write_u64, LittleEndian::read_u64);
    impl_fixed_le!(write_i64, read_i64, i64, 8, LittleEndian::write_i64, LittleEndian::read_i64);
    impl_fixed_le!(write_f32, read_f32, f32, 4, LittleEndian::write_f32, LittleEndian::read_f32);
    impl_fixed_le!(write_f64, read_f64, f64, 8, LittleEndian::write_f64, LittleEndian::read_f64);

    pub fn write_u8(&mut self, value: u8) -> BufResult<()> {
        let range = self.reserve(1)?;
        self.data[range.start] = value;
        Ok(())
    }

    pub fn read_u8(&mut self, peek: bool) -> BufResult<u8> {
        let range = self.claim(1, peek)?;
        Ok(self.data[range.start])
    }

    pub fn write_i8(&mut self, value: i8) -> BufResult<()> {
        self.write_u8(value as u8)
    }

    pub fn read_i8(&mut self, peek: bool) -> BufResult<i8> {
        Ok(self.read_u8(peek)? as i8)
    }

    pub fn write_bool(&mut self, value: bool) -> BufResult<()> {
        self.write_u8(u8::from(value))
    }

    /// Reads one byte; only 0 and 1 are valid.
    pub fn read_bool(&mut self, peek: bool) -> BufResult<bool> {
        let offset = self.offset;
        match self.read_u8(peek)? {
            0 => Ok(false),
            1 => Ok(true),
            other => {
                self.offset = offset;
                Err(BufferError::InvalidData {
                    offset,
                    reason: format!("invalid bool byte {:#04x}", other),
                })
            }
        }
    }

    /// Chars travel as their 32-bit Unicode scalar value.
    pub fn write_char(&mut self, value: char) -> BufResult<()> {
        self.write_u32(u32::from(value))
    }

    pub fn read_char(&mut self, peek: bool) -> BufResult<char> {
        let offset = self.offset;
        let raw = self.read_u32(peek)?;
        char::from_u32(raw).ok_or_else(|| {
            self.offset = offset;
            BufferError::InvalidData {
                offset,
                reason: format!("invalid unicode scalar {:#x}", raw),
            }
        })
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> BufResult<()> {
        let range = self.reserve(bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize, peek: bool) -> BufResult<&[u8]> {
        let range = self.claim(len, peek)?;
        Ok(&self.data[range])
    }

    pub fn write_header(&mut self, header: u16) -> BufResult<()> {
        self.write_u16(header)
    }

    pub fn read_header(&mut self, peek: bool) -> BufResult<u16> {
        self.read_u16(peek)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_U16: u16 = 0xCDEF;
    const TEST_U32: u32 = 0x1234_5678;
    const TEST_U64: u64 = 0x1122_3344_5566_7788;

    #[test]
    fn test_write_overflow_reports_offset() {
        let mut buffer = ByteBuffer::with_len(2);
        buffer.write_u16(0xABCD).expect("Write u16 should succeed");

        match buffer.write_u8(0xFF).unwrap_err() {
            BufferError::WriteFailed { offset, reason } => {
                assert_eq!(offset, 2);
                assert_eq!(reason, "buffer too small");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_read_overflow_reports_offset() {
        let mut buffer = ByteBuffer::from_bytes(vec![0u8; 3]);
        assert_eq!(buffer.read_u16(false).expect("Read u16 should succeed"), 0);

        match buffer.read_u16(false).unwrap_err() {
            BufferError::ReadFailed { offset, reason } => {
                assert_eq!(offset, 2);
                assert_eq!(reason, "unexpected end of buffer");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(buffer.position(), 2);
    }

    #[test]
    fn test_roundtrip_across_numeric_types() {
        let mut buffer = ByteBuffer::with_len(64);
        buffer.write_u8(0xAB).expect("Write u8 should succeed");
        buffer.write_i8(-5).expect("Write i8 should succeed");
        buffer.write_u16(TEST_U16).expect("Write u16 should succeed");
        buffer.write_u32(TEST_U32).expect("Write u32 should succeed");
        buffer.write_u64(TEST_U64).expect("Write u64 should succeed");
        buffer.write_i32(-42).expect("Write i32 should succeed");
        buffer.write_f64(6.25).expect("Write f64 should succeed");
        buffer.write_char('λ').expect("Write char should succeed");
        buffer.write_bytes(&[1, 2, 3]).expect("Write bytes should succeed");
        let written = buffer.position();

        buffer.rewind();
        assert_eq!(buffer.read_u8(false).expect("Read u8 should succeed"), 0xAB);
        assert_eq!(buffer.read_i8(false).expect("Read i8 should succeed"), -5);
        assert_eq!(buffer.read_u16(false).expect("Read u16 should succeed"), TEST_U16);
        assert_eq!(buffer.read_u32(false).expect("Read u32 should succeed"), TEST_U32);
        assert_eq!(buffer.read_u64(false).expect("Read u64 should succeed"), TEST_U64);
        assert_eq!(buffer.read_i32(false).expect("Read i32 should succeed"), -42);
        assert_eq!(buffer.read_f64(false).expect("Read f64 should succeed"), 6.25);
        assert_eq!(buffer.read_char(false).expect("Read char should succeed"), 'λ');
        assert_eq!(
            buffer.read_bytes(3, false).expect("Read bytes should succeed"),
            &[1, 2, 3]
        );
        assert_eq!(buffer.position(), written);
        assert_eq!(buffer.remaining(), 64 - written);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buffer = ByteBuffer::with_len(6);
        buffer.write_header(0x0102).expect("Write header should succeed");
        buffer.write_u32(TEST_U32).expect("Write u32 should succeed");
        assert_eq!(buffer.as_bytes(), &[0x02, 0x01, 0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut buffer = ByteBuffer::from_bytes(TEST_U32.to_le_bytes().to_vec());
        assert_eq!(buffer.read_u32(true).expect("Peek should succeed"), TEST_U32);
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.read_header(true).expect("Peek should succeed"), 0x5678);
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.read_u32(false).expect("Read should succeed"), TEST_U32);
        assert_eq!(buffer.position(), 4);
    }

    #[test]
    fn test_failed_peek_leaves_cursor() {
        let mut buffer = ByteBuffer::from_bytes(vec![1, 2]);
        buffer.read_u8(false).expect("Read u8 should succeed");
        assert!(buffer.read_u32(true).is_err());
        assert_eq!(buffer.position(), 1);
    }

    #[test]
    fn test_peeking_scope_restores_on_success_and_error() {
        let mut buffer = ByteBuffer::from_bytes(vec![7, 0, 0, 0, 9]);
        let value = buffer
            .peeking(true, |buf| {
                let a = buf.read_u32(false)?;
                let b = buf.read_u8(false)?;
                Ok::<_, BufferError>(a + u32::from(b))
            })
            .expect("Peeked read should succeed");
        assert_eq!(value, 16);
        assert_eq!(buffer.position(), 0);

        let result = buffer.peeking(true, |buf| {
            buf.read_u32(false)?;
            buf.read_u64(false)
        });
        assert!(result.is_err());
        assert_eq!(buffer.position(), 0);

        buffer
            .peeking(false, |buf| buf.read_u32(false))
            .expect("Read should succeed");
        assert_eq!(buffer.position(), 4);
    }

    #[test]
    fn test_resize_is_destructive() {
        let mut buffer = ByteBuffer::with_len(4);
        buffer.write_u32(u32::MAX).expect("Write u32 should succeed");
        buffer.resize(6);
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.as_bytes(), &[0; 6]);
    }

    #[test]
    fn test_invalid_bool_and_char_rejected() {
        let mut buffer = ByteBuffer::from_bytes(vec![2]);
        match buffer.read_bool(false).unwrap_err() {
            BufferError::InvalidData { offset, .. } => assert_eq!(offset, 0),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(buffer.position(), 0);

        let mut buffer = ByteBuffer::from_bytes(0xD800u32.to_le_bytes().to_vec());
        assert!(matches!(
            buffer.read_char(false),
            Err(BufferError::InvalidData { .. })
        ));
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn test_set_position_bounds() {
        let mut buffer = ByteBuffer::with_len(4);
        buffer.set_position(4).expect("End position should be valid");
        assert_eq!(buffer.remaining(), 0);
        assert!(buffer.set_position(5).is_err());
    }
}
