// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Leaf codecs for primitive scalars.
//!
//! Fixed-width kinds encode as their little-endian bytes. Text is a `u32`
//! byte-length prefix followed by UTF-8.

use super::{Codec, CodecKind, SIZE_UNKNOWN};
use crate::buffer::ByteBuffer;
use crate::error::{BufResult, BufferError, CodecResult};
use crate::registry::TypeRegistry;
use std::any::Any;
use std::marker::PhantomData;

/// Width of the text length prefix.
pub(crate) const TEXT_PREFIX_WIDTH: usize = 4;

/// A primitive that knows its own wire encoding.
pub trait Scalar: Any + Send + Sync + Sized {
    /// Encoded size, or `None` if the value cannot be encoded.
    fn encoded_len(&self) -> Option<usize>;

    fn put(&self, buf: &mut ByteBuffer) -> BufResult<()>;

    fn take(buf: &mut ByteBuffer, peek: bool) -> BufResult<Self>;
}

/// Generate `Scalar` for a fixed-width primitive.
macro_rules! impl_scalar {
    ($ty:ty, $size:expr, $write:ident, $read:ident) => {
        impl Scalar for $ty {
            fn encoded_len(&self) -> Option<usize> {
                Some($size)
            }

            fn put(&self, buf: &mut ByteBuffer) -> BufResult<()> {
                buf.$write(*self)
            }

            fn take(buf: &mut ByteBuffer, peek: bool) -> BufResult<Self> {
                buf.$read(peek)
            }
        }
    };
}

impl_scalar!(bool, 1, write_bool, read_bool);
impl_scalar!(i8, 1, write_i8, read_i8);
impl_scalar!(u8, 1, write_u8, read_u8);
impl_scalar!(i16, 2, write_i16, read_i16);
impl_scalar!(u16, 2, write_u16, read_u16);
impl_scalar!(i32, 4, write_i32, read_i32);
impl_scalar!(u32, 4, write_u32, read_u32);
impl_scalar!(i64, 8, write_i64, read_i64);
impl_scalar!(u64, 8, write_u64, read_u64);
impl_scalar!(f32, 4, write_f32, read_f32);
impl_scalar!(f64, 8, write_f64, read_f64);
impl_scalar!(char, 4, write_char, read_char);

impl Scalar for String {
    fn encoded_len(&self) -> Option<usize> {
        u32::try_from(self.len()).ok()?;
        TEXT_PREFIX_WIDTH.checked_add(self.len())
    }

    fn put(&self, buf: &mut ByteBuffer) -> BufResult<()> {
        let len = u32::try_from(self.len()).map_err(|_| BufferError::WriteFailed {
            offset: buf.position(),
            reason: format!("text of {} bytes exceeds u32 length prefix", self.len()),
        })?;
        buf.write_u32(len)?;
        buf.write_bytes(self.as_bytes())
    }

    fn take(buf: &mut ByteBuffer, peek: bool) -> BufResult<Self> {
        buf.peeking(peek, |buf| {
            let len = buf.read_u32(false)? as usize;
            let offset = buf.position();
            let bytes = buf.read_bytes(len, false)?;
            String::from_utf8(bytes.to_vec()).map_err(|e| BufferError::InvalidData {
                offset,
                reason: e.to_string(),
            })
        })
    }
}

/// Codec for one [`Scalar`] type.
pub struct LeafCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Scalar> LeafCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Scalar> Default for LeafCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Codec for LeafCodec<T> {
    type Value = T;

    const KIND: CodecKind = CodecKind::Leaf;

    fn size_of(&self, value: &T, _registry: &TypeRegistry) -> isize {
        value
            .encoded_len()
            .and_then(|len| isize::try_from(len).ok())
            .unwrap_or(SIZE_UNKNOWN)
    }

    fn write(&self, value: &T, buf: &mut ByteBuffer, _registry: &TypeRegistry) -> CodecResult<()> {
        Ok(value.put(buf)?)
    }

    fn read(&self, buf: &mut ByteBuffer, peek: bool, _registry: &TypeRegistry) -> CodecResult<T> {
        Ok(T::take(buf, peek)?)
    }
}
