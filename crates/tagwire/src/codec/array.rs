// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Array codec: `u32` element count followed by each element payload.
//!
//! Elements carry no header. The element codec is resolved through the
//! registry on every call, so an array codec may be registered before its
//! element type.

use super::{add_size, Codec, CodecKind, DynCodec, TypeKey, SIZE_UNKNOWN};
use crate::buffer::ByteBuffer;
use crate::error::{CodecError, CodecResult};
use crate::registry::TypeRegistry;
use std::any::{type_name, Any};
use std::marker::PhantomData;

/// Width of the element count prefix.
pub(crate) const COUNT_PREFIX_WIDTH: usize = 4;

/// Codec for `Vec<T>`, delegating each element to the codec registered for `T`.
pub struct ArrayCodec<T> {
    element: TypeKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> ArrayCodec<T> {
    pub fn new() -> Self {
        Self {
            element: TypeKey::of::<T>(),
            _marker: PhantomData,
        }
    }

    pub fn element(&self) -> TypeKey {
        self.element
    }

    fn element_codec<'r>(&self, registry: &'r TypeRegistry) -> CodecResult<&'r dyn DynCodec> {
        registry
            .codec(self.element.id())
            .ok_or(CodecError::Unregistered(self.element.name()))
    }
}

impl<T: Any> Default for ArrayCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any> Codec for ArrayCodec<T> {
    type Value = Vec<T>;

    const KIND: CodecKind = CodecKind::Array;

    fn size_of(&self, value: &Vec<T>, registry: &TypeRegistry) -> isize {
        if u32::try_from(value.len()).is_err() {
            return SIZE_UNKNOWN;
        }
        let Ok(codec) = self.element_codec(registry) else {
            return SIZE_UNKNOWN;
        };

        let mut total = COUNT_PREFIX_WIDTH as isize;
        for element in value {
            total = add_size(total, codec.size_of_dyn(element, registry));
            if total == SIZE_UNKNOWN {
                break;
            }
        }
        total
    }

    fn write(&self, value: &Vec<T>, buf: &mut ByteBuffer, registry: &TypeRegistry) -> CodecResult<()> {
        let count = u32::try_from(value.len()).map_err(|_| CodecError::LengthLimit {
            len: value.len() as u64,
            limit: u64::from(u32::MAX),
        })?;
        let codec = self.element_codec(registry)?;

        buf.write_u32(count)?;
        for (index, element) in value.iter().enumerate() {
            codec
                .write_dyn(element, buf, registry)
                .map_err(|source| CodecError::Element {
                    index,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    fn read(&self, buf: &mut ByteBuffer, peek: bool, registry: &TypeRegistry) -> CodecResult<Vec<T>> {
        let codec = self.element_codec(registry)?;
        let limit = registry.config().max_sequence_len;

        buf.peeking(peek, |buf| {
            let count = buf.read_u32(false)? as usize;
            if count > limit {
                return Err(CodecError::LengthLimit {
                    len: count as u64,
                    limit: limit as u64,
                });
            }

            // A hostile count must not drive the allocation.
            let mut out = Vec::with_capacity(count.min(buf.remaining()));
            for index in 0..count {
                let element = codec
                    .read_dyn(buf, false, registry)
                    .and_then(|boxed| {
                        boxed
                            .downcast::<T>()
                            .map_err(|_| CodecError::TypeMismatch {
                                expected: type_name::<T>(),
                            })
                    })
                    .map_err(|source| CodecError::Element {
                        index,
                        source: Box::new(source),
                    })?;
                out.push(*element);
            }
            Ok(out)
        })
    }
}
