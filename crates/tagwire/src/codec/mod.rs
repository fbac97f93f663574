// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Encoder capability shared by every codec.
//!
//! A codec reports the encoded size of a value, writes it and reads it back.
//! Codecs come in three variants:
//!
//! - **Leaf**: one primitive scalar ([`LeafCodec`])
//! - **Array**: a homogeneous `Vec<T>` built on the element codec ([`ArrayCodec`])
//! - **Structured**: an ordered list of declared fields ([`StructCodec`])
//!
//! Codecs are written against the typed [`Codec`] trait. The registry stores
//! them as [`DynCodec`] trait objects, which take and return `dyn Any` so that
//! a value can be dispatched by its runtime type.
//!
//! Every call receives the [`TypeRegistry`] so that composite codecs can
//! resolve the codecs of nested values. Nested values are written without a
//! header; only the registry's top-level `serialize` emits one.

mod array;
mod leaf;
mod structured;

pub use array::ArrayCodec;
pub use leaf::{LeafCodec, Scalar};
pub use structured::{StructCodec, StructSchema, Structured};

use crate::buffer::ByteBuffer;
use crate::error::{CodecError, CodecResult};
use crate::registry::TypeRegistry;
use std::any::{type_name, Any, TypeId};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Size sentinel: the codec cannot size this value (type mismatch,
/// unregistered nested type, or a value the encoding cannot represent).
///
/// This is an in-band answer, not an error. Composite codecs propagate it
/// upward so a caller can stop before writing anything.
pub const SIZE_UNKNOWN: isize = -1;

/// Stable identity of a concrete Rust type.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for
/// diagnostics. Matching is exact: no subtype or trait-object upcasting.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// Lets the registry look a key up by the `TypeId` of a `dyn Any` value.
impl Borrow<TypeId> for TypeKey {
    fn borrow(&self) -> &TypeId {
        &self.id
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Codec variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Leaf,
    Array,
    Structured,
}

/// Typed encoder capability.
pub trait Codec: Send + Sync + 'static {
    /// The exact type this codec handles.
    type Value: Any;

    const KIND: CodecKind;

    /// Encoded payload size in bytes, or [`SIZE_UNKNOWN`].
    fn size_of(&self, value: &Self::Value, registry: &TypeRegistry) -> isize;

    /// Append the payload at the buffer's cursor.
    ///
    /// A failure may leave part of the payload in the buffer.
    fn write(
        &self,
        value: &Self::Value,
        buf: &mut ByteBuffer,
        registry: &TypeRegistry,
    ) -> CodecResult<()>;

    /// Read a payload at the cursor. With `peek` set the cursor must end
    /// exactly where it started.
    fn read(
        &self,
        buf: &mut ByteBuffer,
        peek: bool,
        registry: &TypeRegistry,
    ) -> CodecResult<Self::Value>;
}

/// Object-safe view of a [`Codec`], used for runtime dispatch.
pub trait DynCodec: Send + Sync {
    fn type_key(&self) -> TypeKey;

    fn kind(&self) -> CodecKind;

    /// [`SIZE_UNKNOWN`] when `value` is not of [`DynCodec::type_key`].
    fn size_of_dyn(&self, value: &dyn Any, registry: &TypeRegistry) -> isize;

    fn write_dyn(
        &self,
        value: &dyn Any,
        buf: &mut ByteBuffer,
        registry: &TypeRegistry,
    ) -> CodecResult<()>;

    fn read_dyn(
        &self,
        buf: &mut ByteBuffer,
        peek: bool,
        registry: &TypeRegistry,
    ) -> CodecResult<Box<dyn Any>>;
}

impl<C: Codec> DynCodec for C {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<C::Value>()
    }

    fn kind(&self) -> CodecKind {
        C::KIND
    }

    fn size_of_dyn(&self, value: &dyn Any, registry: &TypeRegistry) -> isize {
        match value.downcast_ref::<C::Value>() {
            Some(value) => self.size_of(value, registry),
            None => SIZE_UNKNOWN,
        }
    }

    fn write_dyn(
        &self,
        value: &dyn Any,
        buf: &mut ByteBuffer,
        registry: &TypeRegistry,
    ) -> CodecResult<()> {
        let value = value
            .downcast_ref::<C::Value>()
            .ok_or(CodecError::TypeMismatch {
                expected: type_name::<C::Value>(),
            })?;
        self.write(value, buf, registry)
    }

    fn read_dyn(
        &self,
        buf: &mut ByteBuffer,
        peek: bool,
        registry: &TypeRegistry,
    ) -> CodecResult<Box<dyn Any>> {
        let value = self.read(buf, peek, registry)?;
        Ok(Box::new(value))
    }
}

/// Sum of two sizes, propagating the sentinel.
pub(crate) fn add_size(total: isize, part: isize) -> isize {
    if total == SIZE_UNKNOWN || part == SIZE_UNKNOWN {
        return SIZE_UNKNOWN;
    }
    total.checked_add(part).unwrap_or(SIZE_UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_key_identity() {
        assert_eq!(TypeKey::of::<i32>(), TypeKey::of::<i32>());
        assert_ne!(TypeKey::of::<i32>(), TypeKey::of::<u32>());
        assert_ne!(TypeKey::of::<i32>(), TypeKey::of::<Vec<i32>>());
        assert!(TypeKey::of::<Vec<u8>>().name().ends_with("Vec<u8>"));
    }

    #[test]
    fn test_add_size_propagates_sentinel() {
        assert_eq!(add_size(4, 8), 12);
        assert_eq!(add_size(SIZE_UNKNOWN, 8), SIZE_UNKNOWN);
        assert_eq!(add_size(4, SIZE_UNKNOWN), SIZE_UNKNOWN);
        assert_eq!(add_size(isize::MAX, 1), SIZE_UNKNOWN);
    }

    #[test]
    fn test_dyn_codec_rejects_foreign_values() {
        let registry = TypeRegistry::new();
        let codec: &dyn DynCodec = &LeafCodec::<i32>::new();
        assert_eq!(codec.kind(), CodecKind::Leaf);
        assert_eq!(codec.size_of_dyn(&7i32, &registry), 4);
        assert_eq!(codec.size_of_dyn(&7i64, &registry), SIZE_UNKNOWN);

        let mut buf = ByteBuffer::with_len(8);
        match codec.write_dyn(&"seven", &mut buf, &registry) {
            Err(CodecError::TypeMismatch { expected }) => assert_eq!(expected, "i32"),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(buf.position(), 0);
    }
}
