// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structured codec built from a declared field list.
//!
//! A type opts in by implementing [`Structured`] and returning a
//! [`StructSchema`] that names the fields to encode, in wire order. Fields left
//! out of the schema are never read or written; on decode they keep the value
//! given by `Default`.
//!
//! ```
//! use tagwire::{wire_struct, TypeRegistry};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Sample {
//!     id: u32,
//!     label: String,
//!     cached: Option<u64>, // not on the wire
//! }
//!
//! wire_struct!(Sample { id, label });
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_struct::<Sample>().unwrap();
//!
//! let sample = Sample { id: 7, label: "a".into(), cached: Some(1) };
//! let mut buf = registry.serialize(&sample).unwrap();
//! let back: Sample = registry.deserialize_as(&mut buf).unwrap();
//! assert_eq!(back, Sample { cached: None, ..sample });
//! ```
//!
//! Binding a schema resolves each field's codec through the registry once.
//! Field types that are not registered yet are registered on the spot, which
//! is how nested structured types and arrays of them gain support.

use super::{add_size, Codec, CodecKind, DynCodec, TypeKey};
use crate::buffer::ByteBuffer;
use crate::error::{CodecError, CodecResult, RegistryError, Result};
use crate::registry::{TypeRegistry, WireType};
use std::any::{type_name, Any};
use std::sync::Arc;

/// A type with a declared wire layout.
pub trait Structured: Default + Any + Send + Sync {
    /// Ordered field list. Called once, when the type is registered.
    fn schema() -> StructSchema<Self>;
}

/// Declarative field list of a structured type.
pub struct StructSchema<T> {
    name: &'static str,
    fields: Vec<FieldDecl<T>>,
}

struct FieldDecl<T> {
    name: &'static str,
    key: TypeKey,
    register: fn(&mut TypeRegistry) -> Result<u16>,
    access: Box<dyn FieldAccess<T>>,
}

impl<T: Any> StructSchema<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    /// Append a field. Declaration order is wire order.
    pub fn field<F: WireType>(
        mut self,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.fields.push(FieldDecl {
            name,
            key: TypeKey::of::<F>(),
            register: F::register,
            access: Box::new(Accessor { get, get_mut }),
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    /// Resolve every field codec, registering field types as needed.
    pub(crate) fn bind(self, registry: &mut TypeRegistry) -> Result<StructCodec<T>> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for decl in self.fields {
            (decl.register)(registry)?;
            let codec = registry
                .codec_arc(decl.key.id())
                .ok_or_else(|| RegistryError::NotRegistered {
                    type_name: decl.key.name().to_string(),
                })?;
            fields.push(FieldBinding {
                name: decl.name,
                codec,
                access: decl.access,
            });
        }
        Ok(StructCodec {
            name: self.name,
            fields,
        })
    }
}

// Typed get/set for one field, erased so bindings of different field types
// fit in one list.
trait FieldAccess<T>: Send + Sync {
    fn get<'a>(&self, owner: &'a T) -> &'a dyn Any;

    fn set(&self, owner: &mut T, value: Box<dyn Any>) -> CodecResult<()>;
}

struct Accessor<T, F> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
}

impl<T: Any, F: Any> FieldAccess<T> for Accessor<T, F> {
    fn get<'a>(&self, owner: &'a T) -> &'a dyn Any {
        (self.get)(owner)
    }

    fn set(&self, owner: &mut T, value: Box<dyn Any>) -> CodecResult<()> {
        let value = value.downcast::<F>().map_err(|_| CodecError::TypeMismatch {
            expected: type_name::<F>(),
        })?;
        *(self.get_mut)(owner) = *value;
        Ok(())
    }
}

struct FieldBinding<T> {
    name: &'static str,
    codec: Arc<dyn DynCodec>,
    access: Box<dyn FieldAccess<T>>,
}

/// Codec for a [`Structured`] type: field payloads concatenated in declared
/// order, with no tags and no nested header.
pub struct StructCodec<T> {
    name: &'static str,
    fields: Vec<FieldBinding<T>>,
}

impl<T> StructCodec<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    fn wrap(&self, field: &FieldBinding<T>, source: CodecError) -> CodecError {
        CodecError::Field {
            type_name: self.name,
            field: field.name,
            source: Box::new(source),
        }
    }
}

impl<T: Structured> Codec for StructCodec<T> {
    type Value = T;

    const KIND: CodecKind = CodecKind::Structured;

    fn size_of(&self, value: &T, registry: &TypeRegistry) -> isize {
        self.fields.iter().fold(0, |total, field| {
            add_size(total, field.codec.size_of_dyn(field.access.get(value), registry))
        })
    }

    fn write(&self, value: &T, buf: &mut ByteBuffer, registry: &TypeRegistry) -> CodecResult<()> {
        for field in &self.fields {
            field
                .codec
                .write_dyn(field.access.get(value), buf, registry)
                .map_err(|source| self.wrap(field, source))?;
        }
        Ok(())
    }

    fn read(&self, buf: &mut ByteBuffer, peek: bool, registry: &TypeRegistry) -> CodecResult<T> {
        buf.peeking(peek, |buf| {
            let mut out = T::default();
            for field in &self.fields {
                let value = field
                    .codec
                    .read_dyn(buf, false, registry)
                    .map_err(|source| self.wrap(field, source))?;
                field
                    .access
                    .set(&mut out, value)
                    .map_err(|source| self.wrap(field, source))?;
            }
            Ok(out)
        })
    }
}

/// Implement [`Structured`] and [`WireType`](crate::WireType) for a struct
/// from its list of wire fields.
///
/// `wire_struct!(Point { x, y })` encodes `x` then `y`. Every listed field type
/// must itself implement `WireType`.
#[macro_export]
macro_rules! wire_struct {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::Structured for $ty {
            fn schema() -> $crate::StructSchema<Self> {
                $crate::StructSchema::new(stringify!($ty))
                    $(.field(
                        stringify!($field),
                        |s: &Self| &s.$field,
                        |s: &mut Self| &mut s.$field,
                    ))*
            }
        }

        impl $crate::WireType for $ty {
            fn register(registry: &mut $crate::TypeRegistry) -> $crate::Result<u16> {
                registry.register_struct::<Self>()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BufferError;

    #[derive(Debug, Default, PartialEq)]
    struct Reading {
        sensor: u16,
        values: Vec<f32>,
        note: String,
        scratch: u64,
    }

    wire_struct!(Reading {
        sensor,
        values,
        note,
    });

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register_struct::<Reading>()
            .expect("Register Reading should succeed");
        registry
    }

    fn sample() -> Reading {
        Reading {
            sensor: 3,
            values: vec![1.5, -2.0],
            note: "ok".into(),
            scratch: 99,
        }
    }

    #[test]
    fn test_schema_lists_declared_fields_in_order() {
        let schema = Reading::schema();
        assert_eq!(schema.name(), "Reading");
        assert_eq!(schema.len(), 3);
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            vec!["sensor", "values", "note"]
        );
    }

    #[test]
    fn test_undeclared_field_excluded_from_size() {
        let registry = registry();
        let mut value = sample();
        let size = registry.size_of(&value);
        assert_eq!(size, 2 + (4 + 8) + (4 + 2));

        value.scratch = u64::MAX;
        assert_eq!(registry.size_of(&value), size);
    }

    #[test]
    fn test_roundtrip_resets_undeclared_field() {
        let registry = registry();
        let value = sample();
        let mut buf = ByteBuffer::with_len(registry.size_of(&value) as usize);
        registry
            .write(&value, &mut buf)
            .expect("Write should succeed");
        assert_eq!(buf.remaining(), 0);

        buf.rewind();
        let peeked: Reading = registry.read(&mut buf, true).expect("Peek should succeed");
        assert_eq!(buf.position(), 0);
        let read: Reading = registry.read(&mut buf, false).expect("Read should succeed");
        assert_eq!(peeked, read);
        assert_eq!(
            read,
            Reading {
                scratch: 0,
                ..sample()
            }
        );
    }

    #[test]
    fn test_field_failure_names_field() {
        let registry = registry();
        // sensor, then a values count of 1 with no element bytes behind it
        let mut buf = ByteBuffer::from_bytes(vec![3, 0, 1, 0, 0, 0]);
        match registry.read::<Reading>(&mut buf, false) {
            Err(CodecError::Field {
                type_name,
                field,
                source,
            }) => {
                assert_eq!(type_name, "Reading");
                assert_eq!(field, "values");
                match *source {
                    CodecError::Element { index: 0, source } => assert!(matches!(
                        *source,
                        CodecError::Buffer(BufferError::ReadFailed { .. })
                    )),
                    other => panic!("unexpected source {:?}", other),
                }
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_write_stops_at_first_failing_field() {
        let registry = registry();
        let value = sample();
        // room for `sensor` and the `values` count only
        let mut buf = ByteBuffer::with_len(6);
        let err = registry
            .write(&value, &mut buf)
            .expect_err("Write into short buffer should fail");
        assert!(matches!(err, CodecError::Field { field: "values", .. }));
        assert_eq!(&buf.as_bytes()[..2], &[3, 0]);
    }

    #[test]
    fn test_codec_reports_bound_fields() {
        let registry = registry();
        let descriptor = registry
            .descriptor(registry.header_of::<Reading>().expect("Reading should be registered"))
            .expect("Descriptor should exist");
        assert_eq!(descriptor.kind(), CodecKind::Structured);
        assert_eq!(descriptor.key(), TypeKey::of::<Reading>());
    }
}
