// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry and header dispatch.
//!
//! The registry maps each concrete Rust type to a codec and a header ordinal.
//! Ordinals are dense, zero-based and assigned in registration order; they are
//! never reassigned. A top-level payload is `[u16 header][codec payload]`, and
//! `deserialize` dispatches on the header alone.
//!
//! Two registries only agree on the wire if they registered the same types in
//! the same order. [`TypeRegistry::layout_fingerprint`] lets peers check that
//! before exchanging payloads.
//!
//! Registration takes `&mut self`; encoding and decoding take `&self`. Once a
//! registry is shared (for example through [`install_global`]) it is frozen.

use crate::buffer::{ByteBuffer, HEADER_WIDTH};
use crate::codec::{
    ArrayCodec, Codec, CodecKind, DynCodec, LeafCodec, Structured, TypeKey, SIZE_UNKNOWN,
};
use crate::config::RegistryConfig;
use crate::error::{CodecError, CodecResult, RegistryError, Result};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::iter;
use std::sync::{Arc, OnceLock};

/// Number of distinct header ordinals a `u16` header can carry.
pub const MAX_TYPES: usize = u16::MAX as usize + 1;

const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf29ce484222325;
const FNV1A_PRIME_64: u64 = 0x100000001b3;

// ---------------------------------------------------------------------------
// WireType
// ---------------------------------------------------------------------------

/// How a Rust type gets its codec into a registry.
///
/// Implemented for every leaf scalar and for `Vec<T>`; structured types get
/// it from [`wire_struct!`](crate::wire_struct). Registering a type registers
/// whatever it is built from first.
pub trait WireType: Any + Sized {
    /// Register `Self` (idempotent) and return its header.
    fn register(registry: &mut TypeRegistry) -> Result<u16>;
}

macro_rules! impl_leaf_wire_type {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WireType for $ty {
                fn register(registry: &mut TypeRegistry) -> Result<u16> {
                    registry.register_codec(LeafCodec::<$ty>::new())
                }
            }
        )*
    };
}

impl_leaf_wire_type!(bool, i8, u8, i16, u16, i32, u32, i64, u64, f32, f64, char, String);

impl<T: WireType> WireType for Vec<T> {
    fn register(registry: &mut TypeRegistry) -> Result<u16> {
        registry.register_array::<T>()
    }
}

// ---------------------------------------------------------------------------
// TypeDescriptor
// ---------------------------------------------------------------------------

/// One registration: type identity, header ordinal and owning codec.
#[derive(Clone)]
pub struct TypeDescriptor {
    key: TypeKey,
    header: u16,
    codec: Arc<dyn DynCodec>,
}

impl TypeDescriptor {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn header(&self) -> u16 {
        self.header
    }

    pub fn kind(&self) -> CodecKind {
        self.codec.kind()
    }

    pub fn type_name(&self) -> &'static str {
        self.key.name()
    }

    pub fn codec(&self) -> &dyn DynCodec {
        &*self.codec
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("header", &self.header)
            .field("type", &self.key)
            .field("kind", &self.kind())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TypeRegistry
// ---------------------------------------------------------------------------

/// Append-only map from type to codec and header ordinal.
pub struct TypeRegistry {
    config: RegistryConfig,
    by_type: HashMap<TypeKey, u16>,
    headers: Vec<TypeDescriptor>,
    /// Types whose codecs are being derived, outermost first.
    in_progress: Vec<TypeKey>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("config", &self.config)
            .field("headers", &self.headers)
            .finish()
    }
}

impl TypeRegistry {
    /// Empty registry with the default configuration.
    pub fn new() -> Self {
        Self {
            config: RegistryConfig::default(),
            by_type: HashMap::new(),
            headers: Vec::new(),
            in_progress: Vec::new(),
        }
    }

    /// Registry built from `config`, with the leaf codecs pre-registered when
    /// `config.builtin_leaves` is set.
    pub fn with_config(config: RegistryConfig) -> Result<Self> {
        let builtin = config.builtin_leaves;
        let mut registry = Self {
            config,
            ..Self::new()
        };
        if builtin {
            registry.register_builtin_leaves()?;
        }
        Ok(registry)
    }

    /// Registry with every leaf codec, in the fixed order of
    /// [`TypeRegistry::register_builtin_leaves`].
    pub fn builtin() -> Result<Self> {
        Self::with_config(RegistryConfig::default().with_builtin_leaves(true))
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register `codec` for its value type and return the header.
    ///
    /// A type that already has a codec keeps it; the existing header is
    /// returned and `codec` is dropped.
    ///
    /// A codec whose [`Codec::KIND`] is not [`CodecKind::Array`] also
    /// registers `Vec<C::Value>`, right after it. The decision follows the
    /// codec kind, not the value type: a custom leaf codec for `Vec<u8>`
    /// brings `Vec<Vec<u8>>` with it.
    ///
    /// Both headers are reserved together. When only one slot is left the
    /// call fails with [`RegistryError::HeaderSpaceExhausted`] and registers
    /// nothing.
    pub fn register_codec<C: Codec>(&mut self, codec: C) -> Result<u16> {
        if let Some(header) = self.header_by_id(TypeId::of::<C::Value>()) {
            return Ok(header);
        }

        let with_array = C::KIND != CodecKind::Array
            && self.header_by_id(TypeId::of::<Vec<C::Value>>()).is_none();
        let needed = if with_array { 2 } else { 1 };
        if self.headers.len() + needed > MAX_TYPES {
            log::warn!(
                "[tagwire] no header left for {} ({} of {} used)",
                type_name::<C::Value>(),
                self.headers.len(),
                MAX_TYPES
            );
            return Err(RegistryError::HeaderSpaceExhausted { max: MAX_TYPES });
        }

        let header = self.insert(Arc::new(codec))?;
        if with_array {
            self.insert(Arc::new(ArrayCodec::<C::Value>::new()))?;
        }
        Ok(header)
    }

    /// Register `T` and everything it is built from.
    pub fn register_type<T: WireType>(&mut self) -> Result<u16> {
        T::register(self)
    }

    /// Register `Vec<T>`, registering `T` first.
    pub fn register_array<T: WireType>(&mut self) -> Result<u16> {
        let key = TypeKey::of::<Vec<T>>();
        if let Some(header) = self.header_by_id(key.id()) {
            return Ok(header);
        }

        self.derive(key, |registry| {
            T::register(registry)?;
            match registry.header_by_id(key.id()) {
                Some(header) => Ok(header),
                None => registry.register_codec(ArrayCodec::<T>::new()),
            }
        })
    }

    /// Register a structured type.
    ///
    /// Field types are registered first, in declaration order. A field graph
    /// that leads back to `T` fails with [`RegistryError::CyclicType`]. Field
    /// types registered before a failure stay registered.
    pub fn register_struct<T: Structured>(&mut self) -> Result<u16> {
        let key = TypeKey::of::<T>();
        if let Some(header) = self.header_by_id(key.id()) {
            return Ok(header);
        }

        self.derive(key, |registry| {
            let codec = T::schema().bind(registry)?;
            registry.register_codec(codec)
        })
    }

    /// Register the leaf codecs in their fixed order, each followed by its
    /// array: `bool i8 u8 i16 u16 i32 u32 i64 u64 f32 f64 char String`.
    pub fn register_builtin_leaves(&mut self) -> Result<()> {
        self.register_type::<bool>()?;
        self.register_type::<i8>()?;
        self.register_type::<u8>()?;
        self.register_type::<i16>()?;
        self.register_type::<u16>()?;
        self.register_type::<i32>()?;
        self.register_type::<u32>()?;
        self.register_type::<i64>()?;
        self.register_type::<u64>()?;
        self.register_type::<f32>()?;
        self.register_type::<f64>()?;
        self.register_type::<char>()?;
        self.register_type::<String>()?;
        Ok(())
    }

    // Run one derivation step for `key` under the cycle and depth guards.
    fn derive(
        &mut self,
        key: TypeKey,
        build: impl FnOnce(&mut Self) -> Result<u16>,
    ) -> Result<u16> {
        if let Some(start) = self.in_progress.iter().position(|k| *k == key) {
            let path = self.in_progress[start..]
                .iter()
                .chain(iter::once(&key))
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join(" -> ");
            log::warn!("[tagwire] refusing cyclic type {}: {}", key, path);
            return Err(RegistryError::CyclicType {
                type_name: key.name(),
                path,
            });
        }

        let limit = self.config.max_derivation_depth;
        if self.in_progress.len() >= limit {
            log::warn!(
                "[tagwire] refusing {}: derivation depth limit {} reached",
                key,
                limit
            );
            return Err(RegistryError::DepthExceeded {
                type_name: key.name(),
                limit,
            });
        }

        self.in_progress.push(key);
        let result = build(self);
        self.in_progress.pop();
        result
    }

    fn insert(&mut self, codec: Arc<dyn DynCodec>) -> Result<u16> {
        let header = u16::try_from(self.headers.len())
            .map_err(|_| RegistryError::HeaderSpaceExhausted { max: MAX_TYPES })?;
        let key = codec.type_key();

        log::debug!(
            "[tagwire] registered {} as header {} ({:?})",
            key,
            header,
            codec.kind()
        );
        self.by_type.insert(key, header);
        self.headers.push(TypeDescriptor { key, header, codec });
        Ok(header)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn is_registered<T: Any>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    pub fn header_of<T: Any>(&self) -> Option<u16> {
        self.header_by_id(TypeId::of::<T>())
    }

    pub fn descriptor(&self, header: u16) -> Option<&TypeDescriptor> {
        self.headers.get(usize::from(header))
    }

    /// Registrations in header order.
    pub fn descriptors(&self) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        self.headers.iter()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// FNV-1a over the registered type names in header order.
    ///
    /// Type names come from `std::any::type_name`, so fingerprints are only
    /// comparable between builds of the same compiler.
    pub fn layout_fingerprint(&self) -> u64 {
        self.headers
            .iter()
            .flat_map(|d| d.key.name().bytes().chain(iter::once(0xFF)))
            .fold(FNV1A_OFFSET_BASIS_64, |hash, byte| {
                (hash ^ u64::from(byte)).wrapping_mul(FNV1A_PRIME_64)
            })
    }

    fn header_by_id(&self, id: TypeId) -> Option<u16> {
        self.by_type.get(&id).copied()
    }

    fn lookup(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.header_by_id(id).and_then(|header| self.descriptor(header))
    }

    pub(crate) fn codec(&self, id: TypeId) -> Option<&dyn DynCodec> {
        self.lookup(id).map(TypeDescriptor::codec)
    }

    pub(crate) fn codec_arc(&self, id: TypeId) -> Option<Arc<dyn DynCodec>> {
        self.lookup(id).map(|d| Arc::clone(&d.codec))
    }

    // -----------------------------------------------------------------------
    // Payload delegation (no header)
    // -----------------------------------------------------------------------

    /// Payload size of `value`, or [`SIZE_UNKNOWN`] if its type has no codec
    /// or the codec cannot size it.
    pub fn size_of<T: Any>(&self, value: &T) -> isize {
        self.size_of_dyn(value)
    }

    pub fn size_of_dyn(&self, value: &dyn Any) -> isize {
        match self.codec(value.type_id()) {
            Some(codec) => codec.size_of_dyn(value, self),
            None => SIZE_UNKNOWN,
        }
    }

    /// Write the payload of `value` at the cursor.
    pub fn write<T: Any>(&self, value: &T, buf: &mut ByteBuffer) -> CodecResult<()> {
        self.codec(TypeId::of::<T>())
            .ok_or(CodecError::Unregistered(type_name::<T>()))?
            .write_dyn(value, buf, self)
    }

    pub fn write_dyn(&self, value: &dyn Any, buf: &mut ByteBuffer) -> CodecResult<()> {
        self.codec(value.type_id())
            .ok_or(CodecError::Unregistered(
                "dynamic value (type name unavailable, only its TypeId is known)",
            ))?
            .write_dyn(value, buf, self)
    }

    /// Read a payload of type `T` at the cursor.
    pub fn read<T: Any>(&self, buf: &mut ByteBuffer, peek: bool) -> CodecResult<T> {
        let value = self.read_dyn(TypeKey::of::<T>(), buf, peek)?;
        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| CodecError::TypeMismatch {
                expected: type_name::<T>(),
            })
    }

    pub fn read_dyn(
        &self,
        key: TypeKey,
        buf: &mut ByteBuffer,
        peek: bool,
    ) -> CodecResult<Box<dyn Any>> {
        self.codec(key.id())
            .ok_or(CodecError::Unregistered(key.name()))?
            .read_dyn(buf, peek, self)
    }

    // -----------------------------------------------------------------------
    // Top-level serialize / deserialize
    // -----------------------------------------------------------------------

    /// Encode `value` with its header into a new buffer of exactly the
    /// encoded length. The returned buffer is rewound, ready to decode.
    pub fn serialize<T: Any>(&self, value: &T) -> Result<ByteBuffer> {
        let mut buf = ByteBuffer::default();
        self.serialize_into(value, &mut buf)?;
        Ok(buf)
    }

    /// Encode `value` into `buf`, resizing it to the encoded length. Prior
    /// contents are discarded.
    ///
    /// On [`RegistryError::WriteFailed`] the buffer holds a partial payload
    /// and must not be decoded.
    pub fn serialize_into<T: Any>(&self, value: &T, buf: &mut ByteBuffer) -> Result<()> {
        let descriptor = self
            .lookup(TypeId::of::<T>())
            .ok_or_else(|| RegistryError::NotRegistered {
                type_name: type_name::<T>().to_string(),
            })?;
        self.encode(descriptor, value, buf)
    }

    /// [`TypeRegistry::serialize`] dispatching on the runtime type of a
    /// `dyn Any` value.
    pub fn serialize_dyn(&self, value: &dyn Any) -> Result<ByteBuffer> {
        let mut buf = ByteBuffer::default();
        self.serialize_dyn_into(value, &mut buf)?;
        Ok(buf)
    }

    pub fn serialize_dyn_into(&self, value: &dyn Any, buf: &mut ByteBuffer) -> Result<()> {
        let descriptor =
            self.lookup(value.type_id())
                .ok_or_else(|| RegistryError::NotRegistered {
                    type_name: format!(
                        "dynamic value with {:?} (type name unavailable)",
                        value.type_id()
                    ),
                })?;
        self.encode(descriptor, value, buf)
    }

    fn encode(
        &self,
        descriptor: &TypeDescriptor,
        value: &dyn Any,
        buf: &mut ByteBuffer,
    ) -> Result<()> {
        let size = descriptor.codec.size_of_dyn(value, self);
        let total = usize::try_from(size)
            .ok()
            .and_then(|size| size.checked_add(HEADER_WIDTH))
            .ok_or(RegistryError::Unsizable {
                type_name: descriptor.type_name(),
            })?;

        buf.resize(total);
        buf.write_header(descriptor.header)?;
        descriptor
            .codec
            .write_dyn(value, buf, self)
            .map_err(|source| {
                log::debug!(
                    "[tagwire] serialize {} failed at offset {}: {}",
                    descriptor.key,
                    buf.position(),
                    source
                );
                RegistryError::WriteFailed {
                    type_name: descriptor.type_name(),
                    source,
                }
            })?;

        if buf.remaining() != 0 {
            log::warn!(
                "[tagwire] codec for {} sized {} bytes but wrote {}",
                descriptor.key,
                size,
                buf.position() - HEADER_WIDTH
            );
        }
        log::trace!(
            "[tagwire] serialized {} (header {}, {} bytes)",
            descriptor.key,
            descriptor.header,
            total
        );
        buf.rewind();
        Ok(())
    }

    /// Decode one header-tagged value at the cursor.
    pub fn deserialize(&self, buf: &mut ByteBuffer) -> Result<Box<dyn Any>> {
        let header = buf.read_header(false)?;
        let descriptor = self.dispatch(header)?;
        self.decode(descriptor, buf)
    }

    /// Decode one value and downcast it to `T`.
    ///
    /// The header is checked before it is consumed: on
    /// [`RegistryError::TypeMismatch`] the cursor has not moved.
    pub fn deserialize_as<T: Any>(&self, buf: &mut ByteBuffer) -> Result<T> {
        let header = buf.read_header(true)?;
        let descriptor = self.dispatch(header)?;
        if descriptor.key.id() != TypeId::of::<T>() {
            return Err(RegistryError::TypeMismatch {
                expected: type_name::<T>(),
                found: descriptor.type_name(),
            });
        }

        buf.read_header(false)?;
        self.decode(descriptor, buf)?
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| RegistryError::TypeMismatch {
                expected: type_name::<T>(),
                found: descriptor.type_name(),
            })
    }

    fn dispatch(&self, header: u16) -> Result<&TypeDescriptor> {
        self.descriptor(header).ok_or_else(|| {
            log::debug!("[tagwire] unrecognized header {}", header);
            RegistryError::UnrecognizedHeader {
                header,
                registered: self.len(),
            }
        })
    }

    fn decode(&self, descriptor: &TypeDescriptor, buf: &mut ByteBuffer) -> Result<Box<dyn Any>> {
        let value = descriptor
            .codec
            .read_dyn(buf, false, self)
            .map_err(|source| RegistryError::ReadFailed {
                type_name: descriptor.type_name(),
                source,
            })?;
        log::trace!(
            "[tagwire] deserialized {} (header {})",
            descriptor.key,
            descriptor.header
        );
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Process-wide registry
// ---------------------------------------------------------------------------

static GLOBAL_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// Freeze `registry` as the process-wide instance.
///
/// Only the first call installs; later calls hand their registry back.
pub fn install_global(
    registry: TypeRegistry,
) -> std::result::Result<&'static TypeRegistry, TypeRegistry> {
    let mut pending = Some(registry);
    let installed = GLOBAL_REGISTRY.get_or_init(|| pending.take().unwrap_or_default());
    match pending {
        None => {
            log::debug!(
                "[tagwire] installed global registry ({} types)",
                installed.len()
            );
            Ok(installed)
        }
        Some(rejected) => Err(rejected),
    }
}

/// The process-wide registry, if one was installed.
pub fn global() -> Option<&'static TypeRegistry> {
    GLOBAL_REGISTRY.get()
}
