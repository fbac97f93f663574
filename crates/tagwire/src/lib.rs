// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # tagwire - header-tagged binary encoding
//!
//! A [`TypeRegistry`] maps concrete Rust types to codecs and gives each one a
//! 16-bit header ordinal in registration order. A serialized value is the
//! header followed by the codec payload, so [`TypeRegistry::deserialize`]
//! needs no schema: it reads the header and dispatches.
//!
//! ## Quick Start
//!
//! ```rust
//! use tagwire::{Result, TypeRegistry};
//!
//! fn main() -> Result<()> {
//!     let mut registry = TypeRegistry::new();
//!     registry.register_type::<i32>()?; // also registers Vec<i32>
//!
//!     let mut buf = registry.serialize(&42i32)?;
//!     assert_eq!(buf.as_bytes(), &[0, 0, 42, 0, 0, 0]);
//!
//!     let value = registry.deserialize(&mut buf)?;
//!     assert_eq!(value.downcast_ref::<i32>(), Some(&42));
//!     Ok(())
//! }
//! ```
//!
//! ## Wire format
//!
//! ```text
//! top level   [u16 header][payload]
//! leaf        fixed-width little-endian value
//! text        [u32 byte length][UTF-8 bytes]
//! array       [u32 count][element payload]...
//! structured  [field payload]... in declared order
//! ```
//!
//! Nested values never carry a header. `bool` is one byte (0 or 1) and `char`
//! is its 32-bit scalar value.
//!
//! Headers are only meaningful to a registry populated with the same types in
//! the same order; compare [`TypeRegistry::layout_fingerprint`] across peers.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TypeRegistry`] | Type to codec map, header assignment, `serialize`/`deserialize` |
//! | [`ByteBuffer`] | Byte cursor with typed writes and peekable reads |
//! | [`Codec`] | Size/write/read capability implemented by every codec |
//! | [`StructSchema`] | Declared field list of a structured type |
//! | [`RegistryConfig`] | Derivation and decoding limits |
//!
//! ## Sizing
//!
//! `size_of` answers [`SIZE_UNKNOWN`] (`-1`) instead of failing when a value
//! cannot be sized, for example because a nested type has no codec. Only the
//! top-level `serialize` turns that into [`RegistryError::Unsizable`].

pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod registry;

pub use buffer::{ByteBuffer, HEADER_WIDTH};
pub use codec::{
    ArrayCodec, Codec, CodecKind, DynCodec, LeafCodec, Scalar, StructCodec, StructSchema,
    Structured, TypeKey, SIZE_UNKNOWN,
};
pub use config::RegistryConfig;
pub use error::{BufferError, CodecError, RegistryError, Result};
pub use registry::{global, install_global, TypeDescriptor, TypeRegistry, WireType, MAX_TYPES};
