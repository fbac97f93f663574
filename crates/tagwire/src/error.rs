// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the cursor, codec and registry layers.
//!
//! Three layers, each wrapping the one below it:
//!
//! - [`BufferError`]: bounds and validity failures of the byte cursor.
//! - [`CodecError`]: a codec could not write or read a value.
//! - [`RegistryError`]: failures at the registry boundary (registration,
//!   `serialize`, `deserialize`).
//!
//! Size computation is deliberately absent from all three: an unsizable value
//! is reported in-band as [`crate::SIZE_UNKNOWN`].

use thiserror::Error;

/// Byte cursor failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("write failed at offset {offset}: {reason}")]
    WriteFailed { offset: usize, reason: String },

    #[error("read failed at offset {offset}: {reason}")]
    ReadFailed { offset: usize, reason: String },

    #[error("invalid data at offset {offset}: {reason}")]
    InvalidData { offset: usize, reason: String },
}

pub type BufResult<T> = std::result::Result<T, BufferError>;

/// Codec-level failure while writing or reading a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// The value handed to a codec is not of the codec's exact type.
    #[error("type mismatch: codec for {expected} received a value of another type")]
    TypeMismatch { expected: &'static str },

    /// A nested element or field type has no codec in the registry.
    #[error("type not registered: {0}")]
    Unregistered(&'static str),

    /// A length prefix exceeds what the encoding or the configuration allows.
    #[error("length {len} exceeds limit {limit}")]
    LengthLimit { len: u64, limit: u64 },

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<CodecError>,
    },

    #[error("field `{field}` of {type_name}: {source}")]
    Field {
        type_name: &'static str,
        field: &'static str,
        #[source]
        source: Box<CodecError>,
    },
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Registry-boundary failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The value's exact runtime type was never registered.
    #[error("type not registered: {type_name}")]
    NotRegistered { type_name: String },

    /// The decoded header has no registration behind it.
    #[error("unrecognized type header {header} ({registered} types registered)")]
    UnrecognizedHeader { header: u16, registered: usize },

    /// The codec returned the size sentinel for a top-level value.
    #[error("cannot determine encoded size of {type_name}")]
    Unsizable { type_name: &'static str },

    /// The codec failed after the header was committed. The buffer holds a
    /// partial payload and must be discarded.
    #[error("failed to write {type_name}: {source}")]
    WriteFailed {
        type_name: &'static str,
        #[source]
        source: CodecError,
    },

    #[error("failed to read {type_name}: {source}")]
    ReadFailed {
        type_name: &'static str,
        #[source]
        source: CodecError,
    },

    /// Deriving codecs for this type would recurse into itself.
    #[error("cyclic field graph: {type_name} is reachable from its own fields ({path})")]
    CyclicType { type_name: &'static str, path: String },

    #[error("derivation depth limit {limit} exceeded while registering {type_name}")]
    DepthExceeded { type_name: &'static str, limit: usize },

    /// Every 16-bit header ordinal is in use.
    #[error("header space exhausted: at most {max} types can be registered")]
    HeaderSpaceExhausted { max: usize },

    /// `deserialize_as` decoded a value of a different type.
    #[error("decoded {found}, expected {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
