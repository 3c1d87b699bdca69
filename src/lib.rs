//! # zcpack
//!
//! A MessagePack codec for latency- and allocation-sensitive callers.
//!
//! ## Design principles
//!
//! - **Bit-exact wire format.**
//!   Every value is written with the narrowest tag that can represent it, so output is
//!   byte-compatible with other MessagePack implementations.
//! - **Limits are checked on the claim.**
//!   Declared string, binary, array, map and extension lengths, and container nesting, are
//!   validated against [`DecodeLimits`] before any payload byte is read or any buffer allocated.
//! - **Zero-copy is a per-call choice.**
//!   With [`DecodeOptions::BORROWED`] (or the `zero_copy` toggle of [`StructCodec`]), string and
//!   binary spans borrow from the input; the borrow checker keeps the input alive and immutable
//!   for as long as they are in use.
//! - **Records are compiled once.**
//!   `#[derive(MsgPackEncode, MsgPackDecode)]` emits a field table and per-field accessors;
//!   the table is compiled into a [`Schema`] on first use and cached for the rest of the
//!   process.
//!
//! ## Data models
//!
//! - Native types through [`MsgPackEncode`] / [`MsgPackDecode`] (integers, floats, strings,
//!   byte sequences, `Option`, `Vec`, maps, derived records).
//! - [`Value`]: any MessagePack value, including extension values and raw (non-UTF-8) strings.
//! - [`Dynamic`]: an open-ended native model (text strings, `f64` floats, hashed maps).
//!
//! ## Example
//!
//! ```
//! use zcpack::{decode_value, encode_to_vec, DecodeOptions, Value};
//!
//! let v = Value::map([("name", Value::str("Alice")), ("age", Value::Int(30))]);
//! let bytes = encode_to_vec(&v)?;
//! assert_eq!(&bytes[..6], &[0x82, 0xa4, b'n', b'a', b'm', b'e']);
//!
//! let back = decode_value(&bytes, DecodeOptions::BORROWED)?;
//! assert_eq!(back.get("age").and_then(Value::as_i64), Some(30));
//! # Ok::<(), zcpack::MsgPackError>(())
//! ```
//!
//! ## Feature flags
//!
//! - `simdutf8`: enables SIMD-accelerated UTF-8 validation where supported.
//! - `serde`: implements `serde::Serialize` for [`Value`] and [`Dynamic`], and
//!   `serde::Deserialize` for `Dynamic<'static>`.
//! - `tracing`: logs schema compilation and pool activity through `tracing`.
//!
//! ## Safety
//!
//! This crate forbids `unsafe` code.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

#[macro_use]
mod trace;

mod alloc_util;
mod codec;
mod decode;
mod dynamic;
mod encode;
mod error;
pub mod format;
mod limits;
pub mod pool;
mod record;
pub mod schema;
#[cfg(feature = "serde")]
mod serde_impl;
mod utf8;
mod value;
mod wire;

pub use crate::codec::{
    decode, decode_borrowed, decode_into, decode_value, decode_with, encode_into, encode_to_vec, ArrayElem,
    MapEntries, MapKey, MsgPackDecode, MsgPackEncode,
};
pub use crate::decode::{DecodeOptions, Decoder};
pub use crate::dynamic::{decode_dynamic, Dynamic};
pub use crate::encode::{ArrayEncoder, Encoder, MapEncoder};
pub use crate::error::{ErrorCode, MsgPackError};
pub use crate::limits::{
    DecodeLimits, DEFAULT_MAX_CONTAINER_LEN, DEFAULT_MAX_DEPTH, MAX_TYPED_DEPTH, MAX_WIRE_LEN,
};
pub use crate::record::{decode_record, decode_record_into, encode_record, Record, RecordDecode, StructCodec};
pub use crate::schema::{FieldDef, FieldKind, Schema, SchemaKey};
pub use crate::value::{ExtValue, Value};

/// Derive macros for records.
///
/// `MsgPackEncode` implements [`Record`] and [`MsgPackEncode`]; `MsgPackDecode` implements
/// [`RecordDecode`] and [`MsgPackDecode`] and needs the `MsgPackEncode` derive (or a manual
/// [`Record`] impl) on the same type. Field attributes: `#[msgpack(rename = "..")]`,
/// `#[msgpack(skip)]`, `#[msgpack(omit_empty)]`, `#[msgpack(flatten)]`.
pub use zcpack_derive::{MsgPackDecode, MsgPackEncode};

#[doc(hidden)]
pub mod __private {
    pub use crate::record::unknown_route;
}
