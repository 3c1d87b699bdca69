//! Struct codec: records encoded as string-keyed maps, driven by their compiled [`Schema`].

use core::fmt;
use core::marker::PhantomData;

use crate::decode::{DecodeOptions, Decoder};
use crate::encode::Encoder;
use crate::limits::DecodeLimits;
use crate::schema::{schema_of, FieldDef, FieldDescriptor, Schema, SchemaKey};
use crate::{ErrorCode, MsgPackError};

/// A record type with a compiled field table.
///
/// Implemented by `#[derive(MsgPackEncode)]`. Field accessors are addressed by the routes of
/// the record's [`Schema`]; the codec never inspects the record any other way.
pub trait Record {
    /// Identity of the record's schema, used as the schema cache key.
    fn schema_key() -> SchemaKey;

    /// Declared fields in order, `skip` fields excluded.
    fn fields() -> Vec<FieldDef>;

    /// Encode the field at `route` as one value.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or if `route` names no field.
    fn encode_field(&self, route: &[u16], enc: &mut Encoder) -> Result<(), MsgPackError>;

    /// Whether the field at `route` holds its empty value.
    fn field_is_empty(&self, route: &[u16]) -> bool;
}

/// A record that can be decoded field by field.
///
/// Implemented by `#[derive(MsgPackDecode)]`. Fields absent from the input keep their
/// [`Default`] value.
pub trait RecordDecode<'de>: Record + Default {
    /// Decode one value into the field at `route`.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails or if `route` names no field.
    fn decode_field(&mut self, route: &[u16], dec: &mut Decoder<'de>) -> Result<(), MsgPackError>;
}

#[doc(hidden)]
#[must_use]
pub const fn unknown_route(offset: usize) -> MsgPackError {
    MsgPackError::new(ErrorCode::UnsupportedType, offset)
}

fn encode_with<T: Record>(schema: &Schema, value: &T, enc: &mut Encoder) -> Result<(), MsgPackError> {
    let retained = |f: &&FieldDescriptor| !(f.omit_empty && value.field_is_empty(&f.route));
    let count = schema.fields().iter().filter(retained).count();
    enc.map(count, |m| {
        for field in schema.fields().iter().filter(retained) {
            m.entry(field.name, |e| value.encode_field(&field.route, e))?;
        }
        Ok(())
    })
}

fn decode_with<'de, T: RecordDecode<'de>>(
    schema: &Schema,
    target: &mut T,
    dec: &mut Decoder<'de>,
) -> Result<(), MsgPackError> {
    if dec.try_nil()? {
        return Ok(());
    }
    dec.map(|d, len| {
        for _ in 0..len {
            match d.read_key_or_skip()?.and_then(|key| schema.find(key)) {
                Some(field) => target.decode_field(&field.route, d)?,
                None => d.skip_value()?,
            }
        }
        Ok(())
    })
}

/// Encode a record as a map of its retained fields.
///
/// `omit_empty` fields holding their empty value are left out and the map header counts only
/// the fields actually written.
///
/// # Errors
///
/// Returns an error if any field fails to encode; the encoder is left as it was.
pub fn encode_record<T: Record>(value: &T, enc: &mut Encoder) -> Result<(), MsgPackError> {
    encode_with(schema_of::<T>(), value, enc)
}

/// Decode a map into an existing record.
///
/// `nil` leaves every field untouched. Keys that match no field, and keys that are not strings,
/// are skipped together with their values.
///
/// # Errors
///
/// Returns `TypeMismatch` if the value is neither a map nor `nil`, or the first field error.
pub fn decode_record_into<'de, T: RecordDecode<'de>>(
    target: &mut T,
    dec: &mut Decoder<'de>,
) -> Result<(), MsgPackError> {
    decode_with(schema_of::<T>(), target, dec)
}

/// Decode a map into a fresh record, starting from [`Default`].
///
/// # Errors
///
/// See [`decode_record_into`].
pub fn decode_record<'de, T: RecordDecode<'de>>(dec: &mut Decoder<'de>) -> Result<T, MsgPackError> {
    let mut value = T::default();
    decode_record_into(&mut value, dec)?;
    Ok(value)
}

/// Compiled encoder/decoder for one record type.
///
/// Holds the record's cached [`Schema`] and decode limits; cheap to copy and share.
pub struct StructCodec<T> {
    schema: &'static Schema,
    limits: DecodeLimits,
    marker: PhantomData<fn() -> T>,
}

impl<T: Record> StructCodec<T> {
    /// Codec with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: schema_of::<T>(),
            limits: DecodeLimits::DEFAULT,
            marker: PhantomData,
        }
    }

    /// Replace the decode limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The compiled schema.
    #[must_use]
    pub const fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// The decode limits.
    #[must_use]
    pub const fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    const fn options(&self, zero_copy: bool) -> DecodeOptions {
        DecodeOptions::with_limits(self.limits).zero_copy(zero_copy)
    }

    /// Append `value` to `enc`.
    ///
    /// # Errors
    ///
    /// Returns an error if a field fails to encode; `enc` is left as it was.
    pub fn encode(&self, value: &T, enc: &mut Encoder) -> Result<(), MsgPackError> {
        encode_with(self.schema, value, enc)
    }

    /// Encode `value` into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if a field fails to encode.
    pub fn encode_to_vec(&self, value: &T) -> Result<Vec<u8>, MsgPackError> {
        let mut enc = Encoder::new();
        self.encode(value, &mut enc)?;
        Ok(enc.into_vec())
    }

    /// Decode exactly one record from `bytes`.
    ///
    /// With `zero_copy`, `Cow` string and byte fields borrow from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails or if bytes remain after the record.
    pub fn decode<'de>(&self, bytes: &'de [u8], zero_copy: bool) -> Result<T, MsgPackError>
    where
        T: RecordDecode<'de>,
    {
        let mut value = T::default();
        self.decode_into(bytes, &mut value, zero_copy)?;
        Ok(value)
    }

    /// Decode exactly one record from `bytes` into `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails or if bytes remain after the record. On error
    /// `target` may be partially written.
    pub fn decode_into<'de>(&self, bytes: &'de [u8], target: &mut T, zero_copy: bool) -> Result<(), MsgPackError>
    where
        T: RecordDecode<'de>,
    {
        let mut dec = Decoder::new(bytes, self.options(zero_copy));
        decode_with(self.schema, target, &mut dec)?;
        dec.finish()
    }

    /// Decode the next record from a streaming decoder.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_from<'de>(&self, dec: &mut Decoder<'de>) -> Result<T, MsgPackError>
    where
        T: RecordDecode<'de>,
    {
        let mut value = T::default();
        decode_with(self.schema, &mut value, dec)?;
        Ok(value)
    }
}

impl<T: Record> Default for StructCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for StructCodec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StructCodec<T> {}

impl<T> fmt::Debug for StructCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructCodec")
            .field("record", &core::any::type_name::<T>())
            .field("fields", &self.schema.len())
            .field("limits", &self.limits)
            .finish()
    }
}
