use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::mem;

use crate::alloc_util::{try_string_from_str, try_vec_for_count, try_vec_from_slice};
use crate::decode::{DecodeOptions, Decoder};
use crate::encode::Encoder;
use crate::value::{ExtValue, Value};
use crate::{utf8, ErrorCode, MsgPackError};

/// A map represented as ordered key/value entries.
///
/// Encodes in vector order and decodes in wire order, so entry order survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapEntries<K, V>(pub Vec<(K, V)>);

impl<K, V> MapEntries<K, V> {
    /// Wrap an existing vector of entries.
    #[must_use]
    pub const fn new(entries: Vec<(K, V)>) -> Self {
        Self(entries)
    }
}

/// Encode `self` as one MessagePack value.
pub trait MsgPackEncode {
    /// Append `self` to the encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError>;

    /// Whether `self` holds its type's zero/empty value, for `omit_empty` fields.
    fn is_empty_value(&self) -> bool {
        false
    }
}

/// Decode one MessagePack value into `Self`.
pub trait MsgPackDecode<'de>: Sized {
    /// Decode a fresh value.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire value is malformed, violates limits, or does not match
    /// `Self`.
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError>;

    /// Decode into an existing value. A `nil` on the wire leaves `self` untouched.
    ///
    /// # Errors
    ///
    /// See [`MsgPackDecode::decode`].
    fn decode_in_place(&mut self, dec: &mut Decoder<'de>) -> Result<(), MsgPackError> {
        if dec.try_nil()? {
            return Ok(());
        }
        *self = Self::decode(dec)?;
        Ok(())
    }
}

/// Marker for types encoded as array elements.
///
/// `u8` is deliberately absent: `Vec<u8>` and `&[u8]` encode as binary, not as arrays.
pub trait ArrayElem {}

/// String map keys.
pub trait MapKey<'de>: Sized {
    /// Decode a key; non-string keys fail with `InvalidFormat`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for non-string keys and `Utf8Invalid` for malformed text.
    fn decode_key(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError>;
}

fn read_key_str<'de>(dec: &mut Decoder<'de>) -> Result<(&'de str, usize), MsgPackError> {
    let off = dec.position();
    let bytes = dec.read_string_key()?;
    utf8::validate(bytes, off).map(|s| (s, off))
}

impl<'de> MapKey<'de> for &'de str {
    fn decode_key(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        read_key_str(dec).map(|(s, _)| s)
    }
}

impl<'de> MapKey<'de> for String {
    fn decode_key(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        let (s, off) = read_key_str(dec)?;
        try_string_from_str(s, off)
    }
}

impl<'de> MapKey<'de> for Cow<'de, str> {
    fn decode_key(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        let (s, off) = read_key_str(dec)?;
        crate::alloc_util::str_span(s, dec.is_zero_copy(), off)
    }
}

/// Encode a value into a new buffer.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_to_vec<T: MsgPackEncode + ?Sized>(value: &T) -> Result<Vec<u8>, MsgPackError> {
    let mut enc = Encoder::new();
    enc.encode(value)?;
    Ok(enc.into_vec())
}

/// Append the encoding of a value to `out`. On error `out` keeps its previous contents.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_into<T: MsgPackEncode + ?Sized>(value: &T, out: &mut Vec<u8>) -> Result<(), MsgPackError> {
    let mut enc = Encoder::from_vec(mem::take(out));
    let res = enc.encode(value);
    *out = enc.into_vec();
    res
}

/// Decode exactly one value with default limits, copying spans.
///
/// # Errors
///
/// Returns an error if decoding fails or if bytes remain after the value.
pub fn decode<'de, T: MsgPackDecode<'de>>(bytes: &'de [u8]) -> Result<T, MsgPackError> {
    decode_with(bytes, DecodeOptions::DEFAULT)
}

/// Decode exactly one value with default limits, borrowing spans from `bytes`.
///
/// # Errors
///
/// Returns an error if decoding fails or if bytes remain after the value.
pub fn decode_borrowed<'de, T: MsgPackDecode<'de>>(bytes: &'de [u8]) -> Result<T, MsgPackError> {
    decode_with(bytes, DecodeOptions::BORROWED)
}

/// Decode exactly one value with explicit options.
///
/// # Errors
///
/// Returns an error if decoding fails or if bytes remain after the value.
pub fn decode_with<'de, T: MsgPackDecode<'de>>(
    bytes: &'de [u8],
    opts: DecodeOptions,
) -> Result<T, MsgPackError> {
    let mut dec = Decoder::new(bytes, opts);
    let value = T::decode(&mut dec)?;
    dec.finish()?;
    Ok(value)
}

/// Decode exactly one value into an existing target.
///
/// A `nil` input leaves the target unchanged. On error the target may be partially written.
///
/// # Errors
///
/// Returns an error if decoding fails or if bytes remain after the value.
pub fn decode_into<'de, T: MsgPackDecode<'de>>(
    bytes: &'de [u8],
    target: &mut T,
    opts: DecodeOptions,
) -> Result<(), MsgPackError> {
    let mut dec = Decoder::new(bytes, opts);
    target.decode_in_place(&mut dec)?;
    dec.finish()
}

/// Decode exactly one value into a [`Value`].
///
/// # Errors
///
/// Returns an error if decoding fails or if bytes remain after the value.
pub fn decode_value(bytes: &[u8], opts: DecodeOptions) -> Result<Value<'_>, MsgPackError> {
    let mut dec = Decoder::new(bytes, opts);
    let value = dec.decode_value()?;
    dec.finish()?;
    Ok(value)
}

impl MsgPackEncode for bool {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.bool(*self)
    }

    fn is_empty_value(&self) -> bool {
        !*self
    }
}

impl<'de> MsgPackDecode<'de> for bool {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.read_bool()
    }
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl MsgPackEncode for $t {
            fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
                enc.int(i64::from(*self))
            }

            fn is_empty_value(&self) -> bool {
                *self == 0
            }
        }

        impl<'de> MsgPackDecode<'de> for $t {
            fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
                dec.read_int()
            }
        }

        impl ArrayElem for $t {}
    )*};
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl MsgPackEncode for $t {
            fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
                enc.uint(u64::from(*self))
            }

            fn is_empty_value(&self) -> bool {
                *self == 0
            }
        }

        impl<'de> MsgPackDecode<'de> for $t {
            fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
                dec.read_int()
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64);
impl_unsigned!(u8, u16, u32, u64);

impl ArrayElem for u16 {}
impl ArrayElem for u32 {}
impl ArrayElem for u64 {}
impl ArrayElem for bool {}

impl MsgPackEncode for isize {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        let v = i64::try_from(*self)
            .map_err(|_| MsgPackError::new(ErrorCode::IntegerOutOfRange, enc.len()))?;
        enc.int(v)
    }

    fn is_empty_value(&self) -> bool {
        *self == 0
    }
}

impl<'de> MsgPackDecode<'de> for isize {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.read_int()
    }
}

impl ArrayElem for isize {}

impl MsgPackEncode for usize {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        let v = u64::try_from(*self)
            .map_err(|_| MsgPackError::new(ErrorCode::IntegerOutOfRange, enc.len()))?;
        enc.uint(v)
    }

    fn is_empty_value(&self) -> bool {
        *self == 0
    }
}

impl<'de> MsgPackDecode<'de> for usize {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.read_int()
    }
}

impl ArrayElem for usize {}

impl MsgPackEncode for f32 {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.f32(*self)
    }

    fn is_empty_value(&self) -> bool {
        *self == 0.0
    }
}

impl<'de> MsgPackDecode<'de> for f32 {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.read_f32()
    }
}

impl ArrayElem for f32 {}

impl MsgPackEncode for f64 {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.f64(*self)
    }

    fn is_empty_value(&self) -> bool {
        *self == 0.0
    }
}

impl<'de> MsgPackDecode<'de> for f64 {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.read_f64()
    }
}

impl ArrayElem for f64 {}

impl MsgPackEncode for str {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.str(self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<'de> MsgPackDecode<'de> for &'de str {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.read_str()
    }
}

impl ArrayElem for &str {}

impl MsgPackEncode for String {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.str(self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<'de> MsgPackDecode<'de> for String {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        let off = dec.position();
        let s = dec.read_str()?;
        try_string_from_str(s, off)
    }
}

impl ArrayElem for String {}

impl MsgPackEncode for Cow<'_, str> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.str(self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<'de> MsgPackDecode<'de> for Cow<'de, str> {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.read_str_cow()
    }
}

impl ArrayElem for Cow<'_, str> {}

impl MsgPackEncode for [u8] {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.bin(self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<'de> MsgPackDecode<'de> for &'de [u8] {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.read_bin()
    }
}

impl ArrayElem for &[u8] {}

impl MsgPackEncode for Vec<u8> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.bin(self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<'de> MsgPackDecode<'de> for Vec<u8> {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        let off = dec.position();
        let b = dec.read_bin()?;
        try_vec_from_slice(b, off)
    }
}

impl MsgPackEncode for Cow<'_, [u8]> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.bin(self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<'de> MsgPackDecode<'de> for Cow<'de, [u8]> {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.read_bin_cow()
    }
}

impl ArrayElem for Cow<'_, [u8]> {}

impl<T: MsgPackEncode + ?Sized> MsgPackEncode for &T {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        (**self).encode(enc)
    }

    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

impl<T: MsgPackEncode + ?Sized> MsgPackEncode for Box<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        (**self).encode(enc)
    }

    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

impl<'de, T: MsgPackDecode<'de>> MsgPackDecode<'de> for Box<T> {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        T::decode(dec).map(Box::new)
    }

    fn decode_in_place(&mut self, dec: &mut Decoder<'de>) -> Result<(), MsgPackError> {
        (**self).decode_in_place(dec)
    }
}

impl<T: ArrayElem + ?Sized> ArrayElem for Box<T> {}

impl<T: MsgPackEncode> MsgPackEncode for Option<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        match self {
            Some(v) => v.encode(enc),
            None => enc.nil(),
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl<'de, T: MsgPackDecode<'de>> MsgPackDecode<'de> for Option<T> {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        if dec.try_nil()? {
            return Ok(None);
        }
        T::decode(dec).map(Some)
    }

    fn decode_in_place(&mut self, dec: &mut Decoder<'de>) -> Result<(), MsgPackError> {
        *self = Self::decode(dec)?;
        Ok(())
    }
}

impl<T> ArrayElem for Option<T> {}

impl<T: MsgPackEncode + ArrayElem> MsgPackEncode for [T] {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.array_header(self.len())?;
        self.iter().try_for_each(|item| item.encode(enc))
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: MsgPackEncode + ArrayElem> MsgPackEncode for Vec<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        self.as_slice().encode(enc)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<'de, T: MsgPackDecode<'de> + ArrayElem> MsgPackDecode<'de> for Vec<T> {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        let off = dec.position();
        dec.array(|dec, len| {
            let mut out = try_vec_for_count(len, dec.remaining(), off)?;
            for _ in 0..len {
                out.push(T::decode(dec)?);
            }
            Ok(out)
        })
    }
}

impl<T> ArrayElem for Vec<T> {}

fn encode_entries<'a, K, V, I>(enc: &mut Encoder, len: usize, entries: I) -> Result<(), MsgPackError>
where
    K: AsRef<str> + 'a,
    V: MsgPackEncode + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    enc.map_header(len)?;
    for (k, v) in entries {
        enc.str(k.as_ref())?;
        v.encode(enc)?;
    }
    Ok(())
}

impl<K: AsRef<str>, V: MsgPackEncode, S> MsgPackEncode for HashMap<K, V, S> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        encode_entries(enc, self.len(), self.iter())
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<'de, K, V, S> MsgPackDecode<'de> for HashMap<K, V, S>
where
    K: MapKey<'de> + Eq + Hash,
    V: MsgPackDecode<'de>,
    S: BuildHasher + Default,
{
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        let off = dec.position();
        dec.map(|dec, len| {
            let mut out = Self::with_hasher(S::default());
            out.try_reserve(len.min(dec.remaining()))
                .map_err(|_| MsgPackError::new(ErrorCode::AllocationFailed, off))?;
            for _ in 0..len {
                let k = K::decode_key(dec)?;
                let v = V::decode(dec)?;
                out.insert(k, v);
            }
            Ok(out)
        })
    }
}

impl<K, V, S> ArrayElem for HashMap<K, V, S> {}

impl<K: AsRef<str>, V: MsgPackEncode> MsgPackEncode for BTreeMap<K, V> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        encode_entries(enc, self.len(), self.iter())
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<'de, K, V> MsgPackDecode<'de> for BTreeMap<K, V>
where
    K: MapKey<'de> + Ord,
    V: MsgPackDecode<'de>,
{
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.map(|dec, len| {
            let mut out = Self::new();
            for _ in 0..len {
                let k = K::decode_key(dec)?;
                let v = V::decode(dec)?;
                out.insert(k, v);
            }
            Ok(out)
        })
    }
}

impl<K, V> ArrayElem for BTreeMap<K, V> {}

impl<K: AsRef<str>, V: MsgPackEncode> MsgPackEncode for MapEntries<K, V> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        encode_entries(enc, self.0.len(), self.0.iter().map(|(k, v)| (k, v)))
    }

    fn is_empty_value(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de, K: MapKey<'de>, V: MsgPackDecode<'de>> MsgPackDecode<'de> for MapEntries<K, V> {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        let off = dec.position();
        dec.map(|dec, len| {
            let mut out = try_vec_for_count(len, dec.remaining(), off)?;
            for _ in 0..len {
                let k = K::decode_key(dec)?;
                let v = V::decode(dec)?;
                out.push((k, v));
            }
            Ok(Self(out))
        })
    }
}

impl<K, V> ArrayElem for MapEntries<K, V> {}

impl MsgPackEncode for Value<'_> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.value(self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_nil()
    }
}

impl<'de> MsgPackDecode<'de> for Value<'de> {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.decode_value()
    }

    fn decode_in_place(&mut self, dec: &mut Decoder<'de>) -> Result<(), MsgPackError> {
        *self = dec.decode_value()?;
        Ok(())
    }
}

impl ArrayElem for Value<'_> {}

impl MsgPackEncode for ExtValue<'_> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        enc.ext(self.type_id, &self.data)
    }
}

impl<'de> MsgPackDecode<'de> for ExtValue<'de> {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        let off = dec.position();
        let (type_id, data) = dec.read_ext()?;
        let data = crate::alloc_util::span(data, dec.is_zero_copy(), off)?;
        Ok(Self { type_id, data })
    }
}

impl ArrayElem for ExtValue<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_encode_as_binary_and_vectors_as_arrays() {
        assert_eq!(encode_to_vec(&vec![1u8, 2]).unwrap(), [0xc4, 0x02, 0x01, 0x02]);
        assert_eq!(encode_to_vec(&vec![1u16, 2]).unwrap(), [0x92, 0x01, 0x02]);
    }

    #[test]
    fn none_encodes_as_nil() {
        assert_eq!(encode_to_vec(&None::<String>).unwrap(), [0xc0]);
        assert_eq!(decode::<Option<u8>>(&[0xc0]).unwrap(), None);
    }

    #[test]
    fn nil_leaves_target_untouched() {
        let mut v = 7u32;
        decode_into(&[0xc0], &mut v, DecodeOptions::DEFAULT).unwrap();
        assert_eq!(v, 7);

        let mut o = Some(7u32);
        decode_into(&[0xc0], &mut o, DecodeOptions::DEFAULT).unwrap();
        assert_eq!(o, None);
    }

    #[test]
    fn trailing_bytes_rejected() {
        let err = decode::<u8>(&[0x01, 0x02]).unwrap_err();
        assert_eq!(err, MsgPackError::new(ErrorCode::TrailingBytes, 1));
    }

    #[test]
    fn encode_into_appends_and_restores_on_error() {
        let mut out = vec![0xaa];
        encode_into(&true, &mut out).unwrap();
        assert_eq!(out, [0xaa, 0xc3]);
    }

    #[test]
    fn map_keys_must_be_strings() {
        let err = decode::<HashMap<String, u8>>(&[0x81, 0x01, 0x02]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[test]
    fn cow_follows_zero_copy_toggle() {
        let bytes = [0xa1, b'x'];
        assert!(matches!(
            decode_borrowed::<Cow<'_, str>>(&bytes).unwrap(),
            Cow::Borrowed("x")
        ));
        assert!(matches!(decode::<Cow<'_, str>>(&bytes).unwrap(), Cow::Owned(_)));
    }
}
