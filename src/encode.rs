use std::borrow::Cow;

use crate::alloc_util::try_reserve_exact;
use crate::codec::MsgPackEncode;
use crate::format::{self, Width, WidthTable};
use crate::value::{ExtValue, Value};
use crate::{ErrorCode, MsgPackError};

struct VecSink {
    buf: Vec<u8>,
}

impl VecSink {
    const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn with_capacity(capacity: usize) -> Self {
        let mut buf = Vec::new();
        let _ = buf.try_reserve(capacity);
        Self { buf }
    }

    #[inline]
    fn position(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn reserve(&mut self, additional: usize) -> Result<(), MsgPackError> {
        let available = self.buf.capacity() - self.buf.len();
        if additional <= available {
            return Ok(());
        }
        let offset = self.buf.len();
        try_reserve_exact(&mut self.buf, additional, offset)
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) -> Result<(), MsgPackError> {
        self.reserve(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    #[inline]
    fn write_u8(&mut self, byte: u8) -> Result<(), MsgPackError> {
        if self.buf.len() == self.buf.capacity() {
            self.reserve(1)?;
        }
        self.buf.push(byte);
        Ok(())
    }

    fn err(&self, code: ErrorCode) -> MsgPackError {
        MsgPackError::new(code, self.position())
    }
}

/// Emit the narrowest header of `table`'s family able to carry `n`.
fn write_width(sink: &mut VecSink, table: &WidthTable, n: u64) -> Result<(), MsgPackError> {
    match table.select(n) {
        Some(Width::Fix(b)) => sink.write_u8(b),
        Some(Width::W8(t)) => {
            let v = u8::try_from(n).map_err(|_| sink.err(ErrorCode::LengthOverflow))?;
            sink.write(&[t, v])
        }
        Some(Width::W16(t)) => {
            let v = u16::try_from(n).map_err(|_| sink.err(ErrorCode::LengthOverflow))?;
            sink.write_u8(t)?;
            sink.write(&v.to_be_bytes())
        }
        Some(Width::W32(t)) => {
            let v = u32::try_from(n).map_err(|_| sink.err(ErrorCode::LengthOverflow))?;
            sink.write_u8(t)?;
            sink.write(&v.to_be_bytes())
        }
        Some(Width::W64(t)) => {
            sink.write_u8(t)?;
            sink.write(&n.to_be_bytes())
        }
        None => Err(sink.err(ErrorCode::LengthOverflow)),
    }
}

fn write_len(sink: &mut VecSink, table: &WidthTable, len: usize) -> Result<(), MsgPackError> {
    let n = u64::try_from(len).map_err(|_| sink.err(ErrorCode::LengthOverflow))?;
    write_width(sink, table, n)
}

fn write_int(sink: &mut VecSink, v: i64) -> Result<(), MsgPackError> {
    if let Ok(u) = u64::try_from(v) {
        return write_width(sink, &WidthTable::UINT, u);
    }
    if v >= -32 {
        return sink.write_u8(v.to_be_bytes()[7]);
    }
    if let Ok(v8) = i8::try_from(v) {
        return sink.write(&[format::INT8, v8.to_be_bytes()[0]]);
    }
    if let Ok(v16) = i16::try_from(v) {
        sink.write_u8(format::INT16)?;
        return sink.write(&v16.to_be_bytes());
    }
    if let Ok(v32) = i32::try_from(v) {
        sink.write_u8(format::INT32)?;
        return sink.write(&v32.to_be_bytes());
    }
    sink.write_u8(format::INT64)?;
    sink.write(&v.to_be_bytes())
}

fn write_str(sink: &mut VecSink, b: &[u8]) -> Result<(), MsgPackError> {
    write_len(sink, &WidthTable::STR, b.len())?;
    sink.write(b)
}

/// Streaming encoder that appends MessagePack values to a growable buffer.
///
/// Every value is written with the narrowest tag able to represent it, so output is
/// byte-compatible with other MessagePack implementations.
pub struct Encoder {
    sink: VecSink,
}

impl Encoder {
    /// Create an empty encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sink: VecSink::new(),
        }
    }

    /// Create an encoder with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sink: VecSink::with_capacity(capacity),
        }
    }

    /// Create an encoder that appends to `buf`.
    #[must_use]
    pub const fn from_vec(buf: Vec<u8>) -> Self {
        Self {
            sink: VecSink { buf },
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sink.buf.len()
    }

    /// Returns `true` if no bytes have been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sink.buf.is_empty()
    }

    /// Allocated capacity of the output buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.sink.buf.capacity()
    }

    /// Drop all written bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.sink.buf.clear();
    }

    /// Borrow the bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.sink.buf
    }

    /// Consume and return the written bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.sink.buf
    }

    /// Encode one value with [`MsgPackEncode`].
    ///
    /// On error the buffer is restored to its length before the call.
    ///
    /// # Errors
    ///
    /// Returns whatever the value's encoding returns.
    pub fn encode<T: MsgPackEncode + ?Sized>(&mut self, value: &T) -> Result<(), MsgPackError> {
        let start = self.sink.buf.len();
        let res = value.encode(self);
        if res.is_err() {
            self.sink.buf.truncate(start);
        }
        res
    }

    /// Encode `nil`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the buffer cannot grow.
    pub fn nil(&mut self) -> Result<(), MsgPackError> {
        self.sink.write_u8(format::NIL)
    }

    /// Encode a boolean.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the buffer cannot grow.
    pub fn bool(&mut self, v: bool) -> Result<(), MsgPackError> {
        self.sink.write_u8(if v { format::TRUE } else { format::FALSE })
    }

    /// Encode a signed integer. Non-negative values use the unsigned families.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the buffer cannot grow.
    pub fn int(&mut self, v: i64) -> Result<(), MsgPackError> {
        write_int(&mut self.sink, v)
    }

    /// Encode an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the buffer cannot grow.
    pub fn uint(&mut self, v: u64) -> Result<(), MsgPackError> {
        write_width(&mut self.sink, &WidthTable::UINT, v)
    }

    /// Encode a float32.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the buffer cannot grow.
    pub fn f32(&mut self, v: f32) -> Result<(), MsgPackError> {
        self.sink.write_u8(format::FLOAT32)?;
        self.sink.write(&v.to_bits().to_be_bytes())
    }

    /// Encode a float64.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the buffer cannot grow.
    pub fn f64(&mut self, v: f64) -> Result<(), MsgPackError> {
        self.sink.write_u8(format::FLOAT64)?;
        self.sink.write(&v.to_bits().to_be_bytes())
    }

    /// Encode a string.
    ///
    /// # Errors
    ///
    /// Returns `LengthOverflow` above `u32::MAX` bytes, or `AllocationFailed`.
    pub fn str(&mut self, s: &str) -> Result<(), MsgPackError> {
        write_str(&mut self.sink, s.as_bytes())
    }

    /// Encode string bytes as-is; MessagePack does not require them to be UTF-8.
    ///
    /// # Errors
    ///
    /// Returns `LengthOverflow` above `u32::MAX` bytes, or `AllocationFailed`.
    pub fn str_bytes(&mut self, b: &[u8]) -> Result<(), MsgPackError> {
        write_str(&mut self.sink, b)
    }

    /// Encode a binary value.
    ///
    /// # Errors
    ///
    /// Returns `LengthOverflow` above `u32::MAX` bytes, or `AllocationFailed`.
    pub fn bin(&mut self, b: &[u8]) -> Result<(), MsgPackError> {
        write_len(&mut self.sink, &WidthTable::BIN, b.len())?;
        self.sink.write(b)
    }

    /// Encode an extension value, using fixext when the payload length allows it.
    ///
    /// # Errors
    ///
    /// Returns `LengthOverflow` above `u32::MAX` bytes, or `AllocationFailed`.
    pub fn ext(&mut self, type_id: i8, data: &[u8]) -> Result<(), MsgPackError> {
        let ty = type_id.to_be_bytes()[0];
        if let Some(tag) = format::fixext_tag(data.len()) {
            self.sink.write(&[tag, ty])?;
        } else {
            write_len(&mut self.sink, &WidthTable::EXT, data.len())?;
            self.sink.write_u8(ty)?;
        }
        self.sink.write(data)
    }

    /// Write an array header. The caller must follow it with exactly `len` values.
    ///
    /// # Errors
    ///
    /// Returns `LengthOverflow` above `u32::MAX` elements, or `AllocationFailed`.
    pub fn array_header(&mut self, len: usize) -> Result<(), MsgPackError> {
        write_len(&mut self.sink, &WidthTable::ARRAY, len)?;
        self.sink.reserve(len)
    }

    /// Write a map header. The caller must follow it with exactly `len` key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns `LengthOverflow` above `u32::MAX` entries, or `AllocationFailed`.
    pub fn map_header(&mut self, len: usize) -> Result<(), MsgPackError> {
        write_len(&mut self.sink, &WidthTable::MAP, len)?;
        let items = len
            .checked_mul(2)
            .ok_or_else(|| self.sink.err(ErrorCode::LengthOverflow))?;
        self.sink.reserve(items)
    }

    /// Encode a [`Value`].
    ///
    /// Nested containers are walked with an explicit stack, so any value [`Decoder::decode_value`]
    /// accepts can be written back.
    ///
    /// [`Decoder::decode_value`]: crate::Decoder::decode_value
    ///
    /// # Errors
    ///
    /// Returns `LengthOverflow` for oversize spans or containers, or `AllocationFailed`.
    pub fn value(&mut self, v: &Value<'_>) -> Result<(), MsgPackError> {
        let mut stack: Vec<ValueWalk<'_, '_>> = Vec::new();
        let mut current = v;
        loop {
            match current {
                Value::Nil => self.nil()?,
                Value::Bool(b) => self.bool(*b)?,
                Value::Int(i) => self.int(*i)?,
                Value::Uint(u) => self.uint(*u)?,
                Value::F32(f) => self.f32(*f)?,
                Value::F64(f) => self.f64(*f)?,
                Value::Str(b) => self.str_bytes(b)?,
                Value::Bin(b) => self.bin(b)?,
                Value::Ext(ExtValue { type_id, data }) => self.ext(*type_id, data)?,
                Value::Array(items) => {
                    self.array_header(items.len())?;
                    stack.push(ValueWalk::Items(items.iter()));
                }
                Value::Map(entries) => {
                    self.map_header(entries.len())?;
                    stack.push(ValueWalk::Entries(entries.iter()));
                }
            }
            current = loop {
                let Some(top) = stack.last_mut() else {
                    return Ok(());
                };
                let next = match top {
                    ValueWalk::Items(items) => items.next(),
                    ValueWalk::Entries(entries) => match entries.next() {
                        Some((k, v)) => {
                            self.str_bytes(k)?;
                            Some(v)
                        }
                        None => None,
                    },
                };
                match next {
                    Some(v) => break v,
                    None => {
                        stack.pop();
                    }
                }
            };
        }
    }

    /// Encode an array of `len` elements filled by the provided builder.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or if the builder emits a different number of items.
    pub fn array<F>(&mut self, len: usize, f: F) -> Result<(), MsgPackError>
    where
        F: FnOnce(&mut ArrayEncoder<'_>) -> Result<(), MsgPackError>,
    {
        let start = self.sink.buf.len();
        if let Err(err) = self.array_header(len) {
            self.sink.buf.truncate(start);
            return Err(err);
        }
        let mut a = ArrayEncoder {
            enc: self,
            remaining: len,
        };
        if let Err(err) = f(&mut a) {
            self.sink.buf.truncate(start);
            return Err(err);
        }
        if a.remaining != 0 {
            let err = self.sink.err(ErrorCode::ArrayLenMismatch);
            self.sink.buf.truncate(start);
            return Err(err);
        }
        Ok(())
    }

    /// Encode a map of `len` entries filled by the provided builder.
    ///
    /// Entries are written in the order the builder emits them.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or if the builder emits a different number of entries.
    pub fn map<F>(&mut self, len: usize, f: F) -> Result<(), MsgPackError>
    where
        F: FnOnce(&mut MapEncoder<'_>) -> Result<(), MsgPackError>,
    {
        let start = self.sink.buf.len();
        if let Err(err) = self.map_header(len) {
            self.sink.buf.truncate(start);
            return Err(err);
        }
        let mut m = MapEncoder {
            enc: self,
            remaining: len,
        };
        if let Err(err) = f(&mut m) {
            self.sink.buf.truncate(start);
            return Err(err);
        }
        if m.remaining != 0 {
            let err = self.sink.err(ErrorCode::MapLenMismatch);
            self.sink.buf.truncate(start);
            return Err(err);
        }
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for writing array elements.
pub struct ArrayEncoder<'a> {
    enc: &'a mut Encoder,
    remaining: usize,
}

impl ArrayEncoder<'_> {
    fn consume_one(&mut self) -> Result<(), MsgPackError> {
        if self.remaining == 0 {
            return Err(self.enc.sink.err(ErrorCode::ArrayLenMismatch));
        }
        self.remaining -= 1;
        Ok(())
    }

    /// Encode `nil` as the next element.
    ///
    /// # Errors
    ///
    /// Returns an error if the array length is exceeded or if encoding fails.
    pub fn nil(&mut self) -> Result<(), MsgPackError> {
        self.consume_one()?;
        self.enc.nil()
    }

    /// Encode a value as the next element.
    ///
    /// # Errors
    ///
    /// Returns an error if the array length is exceeded or if encoding fails.
    pub fn value<T: MsgPackEncode + ?Sized>(&mut self, value: &T) -> Result<(), MsgPackError> {
        self.consume_one()?;
        value.encode(self.enc)
    }

    /// Encode the next element with direct access to the encoder.
    ///
    /// The closure must write exactly one value.
    ///
    /// # Errors
    ///
    /// Returns an error if the array length is exceeded or if the closure fails.
    pub fn with<F>(&mut self, f: F) -> Result<(), MsgPackError>
    where
        F: FnOnce(&mut Encoder) -> Result<(), MsgPackError>,
    {
        self.consume_one()?;
        f(self.enc)
    }

    /// Encode a nested array as the next element.
    ///
    /// # Errors
    ///
    /// Returns an error if the array length is exceeded or if encoding fails.
    pub fn array<F>(&mut self, len: usize, f: F) -> Result<(), MsgPackError>
    where
        F: FnOnce(&mut ArrayEncoder<'_>) -> Result<(), MsgPackError>,
    {
        self.consume_one()?;
        self.enc.array(len, f)
    }

    /// Encode a nested map as the next element.
    ///
    /// # Errors
    ///
    /// Returns an error if the array length is exceeded or if encoding fails.
    pub fn map<F>(&mut self, len: usize, f: F) -> Result<(), MsgPackError>
    where
        F: FnOnce(&mut MapEncoder<'_>) -> Result<(), MsgPackError>,
    {
        self.consume_one()?;
        self.enc.map(len, f)
    }
}

/// Builder for writing map entries.
pub struct MapEncoder<'a> {
    enc: &'a mut Encoder,
    remaining: usize,
}

impl MapEncoder<'_> {
    /// Insert an entry whose value is written by `f`.
    ///
    /// # Errors
    ///
    /// Returns an error if the map length is exceeded or if encoding fails.
    pub fn entry<F>(&mut self, key: &str, f: F) -> Result<(), MsgPackError>
    where
        F: FnOnce(&mut Encoder) -> Result<(), MsgPackError>,
    {
        if self.remaining == 0 {
            return Err(self.enc.sink.err(ErrorCode::MapLenMismatch));
        }
        let entry_start = self.enc.sink.buf.len();
        let res = self.enc.str(key).and_then(|()| f(self.enc));
        if let Err(err) = res {
            self.enc.sink.buf.truncate(entry_start);
            return Err(err);
        }
        self.remaining -= 1;
        Ok(())
    }

    /// Insert an entry whose value implements [`MsgPackEncode`].
    ///
    /// # Errors
    ///
    /// Returns an error if the map length is exceeded or if encoding fails.
    pub fn value<T: MsgPackEncode + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), MsgPackError> {
        self.entry(key, |enc| value.encode(enc))
    }
}

/// Children of a container [`Encoder::value`] has opened but not finished.
enum ValueWalk<'v, 'a> {
    Items(std::slice::Iter<'v, Value<'a>>),
    Entries(std::slice::Iter<'v, (Cow<'a, [u8]>, Value<'a>)>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_bytes(v: i64) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.int(v).unwrap();
        enc.into_vec()
    }

    #[test]
    fn integers_use_narrowest_tag() {
        assert_eq!(int_bytes(0), [0x00]);
        assert_eq!(int_bytes(127), [0x7f]);
        assert_eq!(int_bytes(128), [0xcc, 0x80]);
        assert_eq!(int_bytes(256), [0xcd, 0x01, 0x00]);
        assert_eq!(int_bytes(-1), [0xff]);
        assert_eq!(int_bytes(-32), [0xe0]);
        assert_eq!(int_bytes(-33), [0xd0, 0xdf]);
        assert_eq!(int_bytes(-129), [0xd1, 0xff, 0x7f]);
        assert_eq!(int_bytes(i64::MIN)[0], 0xd3);
        assert_eq!(int_bytes(i64::from(u32::MAX)), [0xce, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn ext_prefers_fixext() {
        let mut enc = Encoder::new();
        enc.ext(1, &[0xaa; 4]).unwrap();
        assert_eq!(enc.as_bytes(), [0xd6, 0x01, 0xaa, 0xaa, 0xaa, 0xaa]);

        let mut enc = Encoder::new();
        enc.ext(-2, &[0x01; 3]).unwrap();
        assert_eq!(enc.as_bytes(), [0xc7, 0x03, 0xfe, 0x01, 0x01, 0x01]);
    }

    #[test]
    fn builder_length_mismatch_truncates() {
        let mut enc = Encoder::new();
        enc.nil().unwrap();
        let err = enc.array(2, |a| a.value(&1_i64)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ArrayLenMismatch);
        assert_eq!(enc.as_bytes(), [0xc0]);

        let err = enc
            .map(0, |m| m.entry("k", Encoder::nil))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MapLenMismatch);
        assert_eq!(enc.as_bytes(), [0xc0]);
    }

    #[test]
    fn map_builder_keeps_emit_order() {
        let mut enc = Encoder::new();
        enc.map(2, |m| {
            m.entry("name", |e| e.str("Alice"))?;
            m.entry("age", |e| e.int(30))
        })
        .unwrap();
        let mut expected = vec![0x82, 0xa4];
        expected.extend_from_slice(b"name");
        expected.push(0xa5);
        expected.extend_from_slice(b"Alice");
        expected.push(0xa3);
        expected.extend_from_slice(b"age");
        expected.push(0x1e);
        assert_eq!(enc.as_bytes(), expected);
    }
}
