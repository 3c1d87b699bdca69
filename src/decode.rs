use std::borrow::Cow;
use std::mem;

use crate::alloc_util::{self, try_vec_for_count};
use crate::codec::MsgPackDecode;
use crate::format::{Family, Tag};
use crate::value::{ExtValue, Value};
use crate::wire::Cursor;
use crate::{utf8, DecodeLimits, ErrorCode, MsgPackError};

/// Per-call decode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Resource ceilings enforced on declared lengths and nesting.
    pub limits: DecodeLimits,
    /// Borrow string and binary spans from the input instead of copying them.
    ///
    /// Only affects targets that can hold either form (`Cow`, [`Value`]); `&str` always
    /// borrows and `String` always copies.
    pub zero_copy: bool,
}

impl DecodeOptions {
    /// Default limits, copying mode.
    pub const DEFAULT: Self = Self {
        limits: DecodeLimits::DEFAULT,
        zero_copy: false,
    };

    /// Default limits, zero-copy mode.
    pub const BORROWED: Self = Self {
        limits: DecodeLimits::DEFAULT,
        zero_copy: true,
    };

    /// Copying mode with explicit limits.
    #[must_use]
    pub const fn with_limits(limits: DecodeLimits) -> Self {
        Self {
            limits,
            zero_copy: false,
        }
    }

    /// Return a copy with the zero-copy toggle set.
    #[must_use]
    pub const fn zero_copy(mut self, on: bool) -> Self {
        self.zero_copy = on;
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Streaming decoder over a MessagePack input buffer.
///
/// A decoder reads one value at a time and leaves the cursor just past it, so a buffer holding
/// several concatenated values can be consumed with repeated [`Decoder::decode`] calls.
pub struct Decoder<'de> {
    cursor: Cursor<'de>,
    limits: DecodeLimits,
    depth: usize,
    zero_copy: bool,
    skip_stack: Vec<usize>,
}

impl<'de> Decoder<'de> {
    /// Construct a decoder over `bytes`.
    #[must_use]
    pub const fn new(bytes: &'de [u8], opts: DecodeOptions) -> Self {
        Self::with_scratch(bytes, opts, Vec::new())
    }

    pub(crate) const fn with_scratch(
        bytes: &'de [u8],
        opts: DecodeOptions,
        skip_stack: Vec<usize>,
    ) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            limits: opts.limits,
            depth: 0,
            zero_copy: opts.zero_copy,
            skip_stack,
        }
    }

    pub(crate) fn take_scratch(&mut self) -> Vec<usize> {
        mem::take(&mut self.skip_stack)
    }

    /// Current byte offset in the input.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Number of unread input bytes.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Returns `true` once every input byte has been consumed.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cursor.remaining() == 0
    }

    /// The limits this decoder enforces.
    #[inline]
    #[must_use]
    pub const fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Whether string and binary spans are borrowed from the input.
    #[inline]
    #[must_use]
    pub const fn is_zero_copy(&self) -> bool {
        self.zero_copy
    }

    /// Current container nesting depth.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Fail with `TrailingBytes` unless the input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `TrailingBytes` at the current position if unread bytes remain.
    pub const fn finish(&self) -> Result<(), MsgPackError> {
        if self.cursor.remaining() != 0 {
            return Err(MsgPackError::new(ErrorCode::TrailingBytes, self.position()));
        }
        Ok(())
    }

    /// Decode one value of type `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the next value is malformed, violates limits, or does not fit `T`.
    pub fn decode<T: MsgPackDecode<'de>>(&mut self) -> Result<T, MsgPackError> {
        T::decode(self)
    }

    /// Classify the next tag byte without consuming it.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` if the input is exhausted.
    pub fn peek_tag(&self) -> Result<Tag, MsgPackError> {
        self.cursor.peek_u8().map(Tag::classify)
    }

    /// Wire family of the next value.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` if the input is exhausted.
    pub fn peek_family(&self) -> Result<Family, MsgPackError> {
        self.peek_tag().map(Tag::family)
    }

    #[inline]
    pub(crate) fn read_tag(&mut self) -> Result<(Tag, usize), MsgPackError> {
        let off = self.cursor.position();
        let b = self.cursor.read_u8()?;
        Ok((Tag::classify(b), off))
    }

    /// Error for a tag that cannot be read as the requested type.
    pub(crate) const fn unexpected(tag: Tag, off: usize) -> MsgPackError {
        match tag {
            Tag::Reserved => MsgPackError::new(ErrorCode::InvalidFormat, off),
            _ => MsgPackError::new(ErrorCode::TypeMismatch, off),
        }
    }

    /// Consume a `nil` if one is next.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` if the input is exhausted.
    pub fn try_nil(&mut self) -> Result<bool, MsgPackError> {
        if self.peek_tag()? == Tag::Nil {
            self.cursor.read_u8()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Read a `nil`.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the next value is not `nil`.
    pub fn read_nil(&mut self) -> Result<(), MsgPackError> {
        match self.read_tag()? {
            (Tag::Nil, _) => Ok(()),
            (tag, off) => Err(Self::unexpected(tag, off)),
        }
    }

    /// Read a boolean.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the next value is not a boolean.
    pub fn read_bool(&mut self) -> Result<bool, MsgPackError> {
        match self.read_tag()? {
            (Tag::False, _) => Ok(false),
            (Tag::True, _) => Ok(true),
            (tag, off) => Err(Self::unexpected(tag, off)),
        }
    }

    /// Read the payload of an integer tag. `None` if `tag` is not an integer.
    pub(crate) fn int_body(&mut self, tag: Tag) -> Result<Option<i128>, MsgPackError> {
        let c = &mut self.cursor;
        let v = match tag {
            Tag::PosFixInt(v) => i128::from(v),
            Tag::NegFixInt(v) => i128::from(v),
            Tag::Uint8 => i128::from(c.read_u8()?),
            Tag::Uint16 => i128::from(c.read_be_u16()?),
            Tag::Uint32 => i128::from(c.read_be_u32()?),
            Tag::Uint64 => i128::from(c.read_be_u64()?),
            Tag::Int8 => i128::from(i8::from_be_bytes([c.read_u8()?])),
            Tag::Int16 => i128::from(i16::from_be_bytes(c.read_be_u16()?.to_be_bytes())),
            Tag::Int32 => i128::from(i32::from_be_bytes(c.read_be_u32()?.to_be_bytes())),
            Tag::Int64 => i128::from(i64::from_be_bytes(c.read_be_u64()?.to_be_bytes())),
            _ => return Ok(None),
        };
        Ok(Some(v))
    }

    /// Read an integer of any wire width into `T`.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non-integer values and `IntegerOutOfRange` if the value does
    /// not fit `T`.
    pub fn read_int<T: TryFrom<i128>>(&mut self) -> Result<T, MsgPackError> {
        let (tag, off) = self.read_tag()?;
        match self.int_body(tag)? {
            Some(v) => T::try_from(v).map_err(|_| MsgPackError::new(ErrorCode::IntegerOutOfRange, off)),
            None => Err(Self::unexpected(tag, off)),
        }
    }

    /// Read a float64. float32 and integer values are widened.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non-numeric values.
    #[allow(clippy::cast_precision_loss)]
    pub fn read_f64(&mut self) -> Result<f64, MsgPackError> {
        let (tag, off) = self.read_tag()?;
        match tag {
            Tag::Float32 => Ok(f64::from(f32::from_bits(self.cursor.read_be_u32()?))),
            Tag::Float64 => Ok(f64::from_bits(self.cursor.read_be_u64()?)),
            _ => match self.int_body(tag)? {
                Some(v) => Ok(v as f64),
                None => Err(Self::unexpected(tag, off)),
            },
        }
    }

    /// Read a float32. Integer values are widened; float64 values are rounded to nearest.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non-numeric values.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn read_f32(&mut self) -> Result<f32, MsgPackError> {
        let (tag, off) = self.read_tag()?;
        match tag {
            Tag::Float32 => Ok(f32::from_bits(self.cursor.read_be_u32()?)),
            Tag::Float64 => Ok(f64::from_bits(self.cursor.read_be_u64()?) as f32),
            _ => match self.int_body(tag)? {
                Some(v) => Ok(v as f32),
                None => Err(Self::unexpected(tag, off)),
            },
        }
    }

    /// Read the length field following a length-carrying tag.
    fn len_after(&mut self, tag: Tag, off: usize) -> Result<usize, MsgPackError> {
        match tag {
            Tag::FixStr(n) | Tag::FixArray(n) | Tag::FixMap(n) => Ok(usize::from(n)),
            Tag::Str8 | Tag::Bin8 => self.cursor.read_len(1),
            Tag::Str16 | Tag::Bin16 | Tag::Array16 | Tag::Map16 => self.cursor.read_len(2),
            Tag::Str32 | Tag::Bin32 | Tag::Array32 | Tag::Map32 => self.cursor.read_len(4),
            _ => Err(Self::unexpected(tag, off)),
        }
    }

    /// Payload of a string tag; the declared length is validated before any byte is read.
    pub(crate) fn str_body(&mut self, tag: Tag, off: usize) -> Result<&'de [u8], MsgPackError> {
        if tag.family() != Family::Str {
            return Err(Self::unexpected(tag, off));
        }
        let len = self.len_after(tag, off)?;
        self.limits.check_str_len(len, off)?;
        self.cursor.read_exact(len)
    }

    pub(crate) fn bin_body(&mut self, tag: Tag, off: usize) -> Result<&'de [u8], MsgPackError> {
        if tag.family() != Family::Bin {
            return Err(Self::unexpected(tag, off));
        }
        let len = self.len_after(tag, off)?;
        self.limits.check_bin_len(len, off)?;
        self.cursor.read_exact(len)
    }

    pub(crate) fn ext_body(&mut self, tag: Tag, off: usize) -> Result<(i8, &'de [u8]), MsgPackError> {
        let len = match tag {
            Tag::FixExt(n) => usize::from(n),
            Tag::Ext8 => self.cursor.read_len(1)?,
            Tag::Ext16 => self.cursor.read_len(2)?,
            Tag::Ext32 => self.cursor.read_len(4)?,
            _ => return Err(Self::unexpected(tag, off)),
        };
        self.limits.check_ext_len(len, off)?;
        let ty = i8::from_be_bytes([self.cursor.read_u8()?]);
        let data = self.cursor.read_exact(len)?;
        Ok((ty, data))
    }

    /// Read raw string bytes without UTF-8 validation.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non-string values, or a limit/EOF error.
    pub fn read_str_bytes(&mut self) -> Result<&'de [u8], MsgPackError> {
        let (tag, off) = self.read_tag()?;
        self.str_body(tag, off)
    }

    /// Read a UTF-8 string borrowed from the input.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non-string values, `Utf8Invalid` for malformed text, or a
    /// limit/EOF error.
    pub fn read_str(&mut self) -> Result<&'de str, MsgPackError> {
        let (tag, off) = self.read_tag()?;
        let bytes = self.str_body(tag, off)?;
        utf8::validate(bytes, off)
    }

    /// Read a UTF-8 string, borrowed or copied according to the zero-copy toggle.
    ///
    /// # Errors
    ///
    /// See [`Decoder::read_str`]; additionally `AllocationFailed` when copying.
    pub fn read_str_cow(&mut self) -> Result<Cow<'de, str>, MsgPackError> {
        let off = self.position();
        let s = self.read_str()?;
        alloc_util::str_span(s, self.zero_copy, off)
    }

    /// Read binary bytes borrowed from the input.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non-binary values, or a limit/EOF error.
    pub fn read_bin(&mut self) -> Result<&'de [u8], MsgPackError> {
        let (tag, off) = self.read_tag()?;
        self.bin_body(tag, off)
    }

    /// Read binary bytes, borrowed or copied according to the zero-copy toggle.
    ///
    /// # Errors
    ///
    /// See [`Decoder::read_bin`]; additionally `AllocationFailed` when copying.
    pub fn read_bin_cow(&mut self) -> Result<Cow<'de, [u8]>, MsgPackError> {
        let off = self.position();
        let b = self.read_bin()?;
        alloc_util::span(b, self.zero_copy, off)
    }

    /// Read an extension value borrowed from the input.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non-extension values, or a limit/EOF error.
    pub fn read_ext(&mut self) -> Result<(i8, &'de [u8]), MsgPackError> {
        let (tag, off) = self.read_tag()?;
        self.ext_body(tag, off)
    }

    /// Run `f` one container level deeper.
    ///
    /// This is the recursive typed path, bounded by [`MAX_TYPED_DEPTH`] as well as `max_depth`.
    /// The depth counter is restored on every exit path, including errors.
    ///
    /// [`MAX_TYPED_DEPTH`]: crate::MAX_TYPED_DEPTH
    pub(crate) fn nested<R, F>(&mut self, off: usize, f: F) -> Result<R, MsgPackError>
    where
        F: FnOnce(&mut Self) -> Result<R, MsgPackError>,
    {
        self.limits.check_enter_typed(self.depth, off)?;
        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    pub(crate) fn array_body<R, F>(&mut self, tag: Tag, off: usize, f: F) -> Result<R, MsgPackError>
    where
        F: FnOnce(&mut Self, usize) -> Result<R, MsgPackError>,
    {
        if tag.family() != Family::Array {
            return Err(Self::unexpected(tag, off));
        }
        let len = self.len_after(tag, off)?;
        self.limits.check_array_len(len, off)?;
        self.nested(off, |d| f(d, len))
    }

    pub(crate) fn map_body<R, F>(&mut self, tag: Tag, off: usize, f: F) -> Result<R, MsgPackError>
    where
        F: FnOnce(&mut Self, usize) -> Result<R, MsgPackError>,
    {
        if tag.family() != Family::Map {
            return Err(Self::unexpected(tag, off));
        }
        let len = self.len_after(tag, off)?;
        self.limits.check_map_len(len, off)?;
        self.nested(off, |d| f(d, len))
    }

    /// Read an array header and hand its element count to `f`, one nesting level deeper.
    ///
    /// `f` must consume exactly `len` elements.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non-array values, a limit error, or whatever `f` returns.
    pub fn array<R, F>(&mut self, f: F) -> Result<R, MsgPackError>
    where
        F: FnOnce(&mut Self, usize) -> Result<R, MsgPackError>,
    {
        let (tag, off) = self.read_tag()?;
        self.array_body(tag, off, f)
    }

    /// Read a map header and hand its entry count to `f`, one nesting level deeper.
    ///
    /// `f` must consume exactly `len` key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non-map values, a limit error, or whatever `f` returns.
    pub fn map<R, F>(&mut self, f: F) -> Result<R, MsgPackError>
    where
        F: FnOnce(&mut Self, usize) -> Result<R, MsgPackError>,
    {
        let (tag, off) = self.read_tag()?;
        self.map_body(tag, off, f)
    }

    /// Read a map key that must be a string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the key is not a string.
    pub fn read_string_key(&mut self) -> Result<&'de [u8], MsgPackError> {
        let (tag, off) = self.read_tag()?;
        if tag.family() != Family::Str {
            return Err(MsgPackError::new(ErrorCode::InvalidFormat, off));
        }
        self.str_body(tag, off)
    }

    /// Read a map key, skipping it and returning `None` if it is not a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed or violates limits.
    pub fn read_key_or_skip(&mut self) -> Result<Option<&'de [u8]>, MsgPackError> {
        if self.peek_family()? == Family::Str {
            return self.read_str_bytes().map(Some);
        }
        self.skip_value()?;
        Ok(None)
    }

    /// Skip exactly one value while enforcing limits and depth.
    ///
    /// Skipping is iterative; arbitrarily deep input cannot exhaust the call stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed, truncated, or violates limits.
    pub fn skip_value(&mut self) -> Result<(), MsgPackError> {
        let mut stack = mem::take(&mut self.skip_stack);
        stack.clear();
        let res = self.skip_with(&mut stack);
        self.skip_stack = stack;
        res
    }

    fn skip_with(&mut self, stack: &mut Vec<usize>) -> Result<(), MsgPackError> {
        loop {
            let (tag, off) = self.read_tag()?;
            let children = match tag.family() {
                Family::Nil | Family::Bool => 0,
                Family::Int => {
                    self.int_body(tag)?;
                    0
                }
                Family::Float => {
                    let n = if tag == Tag::Float32 { 4 } else { 8 };
                    self.cursor.read_exact(n)?;
                    0
                }
                Family::Str => {
                    self.str_body(tag, off)?;
                    0
                }
                Family::Bin => {
                    self.bin_body(tag, off)?;
                    0
                }
                Family::Ext => {
                    self.ext_body(tag, off)?;
                    0
                }
                Family::Array => self.open_array(tag, off, stack.len())?,
                Family::Map => self
                    .open_map(tag, off, stack.len())?
                    .checked_mul(2)
                    .ok_or_else(|| MsgPackError::new(ErrorCode::LengthOverflow, off))?,
                Family::Invalid => return Err(MsgPackError::new(ErrorCode::InvalidFormat, off)),
            };
            if children > 0 {
                stack.push(children);
                continue;
            }
            // One value finished; close every container it completes.
            loop {
                match stack.last_mut() {
                    None => return Ok(()),
                    Some(rem) => {
                        *rem -= 1;
                        if *rem > 0 {
                            break;
                        }
                        stack.pop();
                    }
                }
            }
        }
    }

    /// Read an array header for an iterative walk that already has `open` containers in flight.
    pub(crate) fn open_array(&mut self, tag: Tag, off: usize, open: usize) -> Result<usize, MsgPackError> {
        let len = self.len_after(tag, off)?;
        self.limits.check_array_len(len, off)?;
        self.limits.check_enter(self.depth + open, off)?;
        Ok(len)
    }

    /// Map counterpart of [`Decoder::open_array`]; returns the entry count.
    pub(crate) fn open_map(&mut self, tag: Tag, off: usize, open: usize) -> Result<usize, MsgPackError> {
        let len = self.len_after(tag, off)?;
        self.limits.check_map_len(len, off)?;
        self.limits.check_enter(self.depth + open, off)?;
        Ok(len)
    }

    /// Decode the next value into a [`Value`], honoring the zero-copy toggle for spans.
    ///
    /// Map keys must be strings; anything else fails with `InvalidFormat`. Containers are
    /// assembled on an explicit stack, so nesting up to `max_depth` never recurses.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is malformed, truncated, or violates limits.
    pub fn decode_value(&mut self) -> Result<Value<'de>, MsgPackError> {
        let zc = self.zero_copy;
        let mut stack: Vec<ValueFrame<'de>> = Vec::new();
        loop {
            if let Some(ValueFrame::Map { entries, .. }) = stack.last_mut() {
                let key_off = self.position();
                let key = self.read_string_key()?;
                entries.push((alloc_util::span(key, zc, key_off)?, Value::Nil));
            }
            let (tag, off) = self.read_tag()?;
            let mut value = match tag.family() {
                Family::Nil => Value::Nil,
                Family::Bool => Value::Bool(tag == Tag::True),
                Family::Int => {
                    let v = self.int_body(tag)?.ok_or_else(|| Self::unexpected(tag, off))?;
                    int_value(v, off)?
                }
                Family::Float => {
                    if tag == Tag::Float32 {
                        Value::F32(f32::from_bits(self.cursor.read_be_u32()?))
                    } else {
                        Value::F64(f64::from_bits(self.cursor.read_be_u64()?))
                    }
                }
                Family::Str => Value::Str(alloc_util::span(self.str_body(tag, off)?, zc, off)?),
                Family::Bin => Value::Bin(alloc_util::span(self.bin_body(tag, off)?, zc, off)?),
                Family::Ext => {
                    let (type_id, data) = self.ext_body(tag, off)?;
                    let data = alloc_util::span(data, zc, off)?;
                    Value::Ext(ExtValue { type_id, data })
                }
                Family::Array => {
                    let len = self.open_array(tag, off, stack.len())?;
                    let items = try_vec_for_count(len, self.remaining(), off)?;
                    if len > 0 {
                        stack.push(ValueFrame::Array { items, remaining: len });
                        continue;
                    }
                    Value::Array(items)
                }
                Family::Map => {
                    let len = self.open_map(tag, off, stack.len())?;
                    let entries = try_vec_for_count(len, self.remaining(), off)?;
                    if len > 0 {
                        stack.push(ValueFrame::Map { entries, remaining: len });
                        continue;
                    }
                    Value::Map(entries)
                }
                Family::Invalid => return Err(MsgPackError::new(ErrorCode::InvalidFormat, off)),
            };
            // Hand the finished value to its parent, closing every container it completes.
            loop {
                let Some(mut frame) = stack.pop() else {
                    return Ok(value);
                };
                if frame.fill(value) {
                    value = frame.into_value();
                } else {
                    stack.push(frame);
                    break;
                }
            }
        }
    }
}

/// A container [`Decoder::decode_value`] is still filling.
enum ValueFrame<'de> {
    Array {
        items: Vec<Value<'de>>,
        remaining: usize,
    },
    /// The key of the entry being filled is already pushed with a `nil` placeholder.
    Map {
        entries: Vec<(Cow<'de, [u8]>, Value<'de>)>,
        remaining: usize,
    },
}

impl<'de> ValueFrame<'de> {
    /// Store the next child. Returns `true` once the container is complete.
    fn fill(&mut self, value: Value<'de>) -> bool {
        match self {
            Self::Array { items, remaining } => {
                items.push(value);
                *remaining -= 1;
                *remaining == 0
            }
            Self::Map { entries, remaining } => {
                if let Some(slot) = entries.last_mut() {
                    slot.1 = value;
                }
                *remaining -= 1;
                *remaining == 0
            }
        }
    }

    fn into_value(self) -> Value<'de> {
        match self {
            Self::Array { items, .. } => Value::Array(items),
            Self::Map { entries, .. } => Value::Map(entries),
        }
    }
}

/// `Int` when the value fits `i64`, `Uint` above that.
pub(crate) fn int_value<'a>(v: i128, off: usize) -> Result<Value<'a>, MsgPackError> {
    if let Ok(i) = i64::try_from(v) {
        return Ok(Value::Int(i));
    }
    u64::try_from(v)
        .map(Value::Uint)
        .map_err(|_| MsgPackError::new(ErrorCode::IntegerOutOfRange, off))
}
