use std::borrow::Cow;
use std::collections::{hash_map, HashMap};
use std::mem;

use crate::alloc_util::{try_vec_for_count, try_vec_from_slice};
use crate::codec::{ArrayElem, MapKey, MsgPackDecode, MsgPackEncode};
use crate::decode::{DecodeOptions, Decoder};
use crate::encode::Encoder;
use crate::format::Family;
use crate::{ErrorCode, MsgPackError};

/// Open-ended native value for data with no static shape.
///
/// Unlike [`Value`](crate::Value), this is the "decode into a generic key-value mapping" model:
/// strings are UTF-8 text, float32 is promoted to `f64`, maps are hashed by key, binary payloads
/// are always owned, and extension values are not representable.
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic<'a> {
    /// `nil`
    Nil,
    /// Boolean.
    Bool(bool),
    /// Integer representable as `i64`.
    Int(i64),
    /// Integer above `i64::MAX`.
    Uint(u64),
    /// Float of either wire width.
    Float(f64),
    /// UTF-8 string, borrowed in zero-copy mode.
    Str(Cow<'a, str>),
    /// Owned binary payload.
    Bytes(Vec<u8>),
    /// Array.
    Array(Vec<Dynamic<'a>>),
    /// String-keyed map.
    Map(HashMap<Cow<'a, str>, Dynamic<'a>>),
}

impl<'a> Dynamic<'a> {
    /// Returns `true` for `nil`.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// View as `i64`, if the integer fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// View as `f64`.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// View as text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a map entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Dynamic<'a>> {
        match self {
            Self::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// Detach every string from the input buffer.
    ///
    /// Unlike decoding, encoding and dropping, this recurses once per nesting level.
    #[must_use]
    pub fn into_owned(mut self) -> Dynamic<'static> {
        match &mut self {
            Self::Nil => Dynamic::Nil,
            Self::Bool(b) => Dynamic::Bool(*b),
            Self::Int(v) => Dynamic::Int(*v),
            Self::Uint(v) => Dynamic::Uint(*v),
            Self::Float(v) => Dynamic::Float(*v),
            Self::Str(s) => Dynamic::Str(Cow::Owned(mem::take(s).into_owned())),
            Self::Bytes(b) => Dynamic::Bytes(mem::take(b)),
            Self::Array(items) => Dynamic::Array(items.drain(..).map(Dynamic::into_owned).collect()),
            Self::Map(m) => Dynamic::Map(
                m.drain()
                    .map(|(k, v)| (Cow::Owned(k.into_owned()), v.into_owned()))
                    .collect(),
            ),
        }
    }

    const fn is_container(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Map(_))
    }

    /// Move nested containers out into `out`, dropping leaf children in place.
    fn detach_containers(&mut self, out: &mut Vec<Self>) {
        match self {
            Self::Array(items) => out.extend(items.drain(..).filter(Self::is_container)),
            Self::Map(m) => out.extend(m.drain().map(|(_, v)| v).filter(Self::is_container)),
            _ => {}
        }
    }
}

impl Drop for Dynamic<'_> {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_containers(&mut pending);
        while let Some(mut v) = pending.pop() {
            v.detach_containers(&mut pending);
        }
    }
}

impl From<i64> for Dynamic<'_> {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Dynamic<'_> {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Dynamic<'_> {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl<'a> From<&'a str> for Dynamic<'a> {
    fn from(v: &'a str) -> Self {
        Self::Str(Cow::Borrowed(v))
    }
}

impl From<String> for Dynamic<'_> {
    fn from(v: String) -> Self {
        Self::Str(Cow::Owned(v))
    }
}

impl<'de> Decoder<'de> {
    /// Decode the next value into a [`Dynamic`].
    ///
    /// Like [`Decoder::decode_value`], containers are assembled on an explicit stack.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType` for extension values, `InvalidFormat` for non-string map keys,
    /// `Utf8Invalid` for malformed strings, or any structural/limit error.
    pub fn decode_dynamic(&mut self) -> Result<Dynamic<'de>, MsgPackError> {
        let mut stack: Vec<DynamicFrame<'de>> = Vec::new();
        loop {
            if let Some(DynamicFrame::Map { key, .. }) = stack.last_mut() {
                *key = Some(<Cow<'de, str>>::decode_key(self)?);
            }
            let off = self.position();
            let mut value = match self.peek_family()? {
                Family::Nil => self.read_nil().map(|()| Dynamic::Nil)?,
                Family::Bool => Dynamic::Bool(self.read_bool()?),
                Family::Int => {
                    let v: i128 = self.read_int()?;
                    if let Ok(i) = i64::try_from(v) {
                        Dynamic::Int(i)
                    } else {
                        u64::try_from(v)
                            .map(Dynamic::Uint)
                            .map_err(|_| MsgPackError::new(ErrorCode::IntegerOutOfRange, off))?
                    }
                }
                Family::Float => Dynamic::Float(self.read_f64()?),
                Family::Str => Dynamic::Str(self.read_str_cow()?),
                Family::Bin => {
                    let b = self.read_bin()?;
                    Dynamic::Bytes(try_vec_from_slice(b, off)?)
                }
                Family::Array => {
                    let (tag, off) = self.read_tag()?;
                    let len = self.open_array(tag, off, stack.len())?;
                    let items = try_vec_for_count(len, self.remaining(), off)?;
                    if len > 0 {
                        stack.push(DynamicFrame::Array { items, remaining: len });
                        continue;
                    }
                    Dynamic::Array(items)
                }
                Family::Map => {
                    let (tag, off) = self.read_tag()?;
                    let len = self.open_map(tag, off, stack.len())?;
                    let mut entries = HashMap::new();
                    entries
                        .try_reserve(len.min(self.remaining()))
                        .map_err(|_| MsgPackError::new(ErrorCode::AllocationFailed, off))?;
                    if len > 0 {
                        stack.push(DynamicFrame::Map {
                            entries,
                            key: None,
                            remaining: len,
                        });
                        continue;
                    }
                    Dynamic::Map(entries)
                }
                Family::Ext => return Err(MsgPackError::new(ErrorCode::UnsupportedType, off)),
                Family::Invalid => return Err(MsgPackError::new(ErrorCode::InvalidFormat, off)),
            };
            loop {
                let Some(mut frame) = stack.pop() else {
                    return Ok(value);
                };
                if frame.fill(value) {
                    value = frame.into_dynamic();
                } else {
                    stack.push(frame);
                    break;
                }
            }
        }
    }
}

/// A container [`Decoder::decode_dynamic`] is still filling.
enum DynamicFrame<'de> {
    Array {
        items: Vec<Dynamic<'de>>,
        remaining: usize,
    },
    Map {
        entries: HashMap<Cow<'de, str>, Dynamic<'de>>,
        key: Option<Cow<'de, str>>,
        remaining: usize,
    },
}

impl<'de> DynamicFrame<'de> {
    /// Store the next child. Returns `true` once the container is complete.
    fn fill(&mut self, value: Dynamic<'de>) -> bool {
        let remaining = match self {
            Self::Array { items, remaining } => {
                items.push(value);
                remaining
            }
            Self::Map {
                entries,
                key,
                remaining,
            } => {
                if let Some(k) = key.take() {
                    entries.insert(k, value);
                }
                remaining
            }
        };
        *remaining -= 1;
        *remaining == 0
    }

    fn into_dynamic(self) -> Dynamic<'de> {
        match self {
            Self::Array { items, .. } => Dynamic::Array(items),
            Self::Map { entries, .. } => Dynamic::Map(entries),
        }
    }
}

/// Decode exactly one value into a [`Dynamic`].
///
/// # Errors
///
/// Returns an error if decoding fails or if bytes remain after the value.
pub fn decode_dynamic(bytes: &[u8], opts: DecodeOptions) -> Result<Dynamic<'_>, MsgPackError> {
    let mut dec = Decoder::new(bytes, opts);
    let value = dec.decode_dynamic()?;
    dec.finish()?;
    Ok(value)
}

/// Children of a container the `Dynamic` encoder has opened but not finished.
enum DynamicWalk<'v, 'a> {
    Items(std::slice::Iter<'v, Dynamic<'a>>),
    Entries(hash_map::Iter<'v, Cow<'a, str>, Dynamic<'a>>),
}

impl MsgPackEncode for Dynamic<'_> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), MsgPackError> {
        let mut stack: Vec<DynamicWalk<'_, '_>> = Vec::new();
        let mut current = self;
        loop {
            match current {
                Self::Nil => enc.nil()?,
                Self::Bool(b) => enc.bool(*b)?,
                Self::Int(v) => enc.int(*v)?,
                Self::Uint(v) => enc.uint(*v)?,
                Self::Float(v) => enc.f64(*v)?,
                Self::Str(s) => enc.str(s)?,
                Self::Bytes(b) => enc.bin(b)?,
                Self::Array(items) => {
                    enc.array_header(items.len())?;
                    stack.push(DynamicWalk::Items(items.iter()));
                }
                Self::Map(m) => {
                    enc.map_header(m.len())?;
                    stack.push(DynamicWalk::Entries(m.iter()));
                }
            }
            current = loop {
                let Some(top) = stack.last_mut() else {
                    return Ok(());
                };
                let next = match top {
                    DynamicWalk::Items(items) => items.next(),
                    DynamicWalk::Entries(entries) => match entries.next() {
                        Some((k, v)) => {
                            enc.str(k)?;
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

    fn is_empty_value(&self) -> bool {
        self.is_nil()
    }
}

impl<'de> MsgPackDecode<'de> for Dynamic<'de> {
    fn decode(dec: &mut Decoder<'de>) -> Result<Self, MsgPackError> {
        dec.decode_dynamic()
    }

    fn decode_in_place(&mut self, dec: &mut Decoder<'de>) -> Result<(), MsgPackError> {
        *self = dec.decode_dynamic()?;
        Ok(())
    }
}

impl ArrayElem for Dynamic<'_> {}
