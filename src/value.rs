use std::borrow::Cow;
use std::mem;

use crate::utf8;

/// An extension value: a signed type tag plus opaque payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtValue<'a> {
    /// Application-defined type tag (negative tags are reserved by the format).
    pub type_id: i8,
    /// Payload bytes.
    pub data: Cow<'a, [u8]>,
}

impl<'a> ExtValue<'a> {
    /// Construct an extension value.
    #[must_use]
    pub fn new(type_id: i8, data: impl Into<Cow<'a, [u8]>>) -> Self {
        Self {
            type_id,
            data: data.into(),
        }
    }

    /// Detach from the input buffer.
    #[must_use]
    pub fn into_owned(self) -> ExtValue<'static> {
        ExtValue {
            type_id: self.type_id,
            data: Cow::Owned(self.data.into_owned()),
        }
    }
}

/// Any MessagePack value, without committing to a native Rust type.
///
/// String, binary, key and extension spans are [`Cow`]s: a zero-copy decode borrows them from
/// the input buffer (and the borrow checker ties the value to that buffer), a copying decode
/// owns them. The choice is made per decode call.
///
/// Strings are kept as raw bytes; MessagePack does not guarantee UTF-8. Use [`Value::as_str`]
/// to view one as text.
///
/// Integers are normalized: any value representable as `i64` is [`Value::Int`]; [`Value::Uint`]
/// only carries magnitudes above `i64::MAX`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// `nil`
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer above `i64::MAX`.
    Uint(u64),
    /// float32, kept at its wire precision.
    F32(f32),
    /// float64
    F64(f64),
    /// String bytes.
    Str(Cow<'a, [u8]>),
    /// Binary bytes.
    Bin(Cow<'a, [u8]>),
    /// Ordered sequence.
    Array(Vec<Value<'a>>),
    /// Map entries in wire order, keyed by string bytes.
    Map(Vec<(Cow<'a, [u8]>, Value<'a>)>),
    /// Extension value.
    Ext(ExtValue<'a>),
}

impl<'a> Value<'a> {
    /// Build a string value.
    #[must_use]
    pub fn str(s: impl Into<Cow<'a, str>>) -> Self {
        match s.into() {
            Cow::Borrowed(s) => Self::Str(Cow::Borrowed(s.as_bytes())),
            Cow::Owned(s) => Self::Str(Cow::Owned(s.into_bytes())),
        }
    }

    /// Build a binary value.
    #[must_use]
    pub fn bin(b: impl Into<Cow<'a, [u8]>>) -> Self {
        Self::Bin(b.into())
    }

    /// Build a map value from `(key, value)` pairs, preserving their order.
    #[must_use]
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<Cow<'a, str>>,
        I: IntoIterator<Item = (K, Value<'a>)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| {
                    let key = match k.into() {
                        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
                        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
                    };
                    (key, v)
                })
                .collect(),
        )
    }

    /// Returns `true` for `nil`.
    #[inline]
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// View as `bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// View as `i64`, if the integer fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// View as `u64`, if the integer is non-negative.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// View as `f64`; float32 is widened.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F32(v) => Some(f64::from(*v)),
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// View a string value as UTF-8 text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(b) => utf8::validate(b, 0).ok(),
            _ => None,
        }
    }

    /// View string or binary bytes.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Str(b) | Self::Bin(b) => Some(b),
            _ => None,
        }
    }

    /// View as an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value<'a>]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a map entry by key. The first entry in wire order wins.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value<'a>> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_ref() == key.as_bytes())
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Detach every span from the input buffer.
    ///
    /// Unlike decoding, encoding and dropping, this recurses once per nesting level.
    #[must_use]
    pub fn into_owned(mut self) -> Value<'static> {
        fn own(b: &mut Cow<'_, [u8]>) -> Cow<'static, [u8]> {
            Cow::Owned(mem::take(b).into_owned())
        }
        match &mut self {
            Self::Nil => Value::Nil,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(v) => Value::Int(*v),
            Self::Uint(v) => Value::Uint(*v),
            Self::F32(v) => Value::F32(*v),
            Self::F64(v) => Value::F64(*v),
            Self::Str(b) => Value::Str(own(b)),
            Self::Bin(b) => Value::Bin(own(b)),
            Self::Array(items) => Value::Array(items.drain(..).map(Value::into_owned).collect()),
            Self::Map(entries) => Value::Map(
                entries
                    .drain(..)
                    .map(|(mut k, v)| (own(&mut k), v.into_owned()))
                    .collect(),
            ),
            Self::Ext(ext) => Value::Ext(ExtValue {
                type_id: ext.type_id,
                data: own(&mut ext.data),
            }),
        }
    }

    const fn is_container(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Map(_))
    }

    /// Move nested containers out into `out`, dropping leaf children in place.
    fn detach_containers(&mut self, out: &mut Vec<Self>) {
        match self {
            Self::Array(items) => out.extend(items.drain(..).filter(Self::is_container)),
            Self::Map(entries) => out.extend(entries.drain(..).map(|(_, v)| v).filter(Self::is_container)),
            _ => {}
        }
    }
}

/// Tears nested containers down level by level, so dropping a deep value never recurses.
impl Drop for Value<'_> {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_containers(&mut pending);
        while let Some(mut v) = pending.pop() {
            v.detach_containers(&mut pending);
        }
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value<'_> {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::Uint(v), Self::Int)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Self::str(v)
    }
}

impl From<String> for Value<'_> {
    fn from(v: String) -> Self {
        Self::str(v)
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Self::Bin(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for Value<'_> {
    fn from(v: Vec<u8>) -> Self {
        Self::Bin(Cow::Owned(v))
    }
}

impl<'a> From<Vec<Value<'a>>> for Value<'a> {
    fn from(v: Vec<Value<'a>>) -> Self {
        Self::Array(v)
    }
}

impl<'a> From<ExtValue<'a>> for Value<'a> {
    fn from(v: ExtValue<'a>) -> Self {
        Self::Ext(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_normalizes_to_int_when_it_fits() {
        assert_eq!(Value::from(5u64), Value::Int(5));
        assert_eq!(Value::from(u64::MAX), Value::Uint(u64::MAX));
        assert_eq!(Value::Uint(u64::MAX).as_i64(), None);
        assert_eq!(Value::Int(-1).as_u64(), None);
    }

    #[test]
    fn map_lookup_uses_first_entry() {
        let v = Value::map([("a", Value::Int(1)), ("a", Value::Int(2))]);
        assert_eq!(v.get("a"), Some(&Value::Int(1)));
        assert_eq!(v.get("b"), None);
    }

    #[test]
    fn into_owned_detaches_spans() {
        let buf = b"hello".to_vec();
        let owned = Value::Str(Cow::Borrowed(&buf)).into_owned();
        drop(buf);
        assert!(matches!(&owned, Value::Str(Cow::Owned(b)) if b == b"hello"));
    }

    #[test]
    fn dropping_a_deep_value_does_not_recurse() {
        let mut v = Value::Nil;
        for i in 0..200_000 {
            v = if i % 2 == 0 {
                Value::Array(vec![v, Value::Int(i)])
            } else {
                Value::map([("k", v)])
            };
        }
        drop(v);
    }

    #[test]
    fn into_owned_keeps_nested_entries() {
        let key = b"k".to_vec();
        let v = Value::Map(vec![(
            Cow::Borrowed(&key[..]),
            Value::Array(vec![Value::Ext(ExtValue::new(3, &key[..])), Value::Int(1)]),
        )]);
        let owned = v.into_owned();
        drop(key);
        assert_eq!(
            owned,
            Value::map([("k", Value::Array(vec![Value::Ext(ExtValue::new(3, vec![b'k'])), Value::Int(1)]))])
        );
    }
}
