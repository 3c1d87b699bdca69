//! MessagePack tag bytes and their classification.
//!
//! Everything here is pure: a single byte in, a classification out. Classification never fails;
//! the one byte with no meaning (`0xc1`) classifies as [`Tag::Reserved`] and is rejected by the
//! caller.

// Tag names are the format's own vocabulary.
#![allow(missing_docs)]

pub const NIL: u8 = 0xc0;
pub const RESERVED: u8 = 0xc1;
pub const FALSE: u8 = 0xc2;
pub const TRUE: u8 = 0xc3;
pub const BIN8: u8 = 0xc4;
pub const BIN16: u8 = 0xc5;
pub const BIN32: u8 = 0xc6;
pub const EXT8: u8 = 0xc7;
pub const EXT16: u8 = 0xc8;
pub const EXT32: u8 = 0xc9;
pub const FLOAT32: u8 = 0xca;
pub const FLOAT64: u8 = 0xcb;
pub const UINT8: u8 = 0xcc;
pub const UINT16: u8 = 0xcd;
pub const UINT32: u8 = 0xce;
pub const UINT64: u8 = 0xcf;
pub const INT8: u8 = 0xd0;
pub const INT16: u8 = 0xd1;
pub const INT32: u8 = 0xd2;
pub const INT64: u8 = 0xd3;
pub const FIXEXT1: u8 = 0xd4;
pub const FIXEXT2: u8 = 0xd5;
pub const FIXEXT4: u8 = 0xd6;
pub const FIXEXT8: u8 = 0xd7;
pub const FIXEXT16: u8 = 0xd8;
pub const STR8: u8 = 0xd9;
pub const STR16: u8 = 0xda;
pub const STR32: u8 = 0xdb;
pub const ARRAY16: u8 = 0xdc;
pub const ARRAY32: u8 = 0xdd;
pub const MAP16: u8 = 0xde;
pub const MAP32: u8 = 0xdf;

pub const POSFIXINT_MAX: u8 = 0x7f;
pub const FIXMAP_BASE: u8 = 0x80;
pub const FIXARRAY_BASE: u8 = 0x90;
pub const FIXSTR_BASE: u8 = 0xa0;
pub const NEGFIXINT_BASE: u8 = 0xe0;

/// Classification of a leading tag byte.
///
/// Fix variants carry their inline payload (value or length) already extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// `0x00..=0x7f`
    PosFixInt(u8),
    /// `0xe0..=0xff`
    NegFixInt(i8),
    /// `0x80..=0x8f`, carrying the entry count.
    FixMap(u8),
    /// `0x90..=0x9f`, carrying the element count.
    FixArray(u8),
    /// `0xa0..=0xbf`, carrying the byte length.
    FixStr(u8),
    Nil,
    /// `0xc1`, never used by the format.
    Reserved,
    False,
    True,
    Bin8,
    Bin16,
    Bin32,
    Ext8,
    Ext16,
    Ext32,
    Float32,
    Float64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    /// `0xd4..=0xd8`, carrying the fixed payload length (1, 2, 4, 8, 16).
    FixExt(u8),
    Str8,
    Str16,
    Str32,
    Array16,
    Array32,
    Map16,
    Map32,
}

/// Coarse wire family of a tag, used for type-mismatch checks and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Nil,
    Bool,
    Int,
    Float,
    Str,
    Bin,
    Array,
    Map,
    Ext,
    Invalid,
}

impl Tag {
    /// Classify a tag byte. Total over `u8`.
    #[inline]
    #[must_use]
    pub const fn classify(b: u8) -> Self {
        match b {
            0x00..=POSFIXINT_MAX => Self::PosFixInt(b),
            0x80..=0x8f => Self::FixMap(fix_len_4(b)),
            0x90..=0x9f => Self::FixArray(fix_len_4(b)),
            0xa0..=0xbf => Self::FixStr(fix_len_5(b)),
            NIL => Self::Nil,
            RESERVED => Self::Reserved,
            FALSE => Self::False,
            TRUE => Self::True,
            BIN8 => Self::Bin8,
            BIN16 => Self::Bin16,
            BIN32 => Self::Bin32,
            EXT8 => Self::Ext8,
            EXT16 => Self::Ext16,
            EXT32 => Self::Ext32,
            FLOAT32 => Self::Float32,
            FLOAT64 => Self::Float64,
            UINT8 => Self::Uint8,
            UINT16 => Self::Uint16,
            UINT32 => Self::Uint32,
            UINT64 => Self::Uint64,
            INT8 => Self::Int8,
            INT16 => Self::Int16,
            INT32 => Self::Int32,
            INT64 => Self::Int64,
            FIXEXT1 => Self::FixExt(1),
            FIXEXT2 => Self::FixExt(2),
            FIXEXT4 => Self::FixExt(4),
            FIXEXT8 => Self::FixExt(8),
            FIXEXT16 => Self::FixExt(16),
            STR8 => Self::Str8,
            STR16 => Self::Str16,
            STR32 => Self::Str32,
            ARRAY16 => Self::Array16,
            ARRAY32 => Self::Array32,
            MAP16 => Self::Map16,
            MAP32 => Self::Map32,
            NEGFIXINT_BASE..=0xff => Self::NegFixInt(b as i8),
        }
    }

    /// The wire family this tag belongs to.
    #[must_use]
    pub const fn family(self) -> Family {
        match self {
            Self::Nil => Family::Nil,
            Self::False | Self::True => Family::Bool,
            Self::PosFixInt(_)
            | Self::NegFixInt(_)
            | Self::Uint8
            | Self::Uint16
            | Self::Uint32
            | Self::Uint64
            | Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64 => Family::Int,
            Self::Float32 | Self::Float64 => Family::Float,
            Self::FixStr(_) | Self::Str8 | Self::Str16 | Self::Str32 => Family::Str,
            Self::Bin8 | Self::Bin16 | Self::Bin32 => Family::Bin,
            Self::FixArray(_) | Self::Array16 | Self::Array32 => Family::Array,
            Self::FixMap(_) | Self::Map16 | Self::Map32 => Family::Map,
            Self::FixExt(_) | Self::Ext8 | Self::Ext16 | Self::Ext32 => Family::Ext,
            Self::Reserved => Family::Invalid,
        }
    }
}

/// Low four bits of a fixmap/fixarray tag.
#[inline]
#[must_use]
pub const fn fix_len_4(b: u8) -> u8 {
    b & 0x0f
}

/// Low five bits of a fixstr tag.
#[inline]
#[must_use]
pub const fn fix_len_5(b: u8) -> u8 {
    b & 0x1f
}

/// Width class chosen for a length or unsigned magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Width {
    /// Complete single-byte encoding (fix variant).
    Fix(u8),
    W8(u8),
    W16(u8),
    W32(u8),
    W64(u8),
}

/// A family of tags sharing the fix -> 8 -> 16 -> 32 (-> 64) cascade.
///
/// Strings, binaries, arrays, maps and unsigned integers are all expressed through this one
/// table so the smallest-width decision exists exactly once.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WidthTable {
    fix: Option<(u8, u64)>,
    w8: Option<u8>,
    w16: Option<u8>,
    w32: Option<u8>,
    w64: Option<u8>,
}

impl WidthTable {
    pub(crate) const STR: Self = Self {
        fix: Some((FIXSTR_BASE, 31)),
        w8: Some(STR8),
        w16: Some(STR16),
        w32: Some(STR32),
        w64: None,
    };
    pub(crate) const BIN: Self = Self {
        fix: None,
        w8: Some(BIN8),
        w16: Some(BIN16),
        w32: Some(BIN32),
        w64: None,
    };
    pub(crate) const ARRAY: Self = Self {
        fix: Some((FIXARRAY_BASE, 15)),
        w8: None,
        w16: Some(ARRAY16),
        w32: Some(ARRAY32),
        w64: None,
    };
    pub(crate) const MAP: Self = Self {
        fix: Some((FIXMAP_BASE, 15)),
        w8: None,
        w16: Some(MAP16),
        w32: Some(MAP32),
        w64: None,
    };
    pub(crate) const UINT: Self = Self {
        fix: Some((0x00, POSFIXINT_MAX as u64)),
        w8: Some(UINT8),
        w16: Some(UINT16),
        w32: Some(UINT32),
        w64: Some(UINT64),
    };
    pub(crate) const EXT: Self = Self {
        fix: None,
        w8: Some(EXT8),
        w16: Some(EXT16),
        w32: Some(EXT32),
        w64: None,
    };

    /// Pick the narrowest width able to carry `n`, or `None` if the family cannot represent it.
    #[must_use]
    pub(crate) const fn select(&self, n: u64) -> Option<Width> {
        if let Some((base, max)) = self.fix {
            if n <= max {
                return Some(Width::Fix(base | n as u8));
            }
        }
        if n <= u8::MAX as u64 {
            if let Some(t) = self.w8 {
                return Some(Width::W8(t));
            }
        }
        if n <= u16::MAX as u64 {
            if let Some(t) = self.w16 {
                return Some(Width::W16(t));
            }
        }
        if n <= u32::MAX as u64 {
            if let Some(t) = self.w32 {
                return Some(Width::W32(t));
            }
        }
        match self.w64 {
            Some(t) => Some(Width::W64(t)),
            None => None,
        }
    }
}

/// Tag byte for a fixext payload of exactly `len` bytes.
#[inline]
#[must_use]
pub(crate) const fn fixext_tag(len: usize) -> Option<u8> {
    match len {
        1 => Some(FIXEXT1),
        2 => Some(FIXEXT2),
        4 => Some(FIXEXT4),
        8 => Some(FIXEXT8),
        16 => Some(FIXEXT16),
        _ => None,
    }
}
