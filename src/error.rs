use core::fmt;

/// A structured error code identifying why a MessagePack value was rejected.
///
/// Codes are string-free and `Copy` so they stay cheap on hot paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Fewer bytes remain than a tag or declared length requires.
    UnexpectedEof,
    /// Tag byte has no MessagePack meaning, or a map key is not a string where one is required.
    InvalidFormat,
    /// Arithmetic overflow while computing a length or offset.
    LengthOverflow,
    /// Memory allocation failed while materializing a declared length.
    AllocationFailed,
    /// Input contains bytes after the single decoded value.
    TrailingBytes,

    /// Declared string length exceeds the configured ceiling.
    StrLenLimitExceeded,
    /// Declared binary length exceeds the configured ceiling.
    BinLenLimitExceeded,
    /// Declared array length exceeds the configured ceiling.
    ArrayLenLimitExceeded,
    /// Declared map length exceeds the configured ceiling.
    MapLenLimitExceeded,
    /// Declared extension payload length exceeds the configured ceiling.
    ExtLenLimitExceeded,
    /// Container nesting exceeds the configured depth ceiling.
    DepthLimitExceeded,

    /// Decoded wire type is incompatible with the requested native type.
    TypeMismatch,
    /// Integer does not fit the requested native integer width.
    IntegerOutOfRange,
    /// String bytes are not valid UTF-8 and the target is a native `str`.
    Utf8Invalid,
    /// The codec has no rule for this value in this position.
    UnsupportedType,

    /// An array builder emitted a different number of items than declared.
    ArrayLenMismatch,
    /// A map builder emitted a different number of entries than declared.
    MapLenMismatch,
}

impl ErrorCode {
    const fn message(self) -> &'static str {
        match self {
            Self::UnexpectedEof => "unexpected end of input",
            Self::InvalidFormat => "invalid MessagePack format",
            Self::LengthOverflow => "length overflow",
            Self::AllocationFailed => "allocation failed",
            Self::TrailingBytes => "trailing bytes after single MessagePack value",

            Self::StrLenLimitExceeded => "string length exceeds decode limits",
            Self::BinLenLimitExceeded => "binary length exceeds decode limits",
            Self::ArrayLenLimitExceeded => "array length exceeds decode limits",
            Self::MapLenLimitExceeded => "map length exceeds decode limits",
            Self::ExtLenLimitExceeded => "extension length exceeds decode limits",
            Self::DepthLimitExceeded => "nesting depth limit exceeded",

            Self::TypeMismatch => "wire type does not match target type",
            Self::IntegerOutOfRange => "integer out of range for target type",
            Self::Utf8Invalid => "string must be valid UTF-8",
            Self::UnsupportedType => "unsupported type",

            Self::ArrayLenMismatch => "array length mismatch",
            Self::MapLenMismatch => "map length mismatch",
        }
    }

    /// Returns `true` for the resource-ceiling family of codes.
    #[inline]
    #[must_use]
    pub const fn is_limit(self) -> bool {
        matches!(
            self,
            Self::StrLenLimitExceeded
                | Self::BinLenLimitExceeded
                | Self::ArrayLenLimitExceeded
                | Self::MapLenLimitExceeded
                | Self::ExtLenLimitExceeded
                | Self::DepthLimitExceeded
        )
    }
}

/// A MessagePack error with a stable code and a byte offset.
///
/// For decode errors `offset` points into the input; for encode errors it is the number of
/// bytes written before the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgPackError {
    /// The error code.
    pub code: ErrorCode,
    /// Byte offset where the error was detected.
    pub offset: usize,
}

impl MsgPackError {
    /// Construct an error at `offset`.
    #[inline]
    #[must_use]
    pub const fn new(code: ErrorCode, offset: usize) -> Self {
        Self { code, offset }
    }
}

impl fmt::Display for MsgPackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msgpack error at {}: {}", self.offset, self.code.message())
    }
}

impl std::error::Error for MsgPackError {}
