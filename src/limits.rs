use crate::{ErrorCode, MsgPackError};

/// Default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Nesting ceiling for decoding into native types.
///
/// Typed decoding recurses once per container level, so self-referential types
/// (`Option<Box<Node>>`, `Vec<Tree>`) stop here even when `max_depth` is higher. [`Value`] and
/// [`Dynamic`] decoding, and skipping, run on an explicit stack and only honor `max_depth`.
///
/// [`Value`]: crate::Value
/// [`Dynamic`]: crate::Dynamic
pub const MAX_TYPED_DEPTH: usize = 256;

/// Largest length any MessagePack length field can declare.
pub const MAX_WIRE_LEN: usize = u32::MAX as usize;

/// Default maximum container length used by [`DecodeLimits::for_bytes`].
///
/// This is a safety limit; adjust explicitly for your deployment.
pub const DEFAULT_MAX_CONTAINER_LEN: usize = 1 << 16;

/// Decode-time resource ceilings.
///
/// Every ceiling is compared against the length a value *declares* before any payload byte is
/// read or any buffer is allocated for it. Limits are immutable for the duration of a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum string length in bytes.
    pub max_str_len: usize,
    /// Maximum binary length in bytes.
    pub max_bin_len: usize,
    /// Maximum array element count.
    pub max_array_len: usize,
    /// Maximum map entry count (pairs).
    pub max_map_len: usize,
    /// Maximum extension payload length in bytes.
    pub max_ext_len: usize,
    /// Maximum container nesting depth.
    pub max_depth: usize,
}

impl DecodeLimits {
    /// Spec-maximum lengths and a depth ceiling of [`DEFAULT_MAX_DEPTH`].
    pub const DEFAULT: Self = Self {
        max_str_len: MAX_WIRE_LEN,
        max_bin_len: MAX_WIRE_LEN,
        max_array_len: MAX_WIRE_LEN,
        max_map_len: MAX_WIRE_LEN,
        max_ext_len: MAX_WIRE_LEN,
        max_depth: DEFAULT_MAX_DEPTH,
    };

    /// Construct conservative limits derived from a maximum message size.
    ///
    /// String, binary and extension ceilings equal `max_message_bytes`; array and map ceilings are
    /// additionally capped by [`DEFAULT_MAX_CONTAINER_LEN`]. Depth keeps its default.
    #[must_use]
    pub fn for_bytes(max_message_bytes: usize) -> Self {
        let max_len = max_message_bytes.min(MAX_WIRE_LEN);
        let max_container_len = max_len.min(DEFAULT_MAX_CONTAINER_LEN);
        Self {
            max_str_len: max_len,
            max_bin_len: max_len,
            max_array_len: max_container_len,
            max_map_len: max_container_len,
            max_ext_len: max_len,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Return a copy with a different depth ceiling.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    pub(crate) const fn check_str_len(&self, len: usize, off: usize) -> Result<(), MsgPackError> {
        check(len, self.max_str_len, ErrorCode::StrLenLimitExceeded, off)
    }

    #[inline]
    pub(crate) const fn check_bin_len(&self, len: usize, off: usize) -> Result<(), MsgPackError> {
        check(len, self.max_bin_len, ErrorCode::BinLenLimitExceeded, off)
    }

    #[inline]
    pub(crate) const fn check_array_len(
        &self,
        len: usize,
        off: usize,
    ) -> Result<(), MsgPackError> {
        check(len, self.max_array_len, ErrorCode::ArrayLenLimitExceeded, off)
    }

    #[inline]
    pub(crate) const fn check_map_len(&self, len: usize, off: usize) -> Result<(), MsgPackError> {
        check(len, self.max_map_len, ErrorCode::MapLenLimitExceeded, off)
    }

    #[inline]
    pub(crate) const fn check_ext_len(&self, len: usize, off: usize) -> Result<(), MsgPackError> {
        check(len, self.max_ext_len, ErrorCode::ExtLenLimitExceeded, off)
    }

    /// Entering a container at `depth` is allowed only while `depth < max_depth`.
    #[inline]
    pub(crate) const fn check_enter(&self, depth: usize, off: usize) -> Result<(), MsgPackError> {
        if depth >= self.max_depth {
            return Err(MsgPackError::new(ErrorCode::DepthLimitExceeded, off));
        }
        Ok(())
    }

    /// [`DecodeLimits::check_enter`] for the recursive typed path, also capped by
    /// [`MAX_TYPED_DEPTH`].
    #[inline]
    pub(crate) const fn check_enter_typed(&self, depth: usize, off: usize) -> Result<(), MsgPackError> {
        if depth >= MAX_TYPED_DEPTH {
            return Err(MsgPackError::new(ErrorCode::DepthLimitExceeded, off));
        }
        self.check_enter(depth, off)
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[inline]
const fn check(len: usize, ceiling: usize, code: ErrorCode, off: usize) -> Result<(), MsgPackError> {
    if len > ceiling {
        return Err(MsgPackError::new(code, off));
    }
    Ok(())
}
