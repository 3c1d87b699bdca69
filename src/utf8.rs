#[cfg(feature = "simdutf8")]
use simdutf8::basic as simd_utf8;

use crate::{ErrorCode, MsgPackError};

/// Validates UTF-8 bytes and returns a borrowed `&str` on success.
#[inline]
pub fn validate(bytes: &[u8], offset: usize) -> Result<&str, MsgPackError> {
    #[cfg(feature = "simdutf8")]
    {
        simd_utf8::from_utf8(bytes).map_err(|_| MsgPackError::new(ErrorCode::Utf8Invalid, offset))
    }

    #[cfg(not(feature = "simdutf8"))]
    {
        core::str::from_utf8(bytes).map_err(|_| MsgPackError::new(ErrorCode::Utf8Invalid, offset))
    }
}
