use std::borrow::Cow;

use crate::{ErrorCode, MsgPackError};

#[inline]
pub fn try_reserve_exact<T>(
    v: &mut Vec<T>,
    additional: usize,
    offset: usize,
) -> Result<(), MsgPackError> {
    let needed = v
        .len()
        .checked_add(additional)
        .ok_or_else(|| MsgPackError::new(ErrorCode::LengthOverflow, offset))?;
    if needed <= v.capacity() {
        return Ok(());
    }
    v.try_reserve_exact(additional)
        .map_err(|_| MsgPackError::new(ErrorCode::AllocationFailed, offset))
}

#[inline]
pub fn try_vec_from_slice(bytes: &[u8], offset: usize) -> Result<Vec<u8>, MsgPackError> {
    let mut v = Vec::new();
    try_reserve_exact(&mut v, bytes.len(), offset)?;
    v.extend_from_slice(bytes);
    Ok(v)
}

#[inline]
pub fn try_string_from_str(s: &str, offset: usize) -> Result<String, MsgPackError> {
    let mut out = String::new();
    out.try_reserve_exact(s.len())
        .map_err(|_| MsgPackError::new(ErrorCode::AllocationFailed, offset))?;
    out.push_str(s);
    Ok(out)
}

/// Pre-size a container for a declared element count.
///
/// Each element occupies at least one input byte, so the reservation is capped by what is
/// actually left in the input; a hostile count cannot force a large allocation.
#[inline]
pub fn try_vec_for_count<T>(
    declared: usize,
    remaining_input: usize,
    offset: usize,
) -> Result<Vec<T>, MsgPackError> {
    let mut v: Vec<T> = Vec::new();
    try_reserve_exact(&mut v, declared.min(remaining_input), offset)?;
    Ok(v)
}

/// Borrow or copy a span depending on the decode mode.
#[inline]
pub fn span<'de>(
    bytes: &'de [u8],
    zero_copy: bool,
    offset: usize,
) -> Result<Cow<'de, [u8]>, MsgPackError> {
    if zero_copy {
        Ok(Cow::Borrowed(bytes))
    } else {
        try_vec_from_slice(bytes, offset).map(Cow::Owned)
    }
}

/// Borrow or copy a validated string depending on the decode mode.
#[inline]
pub fn str_span<'de>(
    s: &'de str,
    zero_copy: bool,
    offset: usize,
) -> Result<Cow<'de, str>, MsgPackError> {
    if zero_copy {
        Ok(Cow::Borrowed(s))
    } else {
        try_string_from_str(s, offset).map(Cow::Owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_reservation_is_capped_by_input() {
        let v: Vec<u64> = try_vec_for_count(u32::MAX as usize, 3, 0).unwrap();
        assert!(v.capacity() < 1024);
    }

    #[test]
    fn span_modes() {
        let buf = [1u8, 2, 3];
        assert!(matches!(span(&buf, true, 0).unwrap(), Cow::Borrowed(_)));
        assert!(matches!(span(&buf, false, 0).unwrap(), Cow::Owned(_)));
    }
}
