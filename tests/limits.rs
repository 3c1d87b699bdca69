#![allow(clippy::unwrap_used, clippy::expect_used)]

use zcpack::{
    decode, decode_dynamic, decode_value, decode_with, encode_to_vec, DecodeLimits, DecodeOptions, Decoder,
    ErrorCode, MsgPackDecode, MsgPackEncode, MsgPackError, Value, DEFAULT_MAX_DEPTH, MAX_TYPED_DEPTH,
};

fn nested_arrays(depth: usize) -> Vec<u8> {
    // `depth` arrays, each holding the next; the innermost is empty.
    let mut out = vec![0x91; depth.saturating_sub(1)];
    if depth > 0 {
        out.push(0x90);
    }
    out
}

fn with_limits(limits: DecodeLimits) -> DecodeOptions {
    DecodeOptions::with_limits(limits)
}

#[test]
fn string_claim_above_ceiling_fails_before_payload() {
    // str32 claiming 1 GiB with no payload at all.
    let bytes = [0xdb, 0x40, 0x00, 0x00, 0x00];
    let opts = with_limits(DecodeLimits {
        max_str_len: 1024,
        ..DecodeLimits::DEFAULT
    });
    let err = decode_value(&bytes, opts).unwrap_err();
    assert_eq!(err.code, ErrorCode::StrLenLimitExceeded);
    assert_eq!(err.offset, 0);

    let err = decode_with::<String>(&bytes, opts).unwrap_err();
    assert_eq!(err.code, ErrorCode::StrLenLimitExceeded);

    // Under default limits the same claim is legal and runs out of input instead.
    let err = decode_value(&bytes, DecodeOptions::DEFAULT).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedEof);
}

#[test]
fn each_length_family_has_its_own_ceiling() {
    let tight = with_limits(DecodeLimits {
        max_str_len: 2,
        max_bin_len: 2,
        max_array_len: 2,
        max_map_len: 2,
        max_ext_len: 2,
        ..DecodeLimits::DEFAULT
    });
    let cases: [(&[u8], ErrorCode); 5] = [
        (&[0xa3, b'a', b'b', b'c'], ErrorCode::StrLenLimitExceeded),
        (&[0xc4, 0x03, 1, 2, 3], ErrorCode::BinLenLimitExceeded),
        (&[0x93, 1, 2, 3], ErrorCode::ArrayLenLimitExceeded),
        (&[0x83, 0xa1, b'a', 1, 0xa1, b'b', 2, 0xa1, b'c', 3], ErrorCode::MapLenLimitExceeded),
        (&[0xd6, 0x01, 1, 2, 3, 4], ErrorCode::ExtLenLimitExceeded),
    ];
    for (bytes, code) in cases {
        let err = decode_value(bytes, tight).unwrap_err();
        assert_eq!(err.code, code, "input {bytes:02x?}");
        assert!(err.code.is_limit());
    }

    // Exactly at the ceiling is fine.
    assert!(decode_value(&[0xa2, b'a', b'b'], tight).is_ok());
    assert!(decode_value(&[0x92, 1, 2], tight).is_ok());
}

#[test]
fn array_claim_is_checked_before_allocation() {
    // array32 claiming u32::MAX elements with nothing behind it.
    let bytes = [0xdd, 0xff, 0xff, 0xff, 0xff];
    let opts = with_limits(DecodeLimits::for_bytes(1 << 20));
    let err = decode_value(&bytes, opts).unwrap_err();
    assert_eq!(err.code, ErrorCode::ArrayLenLimitExceeded);

    let err = decode_value(&bytes, DecodeOptions::DEFAULT).unwrap_err();
    assert!(matches!(
        err.code,
        ErrorCode::UnexpectedEof | ErrorCode::AllocationFailed
    ));
}

#[test]
fn depth_at_ceiling_succeeds_and_one_more_fails() {
    let depth = 32;
    let bytes = nested_arrays(depth);

    let at = with_limits(DecodeLimits::DEFAULT.with_max_depth(depth));
    assert!(decode_value(&bytes, at).is_ok());
    assert!(decode_dynamic(&bytes, at).is_ok());

    let below = with_limits(DecodeLimits::DEFAULT.with_max_depth(depth - 1));
    let err = decode_value(&bytes, below).unwrap_err();
    assert_eq!(err.code, ErrorCode::DepthLimitExceeded);
    assert_eq!(err.offset, depth - 1);
    let err = decode_dynamic(&bytes, below).unwrap_err();
    assert_eq!(err.code, ErrorCode::DepthLimitExceeded);
}

#[test]
fn skipping_enforces_depth_too() {
    let bytes = nested_arrays(8);
    let mut dec = Decoder::new(&bytes, with_limits(DecodeLimits::DEFAULT.with_max_depth(4)));
    let err = dec.skip_value().unwrap_err();
    assert_eq!(err.code, ErrorCode::DepthLimitExceeded);

    let mut dec = Decoder::new(&bytes, with_limits(DecodeLimits::DEFAULT.with_max_depth(8)));
    dec.skip_value().unwrap();
    assert!(dec.is_empty());
}

#[test]
fn default_depth_decodes_without_overflowing_the_stack() {
    let bytes = nested_arrays(DEFAULT_MAX_DEPTH);

    let v = decode_value(&bytes, DecodeOptions::DEFAULT).unwrap();
    let mut levels = 1;
    let mut cur = &v;
    while let Some([inner]) = cur.as_array() {
        levels += 1;
        cur = inner;
    }
    assert_eq!(levels, DEFAULT_MAX_DEPTH);
    assert_eq!(encode_to_vec(&v).unwrap(), bytes);

    let d = decode_dynamic(&bytes, DecodeOptions::BORROWED).unwrap();
    assert_eq!(encode_to_vec(&d).unwrap(), bytes);

    let wrapped = decode::<Vec<Value<'_>>>(&bytes).unwrap();
    assert_eq!(wrapped.len(), 1);

    let mut dec = Decoder::new(&bytes, DecodeOptions::DEFAULT);
    dec.skip_value().unwrap();
    assert!(dec.is_empty());
}

#[test]
fn one_level_past_default_depth_is_rejected() {
    let bytes = nested_arrays(DEFAULT_MAX_DEPTH + 1);
    let err = decode_value(&bytes, DecodeOptions::DEFAULT).unwrap_err();
    assert_eq!(err, MsgPackError::new(ErrorCode::DepthLimitExceeded, DEFAULT_MAX_DEPTH));
    let err = decode_dynamic(&bytes, DecodeOptions::DEFAULT).unwrap_err();
    assert_eq!(err.code, ErrorCode::DepthLimitExceeded);

    let huge = nested_arrays(1_000_000);
    let opts = with_limits(DecodeLimits::DEFAULT.with_max_depth(256));
    let err = decode_value(&huge, opts).unwrap_err();
    assert_eq!(err.offset, 256);
    let mut dec = Decoder::new(&huge, DecodeOptions::DEFAULT);
    assert_eq!(dec.skip_value().unwrap_err().code, ErrorCode::DepthLimitExceeded);
}

#[derive(Debug, Default, MsgPackEncode, MsgPackDecode)]
struct Link {
    next: Option<Box<Link>>,
}

fn linked_maps(levels: usize) -> Vec<u8> {
    // {"next": {"next": ... {}}}
    let mut out = Vec::with_capacity(levels * 6 + 1);
    for _ in 0..levels {
        out.extend_from_slice(&[0x81, 0xa4, b'n', b'e', b'x', b't']);
    }
    out.push(0x80);
    out
}

#[test]
fn recursive_records_stop_at_typed_depth() {
    let ok = decode::<Link>(&linked_maps(MAX_TYPED_DEPTH - 1)).unwrap();
    let mut levels = 1;
    let mut cur = &ok;
    while let Some(next) = &cur.next {
        levels += 1;
        cur = next;
    }
    assert_eq!(levels, MAX_TYPED_DEPTH);

    let err = decode::<Link>(&linked_maps(100_000)).unwrap_err();
    assert_eq!(err, MsgPackError::new(ErrorCode::DepthLimitExceeded, MAX_TYPED_DEPTH * 6));
}

#[test]
fn truncated_input_reports_eof() {
    let cases: [&[u8]; 6] = [
        &[],
        &[0xcd, 0x01],
        &[0xa5, b'a', b'b'],
        &[0x92, 0x01],
        &[0x81, 0xa1, b'k'],
        &[0xcb, 0, 0, 0],
    ];
    for bytes in cases {
        let err = decode_value(bytes, DecodeOptions::DEFAULT).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedEof, "input {bytes:02x?}");
    }
}

#[test]
fn trailing_bytes_are_rejected_at_their_offset() {
    let err = decode_value(&[0x90, 0xc0], DecodeOptions::DEFAULT).unwrap_err();
    assert_eq!(err.code, ErrorCode::TrailingBytes);
    assert_eq!(err.offset, 1);
}

#[test]
fn reserved_tag_is_rejected_everywhere() {
    let err = decode_value(&[0x91, 0xc1], DecodeOptions::DEFAULT).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFormat);
    assert_eq!(err.offset, 1);

    let mut dec = Decoder::new(&[0xc1], DecodeOptions::DEFAULT);
    assert_eq!(dec.skip_value().unwrap_err().code, ErrorCode::InvalidFormat);
}

#[test]
fn decoder_depth_returns_to_zero_after_errors() {
    let bytes = [0x92, 0x01, 0xc1];
    let mut dec = Decoder::new(&bytes, DecodeOptions::DEFAULT);
    assert!(dec.decode::<Vec<i64>>().is_err());
    assert_eq!(dec.depth(), 0);
}
