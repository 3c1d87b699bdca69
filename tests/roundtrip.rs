#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use zcpack::{
    decode, decode_borrowed, decode_value, encode_into, encode_to_vec, DecodeOptions, Decoder, Encoder, ErrorCode,
    ExtValue, MapEntries, MsgPackDecode, MsgPackEncode, Value,
};

fn roundtrip<T>(v: &T) -> T
where
    T: MsgPackEncode + for<'de> MsgPackDecode<'de>,
{
    let bytes = encode_to_vec(v).unwrap();
    decode(&bytes).unwrap()
}

#[test]
fn integer_boundaries_roundtrip() {
    for v in [0, 1, 127, 128, 255, 256, 65_535, 65_536, i64::from(u32::MAX), i64::MAX] {
        assert_eq!(roundtrip(&v), v);
    }
    for v in [-1, -32, -33, -128, -129, -32_768, -32_769, i64::from(i32::MIN), i64::MIN] {
        assert_eq!(roundtrip(&v), v);
    }
    for v in [0u64, u64::from(u8::MAX), u64::from(u16::MAX), u64::from(u32::MAX), u64::MAX] {
        assert_eq!(roundtrip(&v), v);
    }
    assert_eq!(roundtrip(&i8::MIN), i8::MIN);
    assert_eq!(roundtrip(&i16::MAX), i16::MAX);
    assert_eq!(roundtrip(&u16::MAX), u16::MAX);
    assert_eq!(roundtrip(&i32::MIN), i32::MIN);
}

#[test]
fn integers_use_the_narrowest_tag() {
    let cases: [(i64, &[u8]); 10] = [
        (127, &[0x7f]),
        (128, &[0xcc, 0x80]),
        (255, &[0xcc, 0xff]),
        (256, &[0xcd, 0x01, 0x00]),
        (65_536, &[0xce, 0x00, 0x01, 0x00, 0x00]),
        (-1, &[0xff]),
        (-32, &[0xe0]),
        (-33, &[0xd0, 0xdf]),
        (-32_768, &[0xd1, 0x80, 0x00]),
        (-32_769, &[0xd2, 0xff, 0xff, 0x7f, 0xff]),
    ];
    for (v, expected) in cases {
        assert_eq!(encode_to_vec(&v).unwrap(), expected, "encoding {v}");
    }
    assert_eq!(encode_to_vec(&u64::MAX).unwrap(), [0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    assert_eq!(encode_to_vec(&5u8).unwrap(), [0x05]);
}

#[test]
fn integer_width_is_checked_on_decode() {
    let bytes = encode_to_vec(&300_i64).unwrap();
    let err = decode::<u8>(&bytes).unwrap_err();
    assert_eq!(err.code, ErrorCode::IntegerOutOfRange);

    let bytes = encode_to_vec(&-1_i64).unwrap();
    assert_eq!(decode::<u64>(&bytes).unwrap_err().code, ErrorCode::IntegerOutOfRange);
    assert_eq!(decode::<i8>(&bytes).unwrap(), -1);
}

#[test]
fn floats_roundtrip_including_specials() {
    for v in [0.0, -0.0, 1.5, f64::MIN_POSITIVE, f64::MAX, f64::INFINITY, f64::NEG_INFINITY] {
        assert_eq!(roundtrip(&v).to_bits(), v.to_bits());
    }
    assert!(roundtrip(&f64::NAN).is_nan());
    assert!(roundtrip(&f32::NAN).is_nan());
    assert_eq!(roundtrip(&f32::NEG_INFINITY), f32::NEG_INFINITY);
    assert_eq!(roundtrip(&-2.25f32), -2.25);

    assert_eq!(encode_to_vec(&1.0f32).unwrap(), [0xca, 0x3f, 0x80, 0x00, 0x00]);
    assert_eq!(encode_to_vec(&1.0f64).unwrap()[0], 0xcb);
}

#[test]
fn float_targets_widen_integers_and_float32() {
    let bytes = encode_to_vec(&7_i64).unwrap();
    assert_eq!(decode::<f64>(&bytes).unwrap(), 7.0);
    let bytes = encode_to_vec(&0.5f32).unwrap();
    assert_eq!(decode::<f64>(&bytes).unwrap(), 0.5);
    let bytes = encode_to_vec(&"x").unwrap();
    assert_eq!(decode::<f64>(&bytes).unwrap_err().code, ErrorCode::TypeMismatch);
}

#[test]
fn string_and_binary_length_classes() {
    let cases: [(usize, u8, u8); 7] = [
        (0, 0xa0, 0xc4),
        (31, 0xbf, 0xc4),
        (32, 0xd9, 0xc4),
        (255, 0xd9, 0xc4),
        (256, 0xda, 0xc5),
        (65_535, 0xda, 0xc5),
        (65_536, 0xdb, 0xc6),
    ];
    for (len, str_tag, bin_tag) in cases {
        let s = "a".repeat(len);
        let bytes = encode_to_vec(&s).unwrap();
        assert_eq!(bytes[0], str_tag, "str len {len}");
        assert_eq!(decode::<String>(&bytes).unwrap(), s);

        let b = vec![0x5a_u8; len];
        let bytes = encode_to_vec(&b).unwrap();
        assert_eq!(bytes[0], bin_tag, "bin len {len}");
        assert_eq!(decode::<Vec<u8>>(&bytes).unwrap(), b);
    }
}

#[test]
fn nil_bool_and_option() {
    assert_eq!(encode_to_vec(&None::<u8>).unwrap(), [0xc0]);
    assert_eq!(encode_to_vec(&true).unwrap(), [0xc3]);
    assert_eq!(encode_to_vec(&false).unwrap(), [0xc2]);
    assert_eq!(decode::<Option<u8>>(&[0xc0]).unwrap(), None);
    assert_eq!(decode::<Option<u8>>(&[0x07]).unwrap(), Some(7));
    assert_eq!(decode::<bool>(&[0xc0]).unwrap_err().code, ErrorCode::TypeMismatch);
}

#[test]
fn alice_map_bytes_are_exact() {
    let v = Value::map([("name", Value::str("Alice")), ("age", Value::Int(30))]);
    let bytes = encode_to_vec(&v).unwrap();
    let mut expected = vec![0x82, 0xa4];
    expected.extend_from_slice(b"name");
    expected.push(0xa5);
    expected.extend_from_slice(b"Alice");
    expected.push(0xa3);
    expected.extend_from_slice(b"age");
    expected.push(0x1e);
    assert_eq!(bytes, expected);

    let entries = MapEntries::new(vec![("name", Value::str("Alice")), ("age", Value::Int(30))]);
    assert_eq!(encode_to_vec(&entries).unwrap(), expected);
}

#[test]
fn value_roundtrip_keeps_every_kind() {
    let v = Value::Array(vec![
        Value::Nil,
        Value::Bool(true),
        Value::Int(-5),
        Value::Uint(u64::MAX),
        Value::F32(1.25),
        Value::F64(-0.5),
        Value::str("text"),
        Value::bin(vec![0, 1, 2]),
        Value::Str(Cow::Owned(vec![0xff, 0xfe])),
        Value::map([("k", Value::Array(Vec::new()))]),
        Value::Ext(ExtValue::new(7, vec![1, 2, 3, 4])),
        Value::Ext(ExtValue::new(-1, vec![9; 5])),
    ]);
    let bytes = encode_to_vec(&v).unwrap();
    assert_eq!(decode_value(&bytes, DecodeOptions::DEFAULT).unwrap(), v);
    assert_eq!(decode_value(&bytes, DecodeOptions::BORROWED).unwrap(), v);
}

#[test]
fn value_rejects_non_string_keys() {
    // {1: 2}
    let err = decode_value(&[0x81, 0x01, 0x02], DecodeOptions::DEFAULT).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFormat);
    assert_eq!(err.offset, 1);
}

#[test]
fn reserved_tag_is_invalid_format() {
    let err = decode_value(&[0xc1], DecodeOptions::DEFAULT).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFormat);
    let err = decode::<u8>(&[0xc1]).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFormat);
}

#[test]
fn zero_copy_value_spans_alias_the_input() {
    let bytes = encode_to_vec(&Value::map([("key", Value::str("payload"))])).unwrap();
    let range = bytes.as_ptr_range();

    let borrowed = decode_value(&bytes, DecodeOptions::BORROWED).unwrap();
    let Value::Map(entries) = &borrowed else {
        panic!("expected a map");
    };
    let (Cow::Borrowed(k), Value::Str(Cow::Borrowed(v))) = (&entries[0].0, &entries[0].1) else {
        panic!("expected borrowed spans");
    };
    assert!(range.contains(&k.as_ptr()));
    assert!(range.contains(&v.as_ptr()));

    let owned = decode_value(&bytes, DecodeOptions::DEFAULT).unwrap();
    let Value::Map(entries) = &owned else {
        panic!("expected a map");
    };
    assert!(matches!(&entries[0].1, Value::Str(Cow::Owned(_))));
}

#[test]
fn native_strings_follow_their_ownership() {
    let bytes = encode_to_vec("hello").unwrap();
    let s: &str = decode(&bytes).unwrap();
    assert!(bytes.as_ptr_range().contains(&s.as_ptr()));

    let c: Cow<'_, str> = decode_borrowed(&bytes).unwrap();
    assert!(matches!(c, Cow::Borrowed("hello")));
    let c: Cow<'_, str> = decode(&bytes).unwrap();
    assert!(matches!(c, Cow::Owned(_)));

    let bad = [0xa2, 0xff, 0xfe];
    assert_eq!(decode::<String>(&bad).unwrap_err().code, ErrorCode::Utf8Invalid);
    assert!(decode_value(&bad, DecodeOptions::DEFAULT).is_ok());
}

#[test]
fn containers_roundtrip() {
    let v: Vec<String> = vec!["a".into(), String::new(), "ccc".into()];
    assert_eq!(roundtrip(&v), v);

    let mut m: HashMap<String, i64> = HashMap::new();
    m.insert("x".into(), 1);
    m.insert("y".into(), -1);
    assert_eq!(roundtrip(&m), m);

    let mut b: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    b.insert("bytes".into(), vec![1, 2]);
    assert_eq!(roundtrip(&b), b);

    let nested: Vec<Vec<u32>> = vec![vec![], vec![1, 2], vec![u32::MAX]];
    assert_eq!(roundtrip(&nested), nested);

    let entries = MapEntries::new(vec![("z".to_string(), 1u8), ("a".to_string(), 2u8)]);
    assert_eq!(roundtrip(&entries), entries);
}

#[test]
fn streaming_sessions_read_values_in_sequence() {
    let mut enc = Encoder::new();
    enc.encode(&1u8).unwrap();
    enc.encode("two").unwrap();
    enc.encode(&[3u16, 4][..]).unwrap();
    let bytes = enc.into_vec();

    let mut dec = Decoder::new(&bytes, DecodeOptions::DEFAULT);
    assert_eq!(dec.decode::<u8>().unwrap(), 1);
    assert_eq!(dec.decode::<&str>().unwrap(), "two");
    assert_eq!(dec.decode::<Vec<u16>>().unwrap(), [3, 4]);
    assert!(dec.is_empty());
    assert_eq!(dec.decode::<u8>().unwrap_err().code, ErrorCode::UnexpectedEof);
}

#[test]
fn one_shot_decode_rejects_trailing_bytes() {
    let err = decode::<u8>(&[0x01, 0x02]).unwrap_err();
    assert_eq!(err.code, ErrorCode::TrailingBytes);
    assert_eq!(err.offset, 1);
}

#[test]
fn encode_into_appends() {
    let mut out = vec![0xc0];
    encode_into(&7u8, &mut out).unwrap();
    assert_eq!(out, [0xc0, 0x07]);
}
