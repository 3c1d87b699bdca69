// Property-based tests for encode/decode roundtrips and malformed-input robustness.
//
// Sizes and depths stay small to keep CI fast.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use std::collections::BTreeMap;

use zcpack::{
    decode, decode_dynamic, decode_value, encode_to_vec, DecodeOptions, Decoder, ExtValue, MsgPackDecode,
    MsgPackEncode, Value,
};

fn arb_key() -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::char::range('a', 'z'), 0..16).prop_map(|chars| chars.into_iter().collect())
}

fn arb_leaf() -> impl Strategy<Value = Value<'static>> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        // Only values above i64::MAX decode back as Uint.
        ((1u64 << 63)..=u64::MAX).prop_map(Value::Uint),
        any::<f32>().prop_filter("NaN never compares equal", |f| !f.is_nan()).prop_map(Value::F32),
        any::<f64>().prop_filter("NaN never compares equal", |f| !f.is_nan()).prop_map(Value::F64),
        ".{0,40}".prop_map(|s: String| Value::str(s)),
        proptest::collection::vec(any::<u8>(), 0..64).prop_map(|b: Vec<u8>| Value::bin(b)),
        (any::<i8>(), proptest::collection::vec(any::<u8>(), 0..20))
            .prop_map(|(ty, data)| Value::Ext(ExtValue::new(ty, data))),
    ]
}

fn arb_value() -> impl Strategy<Value = Value<'static>> {
    arb_leaf().prop_recursive(4, 128, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            proptest::collection::vec((arb_key(), inner), 0..8)
                .prop_map(|pairs: Vec<(String, Value<'static>)>| Value::map(pairs)),
        ]
    })
}

#[derive(Debug, Default, Clone, PartialEq, MsgPackEncode, MsgPackDecode)]
struct Reading {
    sensor: String,
    at: u64,
    delta: i32,
    samples: Vec<f64>,
    labels: BTreeMap<String, String>,
    raw: Vec<u8>,
    note: Option<String>,
}

fn arb_reading() -> impl Strategy<Value = Reading> {
    (
        arb_key(),
        any::<u64>(),
        any::<i32>(),
        proptest::collection::vec(-1e9f64..1e9, 0..8),
        proptest::collection::btree_map(arb_key(), arb_key(), 0..4),
        proptest::collection::vec(any::<u8>(), 0..32),
        proptest::option::of(arb_key()),
    )
        .prop_map(|(sensor, at, delta, samples, labels, raw, note)| Reading {
            sensor,
            at,
            delta,
            samples,
            labels,
            raw,
            note,
        })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn value_roundtrips_in_both_modes(v in arb_value()) {
        let bytes = encode_to_vec(&v).unwrap();
        prop_assert_eq!(&decode_value(&bytes, DecodeOptions::DEFAULT).unwrap(), &v);
        prop_assert_eq!(&decode_value(&bytes, DecodeOptions::BORROWED).unwrap(), &v);
    }

    #[test]
    fn skip_consumes_exactly_one_value(v in arb_value(), tail in proptest::collection::vec(any::<u8>(), 0..8)) {
        let mut bytes = encode_to_vec(&v).unwrap();
        let len = bytes.len();
        bytes.extend_from_slice(&tail);
        let mut dec = Decoder::new(&bytes, DecodeOptions::DEFAULT);
        dec.skip_value().unwrap();
        prop_assert_eq!(dec.position(), len);
    }

    #[test]
    fn records_roundtrip(r in arb_reading()) {
        let bytes = encode_to_vec(&r).unwrap();
        prop_assert_eq!(&decode::<Reading>(&bytes).unwrap(), &r);
    }

    #[test]
    fn arbitrary_input_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_value(&bytes, DecodeOptions::DEFAULT);
        let _ = decode_value(&bytes, DecodeOptions::BORROWED);
        let _ = decode_dynamic(&bytes, DecodeOptions::DEFAULT);
        let _ = decode::<Reading>(&bytes);
        let mut dec = Decoder::new(&bytes, DecodeOptions::DEFAULT);
        let _ = dec.skip_value();
    }

    #[test]
    fn reencoding_is_stable(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(v) = decode_value(&bytes, DecodeOptions::DEFAULT) {
            let once = encode_to_vec(&v).unwrap();
            let again = encode_to_vec(&decode_value(&once, DecodeOptions::DEFAULT).unwrap()).unwrap();
            prop_assert_eq!(once, again);
        }
    }

    #[test]
    fn skip_agrees_with_full_decode(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut full = Decoder::new(&bytes, DecodeOptions::DEFAULT);
        let decoded = full.decode_value();
        let mut skip = Decoder::new(&bytes, DecodeOptions::DEFAULT);
        let skipped = skip.skip_value();
        if decoded.is_ok() {
            prop_assert!(skipped.is_ok());
            prop_assert_eq!(full.position(), skip.position());
        }
    }
}
