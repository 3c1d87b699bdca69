#![cfg(feature = "serde")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use zcpack::{decode_dynamic, decode_value, encode_to_vec, DecodeOptions, Dynamic, ExtValue, Value};

#[test]
fn json_document_survives_a_msgpack_hop() {
    let json = r#"{"id":7,"big":18446744073709551615,"neg":-3,"ratio":0.25,"ok":true,"none":null,"tags":["x","y"],"nested":{"k":"v"}}"#;
    let doc: Dynamic<'static> = serde_json::from_str(json).unwrap();

    let bytes = encode_to_vec(&doc).unwrap();
    let back = decode_dynamic(&bytes, DecodeOptions::BORROWED).unwrap();
    assert_eq!(back, doc);
    assert_eq!(back.get("big"), Some(&Dynamic::Uint(u64::MAX)));

    let reparsed: serde_json::Value = serde_json::to_value(&back).unwrap();
    let original: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(reparsed, original);
}

#[test]
fn value_serializes_strings_bytes_and_extensions() {
    let v = Value::Array(vec![
        Value::str("text"),
        Value::bin(vec![1, 2]),
        Value::Str(vec![0xff].into()),
        Value::Ext(ExtValue::new(-2, vec![9])),
        Value::Uint(u64::MAX),
        Value::F32(0.5),
    ]);
    let json = serde_json::to_string(&v).unwrap();
    assert_eq!(json, r#"["text",[1,2],[255],[-2,[9]],18446744073709551615,0.5]"#);
}

#[test]
fn decoded_values_serialize_in_wire_order() {
    let mut enc = zcpack::Encoder::new();
    enc.map(2, |m| {
        m.entry("z", |e| e.int(1))?;
        m.entry("a", |e| e.nil())
    })
    .unwrap();
    let bytes = enc.into_vec();
    let v = decode_value(&bytes, DecodeOptions::BORROWED).unwrap();
    assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"z":1,"a":null}"#);
}
