#![allow(clippy::unwrap_used)]

use criterion::{criterion_group, criterion_main, Criterion};
use std::borrow::Cow;
use std::hint::black_box;

use zcpack::{
    decode_value, encode_to_vec, pool, DecodeOptions, Decoder, MsgPackDecode, MsgPackEncode, StructCodec, Value,
};

#[derive(Debug, Default, MsgPackEncode, MsgPackDecode)]
struct Event<'a> {
    id: u64,
    kind: Cow<'a, str>,
    source: Cow<'a, str>,
    payload: Cow<'a, [u8]>,
    tags: Vec<String>,
    score: f64,
}

fn sample_event() -> Event<'static> {
    Event {
        id: 42,
        kind: "click".into(),
        source: "web-frontend-eu-1".into(),
        payload: vec![7; 256].into(),
        tags: vec!["a".into(), "beta".into(), "campaign-2025".into()],
        score: 0.875,
    }
}

fn sample_medium() -> Vec<u8> {
    let entries = (0..64_i64).map(|i| (format!("k{i:03}"), Value::Int(i)));
    encode_to_vec(&Value::map(entries)).unwrap()
}

fn bench_value(c: &mut Criterion) {
    let medium = sample_medium();

    c.bench_function("decode_value_medium_copy", |b| {
        b.iter(|| black_box(decode_value(black_box(&medium), DecodeOptions::DEFAULT).unwrap()))
    });

    c.bench_function("decode_value_medium_borrowed", |b| {
        b.iter(|| black_box(decode_value(black_box(&medium), DecodeOptions::BORROWED).unwrap()))
    });

    c.bench_function("skip_value_medium", |b| {
        b.iter(|| {
            let mut dec = Decoder::new(black_box(&medium), DecodeOptions::DEFAULT);
            dec.skip_value().unwrap();
        })
    });

    let decoded = decode_value(&medium, DecodeOptions::DEFAULT).unwrap();
    c.bench_function("encode_value_medium", |b| b.iter(|| black_box(encode_to_vec(&decoded).unwrap())));
}

fn bench_struct(c: &mut Criterion) {
    let event = sample_event();
    let codec = StructCodec::<Event<'_>>::new();
    let bytes = codec.encode_to_vec(&event).unwrap();

    c.bench_function("struct_encode", |b| b.iter(|| black_box(codec.encode_to_vec(black_box(&event)).unwrap())));

    c.bench_function("struct_encode_pooled", |b| {
        b.iter(|| {
            let mut enc = pool::encoder();
            codec.encode(black_box(&event), &mut enc).unwrap();
            black_box(enc.len())
        })
    });

    c.bench_function("struct_decode_copy", |b| b.iter(|| black_box(codec.decode(black_box(&bytes), false).unwrap())));

    c.bench_function("struct_decode_borrowed", |b| {
        b.iter(|| black_box(codec.decode(black_box(&bytes), true).unwrap()))
    });
}

criterion_group!(benches, bench_value, bench_struct);
criterion_main!(benches);
