#![no_main]

use libfuzzer_sys::fuzz_target;

use zcpack::{decode_value, encode_to_vec, DecodeLimits, DecodeOptions};

fuzz_target!(|data: &[u8]| {
    let opts = DecodeOptions::with_limits(DecodeLimits::for_bytes(data.len().min(1 << 20)).with_max_depth(64));
    if let Ok(v) = decode_value(data, opts) {
        // Re-encoding is minimal, so a second hop must be byte-stable.
        let once = encode_to_vec(&v).expect("re-encode");
        let w = decode_value(&once, DecodeOptions::DEFAULT).expect("decode re-encoded value");
        let twice = encode_to_vec(&w).expect("re-encode again");
        assert_eq!(once, twice);
        assert!(once.len() <= data.len());
    }
});
