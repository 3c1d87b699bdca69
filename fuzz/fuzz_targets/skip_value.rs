#![no_main]

use libfuzzer_sys::fuzz_target;

use zcpack::{DecodeLimits, DecodeOptions, Decoder};

fuzz_target!(|data: &[u8]| {
    let opts = DecodeOptions::with_limits(DecodeLimits::DEFAULT.with_max_depth(64));
    let mut full = Decoder::new(data, opts);
    let decoded = full.decode_value();
    let mut skip = Decoder::new(data, opts);
    let skipped = skip.skip_value();
    if decoded.is_ok() {
        // Skipping must accept everything the value decoder accepts, and stop at the same byte.
        assert!(skipped.is_ok());
        assert_eq!(full.position(), skip.position());
    }
});
