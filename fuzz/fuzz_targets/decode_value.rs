#![no_main]

use libfuzzer_sys::fuzz_target;

use zcpack::{decode_dynamic, decode_value, DecodeLimits, DecodeOptions};

fn fuzz_options(input_len: usize) -> DecodeOptions {
    // Tight enough to avoid pathological allocations while still exploring structure.
    DecodeOptions::with_limits(DecodeLimits::for_bytes(input_len.min(1 << 20)).with_max_depth(64))
}

fuzz_target!(|data: &[u8]| {
    let opts = fuzz_options(data.len());
    let _ = decode_value(data, opts);
    let _ = decode_value(data, opts.zero_copy(true));
    let _ = decode_dynamic(data, opts);
});
