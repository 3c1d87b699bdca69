//! Derive macros for `zcpack` records.
//!
//! `#[derive(MsgPackEncode)]` emits the record's field table, its route-addressed field
//! accessors, and an encode impl that writes the record as a string-keyed map.
//! `#[derive(MsgPackDecode)]` emits the matching field-by-field decoder.

extern crate proc_macro;

mod attrs;
mod decode;
mod encode;
mod model;
mod types;
mod util;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

#[proc_macro_derive(MsgPackEncode, attributes(msgpack))]
pub fn derive_msgpack_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    encode::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[proc_macro_derive(MsgPackDecode, attributes(msgpack))]
pub fn derive_msgpack_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    decode::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
