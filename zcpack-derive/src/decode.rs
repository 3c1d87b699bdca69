use proc_macro2::TokenStream;
use quote::quote;
use syn::{GenericParam, Generics, Ident, Lifetime, LifetimeParam};

use crate::model::record_fields;
use crate::util::add_where_bound;

/// Clone `generics` with a fresh leading input lifetime that outlives every declared lifetime.
fn decode_lifetime(generics: &Generics) -> (Generics, Lifetime) {
    let mut out = generics.clone();
    let mut name = "__zcpack".to_string();
    let mut counter = 0usize;
    loop {
        let probe = Ident::new(&name, proc_macro2::Span::call_site());
        let exists = out.lifetimes().any(|lt| lt.lifetime.ident == probe);
        if !exists {
            break;
        }
        counter += 1;
        name = format!("__zcpack{counter}");
    }
    let lt = Lifetime::new(&format!("'{name}"), proc_macro2::Span::call_site());
    out.params
        .insert(0, GenericParam::Lifetime(LifetimeParam::new(lt.clone())));

    let wc = out.make_where_clause();
    for lifetime in generics.lifetimes() {
        let lt_ident = &lifetime.lifetime;
        wc.predicates.push(syn::parse_quote!(#lt: #lt_ident));
    }

    (out, lt)
}

pub(crate) fn expand(input: &syn::DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let fields = record_fields(input)?;
    let (de_generics, lt) = decode_lifetime(&input.generics);
    let (_, ty_generics, _) = input.generics.split_for_impl();

    let mut de_generics = de_generics;
    let wc = de_generics.make_where_clause();
    wc.predicates.push(syn::parse_quote! {
        #name #ty_generics: ::zcpack::Record + ::core::default::Default
    });
    for f in &fields {
        if f.recursive {
            continue;
        }
        let bound = if f.flatten {
            quote!(::zcpack::RecordDecode<#lt>)
        } else {
            quote!(::zcpack::MsgPackDecode<#lt>)
        };
        add_where_bound(wc, f.ty, bound);
    }
    let (impl_generics, _, where_clause) = de_generics.split_for_impl();

    let arms = fields.iter().map(|f| {
        let (idx, ident) = (&f.index, f.ident);
        if f.flatten {
            quote!([#idx, rest @ ..] => ::zcpack::RecordDecode::decode_field(&mut self.#ident, rest, dec))
        } else {
            quote!([#idx] => ::zcpack::MsgPackDecode::decode_in_place(&mut self.#ident, dec))
        }
    });

    Ok(quote! {
        impl #impl_generics ::zcpack::RecordDecode<#lt> for #name #ty_generics #where_clause {
            #[allow(clippy::match_single_binding)]
            fn decode_field(
                &mut self,
                route: &[u16],
                dec: &mut ::zcpack::Decoder<#lt>,
            ) -> ::core::result::Result<(), ::zcpack::MsgPackError> {
                match route {
                    #(#arms,)*
                    _ => ::core::result::Result::Err(::zcpack::__private::unknown_route(dec.position())),
                }
            }
        }

        impl #impl_generics ::zcpack::MsgPackDecode<#lt> for #name #ty_generics #where_clause {
            fn decode(dec: &mut ::zcpack::Decoder<#lt>) -> ::core::result::Result<Self, ::zcpack::MsgPackError> {
                ::zcpack::decode_record(dec)
            }

            fn decode_in_place(
                &mut self,
                dec: &mut ::zcpack::Decoder<#lt>,
            ) -> ::core::result::Result<(), ::zcpack::MsgPackError> {
                ::zcpack::decode_record_into(self, dec)
            }
        }
    })
}
