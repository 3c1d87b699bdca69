use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::model::record_fields;
use crate::util::{add_where_bound, where_clause_of};

pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let fields = record_fields(input)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut wc = where_clause_of(where_clause);
    for f in &fields {
        if f.recursive {
            continue;
        }
        let bound = if f.flatten {
            quote!(::zcpack::Record)
        } else {
            quote!(::zcpack::MsgPackEncode)
        };
        add_where_bound(&mut wc, f.ty, bound);
    }

    let defs = fields.iter().map(|f| f.def());
    let flattened = fields.iter().filter(|f| f.flatten).map(|f| {
        let ty = f.ty;
        quote!(.with(<#ty as ::zcpack::Record>::schema_key()))
    });
    let encode_arms = fields.iter().map(|f| {
        let (idx, ident) = (&f.index, f.ident);
        if f.flatten {
            quote!([#idx, rest @ ..] => ::zcpack::Record::encode_field(&self.#ident, rest, enc))
        } else {
            quote!([#idx] => ::zcpack::MsgPackEncode::encode(&self.#ident, enc))
        }
    });
    let empty_arms = fields.iter().map(|f| {
        let (idx, ident) = (&f.index, f.ident);
        if f.flatten {
            quote!([#idx, rest @ ..] => ::zcpack::Record::field_is_empty(&self.#ident, rest))
        } else {
            quote!([#idx] => ::zcpack::MsgPackEncode::is_empty_value(&self.#ident))
        }
    });

    Ok(quote! {
        impl #impl_generics ::zcpack::Record for #name #ty_generics #wc {
            fn schema_key() -> ::zcpack::SchemaKey {
                #[allow(dead_code)]
                struct __ZcpackSchemaKey;
                ::zcpack::SchemaKey::of::<__ZcpackSchemaKey>() #(#flattened)*
            }

            fn fields() -> ::std::vec::Vec<::zcpack::FieldDef> {
                ::std::vec![#(#defs),*]
            }

            #[allow(clippy::match_single_binding)]
            fn encode_field(
                &self,
                route: &[u16],
                enc: &mut ::zcpack::Encoder,
            ) -> ::core::result::Result<(), ::zcpack::MsgPackError> {
                match route {
                    #(#encode_arms,)*
                    _ => ::core::result::Result::Err(::zcpack::__private::unknown_route(enc.len())),
                }
            }

            #[allow(clippy::match_single_binding)]
            fn field_is_empty(&self, route: &[u16]) -> bool {
                match route {
                    #(#empty_arms,)*
                    _ => false,
                }
            }
        }

        impl #impl_generics ::zcpack::MsgPackEncode for #name #ty_generics #wc {
            fn encode(&self, enc: &mut ::zcpack::Encoder) -> ::core::result::Result<(), ::zcpack::MsgPackError> {
                ::zcpack::encode_record(self, enc)
            }
        }

        impl #impl_generics ::zcpack::ArrayElem for #name #ty_generics #wc {}
    })
}
