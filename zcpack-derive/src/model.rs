use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::{spanned::Spanned, Data, DeriveInput, Fields, Ident, LitStr, Type};

use crate::attrs::{ensure_no_msgpack_attrs, parse_field_attrs};
use crate::types::{classify, type_is_ident, type_mentions_self, Kind, Shape};

/// A field that takes part in encoding, with its route index.
pub(crate) struct RecordField<'a> {
    pub(crate) ident: &'a Ident,
    pub(crate) ty: &'a Type,
    pub(crate) index: Literal,
    pub(crate) name: LitStr,
    pub(crate) shape: Shape,
    pub(crate) omit_empty: bool,
    pub(crate) flatten: bool,
    pub(crate) recursive: bool,
}

impl RecordField<'_> {
    /// `FieldDef` literal for the field table.
    pub(crate) fn def(&self) -> TokenStream {
        let name = &self.name;
        let ty = self.ty;
        let kind = self.shape.kind.to_tokens();
        let elem = match self.shape.elem {
            Some(k) => {
                let k = k.to_tokens();
                quote!(::core::option::Option::Some(#k))
            }
            None => quote!(::core::option::Option::None),
        };
        let nullable = self.shape.nullable;
        let omit_empty = self.omit_empty;
        let flatten = if self.flatten {
            quote! {
                ::core::option::Option::Some(
                    <#ty as ::zcpack::Record>::fields as fn() -> ::std::vec::Vec<::zcpack::FieldDef>
                )
            }
        } else {
            quote!(::core::option::Option::None)
        };
        quote! {
            ::zcpack::FieldDef {
                name: #name,
                kind: #kind,
                elem: #elem,
                nullable: #nullable,
                omit_empty: #omit_empty,
                flatten: #flatten,
            }
        }
    }
}

pub(crate) fn record_fields(input: &DeriveInput) -> syn::Result<Vec<RecordField<'_>>> {
    ensure_no_msgpack_attrs(&input.attrs, "the record itself (use field attributes)")?;
    let data = match &input.data {
        Data::Struct(data) => data,
        Data::Enum(e) => {
            return Err(syn::Error::new(
                e.enum_token.span(),
                "zcpack records must be structs with named fields",
            ))
        }
        Data::Union(u) => {
            return Err(syn::Error::new(
                u.union_token.span(),
                "zcpack records must be structs with named fields",
            ))
        }
    };
    let named = match &data.fields {
        Fields::Named(named) => named,
        Fields::Unit => return Ok(Vec::new()),
        Fields::Unnamed(unnamed) => {
            return Err(syn::Error::new(
                unnamed.span(),
                "tuple structs are not supported; use named fields",
            ))
        }
    };

    let mut out: Vec<RecordField<'_>> = Vec::new();
    for field in &named.named {
        let attr = parse_field_attrs(&field.attrs)?;
        if attr.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new(field.span(), "expected a named field"));
        };
        let index = u16::try_from(out.len())
            .map_err(|_| syn::Error::new(field.span(), "too many fields in one record"))?;
        let shape = classify(&field.ty)?;
        let recursive = type_mentions_self(&field.ty, &input.ident);

        if attr.flatten {
            if shape.kind != Kind::Record || shape.nullable {
                return Err(syn::Error::new(
                    field.ty.span(),
                    "`msgpack(flatten)` needs a (non-optional) record type",
                ));
            }
            if recursive {
                return Err(syn::Error::new(
                    field.ty.span(),
                    "a record cannot be flattened into itself",
                ));
            }
            if type_is_ident(&field.ty, "Box") {
                return Err(syn::Error::new(
                    field.ty.span(),
                    "`msgpack(flatten)` needs the record inline, not boxed",
                ));
            }
        }

        let name = attr
            .rename
            .unwrap_or_else(|| LitStr::new(&ident.unraw().to_string(), ident.span()));
        if !attr.flatten && out.iter().any(|f| !f.flatten && f.name.value() == name.value()) {
            return Err(syn::Error::new(
                name.span(),
                format!("duplicate wire name `{}`", name.value()),
            ));
        }

        out.push(RecordField {
            ident,
            ty: &field.ty,
            index: Literal::u16_unsuffixed(index),
            name,
            shape,
            omit_empty: attr.omit_empty,
            flatten: attr.flatten,
            recursive,
        });
    }
    Ok(out)
}
