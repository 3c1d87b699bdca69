use proc_macro2::Span;
use syn::{spanned::Spanned, Attribute, LitStr};

#[derive(Default, Clone)]
pub(crate) struct FieldAttr {
    pub(crate) rename: Option<LitStr>,
    pub(crate) skip: bool,
    pub(crate) omit_empty: bool,
    pub(crate) flatten: bool,
}

pub(crate) fn ensure_no_msgpack_attrs(attrs: &[Attribute], ctx: &str) -> syn::Result<()> {
    for a in attrs {
        if a.path().is_ident("msgpack") {
            return Err(syn::Error::new(
                a.span(),
                format!("`#[msgpack(...)]` is not supported on {ctx}"),
            ));
        }
    }
    Ok(())
}

fn set_flag(flag: &mut bool, meta: &syn::meta::ParseNestedMeta<'_>, name: &str) -> syn::Result<()> {
    if *flag {
        return Err(meta.error(format!("duplicate `msgpack({name})`")));
    }
    *flag = true;
    Ok(())
}

pub(crate) fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttr> {
    let mut out = FieldAttr::default();
    let mut span = Span::call_site();
    for attr in attrs {
        if !attr.path().is_ident("msgpack") {
            continue;
        }
        span = attr.span();
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                return set_flag(&mut out.skip, &meta, "skip");
            }
            if meta.path.is_ident("omit_empty") {
                return set_flag(&mut out.omit_empty, &meta, "omit_empty");
            }
            if meta.path.is_ident("flatten") {
                return set_flag(&mut out.flatten, &meta, "flatten");
            }
            if meta.path.is_ident("rename") {
                if out.rename.is_some() {
                    return Err(meta.error("duplicate `msgpack(rename = ...)`"));
                }
                let lit: LitStr = meta.value()?.parse()?;
                out.rename = Some(lit);
                return Ok(());
            }
            Err(meta.error(
                "unsupported `msgpack(...)` field attribute (allowed: rename, skip, omit_empty, flatten)",
            ))
        })?;
    }

    if out.skip && (out.rename.is_some() || out.omit_empty || out.flatten) {
        return Err(syn::Error::new(
            span,
            "`msgpack(skip)` cannot be combined with other field attributes",
        ));
    }
    if out.flatten && (out.rename.is_some() || out.omit_empty) {
        return Err(syn::Error::new(
            span,
            "`msgpack(flatten)` cannot be combined with `rename` or `omit_empty`",
        ));
    }

    Ok(out)
}
