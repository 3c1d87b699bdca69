use proc_macro2::TokenStream;
use quote::quote;
use syn::{spanned::Spanned, GenericArgument, Ident, Path, PathArguments, PathSegment, Type};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Kind {
    Bool,
    Int,
    Uint,
    Float32,
    Float64,
    Str,
    Bytes,
    Seq,
    Map,
    Record,
    Dynamic,
    Ext,
}

impl Kind {
    pub(crate) fn to_tokens(self) -> TokenStream {
        match self {
            Kind::Bool => quote!(::zcpack::FieldKind::Bool),
            Kind::Int => quote!(::zcpack::FieldKind::Int),
            Kind::Uint => quote!(::zcpack::FieldKind::Uint),
            Kind::Float32 => quote!(::zcpack::FieldKind::Float32),
            Kind::Float64 => quote!(::zcpack::FieldKind::Float64),
            Kind::Str => quote!(::zcpack::FieldKind::Str),
            Kind::Bytes => quote!(::zcpack::FieldKind::Bytes),
            Kind::Seq => quote!(::zcpack::FieldKind::Seq),
            Kind::Map => quote!(::zcpack::FieldKind::Map),
            Kind::Record => quote!(::zcpack::FieldKind::Record),
            Kind::Dynamic => quote!(::zcpack::FieldKind::Dynamic),
            Kind::Ext => quote!(::zcpack::FieldKind::Ext),
        }
    }
}

/// Wire shape of a field type, as far as it can be read off the syntax.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Shape {
    pub(crate) kind: Kind,
    pub(crate) elem: Option<Kind>,
    pub(crate) nullable: bool,
}

impl Shape {
    const fn of(kind: Kind) -> Self {
        Self {
            kind,
            elem: None,
            nullable: false,
        }
    }

    const fn container(kind: Kind, elem: Kind) -> Self {
        Self {
            kind,
            elem: Some(elem),
            nullable: false,
        }
    }
}

fn unsupported(ty: &Type, what: &str) -> syn::Error {
    syn::Error::new(ty.span(), format!("{what} are not supported by zcpack records"))
}

fn type_args(seg: &PathSegment) -> Vec<&Type> {
    let PathArguments::AngleBracketed(args) = &seg.arguments else {
        return Vec::new();
    };
    args.args
        .iter()
        .filter_map(|arg| match arg {
            GenericArgument::Type(t) => Some(t),
            _ => None,
        })
        .collect()
}

pub(crate) fn type_is_ident(ty: &Type, name: &str) -> bool {
    let Type::Path(tp) = ty else { return false };
    let Some(seg) = tp.path.segments.last() else {
        return false;
    };
    seg.ident == name
}

fn is_u8_slice(ty: &Type) -> bool {
    matches!(ty, Type::Slice(ts) if type_is_ident(&ts.elem, "u8"))
}

fn nth_arg<'a>(ty: &'a Type, seg: &'a PathSegment, n: usize) -> syn::Result<&'a Type> {
    type_args(seg).get(n).copied().ok_or_else(|| {
        syn::Error::new(ty.span(), format!("`{}` needs explicit type arguments", seg.ident))
    })
}

pub(crate) fn classify(ty: &Type) -> syn::Result<Shape> {
    match ty {
        Type::Group(tg) => classify(&tg.elem),
        Type::Paren(tp) => classify(&tp.elem),
        Type::Reference(tr) => {
            if type_is_ident(&tr.elem, "str") {
                Ok(Shape::of(Kind::Str))
            } else if is_u8_slice(&tr.elem) {
                Ok(Shape::of(Kind::Bytes))
            } else {
                classify(&tr.elem)
            }
        }
        Type::Slice(ts) => {
            if type_is_ident(&ts.elem, "u8") {
                Ok(Shape::of(Kind::Bytes))
            } else {
                Ok(Shape::container(Kind::Seq, classify(&ts.elem)?.kind))
            }
        }
        Type::Path(tp) => {
            let Some(seg) = tp.path.segments.last() else {
                return Err(unsupported(ty, "empty paths"));
            };
            match seg.ident.to_string().as_str() {
                "Option" => {
                    let inner = classify(nth_arg(ty, seg, 0)?)?;
                    Ok(Shape {
                        nullable: true,
                        ..inner
                    })
                }
                "Box" => classify(nth_arg(ty, seg, 0)?),
                "bool" => Ok(Shape::of(Kind::Bool)),
                "i8" | "i16" | "i32" | "i64" | "isize" => Ok(Shape::of(Kind::Int)),
                "u8" | "u16" | "u32" | "u64" | "usize" => Ok(Shape::of(Kind::Uint)),
                "i128" | "u128" => Err(unsupported(ty, "128-bit integers")),
                "f32" => Ok(Shape::of(Kind::Float32)),
                "f64" => Ok(Shape::of(Kind::Float64)),
                "String" | "str" => Ok(Shape::of(Kind::Str)),
                "Cow" => {
                    let inner = nth_arg(ty, seg, 0)?;
                    if type_is_ident(inner, "str") {
                        Ok(Shape::of(Kind::Str))
                    } else if is_u8_slice(inner) {
                        Ok(Shape::of(Kind::Bytes))
                    } else {
                        Err(unsupported(ty, "`Cow`s other than `Cow<str>` and `Cow<[u8]>`"))
                    }
                }
                "Vec" => {
                    let inner = nth_arg(ty, seg, 0)?;
                    if type_is_ident(inner, "u8") {
                        Ok(Shape::of(Kind::Bytes))
                    } else {
                        Ok(Shape::container(Kind::Seq, classify(inner)?.kind))
                    }
                }
                "HashMap" | "BTreeMap" | "MapEntries" => {
                    let value = nth_arg(ty, seg, 1)?;
                    Ok(Shape::container(Kind::Map, classify(value)?.kind))
                }
                "Value" | "Dynamic" => Ok(Shape::of(Kind::Dynamic)),
                "ExtValue" => Ok(Shape::of(Kind::Ext)),
                _ => Ok(Shape::of(Kind::Record)),
            }
        }
        Type::Ptr(_) => Err(unsupported(ty, "raw pointers")),
        Type::BareFn(_) => Err(unsupported(ty, "function pointers")),
        Type::TraitObject(_) | Type::ImplTrait(_) => Err(unsupported(ty, "trait objects")),
        Type::Tuple(_) => Err(unsupported(ty, "tuples")),
        Type::Array(_) => Err(unsupported(ty, "fixed-size arrays (use `Vec`)")),
        _ => Err(unsupported(ty, "types of this form")),
    }
}

fn path_might_be_self(path: &Path, self_ident: &Ident) -> bool {
    let Some(last) = path.segments.last() else {
        return false;
    };
    if last.ident != *self_ident {
        return false;
    }
    if path.segments.len() == 1 {
        return true;
    }
    path.segments
        .iter()
        .take(path.segments.len() - 1)
        .all(|seg| matches!(seg.ident.to_string().as_str(), "crate" | "self" | "super"))
}

pub(crate) fn type_mentions_self(ty: &Type, self_ident: &Ident) -> bool {
    match ty {
        Type::Path(tp) => {
            if tp.qself.is_none() && path_might_be_self(&tp.path, self_ident) {
                return true;
            }
            if let Some(q) = &tp.qself {
                if type_mentions_self(&q.ty, self_ident) {
                    return true;
                }
            }
            tp.path
                .segments
                .iter()
                .flat_map(type_args)
                .any(|inner| type_mentions_self(inner, self_ident))
        }
        Type::Reference(tr) => type_mentions_self(&tr.elem, self_ident),
        Type::Slice(ts) => type_mentions_self(&ts.elem, self_ident),
        Type::Group(tg) => type_mentions_self(&tg.elem, self_ident),
        Type::Paren(tp) => type_mentions_self(&tp.elem, self_ident),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn shape(ty: Type) -> (Kind, Option<Kind>, bool) {
        let s = classify(&ty).unwrap();
        (s.kind, s.elem, s.nullable)
    }

    #[test]
    fn classifies_common_field_types() {
        assert_eq!(shape(parse_quote!(u32)), (Kind::Uint, None, false));
        assert_eq!(shape(parse_quote!(Option<i64>)), (Kind::Int, None, true));
        assert_eq!(shape(parse_quote!(Cow<'a, str>)), (Kind::Str, None, false));
        assert_eq!(shape(parse_quote!(Cow<'a, [u8]>)), (Kind::Bytes, None, false));
        assert_eq!(shape(parse_quote!(Vec<u8>)), (Kind::Bytes, None, false));
        assert_eq!(shape(parse_quote!(&'a [u8])), (Kind::Bytes, None, false));
        assert_eq!(shape(parse_quote!(Vec<String>)), (Kind::Seq, Some(Kind::Str), false));
        assert_eq!(
            shape(parse_quote!(HashMap<String, f64>)),
            (Kind::Map, Some(Kind::Float64), false)
        );
        assert_eq!(shape(parse_quote!(Inner)), (Kind::Record, None, false));
    }

    #[test]
    fn rejects_unrepresentable_types() {
        let types: [Type; 5] = [
            parse_quote!(*const u8),
            parse_quote!(fn() -> u8),
            parse_quote!(Box<dyn Fn()>),
            parse_quote!((u8, u8)),
            parse_quote!(Vec<(u8, u8)>),
        ];
        for ty in &types {
            assert!(classify(ty).is_err());
        }
    }

    #[test]
    fn detects_self_mentions() {
        let me: Ident = parse_quote!(Node);
        assert!(type_mentions_self(&parse_quote!(Vec<Node>), &me));
        assert!(type_mentions_self(&parse_quote!(Option<Box<crate::Node>>), &me));
        assert!(!type_mentions_self(&parse_quote!(Vec<Leaf>), &me));
    }
}
