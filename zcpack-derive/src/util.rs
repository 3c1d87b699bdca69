use proc_macro2::TokenStream;
use syn::{parse_quote, Type, WhereClause, WherePredicate};

pub(crate) fn add_where_bound(wc: &mut WhereClause, ty: &Type, bound: TokenStream) {
    let pred: WherePredicate = parse_quote!(#ty: #bound);
    wc.predicates.push(pred);
}

/// An owned copy of `wc`, or an empty clause to add bounds to.
pub(crate) fn where_clause_of(wc: Option<&WhereClause>) -> WhereClause {
    wc.cloned().unwrap_or_else(|| WhereClause {
        where_token: Default::default(),
        predicates: Default::default(),
    })
}
