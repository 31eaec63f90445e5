//! Proc macros for the cntryl-probe invocation harness.
//!
//! This crate provides the `#[probe_target]` attribute macro for registering
//! functions that can later be resolved by owner and name.

use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Expr, ItemFn, Lit, Meta, Token};

/// Register a function as a probe target.
///
/// The function must have the signature
/// `fn(&[Value]) -> Result<Value, Failure>`.
///
/// # Example
///
/// ```rust,ignore
/// use cntryl_probe::{probe_target, Failure, Value};
///
/// #[probe_target(owner = "BatchTests", params = "i64")]
/// fn square(args: &[Value]) -> Result<Value, Failure> {
///     let n = args[0].as_i64().unwrap_or_default();
///     Ok(Value::from(n * n))
/// }
/// ```
///
/// # Attributes
///
/// - `owner = "Owner"` - Owner name used for lookup (default: the module path)
/// - `name = "custom_name"` - Use a custom name instead of the function name
/// - `params = "i64, String"` - Declared parameter type names (default: none)
#[proc_macro_attribute]
pub fn probe_target(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let args = parse_macro_input!(attr with Punctuated::<Meta, Token![,]>::parse_terminated);

    let fn_name = &input.sig.ident;
    let fn_name_str = fn_name.to_string();

    let mut owner = None;
    let mut name = None;
    let mut params = String::new();

    for meta in &args {
        let Meta::NameValue(nv) = meta else {
            return syn::Error::new_spanned(meta, "expected `key = \"value\"`")
                .to_compile_error()
                .into();
        };
        let value = match string_value(&nv.value) {
            Some(v) => v,
            None => {
                return syn::Error::new_spanned(&nv.value, "expected a string literal")
                    .to_compile_error()
                    .into();
            }
        };
        if nv.path.is_ident("owner") {
            owner = Some(value);
        } else if nv.path.is_ident("name") {
            name = Some(value);
        } else if nv.path.is_ident("params") {
            params = value;
        } else {
            return syn::Error::new_spanned(&nv.path, "unknown attribute, expected owner, name or params")
                .to_compile_error()
                .into();
        }
    }

    let name = name.unwrap_or(fn_name_str.clone());
    let owner = match owner {
        Some(o) => quote! { #o },
        None => quote! { module_path!() },
    };

    // Generate a unique identifier for the registry entry
    let entry_ident = syn::Ident::new(
        &format!("__PROBE_TARGET_{}", fn_name_str.to_uppercase()),
        fn_name.span(),
    );

    let expanded = quote! {
        #input

        #[allow(non_upper_case_globals)]
        #[::cntryl_probe::__private::linkme::distributed_slice(::cntryl_probe::__private::PROBE_TARGETS)]
        #[linkme(crate = ::cntryl_probe::__private::linkme)]
        static #entry_ident: ::cntryl_probe::__private::TargetEntry = ::cntryl_probe::__private::TargetEntry {
            name: #name,
            owner: #owner,
            params: #params,
            func: #fn_name,
        };
    };

    TokenStream::from(expanded)
}

fn string_value(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        _ => None,
    }
}
