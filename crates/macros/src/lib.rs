//! Macros for typed-rpc.
//!
//! This crate contains the derive which is reexported by the `typed-rpc` crate.
//! You shouldn't need to use this crate directly.

mod attr;
mod reflect;

/// Implements `Reflect` for a given struct or enum.
#[proc_macro_derive(Reflect, attributes(reflect, serde))]
pub fn derive_reflect(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    reflect::derive(syn::parse_macro_input!(input as syn::DeriveInput))
        .unwrap_or_else(|err| err.into_compile_error())
        .into()
}
