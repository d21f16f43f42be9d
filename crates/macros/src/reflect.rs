use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{Data, DataEnum, DataStruct, DeriveInput, Fields, Result};

use crate::attr::{ContainerAttr, FieldAttr};

pub fn derive(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput {
        ident,
        generics,
        data,
        attrs,
        ..
    } = &input;

    if !generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            generics,
            "typed-rpc: generic types can't be exported, declare a concrete type instead",
        ));
    }

    let container = ContainerAttr::from_attrs(attrs)?;

    let crate_name = format_ident!(
        "{}",
        container.crate_name.as_deref().unwrap_or("typed_rpc")
    );
    let crate_ref = quote!(::#crate_name);
    let schema = quote!(#crate_ref::schema);

    let name = container
        .rename
        .clone()
        .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
    let module = match &container.module {
        Some(module) => quote!(#module),
        None => quote!(::std::module_path!()),
    };

    let kind = match data {
        Data::Struct(data) => parse_struct(&container, &schema, data)?,
        Data::Enum(data) => parse_enum(&schema, data)?,
        Data::Union(_) => {
            return Err(syn::Error::new(
                Span::call_site(),
                "typed-rpc: unions can't be exported",
            ))
        }
    };

    let rename_all = container.rename_all.map(|rule| {
        let rule = format_ident!("{}", rule);
        quote!(.rename_all(#schema::RenameRule::#rule))
    });
    let docs = (!container.doc.is_empty()).then(|| {
        let docs = &container.doc;
        quote!(.docs([#(#docs),*]))
    });

    Ok(quote! {
        #[automatically_derived]
        impl #crate_ref::Reflect for #ident {
            fn reflect() -> #schema::TypeRef {
                #schema::TypeRef::Named(#schema::NamedRef::new(
                    #schema::Origin::new(#module, #name),
                    || {
                        #schema::TypeDef::new(#schema::Origin::new(#module, #name), #kind)
                            #rename_all
                            #docs
                    },
                ))
            }
        }
    })
}

fn parse_struct(
    container: &ContainerAttr,
    schema: &TokenStream,
    data: &DataStruct,
) -> Result<TokenStream> {
    Ok(match &data.fields {
        Fields::Named(named) if !container.transparent => {
            let mut fields = Vec::new();
            for field in &named.named {
                let attrs = FieldAttr::from_attrs(&field.attrs)?;
                if attrs.skip {
                    continue;
                }

                let ty = &field.ty;
                let name = field
                    .ident
                    .as_ref()
                    .map(|ident| ident.to_string().trim_start_matches("r#").to_string())
                    .unwrap_or_default();
                let rename = attrs.rename.map(|rename| quote!(.rename(#rename)));

                fields.push(quote! {
                    #schema::Field::new(#name, <#ty as #schema::Reflect>::reflect()) #rename
                });
            }

            quote!(#schema::TypeKind::Struct(::std::vec![#(#fields),*]))
        }
        Fields::Named(named) => {
            let inner = transparent_field(named.named.iter())?;
            quote!(#schema::TypeKind::Alias(<#inner as #schema::Reflect>::reflect()))
        }
        Fields::Unnamed(unnamed) => {
            let mut fields = Vec::new();
            for field in &unnamed.unnamed {
                if !FieldAttr::from_attrs(&field.attrs)?.skip {
                    fields.push(&field.ty);
                }
            }

            match &fields[..] {
                [ty] => quote!(#schema::TypeKind::Alias(<#ty as #schema::Reflect>::reflect())),
                tys => quote!(#schema::TypeKind::Alias(#schema::TypeRef::Tuple(
                    ::std::vec![#(<#tys as #schema::Reflect>::reflect()),*]
                ))),
            }
        }
        Fields::Unit => {
            quote!(#schema::TypeKind::Alias(#schema::TypeRef::Primitive(#schema::Primitive::Unit)))
        }
    })
}

fn transparent_field<'a>(mut fields: impl Iterator<Item = &'a syn::Field>) -> Result<&'a syn::Type> {
    match (fields.next(), fields.next()) {
        (Some(field), None) => Ok(&field.ty),
        _ => Err(syn::Error::new(
            Span::call_site(),
            "typed-rpc: `#[serde(transparent)]` requires exactly one field",
        )),
    }
}

fn parse_enum(schema: &TokenStream, data: &DataEnum) -> Result<TokenStream> {
    let mut variants = Vec::new();
    for variant in &data.variants {
        let attrs = FieldAttr::from_attrs(&variant.attrs)?;
        if attrs.skip {
            continue;
        }

        let name = variant.ident.to_string().trim_start_matches("r#").to_string();
        let rename = attrs.rename.map(|rename| quote!(.rename(#rename)));

        let variant = match &variant.fields {
            Fields::Unit => quote!(#schema::Variant::unit(#name)),
            Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                let ty = &unnamed.unnamed[0].ty;
                quote!(#schema::Variant::with_payload(#name, <#ty as #schema::Reflect>::reflect()))
            }
            Fields::Unnamed(unnamed) => {
                let tys = unnamed.unnamed.iter().map(|field| &field.ty);
                quote!(#schema::Variant::with_payload(
                    #name,
                    #schema::TypeRef::Tuple(::std::vec![#(<#tys as #schema::Reflect>::reflect()),*])
                ))
            }
            Fields::Named(_) => {
                return Err(syn::Error::new_spanned(
                    &variant.ident,
                    "typed-rpc: struct variants can't be exported, move the fields into a named struct",
                ))
            }
        };

        variants.push(quote!(#variant #rename));
    }

    Ok(quote!(#schema::TypeKind::Enum(::std::vec![#(#variants),*])))
}
