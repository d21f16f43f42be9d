use syn::{meta::ParseNestedMeta, Attribute, Expr, ExprLit, Lit, LitStr, Meta, Result, Token};

/// `serde` `rename_all` rules, mapped to the variant names of `typed_rpc::schema::RenameRule`.
const RENAME_RULES: &[(&str, &str)] = &[
    ("lowercase", "LowerCase"),
    ("UPPERCASE", "UpperCase"),
    ("PascalCase", "PascalCase"),
    ("camelCase", "CamelCase"),
    ("snake_case", "SnakeCase"),
    ("SCREAMING_SNAKE_CASE", "ScreamingSnakeCase"),
    ("kebab-case", "KebabCase"),
    ("SCREAMING-KEBAB-CASE", "ScreamingKebabCase"),
];

#[derive(Default)]
pub struct ContainerAttr {
    pub rename: Option<String>,
    pub rename_all: Option<&'static str>,
    pub module: Option<String>,
    pub crate_name: Option<String>,
    pub transparent: bool,
    pub doc: Vec<String>,
}

impl ContainerAttr {
    pub fn from_attrs(attrs: &[Attribute]) -> Result<Self> {
        let mut out = Self {
            doc: docs(attrs),
            ..Default::default()
        };

        for attr in attrs {
            if attr.path().is_ident("reflect") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        out.rename = Some(string(&meta)?);
                    } else if meta.path.is_ident("module") {
                        out.module = Some(string(&meta)?);
                    } else if meta.path.is_ident("crate") {
                        out.crate_name = Some(string(&meta)?);
                    } else {
                        return Err(meta.error("typed-rpc: unsupported `reflect` attribute"));
                    }
                    Ok(())
                })?;
            } else if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        let rename = serialize_name(&meta)?;
                        out.rename = out.rename.take().or(rename);
                    } else if meta.path.is_ident("rename_all") {
                        let lit: LitStr = meta.value()?.parse()?;
                        let rule = RENAME_RULES
                            .iter()
                            .find(|(name, _)| *name == lit.value())
                            .map(|(_, variant)| *variant)
                            .ok_or_else(|| {
                                syn::Error::new_spanned(
                                    &lit,
                                    "typed-rpc: unsupported `rename_all` rule",
                                )
                            })?;
                        out.rename_all = Some(rule);
                    } else if meta.path.is_ident("transparent") {
                        out.transparent = true;
                    } else if meta.path.is_ident("tag")
                        || meta.path.is_ident("content")
                        || meta.path.is_ident("untagged")
                    {
                        return Err(meta.error(
                            "typed-rpc: only externally tagged enums can be exported",
                        ));
                    } else {
                        skip(&meta)?;
                    }
                    Ok(())
                })?;
            }
        }

        Ok(out)
    }
}

#[derive(Default)]
pub struct FieldAttr {
    pub rename: Option<String>,
    pub skip: bool,
}

impl FieldAttr {
    pub fn from_attrs(attrs: &[Attribute]) -> Result<Self> {
        let mut out = Self::default();

        for attr in attrs {
            if attr.path().is_ident("reflect") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        out.rename = Some(string(&meta)?);
                    } else if meta.path.is_ident("skip") {
                        out.skip = true;
                    } else {
                        return Err(meta.error("typed-rpc: unsupported `reflect` attribute"));
                    }
                    Ok(())
                })?;
            } else if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        let rename = serialize_name(&meta)?;
                        out.rename = out.rename.take().or(rename);
                    } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing")
                    {
                        out.skip = true;
                    } else if meta.path.is_ident("flatten") {
                        return Err(meta.error("typed-rpc: `flatten` is not supported"));
                    } else {
                        skip(&meta)?;
                    }
                    Ok(())
                })?;
            }
        }

        Ok(out)
    }
}

fn string(meta: &ParseNestedMeta) -> Result<String> {
    let lit: LitStr = meta.value()?.parse()?;
    Ok(lit.value())
}

/// Handles both `rename = "x"` and `rename(serialize = "x", deserialize = "y")`.
fn serialize_name(meta: &ParseNestedMeta) -> Result<Option<String>> {
    if meta.input.peek(Token![=]) {
        return string(meta).map(Some);
    }

    let mut name = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("serialize") {
            name = Some(string(&inner)?);
        } else {
            skip(&inner)?;
        }
        Ok(())
    })?;
    Ok(name)
}

/// Consume an attribute we don't care about, eg. `default` or `skip_serializing_if = "..."`.
fn skip(meta: &ParseNestedMeta) -> Result<()> {
    if meta.input.peek(Token![=]) {
        let _: Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip(&inner))?;
    }
    Ok(())
}

fn docs(attrs: &[Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) => Some(lit.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}
