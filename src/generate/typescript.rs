use crate::schema::{Field, Origin, Primitive, TypeDef, TypeKind, TypeRef, Variant};

use super::{
    BigIntBehavior, EnumStyle, GenerateConfig, OptionalStyle, ResolvedNames, TypeGraph,
    Validation,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Type at '{path}' is a {ty} which your configuration forbids exporting. Change `GenerateConfig::bigint` to export it")]
    BigIntForbidden { path: String, ty: String },
    #[error("Type '{0}' is used but was never extracted")]
    Unresolved(Origin),
    #[error("Type at '{path}' can't be exported: {what} has no representation on the wire")]
    Unsupported { path: String, what: &'static str },
}

/// Renders resolved types as TypeScript declarations and, optionally, zod schemas.
#[derive(Debug, Clone, Copy)]
pub struct TypeScript<'a> {
    config: &'a GenerateConfig,
    names: &'a ResolvedNames,
    namespace: Option<&'a str>,
}

impl<'a> TypeScript<'a> {
    pub fn new(config: &'a GenerateConfig, names: &'a ResolvedNames) -> Self {
        Self {
            config,
            names,
            namespace: None,
        }
    }

    /// Qualify every type reference, eg. `t.User` when the types are imported as `t`.
    pub fn namespace(self, namespace: &'a str) -> Self {
        Self {
            namespace: Some(namespace),
            ..self
        }
    }

    /// Render `types.ts`. Declarations are ordered by their exported name.
    pub fn render(&self, graph: &TypeGraph) -> Result<String, RenderError> {
        let mut defs = graph
            .nodes()
            .map(|def| Ok((self.resolved(&def.origin)?, def)))
            .collect::<Result<Vec<_>, RenderError>>()?;
        defs.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = super::preamble(self.config);
        if self.config.validation == Validation::Zod {
            out.push_str("import { z } from \"zod\";\n");
        }

        for (name, def) in &defs {
            out.push('\n');
            out.push_str(&self.declaration(name, def)?);
            out.push('\n');
        }

        if self.config.validation == Validation::Zod {
            for (name, def) in &defs {
                out.push('\n');
                out.push_str(&self.zod_declaration(name, def)?);
                out.push('\n');
            }
        }

        Ok(out)
    }

    /// Declare a single type, eg. `export type User = { id: string };`
    pub fn declaration(&self, name: &str, def: &TypeDef) -> Result<String, RenderError> {
        let path = def.origin.to_string();
        let body = match &def.kind {
            TypeKind::Enum(variants)
                if self.config.enum_style == EnumStyle::Native
                    && !variants.is_empty()
                    && variants.iter().all(|v| v.payload.is_none()) =>
            {
                let members = variants
                    .iter()
                    .map(|v| format!("{} = \"{}\"", v.name, def.variant_name(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("export enum {name} {{ {members} }}")
            }
            _ => format!("export type {name} = {};", self.definition(def, &path)?),
        };

        Ok(format!("{}{body}", comments(&def.docs)))
    }

    /// The right hand side of a type's declaration.
    pub fn definition(&self, def: &TypeDef, path: &str) -> Result<String, RenderError> {
        Ok(match &def.kind {
            TypeKind::Struct(fields) if fields.is_empty() => "{ [key: string]: never }".into(),
            TypeKind::Struct(fields) => {
                let fields = fields
                    .iter()
                    .map(|field| self.field(def, field, path))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("{{ {} }}", fields.join("; "))
            }
            TypeKind::Enum(variants) if variants.is_empty() => "never".into(),
            TypeKind::Enum(variants) => variants
                .iter()
                .map(|variant| self.variant(def, variant, path))
                .collect::<Result<Vec<_>, _>>()?
                .join(" | "),
            TypeKind::Alias(ty) => self.reference(ty, path)?,
        })
    }

    fn field(&self, def: &TypeDef, field: &Field, path: &str) -> Result<String, RenderError> {
        let key = property_key(&def.field_name(field));
        let path = format!("{path}.{}", field.name);
        Ok(match (&field.ty, self.config.optional_style) {
            // Still nullable, serde writes `null` unless the field is skipped.
            (ty @ TypeRef::Optional(_), OptionalStyle::Absent) => {
                format!("{key}?: {}", self.reference(ty, &path)?)
            }
            (ty, _) => format!("{key}: {}", self.reference(ty, &path)?),
        })
    }

    fn variant(&self, def: &TypeDef, variant: &Variant, path: &str) -> Result<String, RenderError> {
        let name = def.variant_name(variant);
        Ok(match &variant.payload {
            None => format!("\"{name}\""),
            Some(ty) => {
                let path = format!("{path}::{}", variant.name);
                format!("{{ {}: {} }}", property_key(&name), self.reference(ty, &path)?)
            }
        })
    }

    /// The type expression used wherever `ty` is referenced.
    pub fn reference(&self, ty: &TypeRef, path: &str) -> Result<String, RenderError> {
        Ok(match ty {
            TypeRef::Primitive(primitive) => self.primitive(*primitive, path)?.into(),
            TypeRef::Named(named) => self.name(&named.origin)?,
            TypeRef::Optional(ty) => format!("{} | null", self.reference(ty, path)?),
            // `T[]` instead of `Array<T>` so recursive types stay valid.
            TypeRef::List(ty) => match self.reference(ty, &format!("{path}[]"))? {
                ty if ty.contains(' ') => format!("({ty})[]"),
                ty => format!("{ty}[]"),
            },
            TypeRef::Map(kv) => {
                let value = self.reference(&kv.1, &format!("{path}{{value}}"))?;
                match &kv.0 {
                    TypeRef::Named(named) => {
                        format!("{{ [key in {}]?: {value} }}", self.name(&named.origin)?)
                    }
                    TypeRef::Primitive(primitive) => match self.primitive(*primitive, path)? {
                        "number" => format!("{{ [key: number]: {value} }}"),
                        _ => format!("{{ [key: string]: {value} }}"),
                    },
                    _ => format!("{{ [key: string]: {value} }}"),
                }
            }
            TypeRef::Tuple(tys) => format!(
                "[{}]",
                tys.iter()
                    .enumerate()
                    .map(|(i, ty)| self.reference(ty, &format!("{path}.{i}")))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ")
            ),
            TypeRef::Unsupported(what) => {
                return Err(RenderError::Unsupported {
                    path: path.into(),
                    what: *what,
                })
            }
        })
    }

    fn primitive(&self, primitive: Primitive, path: &str) -> Result<&'static str, RenderError> {
        Ok(match primitive {
            Primitive::i64
            | Primitive::i128
            | Primitive::isize
            | Primitive::u64
            | Primitive::u128
            | Primitive::usize => match self.config.bigint {
                BigIntBehavior::Number => "number",
                BigIntBehavior::String => "string",
                BigIntBehavior::BigInt => "bigint",
                BigIntBehavior::Fail => {
                    return Err(RenderError::BigIntForbidden {
                        path: path.into(),
                        ty: format!("{primitive:?}"),
                    })
                }
            },
            Primitive::i8
            | Primitive::i16
            | Primitive::i32
            | Primitive::u8
            | Primitive::u16
            | Primitive::u32
            | Primitive::f32
            | Primitive::f64 => "number",
            Primitive::bool => "boolean",
            Primitive::char | Primitive::String => "string",
            Primitive::Unit => "null",
            Primitive::Any => "any",
        })
    }

    /// Declare the zod schema of a type, eg. `export const UserSchema: z.ZodType<User> = ...;`
    pub fn zod_declaration(&self, name: &str, def: &TypeDef) -> Result<String, RenderError> {
        let path = def.origin.to_string();
        let schema = match &def.kind {
            TypeKind::Struct(fields) => {
                let fields = fields
                    .iter()
                    .map(|field| {
                        let path = format!("{path}.{}", field.name);
                        let value = match (&field.ty, self.config.optional_style) {
                            (TypeRef::Optional(ty), OptionalStyle::Absent) => {
                                format!("{}.nullish()", self.zod(ty, &path)?)
                            }
                            (ty, _) => self.zod(ty, &path)?,
                        };
                        Ok(format!("{}: {value}", property_key(&def.field_name(field))))
                    })
                    .collect::<Result<Vec<_>, RenderError>>()?;
                format!("z.object({{ {} }})", fields.join(", "))
            }
            TypeKind::Enum(variants) if variants.is_empty() => "z.never()".into(),
            TypeKind::Enum(variants) if variants.iter().all(|v| v.payload.is_none()) => {
                match self.config.enum_style {
                    EnumStyle::Native => format!("z.nativeEnum({name})"),
                    EnumStyle::Union => format!(
                        "z.enum([{}])",
                        variants
                            .iter()
                            .map(|v| format!("\"{}\"", def.variant_name(v)))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                }
            }
            TypeKind::Enum(variants) => {
                let variants = variants
                    .iter()
                    .map(|variant| {
                        let wire = def.variant_name(variant);
                        Ok(match &variant.payload {
                            None => format!("z.literal(\"{wire}\")"),
                            Some(ty) => format!(
                                "z.object({{ {}: {} }})",
                                property_key(&wire),
                                self.zod(ty, &format!("{path}::{}", variant.name))?
                            ),
                        })
                    })
                    .collect::<Result<Vec<_>, RenderError>>()?;
                match &variants[..] {
                    [variant] => variant.clone(),
                    variants => format!("z.union([{}])", variants.join(", ")),
                }
            }
            TypeKind::Alias(ty) => self.zod(ty, &path)?,
        };

        // `z.lazy` lets schemas reference each other regardless of declaration order.
        Ok(format!(
            "export const {name}Schema: z.ZodType<{name}> = z.lazy(() => {schema});"
        ))
    }

    /// The zod schema expression validating `ty`.
    pub fn zod(&self, ty: &TypeRef, path: &str) -> Result<String, RenderError> {
        Ok(match ty {
            TypeRef::Primitive(primitive) => match (primitive, self.primitive(*primitive, path)?) {
                (Primitive::Unit, _) => "z.null()".into(),
                (Primitive::Any, _) => "z.any()".into(),
                (_, ty) => format!("z.{ty}()"),
            },
            TypeRef::Named(named) => format!("{}Schema", self.name(&named.origin)?),
            TypeRef::Optional(ty) => format!("{}.nullable()", self.zod(ty, path)?),
            TypeRef::List(ty) => format!("z.array({})", self.zod(ty, &format!("{path}[]"))?),
            TypeRef::Map(kv) => format!(
                "z.record(z.string(), {})",
                self.zod(&kv.1, &format!("{path}{{value}}"))?
            ),
            TypeRef::Tuple(tys) => format!(
                "z.tuple([{}])",
                tys.iter()
                    .enumerate()
                    .map(|(i, ty)| self.zod(ty, &format!("{path}.{i}")))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ")
            ),
            TypeRef::Unsupported(what) => {
                return Err(RenderError::Unsupported {
                    path: path.into(),
                    what: *what,
                })
            }
        })
    }

    fn resolved(&self, origin: &Origin) -> Result<&'a str, RenderError> {
        self.names
            .get(origin)
            .ok_or_else(|| RenderError::Unresolved(origin.clone()))
    }

    fn name(&self, origin: &Origin) -> Result<String, RenderError> {
        let name = self.resolved(origin)?;
        Ok(match self.namespace {
            Some(namespace) => format!("{namespace}.{name}"),
            None => name.to_string(),
        })
    }
}

fn comments(docs: &[std::borrow::Cow<'static, str>]) -> String {
    if docs.is_empty() {
        return String::new();
    }

    let mut result = "/**\n".to_owned();
    for line in docs {
        match line.trim_end() {
            "" => result.push_str(" *\n"),
            line => result.push_str(&format!(" * {}\n", line.replace("*/", "*\\/"))),
        }
    }
    result.push_str(" */\n");
    result
}

/// Quote a property key unless it's a valid identifier.
pub(crate) fn property_key(value: &str) -> String {
    let valid = value
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && value
            .chars()
            .next()
            .map(|first| !first.is_numeric())
            .unwrap_or(false);
    if valid {
        value.to_string()
    } else {
        format!("\"{value}\"")
    }
}
