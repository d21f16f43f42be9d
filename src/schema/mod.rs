//! The statically declared description of the types a service exposes.
//!
//! Every type crossing the wire implements [`Reflect`], which returns a [`TypeRef`]. Primitives and
//! containers are described inline. Composite types (structs, enums and newtypes) are described by a
//! [`NamedRef`] which only carries the type's [`Origin`] and a function producing its [`TypeDef`], so
//! self-referential types can be described without recursing forever.

use std::{borrow::Cow, cmp::Ordering, fmt};

mod casing;
mod reflect;

pub use casing::*;
pub use reflect::*;

/// The identity of a composite type before it has been given an exported name.
///
/// Module paths are stored with `/` as the separator so `my_crate::api::v1` and `my_crate/api/v1`
/// describe the same origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Origin {
    module_path: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl Origin {
    pub fn new(module_path: &str, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            module_path: normalize_module_path(module_path).into(),
            name: name.into(),
        }
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module_path.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.module_path, self.name)
        }
    }
}

/// Convert a Rust (`a::b`) or slash separated (`a/b`) module path into its canonical `a/b` form.
pub fn normalize_module_path(path: &str) -> String {
    path.split("::")
        .flat_map(|segment| segment.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Primitive {
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    bool,
    char,
    String,
    /// `()`, serialized as `null`.
    Unit,
    /// Any JSON value (`serde_json::Value`).
    Any,
}

impl Primitive {
    /// Integers which may not fit into a JavaScript number without losing precision.
    pub fn is_bigint(&self) -> bool {
        matches!(
            self,
            Self::i64 | Self::i128 | Self::isize | Self::u64 | Self::u128 | Self::usize
        )
    }
}

/// A reference to a type at the place it is used (a field, a container element, a method argument).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Primitive(Primitive),
    Named(NamedRef),
    Optional(Box<TypeRef>),
    List(Box<TypeRef>),
    Map(Box<(TypeRef, TypeRef)>),
    Tuple(Vec<TypeRef>),
    /// A host type that has no representation on the wire. Reaching one is a generation error.
    Unsupported(&'static str),
}

impl TypeRef {
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }
}

/// A Rust-like rendering, eg. `Option<Vec<User>>`.
impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(Primitive::Unit) => f.write_str("()"),
            Self::Primitive(Primitive::Any) => f.write_str("Value"),
            Self::Primitive(primitive) => write!(f, "{primitive:?}"),
            Self::Named(named) => f.write_str(named.origin.name()),
            Self::Optional(ty) => write!(f, "Option<{ty}>"),
            Self::List(ty) => write!(f, "Vec<{ty}>"),
            Self::Map(kv) => write!(f, "Map<{}, {}>", kv.0, kv.1),
            Self::Tuple(tys) => {
                f.write_str("(")?;
                for (i, ty) in tys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str(")")
            }
            Self::Unsupported(what) => f.write_str(what),
        }
    }
}

impl From<Primitive> for TypeRef {
    fn from(t: Primitive) -> Self {
        Self::Primitive(t)
    }
}

/// A reference to a composite type which must be declared on its own.
#[derive(Clone)]
pub struct NamedRef {
    pub origin: Origin,
    pub definition: fn() -> TypeDef,
}

impl NamedRef {
    pub fn new(origin: Origin, definition: fn() -> TypeDef) -> Self {
        Self { origin, definition }
    }

    pub fn definition(&self) -> TypeDef {
        (self.definition)()
    }
}

impl fmt::Debug for NamedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedRef").field(&self.origin).finish()
    }
}

impl PartialEq for NamedRef {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
    }
}

impl Eq for NamedRef {}

impl PartialOrd for NamedRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NamedRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.origin.cmp(&other.origin)
    }
}

/// The definition of a composite type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub origin: Origin,
    pub docs: Vec<Cow<'static, str>>,
    pub rename_all: Option<RenameRule>,
    pub kind: TypeKind,
}

impl TypeDef {
    pub fn new(origin: Origin, kind: TypeKind) -> Self {
        Self {
            origin,
            docs: Vec::new(),
            rename_all: None,
            kind,
        }
    }

    pub fn rename_all(mut self, rule: RenameRule) -> Self {
        self.rename_all = Some(rule);
        self
    }

    pub fn docs(mut self, docs: impl IntoIterator<Item = &'static str>) -> Self {
        self.docs = docs.into_iter().map(Cow::Borrowed).collect();
        self
    }

    /// Name of the field as it appears on the wire.
    pub fn field_name(&self, field: &Field) -> String {
        match (field.rename, self.rename_all) {
            (Some(rename), _) => rename.to_string(),
            (None, Some(rule)) => rule.apply_to_field(field.name),
            (None, None) => field.name.to_string(),
        }
    }

    /// Name of the variant as it appears on the wire.
    pub fn variant_name(&self, variant: &Variant) -> String {
        match (variant.rename, self.rename_all) {
            (Some(rename), _) => rename.to_string(),
            (None, Some(rule)) => rule.apply_to_variant(variant.name),
            (None, None) => variant.name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// A struct with named fields. Fields are kept in declaration order.
    Struct(Vec<Field>),
    /// An externally tagged enum.
    Enum(Vec<Variant>),
    /// A newtype which serializes as the type it wraps.
    Alias(TypeRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub ty: TypeRef,
    /// Explicit wire name, eg. from `#[serde(rename = "...")]`.
    pub rename: Option<&'static str>,
}

impl Field {
    pub fn new(name: &'static str, ty: TypeRef) -> Self {
        Self {
            name,
            ty,
            rename: None,
        }
    }

    pub fn rename(mut self, rename: &'static str) -> Self {
        self.rename = Some(rename);
        self
    }

    pub fn nullable(&self) -> bool {
        self.ty.is_optional()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: &'static str,
    pub rename: Option<&'static str>,
    pub payload: Option<TypeRef>,
}

impl Variant {
    pub fn unit(name: &'static str) -> Self {
        Self {
            name,
            rename: None,
            payload: None,
        }
    }

    pub fn with_payload(name: &'static str, payload: TypeRef) -> Self {
        Self {
            name,
            rename: None,
            payload: Some(payload),
        }
    }

    pub fn rename(mut self, rename: &'static str) -> Self {
        self.rename = Some(rename);
        self
    }
}
