use std::collections::{BTreeMap, VecDeque};

use crate::{
    schema::{NamedRef, Origin, TypeDef, TypeKind, TypeRef},
    BuiltRouter, MethodDescriptor,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("Type at '{path}' can't be exported: {what} has no representation on the wire")]
    Unsupported { path: String, what: &'static str },
    #[error("Type at '{path}' declares itself as '{declared}' but was referenced as '{referenced}'")]
    OriginMismatch {
        path: String,
        declared: Origin,
        referenced: Origin,
    },
    #[error("Two different types are declared as '{origin}', at '{first_path}' and '{second_path}'. Rename one of them with `#[reflect(rename = \"...\")]` or move it to its own module")]
    ConflictingDefinitions {
        origin: Origin,
        first_path: String,
        second_path: String,
    },
}

/// Every composite type reachable from the methods of a router.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    methods: Vec<MethodDescriptor>,
    nodes: BTreeMap<Origin, TypeDef>,
}

impl TypeGraph {
    /// Walk the request and response types of every method, breadth first.
    ///
    /// Each composite type is expanded once, no matter how many places reference it, which is
    /// what makes self-referential and mutually recursive types terminate.
    pub fn extract(router: &BuiltRouter) -> Result<Self, ExtractError> {
        let methods = router.methods().cloned().collect::<Vec<_>>();

        let mut walk = Walk::default();
        for method in &methods {
            let key = method.key();
            walk.discover(method.request(), format!("{key}.request"))?;
            walk.discover(method.response(), format!("{key}.response"))?;
        }

        while let Some(origin) = walk.queue.pop_front() {
            let Some((def, path)) = walk.seen.get(&origin).cloned() else {
                continue;
            };

            match &def.kind {
                TypeKind::Struct(fields) => {
                    for field in fields {
                        walk.discover(&field.ty, format!("{path}.{}", field.name))?;
                    }
                }
                TypeKind::Enum(variants) => {
                    for variant in variants {
                        if let Some(payload) = &variant.payload {
                            walk.discover(payload, format!("{path}::{}", variant.name))?;
                        }
                    }
                }
                TypeKind::Alias(ty) => walk.discover(ty, path)?,
            }
        }

        let nodes = walk
            .seen
            .into_iter()
            .map(|(origin, (def, _))| (origin, def))
            .collect::<BTreeMap<_, _>>();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "extracted {} types from {} methods",
            nodes.len(),
            methods.len()
        );

        Ok(Self { methods, nodes })
    }

    /// Methods in key order.
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Types in origin order.
    pub fn nodes(&self) -> impl Iterator<Item = &TypeDef> + '_ {
        self.nodes.values()
    }

    pub fn get(&self, origin: &Origin) -> Option<&TypeDef> {
        self.nodes.get(origin)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Default)]
struct Walk {
    /// The first definition found for each origin and the path it was found at.
    seen: BTreeMap<Origin, (TypeDef, String)>,
    queue: VecDeque<Origin>,
}

impl Walk {
    /// Queue the composite types used by `ty`. Inline types are walked immediately.
    ///
    /// Every reference to an already seen origin is checked against its first definition, so two
    /// distinct types sharing an origin are reported instead of one silently replacing the other.
    fn discover(&mut self, ty: &TypeRef, path: String) -> Result<(), ExtractError> {
        match ty {
            TypeRef::Primitive(_) => {}
            TypeRef::Named(named) => self.named(named, path)?,
            TypeRef::Optional(ty) => self.discover(ty, path)?,
            TypeRef::List(ty) => self.discover(ty, format!("{path}[]"))?,
            TypeRef::Map(kv) => {
                self.discover(&kv.0, format!("{path}{{key}}"))?;
                self.discover(&kv.1, format!("{path}{{value}}"))?;
            }
            TypeRef::Tuple(tys) => {
                for (i, ty) in tys.iter().enumerate() {
                    self.discover(ty, format!("{path}.{i}"))?;
                }
            }
            TypeRef::Unsupported(what) => {
                return Err(ExtractError::Unsupported { path, what: *what });
            }
        }

        Ok(())
    }

    fn named(&mut self, named: &NamedRef, path: String) -> Result<(), ExtractError> {
        // `NamedRef` compares by origin, so comparing two definitions never recurses.
        let def = named.definition();
        if def.origin != named.origin {
            return Err(ExtractError::OriginMismatch {
                path,
                declared: def.origin,
                referenced: named.origin.clone(),
            });
        }

        match self.seen.get(&named.origin) {
            Some((first, _)) if *first == def => Ok(()),
            Some((_, first_path)) => Err(ExtractError::ConflictingDefinitions {
                origin: named.origin.clone(),
                first_path: first_path.clone(),
                second_path: path,
            }),
            None => {
                self.seen.insert(named.origin.clone(), (def, path));
                self.queue.push_back(named.origin.clone());
                Ok(())
            }
        }
    }
}
