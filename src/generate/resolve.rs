use std::collections::{btree_map::Entry, BTreeMap};

use crate::schema::{normalize_module_path, Origin};

use super::TypeGraph;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Types '{first}' and '{second}' would both be exported as '{name}'. Rename one of them with `#[reflect(rename = \"...\")]` or change the strip prefix")]
pub struct CollisionError {
    pub name: String,
    pub first: Origin,
    pub second: Origin,
}

/// Assigns every type of a [`TypeGraph`] a unique exported name.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    strip_prefix: Option<String>,
}

impl NameResolver {
    pub fn new(strip_prefix: Option<&str>) -> Self {
        Self {
            strip_prefix: strip_prefix.map(normalize_module_path),
        }
    }

    /// The exported name of a type, before checking it's unique.
    ///
    /// - A type declared in the strip prefix itself keeps its name.
    /// - A type declared below the strip prefix is prefixed by the rest of its module path.
    /// - Any other type is prefixed by its full module path.
    pub fn candidate(&self, origin: &Origin) -> String {
        let path = origin.module_path();
        let qualifier = match self.strip_prefix.as_deref() {
            Some(prefix) if path == prefix => "",
            Some(prefix) => path
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(path),
            None => path,
        };

        if qualifier.is_empty() {
            sanitize(origin.name())
        } else {
            format!("{}_{}", sanitize(qualifier), sanitize(origin.name()))
        }
    }

    /// Name every type of the graph. Fails if two types end up with the same name.
    pub fn resolve(&self, graph: &TypeGraph) -> Result<ResolvedNames, CollisionError> {
        let mut taken = BTreeMap::<String, &Origin>::new();
        let mut names = BTreeMap::new();

        // The graph iterates in origin order, so the same pair is always reported.
        for def in graph.nodes() {
            let name = self.candidate(&def.origin);
            match taken.entry(name.clone()) {
                Entry::Occupied(entry) => {
                    return Err(CollisionError {
                        name,
                        first: (*entry.get()).clone(),
                        second: def.origin.clone(),
                    })
                }
                Entry::Vacant(entry) => {
                    entry.insert(&def.origin);
                }
            }

            #[cfg(feature = "tracing")]
            tracing::trace!("resolved '{}' as '{name}'", def.origin);

            names.insert(def.origin.clone(), name);
        }

        Ok(ResolvedNames { names })
    }
}

/// Replace everything which can't appear in a TypeScript identifier with `_`.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// The exported name of every type of a [`TypeGraph`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedNames {
    names: BTreeMap<Origin, String>,
}

impl ResolvedNames {
    pub fn get(&self, origin: &Origin) -> Option<&str> {
        self.names.get(origin).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Origin, &str)> + '_ {
        self.names.iter().map(|(origin, name)| (origin, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
