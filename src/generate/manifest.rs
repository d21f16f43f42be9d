use std::collections::BTreeMap;

use serde::Serialize;

use crate::{HttpVerb, MethodKind};

use super::{GenerateConfig, RenderError, TypeGraph, TypeScript};

/// How a client reaches one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub service: String,
    pub method: String,
    pub kind: MethodKind,
    pub verb: HttpVerb,
    /// TypeScript type of the request, eg. `CreateUser` or `string[]`.
    pub request: String,
    pub response: String,
}

/// Every method keyed by `Service.Method`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn build(graph: &TypeGraph, ts: &TypeScript) -> Result<Self, RenderError> {
        let mut entries = BTreeMap::new();
        for method in graph.methods() {
            let key = method.key();
            let entry = ManifestEntry {
                service: method.service().into(),
                method: method.method().into(),
                kind: method.kind(),
                verb: method.verb(),
                request: ts.reference(method.request(), &format!("{key}.request"))?,
                response: ts.reference(method.response(), &format!("{key}.response"))?,
            };
            entries.insert(key, entry);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> + '_ {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self).map(|mut json| {
            json.push('\n');
            json
        })
    }

    /// Render `manifest.ts`.
    pub fn render(&self, config: &GenerateConfig) -> String {
        let mut out = super::preamble(config);
        out.push_str("\nexport const manifest = {\n");
        for (key, entry) in &self.entries {
            out.push_str(&format!(
                "  \"{key}\": {{ service: \"{}\", method: \"{}\", kind: \"{}\", verb: \"{}\", request: {}, response: {} }},\n",
                entry.service,
                entry.method,
                entry.kind,
                entry.verb,
                string_literal(&entry.request),
                string_literal(&entry.response),
            ));
        }
        out.push_str("} as const;\n\n");
        out.push_str("export type Manifest = typeof manifest;\n\n");
        out.push_str("export type MethodKey = keyof Manifest;\n");
        out
    }
}

fn string_literal(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
