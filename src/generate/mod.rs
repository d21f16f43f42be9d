//! Generate TypeScript bindings for a [`BuiltRouter`].
//!
//! Generation runs in stages: [`TypeGraph::extract`] collects every type reachable from the
//! registered methods, [`NameResolver`] gives each one a unique name, then [`TypeScript`],
//! [`Manifest`] and [`ClientEmitter`] render the files. Everything is rendered in memory first so a
//! failing run never leaves partial output behind.
//!
//! ```rust,no_run
//! use typed_rpc::{generate::GenerateConfig, Router};
//!
//! let router = Router::new()
//!     .unary("Greeter", "Hello", |name: String| async move { Ok(format!("Hello {name}")) })
//!     .unwrap()
//!     .build();
//!
//! typed_rpc::export(&router, &GenerateConfig::new("./web/src/rpc")).unwrap();
//! ```

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use crate::BuiltRouter;

mod client;
mod config;
mod extract;
mod manifest;
mod resolve;
mod typescript;

pub use client::ClientEmitter;
pub use config::*;
pub use extract::{ExtractError, TypeGraph};
pub use manifest::{Manifest, ManifestEntry};
pub use resolve::{CollisionError, NameResolver, ResolvedNames};
pub use typescript::{RenderError, TypeScript};

pub const TYPES_FILE: &str = "types.ts";
pub const MANIFEST_FILE: &str = "manifest.ts";
pub const MANIFEST_JSON_FILE: &str = "manifest.json";
pub const CLIENT_FILE: &str = "client.ts";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to extract types: {0}")]
    Extraction(#[from] ExtractError),
    #[error("Failed to name types: {0}")]
    Collision(#[from] CollisionError),
    #[error("Failed to render bindings: {0}")]
    Render(#[from] RenderError),
    #[error("Failed to serialize the manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("Failed to export bindings: {0}")]
    Export(#[from] ExportError),
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to write '{}': {source}", .path.display())]
pub struct ExportError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// The generated files, held in memory until [`Bindings::write`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    output_dir: PathBuf,
    files: BTreeMap<&'static str, String>,
}

impl Bindings {
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Contents of a generated file, eg. `bindings.get("types.ts")`.
    pub fn get(&self, file: &str) -> Option<&str> {
        self.files.get(file).map(String::as_str)
    }

    /// Every generated file name with its contents, ordered by name.
    pub fn files(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.files.iter().map(|(name, contents)| (*name, contents.as_str()))
    }

    /// Write every file into the output directory, creating it if needed.
    pub fn write(&self) -> Result<(), ExportError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| ExportError {
            path: self.output_dir.clone(),
            source,
        })?;

        for (name, contents) in &self.files {
            let path = self.output_dir.join(name);
            fs::write(&path, contents).map_err(|source| ExportError {
                path: path.clone(),
                source,
            })?;

            #[cfg(feature = "tracing")]
            tracing::debug!("wrote bindings to '{}'", path.display());
        }

        Ok(())
    }
}

/// Generate every file in memory. Nothing is written.
pub fn generate(router: &BuiltRouter, config: &GenerateConfig) -> Result<Bindings, GenerateError> {
    config.validate()?;

    let graph = TypeGraph::extract(router)?;
    let names = NameResolver::new(config.strip_prefix.as_deref()).resolve(&graph)?;

    #[cfg(feature = "tracing")]
    tracing::debug!("resolved the names of {} types", names.len());

    let ts = TypeScript::new(config, &names);
    let mut files = BTreeMap::new();
    files.insert(TYPES_FILE, ts.render(&graph)?);

    let manifest = Manifest::build(&graph, &ts)?;
    if config.discovery {
        files.insert(MANIFEST_FILE, manifest.render(config));
        files.insert(MANIFEST_JSON_FILE, manifest.to_json()?);
    }

    if config.client {
        files.insert(
            CLIENT_FILE,
            ClientEmitter::new(config, &names).render(&graph, &manifest)?,
        );
    }

    Ok(Bindings {
        output_dir: config.output_dir.clone(),
        files,
    })
}

/// [`generate`] the bindings and write them into [`GenerateConfig::output_dir`].
pub fn export(router: &BuiltRouter, config: &GenerateConfig) -> Result<Bindings, GenerateError> {
    let bindings = generate(router, config)?;
    bindings.write()?;
    Ok(bindings)
}

/// The lines every generated TypeScript file starts with.
fn preamble(config: &GenerateConfig) -> String {
    let mut out = String::new();
    if !config.header.is_empty() {
        out.push_str(&config.header);
        if !config.header.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str("// This file was generated by typed-rpc. Do not edit this file manually.\n");
    out
}
