use std::path::PathBuf;

use serde::Deserialize;

/// How enums whose variants carry no data are declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnumStyle {
    /// `export type Role = "admin" | "member";`
    #[default]
    Union,
    /// `export enum Role { Admin = "admin", Member = "member" }`
    ///
    /// Enums with data carrying variants are always declared as a union.
    Native,
}

/// How `Option<T>` fields are declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionalStyle {
    /// `name?: T | null`, accepting both an omitted key and an explicit `null`, so it holds with or
    /// without `#[serde(skip_serializing_if = "Option::is_none")]`.
    Absent,
    /// `name: T | null`, which is what serde produces for `None` by default.
    #[default]
    NullUnion,
}

/// Runtime validators declared next to the types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Validation {
    #[default]
    None,
    /// A [zod](https://zod.dev) schema named `<Type>Schema` for every type.
    Zod,
}

/// How integers that may not fit into a JavaScript number (i64, u64, i128, u128, isize, usize) are exported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BigIntBehavior {
    /// Export them as `number`. `serde_json` encodes them as numbers, but `JSON.parse` loses
    /// precision above 2^53.
    #[default]
    Number,
    /// Export them as `string`. Make sure the values are serialized as strings.
    String,
    /// Export them as `bigint`. Make sure the client decodes them that way.
    BigInt,
    /// Refuse to export them.
    Fail,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The output directory can't be empty")]
    EmptyOutputDir,
    #[error("The strip prefix can't be empty, leave it unset to qualify every type with its full module path")]
    EmptyStripPrefix,
    #[error("The strip prefix '{0}' can't end with a module separator")]
    TrailingSeparator(String),
    #[error("The client can't be emitted without the manifest, enable discovery or disable the client")]
    ClientRequiresDiscovery,
    #[error("Failed to parse the configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configures where and how bindings are generated.
///
/// Every field has a default so a configuration file only needs the options it changes:
///
/// ```rust
/// use typed_rpc::generate::{GenerateConfig, Validation};
///
/// let config = GenerateConfig::from_json(r#"{ "outputDir": "./web/src/rpc", "validation": "zod" }"#).unwrap();
/// assert_eq!(config.validation, Validation::Zod);
/// assert!(config.discovery);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GenerateConfig {
    /// Directory the files are written into. Defaults to `./bindings`.
    pub output_dir: PathBuf,
    /// Module path removed from the front of every type's origin before it's named.
    ///
    /// Types declared directly in this module keep their name, types in submodules are prefixed by
    /// the rest of their path (`v1_User`) and every other type is prefixed by its full path.
    pub strip_prefix: Option<String>,
    pub enum_style: EnumStyle,
    pub optional_style: OptionalStyle,
    pub validation: Validation,
    /// Emit `manifest.ts` and `manifest.json`. Defaults to `true`.
    pub discovery: bool,
    /// Emit `client.ts`. Requires `discovery`. Defaults to `true`.
    pub client: bool,
    pub bigint: BigIntBehavior,
    /// Prepended to every generated TypeScript file, eg. `// @ts-nocheck`.
    pub header: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./bindings"),
            strip_prefix: None,
            enum_style: EnumStyle::default(),
            optional_style: OptionalStyle::default(),
            validation: Validation::default(),
            discovery: true,
            client: true,
            bigint: BigIntBehavior::default(),
            header: String::new(),
        }
    }
}

impl GenerateConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Module path, using either `::` or `/`, stripped from type origins.
    pub fn strip_prefix(self, prefix: impl Into<String>) -> Self {
        Self {
            strip_prefix: Some(prefix.into()),
            ..self
        }
    }

    pub fn enum_style(self, enum_style: EnumStyle) -> Self {
        Self { enum_style, ..self }
    }

    pub fn optional_style(self, optional_style: OptionalStyle) -> Self {
        Self {
            optional_style,
            ..self
        }
    }

    pub fn validation(self, validation: Validation) -> Self {
        Self { validation, ..self }
    }

    pub fn discovery(self, discovery: bool) -> Self {
        Self { discovery, ..self }
    }

    pub fn client(self, client: bool) -> Self {
        Self { client, ..self }
    }

    pub fn bigint(self, bigint: BigIntBehavior) -> Self {
        Self { bigint, ..self }
    }

    pub fn header(self, header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..self
        }
    }

    /// Check the options can be used together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }

        if let Some(prefix) = &self.strip_prefix {
            if prefix.is_empty() {
                return Err(ConfigError::EmptyStripPrefix);
            }
            if prefix.ends_with('/') || prefix.ends_with("::") {
                return Err(ConfigError::TrailingSeparator(prefix.clone()));
            }
        }

        if self.client && !self.discovery {
            return Err(ConfigError::ClientRequiresDiscovery);
        }

        Ok(())
    }
}
