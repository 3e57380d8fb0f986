//! Generator configuration.
//!
//! Every field has a convention default, so an empty JSON object (or no
//! file at all) configures the nng binding. Rules are written as data and
//! compiled into a [`RuleRegistry`] in file order.
//!
//! ```json
//! {
//!   "source": "ext/nng/include",
//!   "rules": [
//!     { "kind": "function", "match": { "exact": "nng_aio_alloc" }, "action": "discard" },
//!     { "kind": "constant", "match": { "pattern": "NNG_OPT_.*" }, "action": { "retype_as": "char*" } }
//!   ]
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rebind_header::{parse_type_name, HeaderOptions};
use rebind_ir::model::{DeclKind, MarshalDirection};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::{Action, MarshalSlot, Matcher, RuleError, RuleRegistry};
use crate::transform::TransformOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rule #{index}: `{ty}` is not a C type name")]
    InvalidType { index: usize, ty: String },

    #[error("rule #{index}: {source}")]
    Rule { index: usize, source: RuleError },

    #[error("invalid define `{0}`: expected NAME or NAME=VALUE")]
    InvalidDefine(String),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindSpec {
    Function,
    Struct,
    Enum,
    Constant,
    TypeAlias,
}

impl From<KindSpec> for DeclKind {
    fn from(kind: KindSpec) -> Self {
        match kind {
            KindSpec::Function => DeclKind::Function,
            KindSpec::Struct => DeclKind::Struct,
            KindSpec::Enum => DeclKind::Enum,
            KindSpec::Constant => DeclKind::Constant,
            KindSpec::TypeAlias => DeclKind::TypeAlias,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherSpec {
    Exact(String),
    /// Whole-name regular expression.
    Pattern(String),
    Prefix(String),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionSpec {
    ToNative,
    FromNative,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSpec {
    Discard,
    /// A C type name such as `int` or `const char*`.
    RetypeAs(String),
    OverrideMarshal {
        /// `return` or a parameter name.
        slot: String,
        direction: DirectionSpec,
    },
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub kind: KindSpec,
    #[serde(rename = "match")]
    pub matcher: MatcherSpec,
    pub action: ActionSpec,
}

impl RuleSpec {
    fn new(kind: KindSpec, matcher: MatcherSpec, action: ActionSpec) -> Self {
        RuleSpec {
            kind,
            matcher,
            action,
        }
    }
}

/// The rules the nng binding has always been generated with.
pub fn nng_preset() -> Vec<RuleSpec> {
    let discard = |name: &str| {
        RuleSpec::new(
            KindSpec::Function,
            MatcherSpec::Exact(name.to_string()),
            ActionSpec::Discard,
        )
    };
    let retype = |pattern: &str, ty: &str| {
        RuleSpec::new(
            KindSpec::Constant,
            MatcherSpec::Pattern(pattern.to_string()),
            ActionSpec::RetypeAs(ty.to_string()),
        )
    };
    vec![
        discard("nng_aio_alloc"),
        discard("nng_http_handler_alloc"),
        discard("nng_http_handler_set_data"),
        discard("nng_thread_create"),
        retype("NNG_DURATION_.*", "int"),
        retype("NNG_FLAG_.*", "int"),
        retype("NNG_OPT_.*", "char*"),
    ]
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Header root, relative to the working directory.
    pub source: PathBuf,
    /// Output root, relative to the working directory.
    pub dest: PathBuf,
    pub output_file: String,
    /// Native library to link.
    pub library: String,
    /// Name of the wrapper scope.
    pub module: String,
    /// `NAME` or `NAME=VALUE`.
    pub defines: Vec<String>,
    /// Headers whose relative path contains any of these are skipped.
    pub exclude: Vec<String>,
    pub value_equality_suffix: String,
    pub rules: Vec<RuleSpec>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            source: PathBuf::from("ext/nng/include"),
            dest: PathBuf::from("nng-sys/src"),
            output_file: "nng_generated.rs".to_string(),
            library: "nng".to_string(),
            module: "nng".to_string(),
            defines: vec!["NNG_SHARED_LIB".to_string(), "NNG_ELIDE_DEPRECATED".to_string()],
            exclude: vec!["compat".to_string(), "supplemental".to_string()],
            value_equality_suffix: "_s".to_string(),
            rules: nng_preset(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Compile the rule list, in order.
    pub fn registry(&self) -> Result<RuleRegistry, ConfigError> {
        let mut registry = RuleRegistry::new();
        for (i, spec) in self.rules.iter().enumerate() {
            let index = i + 1;
            let matcher = match &spec.matcher {
                MatcherSpec::Exact(name) => Matcher::exact(name.as_str()),
                MatcherSpec::Pattern(pattern) => Matcher::pattern(pattern)
                    .map_err(|source| ConfigError::Rule { index, source })?,
                MatcherSpec::Prefix(prefix) => Matcher::prefix(prefix),
            };
            let action = match &spec.action {
                ActionSpec::Discard => Action::Discard,
                ActionSpec::RetypeAs(ty) => {
                    Action::RetypeAs(parse_type_name(ty).ok_or_else(|| {
                        ConfigError::InvalidType {
                            index,
                            ty: ty.clone(),
                        }
                    })?)
                }
                ActionSpec::OverrideMarshal { slot, direction } => Action::OverrideMarshal {
                    slot: match slot.as_str() {
                        "return" => MarshalSlot::Return,
                        name => MarshalSlot::Param(name.to_string()),
                    },
                    direction: match direction {
                        DirectionSpec::ToNative => MarshalDirection::ToNative,
                        DirectionSpec::FromNative => MarshalDirection::FromNative,
                    },
                },
            };
            registry
                .register(spec.kind.into(), matcher, action)
                .map_err(|source| ConfigError::Rule { index, source })?;
        }
        Ok(registry)
    }

    pub fn header_options(&self) -> Result<HeaderOptions, ConfigError> {
        let defines = self
            .defines
            .iter()
            .map(String::as_str)
            .map(parse_define)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HeaderOptions {
            defines,
            exclude: self.exclude.clone(),
        })
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            module: self.module.clone(),
            library: self.library.clone(),
            file_name: self.output_file.clone(),
        }
    }
}

/// Split `NAME[=VALUE]`; the name must be a C identifier.
pub fn parse_define(define: &str) -> Result<(String, Option<String>), ConfigError> {
    let (name, value) = match define.split_once('=') {
        Some((name, value)) => (name, Some(value.to_string())),
        None => (define, None),
    };
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ConfigError::InvalidDefine(define.to_string()));
    }
    Ok((name.to_string(), value))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
