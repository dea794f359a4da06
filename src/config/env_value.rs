// ABOUTME: Config values that are literal or read from the environment at run time.
// ABOUTME: Keeps secrets such as webhook URLs out of cutover.yml.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Prefix of the variables the step runner sets itself.
pub const RESERVED_PREFIX: &str = "CUTOVER_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, .. } => self
                .resolve_optional()
                .ok_or_else(|| Error::MissingEnvVar(var.clone())),
        }
    }

    /// Like `resolve`, but an unset variable without a default is `None`.
    pub fn resolve_optional(&self) -> Option<String> {
        match self {
            EnvValue::Literal(s) => Some(s.clone()),
            EnvValue::FromEnv { var, default } => std::env::var(var).ok().or_else(|| default.clone()),
        }
    }
}

pub fn resolve_env_map(map: &HashMap<String, EnvValue>) -> Result<HashMap<String, String>> {
    map.iter()
        .map(|(k, v)| v.resolve().map(|resolved| (k.clone(), resolved)))
        .collect()
}
