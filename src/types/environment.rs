// ABOUTME: The two symmetric deployment environments, blue and green.
// ABOUTME: Exactly one serves live traffic; the other is the deployment target.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown environment '{0}' (expected 'blue' or 'green')")]
pub struct ParseEnvironmentError(String);

/// One of the two blue/green slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Blue,
    Green,
}

impl Environment {
    pub const ALL: [Environment; 2] = [Environment::Blue, Environment::Green];

    /// The other slot.
    pub fn complement(self) -> Self {
        match self {
            Environment::Blue => Environment::Green,
            Environment::Green => Environment::Blue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Blue => "blue",
            Environment::Green => "green",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(Environment::Blue),
            "green" => Ok(Environment::Green),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}

/// Which slot serves traffic and which one a deployment targets.
///
/// Derived from the proxy configuration on every run; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentState {
    pub active: Environment,
    pub target: Environment,
}

impl EnvironmentState {
    pub fn with_active(active: Environment) -> Self {
        Self {
            active,
            target: active.complement(),
        }
    }
}
