// ABOUTME: Environment tracker: reads the upstream file to find the live environment.
// ABOUTME: Neither/both markers resolve through a configurable, always-logged fallback.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::store::UpstreamStore;
use super::switcher::SwitchError;
use super::upstream::MarkerState;
use crate::types::{Environment, EnvironmentState};

/// What to assume when the upstream file does not name exactly one active environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionFallback {
    #[default]
    Blue,
    Green,
    /// Refuse to guess.
    Fail,
}

impl DetectionFallback {
    pub fn environment(self) -> Option<Environment> {
        match self {
            DetectionFallback::Blue => Some(Environment::Blue),
            DetectionFallback::Green => Some(Environment::Green),
            DetectionFallback::Fail => None,
        }
    }
}

/// Why detection could not read a single active marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ambiguity {
    NoMarker,
    BothMarked,
    Unparseable(String),
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ambiguity::NoMarker => write!(f, "no upstream entry is marked active"),
            Ambiguity::BothMarked => write!(f, "both upstream entries are marked active"),
            Ambiguity::Unparseable(e) => write!(f, "upstream config cannot be parsed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub state: EnvironmentState,
    /// Set when `state` came from the fallback policy.
    pub ambiguity: Option<Ambiguity>,
}

impl Detection {
    pub fn fallback_used(&self) -> bool {
        self.ambiguity.is_some()
    }
}

pub fn detect_active(
    store: &dyn UpstreamStore,
    fallback: DetectionFallback,
) -> Result<Detection, SwitchError> {
    let ambiguity = match store.read() {
        Ok(config) => match config.markers() {
            MarkerState::Single(env) => {
                tracing::debug!("Active environment is {}", env);
                return Ok(Detection {
                    state: EnvironmentState::with_active(env),
                    ambiguity: None,
                });
            }
            MarkerState::Neither => Ambiguity::NoMarker,
            MarkerState::Both => Ambiguity::BothMarked,
        },
        Err(e) if e.is_parse_error() => Ambiguity::Unparseable(e.to_string()),
        Err(e) => return Err(e.into()),
    };

    match fallback.environment() {
        Some(env) => {
            tracing::debug!(
                "{} in {}; falling back to {}",
                ambiguity,
                store.location(),
                env
            );
            Ok(Detection {
                state: EnvironmentState::with_active(env),
                ambiguity: Some(ambiguity),
            })
        }
        None => Err(SwitchError::Ambiguous(ambiguity)),
    }
}
