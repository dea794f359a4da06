// ABOUTME: Smoke test battery: HTTP assertions run once against a base URL.
// ABOUTME: Hard failures are status mismatches; latency ceilings only warn.

mod runner;

pub use runner::SmokeRunner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::cancel::Cancellation;
use crate::http::Method;

/// One acceptable status code, or a set of them.
///
/// A set is for endpoints whose answer before login is legitimately one of
/// several codes (e.g. `[200, 401, 403]`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExpectedStatus {
    One(u16),
    AnyOf(Vec<u16>),
}

impl ExpectedStatus {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            ExpectedStatus::One(expected) => *expected == status,
            ExpectedStatus::AnyOf(set) => set.contains(&status),
        }
    }
}

impl Default for ExpectedStatus {
    fn default() -> Self {
        ExpectedStatus::One(200)
    }
}

impl From<u16> for ExpectedStatus {
    fn from(status: u16) -> Self {
        ExpectedStatus::One(status)
    }
}

impl fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedStatus::One(s) => write!(f, "{}", s),
            ExpectedStatus::AnyOf(set) => {
                let codes: Vec<String> = set.iter().map(|s| s.to_string()).collect();
                write!(f, "{}", codes.join("|"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmokeAssertion {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub method: Method,

    pub path: String,

    #[serde(default)]
    pub expect: ExpectedStatus,

    /// Soft ceiling: exceeding it records a warning, never a failure.
    #[serde(default, with = "humantime_serde")]
    pub max_latency: Option<Duration>,
}

impl SmokeAssertion {
    pub fn get(
        name: impl Into<String>,
        path: impl Into<String>,
        expect: impl Into<ExpectedStatus>,
    ) -> Self {
        SmokeAssertion {
            name: Some(name.into()),
            method: Method::Get,
            path: path.into(),
            expect: expect.into(),
            max_latency: None,
        }
    }

    pub fn with_max_latency(mut self, max: Duration) -> Self {
        self.max_latency = Some(max);
        self
    }

    /// Display name, falling back to `METHOD path`.
    pub fn label(&self) -> String {
        match self.name {
            Some(ref name) => name.clone(),
            None => format!("{} {}", self.method, self.path),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SmokeAssertionResult {
    pub name: String,
    pub expected: ExpectedStatus,
    /// None when no response arrived (timeout, refused connection, cancellation).
    pub actual_status: Option<u16>,
    pub pass: bool,
    #[serde(skip)]
    pub latency: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SmokeTestResult {
    pub passed: usize,
    pub failed: usize,
    pub assertions: Vec<SmokeAssertionResult>,
}

impl SmokeTestResult {
    pub fn from_assertions(assertions: Vec<SmokeAssertionResult>) -> Self {
        let passed = assertions.iter().filter(|a| a.pass).count();
        SmokeTestResult {
            passed,
            failed: assertions.len() - passed,
            assertions,
        }
    }

    pub fn verdict(&self) -> bool {
        self.failed == 0
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.assertions
            .iter()
            .filter_map(|a| a.warning.as_deref().map(|w| (a.name.as_str(), w)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &SmokeAssertionResult> {
        self.assertions.iter().filter(|a| !a.pass)
    }
}

/// Runs a smoke battery. Implementations must return within a bounded time.
#[async_trait]
pub trait SmokeTest: Send + Sync {
    async fn run(
        &self,
        base_url: &str,
        assertions: &[SmokeAssertion],
        cancel: &Cancellation,
    ) -> SmokeTestResult;
}
