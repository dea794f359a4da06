// ABOUTME: Project and service names, plus which services a deployment covers.
// ABOUTME: Names stay valid DNS labels even after a slot suffix such as "-green" is appended.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest slot suffix step commands append (`-green`).
const SLOT_SUFFIX_LEN: usize = 6;

/// RFC 1123 label limit minus room for the slot suffix.
pub const MAX_NAME_LEN: usize = 63 - SLOT_SUFFIX_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceNameError {
    #[error("name cannot be empty")]
    Empty,

    #[error("name '{0}' is longer than {MAX_NAME_LEN} characters")]
    TooLong(String),

    #[error("name '{0}' must start and end with a letter or digit")]
    EdgeHyphen(String),

    #[error("name '{name}' contains '{found}'; use lowercase letters, digits and '-'")]
    InvalidChar { name: String, found: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, ServiceNameError> {
        if value.is_empty() {
            return Err(ServiceNameError::Empty);
        }
        if value.len() > MAX_NAME_LEN {
            return Err(ServiceNameError::TooLong(value.to_string()));
        }
        if let Some(found) = value
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(ServiceNameError::InvalidChar {
                name: value.to_string(),
                found,
            });
        }
        if value.starts_with('-') || value.ends_with('-') {
            return Err(ServiceNameError::EdgeHyphen(value.to_string()));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ServiceName {
    type Err = ServiceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which services a deployment covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceTarget {
    #[default]
    All,
    Only(ServiceName),
}

impl ServiceTarget {
    /// `--service NAME` when given, every service otherwise.
    pub fn from_option(name: Option<&str>) -> Result<Self, ServiceNameError> {
        name.map(ServiceName::new)
            .transpose()
            .map(|name| name.map_or(ServiceTarget::All, ServiceTarget::Only))
    }

    pub fn includes(&self, name: &ServiceName) -> bool {
        match self {
            ServiceTarget::All => true,
            ServiceTarget::Only(only) => only == name,
        }
    }
}

impl fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceTarget::All => write!(f, "all services"),
            ServiceTarget::Only(name) => write!(f, "{}", name),
        }
    }
}
