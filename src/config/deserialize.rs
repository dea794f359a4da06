// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles project/service names and the non-empty, duplicate-free service list.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::ServiceConfig;
use crate::types::ServiceName;

pub fn deserialize_service_name<'de, D>(deserializer: D) -> Result<ServiceName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ServiceName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_service_name_option<'de, D>(
    deserializer: D,
) -> Result<Option<ServiceName>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| ServiceName::new(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_services<'de, D>(deserializer: D) -> Result<NonEmpty<ServiceConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<ServiceConfig> = Vec::deserialize(deserializer)?;

    for (i, service) in values.iter().enumerate() {
        if values[..i].iter().any(|s| s.name == service.name) {
            return Err(serde::de::Error::custom(format!(
                "duplicate service name: {}",
                service.name
            )));
        }
    }

    NonEmpty::from_vec(values)
        .ok_or_else(|| serde::de::Error::custom("at least one service is required"))
}
