//! Server policy settings

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Upper bound for any configured lifetime (10 years)
pub const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Access token lifetime in seconds (default: 1 hour)
    #[serde(
        default = "default_access_token_lifetime",
        deserialize_with = "deserialize_lifetime"
    )]
    pub access_token_lifetime_secs: u64,

    /// Authorization code lifetime in seconds (default: 10 minutes)
    #[serde(
        default = "default_code_lifetime",
        deserialize_with = "deserialize_lifetime"
    )]
    pub code_lifetime_secs: u64,

    /// Echo the granted scope in token endpoint responses
    #[serde(default)]
    pub include_scope_in_token_response: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime_secs: default_access_token_lifetime(),
            code_lifetime_secs: default_code_lifetime(),
            include_scope_in_token_response: false,
        }
    }
}

impl ServerConfig {
    /// Check settings built in code; deserialized configs are checked while parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_lifetime("access_token_lifetime_secs", self.access_token_lifetime_secs)?;
        check_lifetime("code_lifetime_secs", self.code_lifetime_secs)?;
        Ok(())
    }
}

fn default_access_token_lifetime() -> u64 {
    3600 // 1 hour
}

fn default_code_lifetime() -> u64 {
    600 // 10 minutes
}

pub(crate) fn check_lifetime(field: &'static str, secs: u64) -> Result<(), ConfigError> {
    if secs > MAX_LIFETIME_SECS {
        return Err(ConfigError::LifetimeOutOfRange { field, secs });
    }
    Ok(())
}

fn deserialize_lifetime<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let secs = u64::deserialize(deserializer)?;
    if secs > MAX_LIFETIME_SECS {
        return Err(serde::de::Error::custom(format!(
            "lifetime of {} seconds exceeds the maximum of {}",
            secs, MAX_LIFETIME_SECS
        )));
    }
    Ok(secs)
}
