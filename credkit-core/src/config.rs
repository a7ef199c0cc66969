//! Provider configuration.

use serde::Deserialize;

use crate::error::ConfigError;

/// Default seed of the request-code sequence.
pub const DEFAULT_FIRST_REQUEST_CODE: u32 = 1;

/// Tunables for a [`crate::CredentialProvider`].
///
/// Every field has a default, so partial JSON such as `{"cancel_in_flight": false}` is accepted by
/// [`ProviderConfig::from_json`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// First request code handed out per provider host. Codes increase by one per invocation.
    pub first_request_code: u32,
    /// Whether a cancellation signal firing after launch tears down the provider UI and answers the
    /// caller with a cancellation error. When `false`, cancellation only prevents launches that have
    /// not started yet.
    pub cancel_in_flight: bool,
    /// Upper bound for the async entry points to wait on the provider. `None` waits until the host
    /// answers or is destroyed.
    pub response_timeout_ms: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            first_request_code: DEFAULT_FIRST_REQUEST_CODE,
            cancel_in_flight: true,
            response_timeout_ms: None,
        }
    }
}

impl ProviderConfig {
    /// Parses a configuration from JSON, filling missing fields with defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidConfig`] if the JSON is malformed or has unknown fields.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidConfig {
            reason: e.to_string(),
        })
    }
}

/// Parses a [`ProviderConfig`] from JSON.
///
/// # Errors
/// See [`ProviderConfig::from_json`].
#[uniffi::export]
pub fn provider_config_from_json(json: &str) -> Result<ProviderConfig, ConfigError> {
    ProviderConfig::from_json(json)
}
