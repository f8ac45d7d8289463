//! Nessie catalog endpoint configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_NESSIE_URI: &str = "http://localhost:19120/api/v2";

fn default_uri() -> String {
    String::from(DEFAULT_NESSIE_URI)
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_commit_retries() -> u32 {
    4
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NessieConfig {
    /// Base URI of the Nessie REST API v2.
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How often a conflicting commit is rebased and retried.
    #[serde(default = "default_commit_retries")]
    pub commit_retries: u32,
}

impl Default for NessieConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            request_timeout_secs: default_request_timeout_secs(),
            commit_retries: default_commit_retries(),
        }
    }
}

impl NessieConfig {
    /// Base URI without a trailing slash.
    #[must_use]
    pub fn base_uri(&self) -> &str {
        self.uri.trim_end_matches('/')
    }

    /// Reject values the client cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a non-http(s) URI or a zero
    /// timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.uri.starts_with("http://") || self.uri.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "nessie.uri".to_string(),
                reason: format!("'{}' is not an http(s) URI", self.uri),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "nessie.request_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_nessie() {
        let config = NessieConfig::default();
        assert_eq!(config.uri, "http://localhost:19120/api/v2");
        assert_eq!(config.commit_retries, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn base_uri_strips_trailing_slash() {
        let config = NessieConfig {
            uri: "http://nessie:19120/api/v2/".into(),
            ..Default::default()
        };
        assert_eq!(config.base_uri(), "http://nessie:19120/api/v2");
    }

    #[test]
    fn non_http_uri_rejected() {
        let config = NessieConfig {
            uri: "nessie:19120".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "nessie.uri"
        ));
    }
}
