//! S3 credentials and endpoint configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_region() -> String {
    String::from("us-west-2")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Config {
    /// AWS access key id.
    #[serde(default)]
    pub access_key_id: String,

    /// AWS secret access key.
    #[serde(default)]
    pub secret_access_key: String,

    /// AWS region code.
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint (MinIO, localstack). Empty means AWS.
    #[serde(default)]
    pub endpoint: String,

    /// Permit plain-http endpoints.
    #[serde(default)]
    pub allow_http: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: default_region(),
            endpoint: String::new(),
            allow_http: false,
        }
    }
}

impl S3Config {
    /// Check if the S3 config has the minimum required fields.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.access_key_id.is_empty()
            && !self.secret_access_key.is_empty()
            && !self.region.is_empty()
    }

    /// Custom endpoint, if one is set.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        (!self.endpoint.is_empty()).then_some(self.endpoint.as_str())
    }

    /// Fail when credentials are missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingS3Credentials`] naming every unset key.
    pub fn require(&self) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = [
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
            ("region", &self.region),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingS3Credentials { missing })
        }
    }
}
