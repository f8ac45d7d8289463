//! # nt-config
//!
//! Layered configuration loading for nessie-tools using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`NESSIE_TOOLS_*` prefix, `__` as separator)
//! 2. Working-directory `.nessie-tools.toml`
//! 3. User-level `~/.config/nessie-tools/config.toml`
//! 4. Built-in defaults
//!
//! Command-line flags are applied on top by the binary.
//!
//! # Environment Variable Mapping
//!
//! `NESSIE_TOOLS_NESSIE__URI` -> `nessie.uri`,
//! `NESSIE_TOOLS_S3__ACCESS_KEY_ID` -> `s3.access_key_id`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use nt_config::ToolsConfig;
//!
//! let config = ToolsConfig::load_with_dotenv().expect("config");
//! println!("Nessie at {}", config.nessie.uri);
//! ```

mod error;
mod general;
mod nessie;
mod s3;

pub use error::{ConfigError, env_var};
pub use general::{AuditConfig, GeneratorConfig};
pub use nessie::{DEFAULT_NESSIE_URI, NessieConfig};
pub use s3::S3Config;

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "NESSIE_TOOLS_";

/// Project-local config file name.
pub const LOCAL_CONFIG_FILE: &str = ".nessie-tools.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub nessie: NessieConfig,
    #[serde(default)]
    pub s3: S3Config,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl ToolsConfig {
    /// Load configuration from TOML files and environment variables.
    ///
    /// Does NOT read `.env`; use [`Self::load_with_dotenv`] for that.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a source cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration after reading `.env` from the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a source cannot be parsed.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        // A missing .env is the common case.
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can extract from it or stack providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nessie-tools").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = ToolsConfig::default();
        assert_eq!(config.nessie.uri, DEFAULT_NESSIE_URI);
        assert!(!config.s3.is_configured());
        assert_eq!(config.generator.tables_count, 100);
        assert!(config.audit.check_heads_only);
    }

    #[test]
    fn figment_builds_without_files() {
        figment::Jail::expect_with(|_jail| {
            let config: ToolsConfig = ToolsConfig::figment().extract()?;
            assert_eq!(config.generator.snapshots_count, 2);
            assert_eq!(config.nessie.commit_retries, 4);
            Ok(())
        });
    }
}
