//! Errors raised while loading or validating nessie-tools settings.

use thiserror::Error;

use crate::ENV_PREFIX;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A TOML file or `NESSIE_TOOLS_*` variable could not be parsed.
    #[error("cannot read nessie-tools settings: {0}")]
    Load(#[from] figment::Error),

    /// S3 access was requested without a complete credential set.
    #[error(
        "S3 credentials incomplete, missing {}: set them under [s3] in .nessie-tools.toml or as {prefix}S3__* variables",
        .missing.join(", "),
        prefix = ENV_PREFIX
    )]
    MissingS3Credentials { missing: Vec<&'static str> },

    /// A setting holds a value the tools cannot use.
    #[error("invalid {field} ({}): {reason}", env_var(.field))]
    InvalidValue { field: String, reason: String },
}

/// Variable overriding a dotted setting: `nessie.uri` is
/// `NESSIE_TOOLS_NESSIE__URI`.
#[must_use]
pub fn env_var(field: &str) -> String {
    format!("{ENV_PREFIX}{}", field.replace('.', "__").to_uppercase())
}
