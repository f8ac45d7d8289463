//! Configuration loading and flag merging shared by every command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use nt_catalog::NessieCatalog;
use nt_config::ToolsConfig;
use nt_storage::{LocalStorage, ObjectStorage, S3Storage};

use crate::cli::subcommands::{NessieArgs, S3Args};

/// Read `.env`, TOML files and `NESSIE_TOOLS_*` variables.
pub fn load_config() -> anyhow::Result<ToolsConfig> {
    ToolsConfig::load_with_dotenv().context("failed to load configuration")
}

/// Flags win over configuration.
pub fn apply_nessie(config: &mut ToolsConfig, args: &NessieArgs) {
    if let Some(uri) = &args.nessie_uri {
        config.nessie.uri.clone_from(uri);
    }
}

pub fn apply_s3(config: &mut ToolsConfig, args: &S3Args) {
    let overrides = [
        (&args.aws_access_key, &mut config.s3.access_key_id),
        (&args.aws_secret_key, &mut config.s3.secret_access_key),
        (&args.aws_region_code, &mut config.s3.region),
        (&args.s3_endpoint, &mut config.s3.endpoint),
    ];
    for (flag, field) in overrides {
        if let Some(value) = flag {
            field.clone_from(value);
        }
    }
    if config.s3.endpoint.starts_with("http://") {
        config.s3.allow_http = true;
    }
}

pub fn s3_storage(config: &ToolsConfig) -> anyhow::Result<Arc<dyn ObjectStorage>> {
    config
        .s3
        .require()
        .context("AWS credentials are required: pass --aws-access-key/--aws-secret-key or configure [s3]")?;
    let storage = S3Storage::new(&config.s3).context("failed to configure S3 storage")?;
    Ok(Arc::new(storage))
}

pub fn local_storage() -> Arc<dyn ObjectStorage> {
    Arc::new(LocalStorage::new())
}

pub fn catalog(
    config: &ToolsConfig,
    io: Arc<dyn ObjectStorage>,
) -> anyhow::Result<Arc<NessieCatalog>> {
    config.nessie.validate().context("invalid Nessie configuration")?;
    let catalog = NessieCatalog::new(&config.nessie, io)
        .with_context(|| format!("failed to create Nessie client for {}", config.nessie.uri))?;
    Ok(Arc::new(catalog))
}

/// Absolute form of a local warehouse path, created if missing.
pub async fn prepare_local_warehouse(warehouse: &str) -> anyhow::Result<String> {
    let location = warehouse.strip_prefix("file://").unwrap_or(warehouse);
    let absolute = std::path::absolute(Path::new(location))
        .with_context(|| format!("invalid warehouse path {warehouse}"))?;
    let absolute = absolute.to_string_lossy().trim_end_matches('/').to_string();

    LocalStorage::new()
        .ensure_dir(&absolute)
        .await
        .with_context(|| format!("failed to create warehouse directory {absolute}"))?;
    Ok(absolute)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn flags_override_config() {
        let mut config = ToolsConfig::default();
        config.s3.region = "eu-central-1".into();
        config.s3.access_key_id = "from-config".into();

        apply_nessie(
            &mut config,
            &NessieArgs {
                nessie_uri: Some("http://nessie:19120/api/v2".into()),
            },
        );
        apply_s3(
            &mut config,
            &S3Args {
                aws_access_key: Some("from-flag".into()),
                aws_secret_key: Some("secret".into()),
                aws_region_code: None,
                s3_endpoint: Some("http://localhost:9000".into()),
            },
        );

        assert_eq!(config.nessie.uri, "http://nessie:19120/api/v2");
        assert_eq!(config.s3.access_key_id, "from-flag");
        assert_eq!(config.s3.secret_access_key, "secret");
        assert_eq!(config.s3.region, "eu-central-1");
        assert_eq!(config.s3.endpoint(), Some("http://localhost:9000"));
        assert!(config.s3.allow_http);
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = ToolsConfig::default();
        apply_nessie(&mut config, &NessieArgs::default());
        apply_s3(&mut config, &S3Args::default());

        assert_eq!(config.nessie.uri, nt_config::DEFAULT_NESSIE_URI);
        assert_eq!(config.s3.region, "us-west-2");
        assert!(!config.s3.allow_http);
    }

    #[test]
    fn s3_storage_needs_credentials() {
        let error = s3_storage(&ToolsConfig::default())
            .err()
            .expect("missing credentials should fail");
        assert!(error.to_string().contains("AWS credentials are required"));
    }

    #[tokio::test]
    async fn local_warehouse_is_created_and_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("wh").join("nested");

        let prepared = prepare_local_warehouse(&format!("{}/", nested.display()))
            .await
            .unwrap();

        assert!(nested.is_dir());
        assert_eq!(prepared, nested.to_string_lossy());
        assert!(Path::new(&prepared).is_absolute());
    }
}
