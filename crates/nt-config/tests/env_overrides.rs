//! Environment variables take precedence over files.

use figment::Jail;
use nt_config::ToolsConfig;

#[test]
fn env_overrides_nested_fields() {
    Jail::expect_with(|jail| {
        jail.set_env("NESSIE_TOOLS_NESSIE__URI", "http://env-nessie:19120/api/v2");
        jail.set_env("NESSIE_TOOLS_S3__ACCESS_KEY_ID", "env-key");
        jail.set_env("NESSIE_TOOLS_S3__SECRET_ACCESS_KEY", "env-secret");
        jail.set_env("NESSIE_TOOLS_GENERATOR__TABLES_COUNT", "7");

        let config = ToolsConfig::load().expect("config loads");
        assert_eq!(config.nessie.uri, "http://env-nessie:19120/api/v2");
        assert!(config.s3.is_configured());
        assert_eq!(config.generator.tables_count, 7);
        Ok(())
    });
}

#[test]
fn env_beats_local_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            ".nessie-tools.toml",
            r#"
[audit]
errors_only = false
"#,
        )?;
        jail.set_env("NESSIE_TOOLS_AUDIT__ERRORS_ONLY", "true");

        let config = ToolsConfig::load().expect("config loads");
        assert!(config.audit.errors_only);
        Ok(())
    });
}

#[test]
fn invalid_value_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.set_env("NESSIE_TOOLS_GENERATOR__TABLES_COUNT", "many");
        assert!(ToolsConfig::load().is_err());
        Ok(())
    });
}
