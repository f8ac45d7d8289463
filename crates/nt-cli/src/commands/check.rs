use std::sync::Arc;

use anyhow::Context;
use nt_config::ToolsConfig;
use nt_core::AuditTally;
use nt_engine::{AuditEngine, AuditError, AuditOptions, StorageChecker};
use nt_storage::ObjectStorage;

use crate::bootstrap;
use crate::cli::subcommands::{CheckArgs, CheckTarget};

/// Handle `nessie-tools check-accessibility`.
pub async fn handle(target: CheckTarget, mut config: ToolsConfig) -> anyhow::Result<()> {
    let (args, storage) = match target {
        CheckTarget::S3(s3_args) => {
            bootstrap::apply_s3(&mut config, &s3_args.s3);
            (s3_args.check, bootstrap::s3_storage(&config)?)
        }
        CheckTarget::Local(args) => (args, bootstrap::local_storage()),
    };
    run(args, config, storage).await
}

async fn run(
    args: CheckArgs,
    mut config: ToolsConfig,
    storage: Arc<dyn ObjectStorage>,
) -> anyhow::Result<()> {
    bootstrap::apply_nessie(&mut config, &args.nessie);
    let options = audit_options(&mut config, &args);

    let catalog = bootstrap::catalog(&config, Arc::clone(&storage))?;
    let engine = AuditEngine::new(catalog, Arc::new(StorageChecker::new(storage)));

    let mut run = engine.audit(options);
    let mut tally = AuditTally::default();
    while let Some(item) = run.next().await {
        match item {
            Ok(finding) => {
                tally.record(finding.status());
                if options.should_report(&finding) {
                    println!("{finding}");
                }
            }
            Err(AuditError::Check { location, source }) => {
                tracing::error!(location, error = %source, "cannot check metadata location");
            }
            Err(error) => {
                println!("{tally}");
                return Err(error).context("accessibility check aborted");
            }
        }
    }

    println!("{tally}");
    Ok(())
}

/// Flags win over the `[audit]` section.
fn audit_options(config: &mut ToolsConfig, args: &CheckArgs) -> AuditOptions {
    if let Some(errors_only) = args.errors_only {
        config.audit.errors_only = errors_only;
    }
    if let Some(heads_only) = args.check_heads_only {
        config.audit.check_heads_only = heads_only;
    }
    AuditOptions::from(&config.audit)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cli::subcommands::NessieArgs;

    fn args(errors_only: Option<bool>, check_heads_only: Option<bool>) -> CheckArgs {
        CheckArgs {
            nessie: NessieArgs::default(),
            errors_only,
            check_heads_only,
        }
    }

    #[test]
    fn explicit_false_overrides_config() {
        let mut config = ToolsConfig::default();
        config.audit.errors_only = true;
        config.audit.check_heads_only = true;

        let options = audit_options(&mut config, &args(Some(false), Some(false)));

        assert!(!options.errors_only);
        assert!(!options.check_only_heads);
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = ToolsConfig::default();
        config.audit.errors_only = true;

        let options = audit_options(&mut config, &args(None, None));

        assert_eq!(
            options,
            AuditOptions {
                errors_only: true,
                check_only_heads: true,
                parallelism: config.audit.parallelism,
            }
        );
    }
}
