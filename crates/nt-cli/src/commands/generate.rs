use std::sync::Arc;

use anyhow::Context;
use nt_config::ToolsConfig;
use nt_engine::{GenerationEvent, ProvisioningEngine};
use nt_engine::template::template_location;
use nt_storage::{ObjectStorage, ObjectUri};

use crate::bootstrap;
use crate::cli::subcommands::{GenerateArgs, GenerateTarget};
use crate::output;

/// Handle `nessie-tools generate-tables`.
pub async fn handle(target: GenerateTarget, mut config: ToolsConfig) -> anyhow::Result<()> {
    let (args, storage, warehouse) = match target {
        GenerateTarget::S3(s3_args) => {
            bootstrap::apply_s3(&mut config, &s3_args.s3);
            let warehouse = s3_args.generate.warehouse.trim_end_matches('/').to_string();
            ObjectUri::parse(&template_location(&warehouse))
                .with_context(|| format!("invalid S3 warehouse {warehouse}"))?;
            (s3_args.generate, bootstrap::s3_storage(&config)?, warehouse)
        }
        GenerateTarget::Local(args) => {
            let warehouse = bootstrap::prepare_local_warehouse(&args.warehouse).await?;
            (args, bootstrap::local_storage(), warehouse)
        }
    };
    run(args, config, storage, &warehouse).await
}

async fn run(
    args: GenerateArgs,
    mut config: ToolsConfig,
    storage: Arc<dyn ObjectStorage>,
    warehouse: &str,
) -> anyhow::Result<()> {
    bootstrap::apply_nessie(&mut config, &args.nessie);
    let tables = args.tables_count.unwrap_or(config.generator.tables_count);
    let snapshots = args
        .snapshots_count
        .unwrap_or(config.generator.snapshots_count);

    let catalog = bootstrap::catalog(&config, Arc::clone(&storage))?;
    let engine = ProvisioningEngine::new(catalog, storage, config.generator.parallelism)
        .with_progress(Arc::new(|event: &GenerationEvent| {
            println!("{}", output::generation_line(event));
        }));

    let summary = engine
        .generate(tables, snapshots, warehouse)
        .await
        .with_context(|| format!("failed to generate tables under {warehouse}"))?;
    tracing::info!(
        tables = summary.tables.len(),
        snapshots = summary.snapshots_per_table,
        "generation complete"
    );
    Ok(())
}
