//! Bulk creation of tables with synthetic snapshot histories.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use nt_catalog::CatalogClient;
use nt_core::table::{COMMIT_NUM_RETRIES, GC_ENABLED};
use nt_core::{SchemaField, SnapshotRequest, TableSpec};
use nt_storage::ObjectStorage;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{GenerationError, SetupError, WorkUnitError};
use crate::template::{TemplateFile, template_location};

const TABLE_PREFIX: &str = "table";
const COMMIT_RETRIES_PROPERTY_VALUE: &str = "4";

/// Progress notifications emitted while generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// A table and all its snapshots were committed.
    Generated { table: String },
    /// Tables still to go; sent whenever the count is a multiple of 10.
    Remaining(usize),
    /// All units are done and the template is cleaned up.
    Finished { elapsed: Duration },
}

pub type ProgressFn = Arc<dyn Fn(&GenerationEvent) + Send + Sync>;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Qualified names (`name@branch`) in generation order.
    pub tables: Vec<String>,
    pub snapshots_per_table: usize,
    pub elapsed: Duration,
}

/// Provisions tables through a [`CatalogClient`], copying data files with an
/// [`ObjectStorage`].
pub struct ProvisioningEngine {
    catalog: Arc<dyn CatalogClient>,
    storage: Arc<dyn ObjectStorage>,
    parallelism: usize,
    prefix: Option<String>,
    progress: ProgressFn,
}

impl ProvisioningEngine {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        storage: Arc<dyn ObjectStorage>,
        parallelism: usize,
    ) -> Self {
        Self {
            catalog,
            storage,
            parallelism: parallelism.max(1),
            prefix: None,
            progress: Arc::new(log_progress),
        }
    }

    /// Receive [`GenerationEvent`]s. By default they are only logged.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = progress;
        self
    }

    /// Use a fixed table name prefix instead of `table<random>`.
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Create `table_count` tables on the default branch, each with
    /// `snapshot_count` appended snapshots, under `warehouse`.
    ///
    /// The first failing table stops new tables from starting. Tables already
    /// committed stay in the catalog. The uploaded template is removed in
    /// every case once setup has succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Setup`] before any table is touched, or
    /// [`GenerationError::WorkUnit`] naming the first table that failed.
    pub async fn generate(
        &self,
        table_count: usize,
        snapshot_count: usize,
        warehouse: &str,
    ) -> Result<GenerationSummary, GenerationError> {
        let started = Instant::now();

        let branch = self
            .catalog
            .default_branch()
            .await
            .map_err(SetupError::DefaultBranch)?;

        let prefix = match &self.prefix {
            Some(prefix) => prefix.clone(),
            None => random_prefix()?,
        };

        let template = TemplateFile::write(&[SchemaField::id_column()])?;
        let template_location = template_location(warehouse);
        self.storage
            .put(template.path(), &template_location)
            .await
            .map_err(|source| SetupError::TemplateUpload {
                location: template_location.clone(),
                source,
            })?;

        tracing::info!(
            branch = %branch.name,
            warehouse,
            prefix,
            table_count,
            snapshot_count,
            "generating tables"
        );

        let plan = UnitPlan {
            catalog: Arc::clone(&self.catalog),
            storage: Arc::clone(&self.storage),
            template: template_location.clone(),
            snapshot_count,
        };
        let result = self
            .run_units(plan, &prefix, &branch.name, warehouse, table_count)
            .await;

        if let Err(error) = self.storage.delete(&template_location).await {
            tracing::warn!(location = %template_location, %error, "failed to delete template data file");
        }
        let elapsed = started.elapsed();
        (self.progress)(&GenerationEvent::Finished { elapsed });

        Ok(GenerationSummary {
            tables: result?,
            snapshots_per_table: snapshot_count,
            elapsed,
        })
    }

    async fn run_units(
        &self,
        plan: UnitPlan,
        prefix: &str,
        branch: &str,
        warehouse: &str,
        table_count: usize,
    ) -> Result<Vec<String>, GenerationError> {
        let plan = Arc::new(plan);
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let aborted = Arc::new(AtomicBool::new(false));
        let remaining = Arc::new(AtomicUsize::new(table_count));
        let mut units = JoinSet::new();

        for index in 0..table_count {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            if aborted.load(Ordering::SeqCst) {
                break;
            }

            let name = format!("{prefix}{index}");
            let qualified = format!("{name}@{branch}");
            let spec = match TableSpec::new(&name, branch, warehouse) {
                Ok(spec) => spec,
                Err(error) => {
                    aborted.store(true, Ordering::SeqCst);
                    units.spawn(async move { (index, qualified, Err(WorkUnitError::from(error))) });
                    break;
                }
            };

            let plan = Arc::clone(&plan);
            let aborted = Arc::clone(&aborted);
            let remaining = Arc::clone(&remaining);
            let progress = Arc::clone(&self.progress);
            units.spawn(async move {
                let result = plan.provision(spec).await;
                match &result {
                    Ok(()) => {
                        progress(&GenerationEvent::Generated {
                            table: qualified.clone(),
                        });
                        let left = remaining.fetch_sub(1, Ordering::SeqCst) - 1;
                        if left % 10 == 0 {
                            progress(&GenerationEvent::Remaining(left));
                        }
                    }
                    Err(error) => {
                        tracing::error!(table = %qualified, %error, "table generation failed");
                        aborted.store(true, Ordering::SeqCst);
                    }
                }
                drop(permit);
                (index, qualified, result)
            });
        }

        let mut generated = Vec::with_capacity(table_count);
        let mut failure: Option<GenerationError> = None;
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((index, table, Ok(()))) => generated.push((index, table)),
                Ok((_, table, Err(source))) => {
                    failure.get_or_insert(GenerationError::WorkUnit { table, source });
                }
                Err(error) => {
                    aborted.store(true, Ordering::SeqCst);
                    failure.get_or_insert(GenerationError::Join(error));
                }
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }
        generated.sort_unstable_by_key(|(index, _)| *index);
        Ok(generated.into_iter().map(|(_, table)| table).collect())
    }
}

/// What every unit shares.
struct UnitPlan {
    catalog: Arc<dyn CatalogClient>,
    storage: Arc<dyn ObjectStorage>,
    template: String,
    snapshot_count: usize,
}

impl UnitPlan {
    /// Create one table, append its snapshots in order, then set properties.
    async fn provision(&self, spec: TableSpec) -> Result<(), WorkUnitError> {
        let mut table = self.catalog.create_table(&spec).await?;

        for index in 0..self.snapshot_count {
            let request = SnapshotRequest::numbered(&spec, &self.template, index);
            self.storage
                .copy(&request.source, &request.destination)
                .await?;
            self.catalog
                .commit_append(&table, &request.data_file())
                .await?;
            self.catalog.refresh(&mut table).await?;
        }

        let properties = BTreeMap::from([
            (GC_ENABLED.to_string(), "true".to_string()),
            (
                COMMIT_NUM_RETRIES.to_string(),
                COMMIT_RETRIES_PROPERTY_VALUE.to_string(),
            ),
        ]);
        self.catalog.update_properties(&table, &properties).await?;
        Ok(())
    }
}

/// `table<R>` with `R` in `0..100`.
fn random_prefix() -> Result<String, SetupError> {
    let value = getrandom::u32().map_err(SetupError::Random)?;
    Ok(format!("{TABLE_PREFIX}{}", value % 100))
}

fn log_progress(event: &GenerationEvent) {
    match event {
        GenerationEvent::Generated { table } => tracing::info!(table, "generated"),
        GenerationEvent::Remaining(left) => tracing::info!(remaining = left, "progress"),
        GenerationEvent::Finished { elapsed } => {
            tracing::info!(secs = elapsed.as_secs(), "generation finished");
        }
    }
}
