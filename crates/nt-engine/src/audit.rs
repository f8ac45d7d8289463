//! Catalog traversal that checks the metadata of every table a reference (or
//! its history) points at.
//!
//! References are audited concurrently. A [`ProcessedCommitSet`] shared by the
//! run makes sure a commit hash is handled once: references whose head was
//! already claimed are skipped, and a commit reachable from several branches
//! is inspected by whichever walk claims it first.

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::{Stream, StreamExt, stream};
use nt_catalog::{CatalogClient, CatalogError};
use nt_config::AuditConfig;
use nt_core::{AuditFinding, CatalogEntry, ContentKey, FindingOrigin, Reference};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use crate::checker::AccessibilityChecker;
use crate::error::AuditError;

const CHANNEL_CAPACITY: usize = 64;

/// Commit hashes already audited in one run.
#[derive(Debug, Default)]
pub struct ProcessedCommitSet {
    hashes: Mutex<HashSet<String>>,
}

impl ProcessedCommitSet {
    /// Insert `hash`; `true` only for the first caller.
    pub fn claim(&self, hash: &str) -> bool {
        self.hashes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(hash.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditOptions {
    /// Report only findings that are not SUCCESS.
    pub errors_only: bool,
    /// Skip the commit-log walk.
    pub check_only_heads: bool,
    /// Concurrent references, and concurrent checks within one reference.
    pub parallelism: usize,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            errors_only: false,
            check_only_heads: true,
            parallelism: 8,
        }
    }
}

impl From<&AuditConfig> for AuditOptions {
    fn from(config: &AuditConfig) -> Self {
        Self {
            errors_only: config.errors_only,
            check_only_heads: config.check_heads_only,
            parallelism: config.parallelism,
        }
    }
}

impl AuditOptions {
    /// Whether `finding` belongs in the report. Tallies count every finding.
    #[must_use]
    pub const fn should_report(&self, finding: &AuditFinding) -> bool {
        !self.errors_only || !finding.result.status.is_success()
    }
}

type Item = Result<AuditFinding, AuditError>;

/// Findings of one audit as they are produced. Ends when the traversal is
/// done; a traversal failure is the last item. Dropping the run stops it.
#[derive(Debug)]
pub struct AuditRun {
    findings: mpsc::Receiver<Item>,
    producer: JoinHandle<()>,
}

impl AuditRun {
    pub async fn next(&mut self) -> Option<Item> {
        self.findings.recv().await
    }
}

impl Stream for AuditRun {
    type Item = Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Item>> {
        self.get_mut().findings.poll_recv(cx)
    }
}

impl Drop for AuditRun {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

/// Audits every reference of a catalog with an [`AccessibilityChecker`].
pub struct AuditEngine {
    catalog: Arc<dyn CatalogClient>,
    checker: Arc<dyn AccessibilityChecker>,
}

impl AuditEngine {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogClient>, checker: Arc<dyn AccessibilityChecker>) -> Self {
        Self { catalog, checker }
    }

    /// Start auditing in the background. Must be called within a tokio
    /// runtime.
    #[must_use]
    pub fn audit(&self, options: AuditOptions) -> AuditRun {
        let (sender, findings) = mpsc::channel(CHANNEL_CAPACITY);
        let traversal = Arc::new(Traversal {
            catalog: Arc::clone(&self.catalog),
            checker: Arc::clone(&self.checker),
            processed: ProcessedCommitSet::default(),
            parallelism: options.parallelism.max(1),
            check_only_heads: options.check_only_heads,
            sender,
        });
        let producer = tokio::spawn(traversal.run());
        AuditRun { findings, producer }
    }
}

/// State shared by every reference task of one run.
struct Traversal {
    catalog: Arc<dyn CatalogClient>,
    checker: Arc<dyn AccessibilityChecker>,
    processed: ProcessedCommitSet,
    parallelism: usize,
    check_only_heads: bool,
    sender: mpsc::Sender<Item>,
}

impl Traversal {
    async fn run(self: Arc<Self>) {
        let references = match self.catalog.all_references().await {
            Ok(references) => references,
            Err(source) => {
                self.emit(Err(AuditError::Traversal {
                    reference: "references".to_string(),
                    source,
                }))
                .await;
                return;
            }
        };
        tracing::info!(references = references.len(), "auditing references");

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut tasks = JoinSet::new();

        for reference in references {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            while let Some(joined) = tasks.try_join_next() {
                if let Some(error) = failure(joined) {
                    self.abort(&mut tasks, error).await;
                    return;
                }
            }

            let traversal = Arc::clone(&self);
            tasks.spawn(async move {
                let result = traversal.audit_reference(&reference).await;
                drop(permit);
                result
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Some(error) = failure(joined) {
                self.abort(&mut tasks, error).await;
                return;
            }
        }
    }

    /// Stop in-flight references, then report `error` as the final item.
    async fn abort(&self, tasks: &mut JoinSet<Result<(), AuditError>>, error: AuditError) {
        tracing::error!(%error, "audit aborted");
        tasks.shutdown().await;
        self.emit(Err(error)).await;
    }

    /// Send an item; `false` once the consumer is gone.
    async fn emit(&self, item: Item) -> bool {
        self.sender.send(item).await.is_ok()
    }

    async fn audit_reference(&self, reference: &Reference) -> Result<(), AuditError> {
        if !self.processed.claim(&reference.hash) {
            tracing::debug!(
                reference = %reference.name,
                hash = %reference.hash,
                "head already audited, skipping reference"
            );
            return Ok(());
        }

        self.audit_head(reference).await?;
        if !self.check_only_heads {
            self.audit_history(reference).await?;
        }
        Ok(())
    }

    /// Check every table visible at the reference's head.
    async fn audit_head(&self, reference: &Reference) -> Result<(), AuditError> {
        let entries = self
            .catalog
            .entries(reference)
            .await
            .map_err(traversal_error(reference))?;
        let tables: Vec<CatalogEntry> = entries.into_iter().filter(CatalogEntry::is_table).collect();
        tracing::debug!(reference = %reference.name, tables = tables.len(), "checking head");

        let mut checks = stream::iter(tables)
            .map(|entry| self.check_entry(reference, entry.name))
            .buffer_unordered(self.parallelism);
        while let Some(result) = checks.next().await {
            if !result? {
                break;
            }
        }
        Ok(())
    }

    async fn check_entry(&self, reference: &Reference, key: ContentKey) -> Result<bool, AuditError> {
        let content = self
            .catalog
            .get_content(reference, &key)
            .await
            .map_err(traversal_error(reference))?;
        let Some(location) = content
            .as_ref()
            .and_then(|content| content.metadata_location())
        else {
            tracing::debug!(reference = %reference.name, %key, "entry has no table content");
            return Ok(true);
        };

        let origin = FindingOrigin::Head(reference.name.clone());
        Ok(self.check(key, origin, location.to_string()).await)
    }

    /// Inspect the table PUTs of every not-yet-claimed commit in the log.
    async fn audit_history(&self, reference: &Reference) -> Result<(), AuditError> {
        let log = self
            .catalog
            .commit_log(reference, true)
            .await
            .map_err(traversal_error(reference))?;

        let mut targets = Vec::new();
        for entry in &log {
            if !self.processed.claim(entry.hash()) {
                continue;
            }
            for (key, table) in entry.operations().filter_map(|op| op.table_put()) {
                targets.push((
                    key.clone(),
                    FindingOrigin::Commit(entry.hash().to_string()),
                    table.metadata_location.clone(),
                ));
            }
        }
        tracing::debug!(
            reference = %reference.name,
            commits = log.len(),
            checks = targets.len(),
            "checking history"
        );

        let mut checks = stream::iter(targets)
            .map(|(key, origin, location)| self.check(key, origin, location))
            .buffer_unordered(self.parallelism);
        while let Some(open) = checks.next().await {
            if !open {
                break;
            }
        }
        Ok(())
    }

    /// Run the checker and emit the outcome. `false` once the consumer is gone.
    async fn check(&self, key: ContentKey, origin: FindingOrigin, location: String) -> bool {
        let item = match self.checker.check(&location).await {
            Ok(result) => Ok(AuditFinding {
                key,
                origin,
                metadata_location: location,
                result,
            }),
            Err(source) => Err(AuditError::Check { location, source }),
        };
        self.emit(item).await
    }
}

fn traversal_error(reference: &Reference) -> impl FnOnce(CatalogError) -> AuditError + '_ {
    move |source| AuditError::Traversal {
        reference: reference.name.clone(),
        source,
    }
}

fn failure(joined: Result<Result<(), AuditError>, tokio::task::JoinError>) -> Option<AuditError> {
    match joined {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(error),
        Err(error) if error.is_cancelled() => None,
        Err(error) => Some(AuditError::Join(error)),
    }
}
