//! # nt-catalog
//!
//! Versioned catalog access for nessie-tools.
//!
//! [`CatalogClient`] is the seam the engines program against. It covers the
//! two sides of the tools:
//! - table provisioning: create a table on a branch, fast-append data files,
//!   refresh, update table properties
//! - history inspection: references, entries, contents and the commit log
//!
//! [`NessieCatalog`] implements it over the Nessie REST API v2, writing Iceberg
//! metadata files through an [`nt_storage::ObjectStorage`]. With the
//! `test-support` feature an in-memory [`MemoryCatalog`] is also available.

mod error;
mod http;
pub mod metadata;
mod nessie;

#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use error::CatalogError;
pub use metadata::TableMetadata;
pub use nessie::NessieCatalog;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryCatalog;

use std::collections::BTreeMap;

use async_trait::async_trait;
use nt_core::{CatalogEntry, Content, ContentKey, DataFile, LogEntry, Reference, TableSpec};

/// A loaded Iceberg table together with the branch state it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHandle {
    pub spec: TableSpec,
    /// Branch pinned at the commit the metadata was loaded from. Commits are
    /// made against this hash so concurrent changes surface as conflicts.
    pub reference: Reference,
    pub content_id: Option<String>,
    pub metadata_location: String,
    pub metadata: TableMetadata,
}

impl TableHandle {
    /// `name@branch`
    #[must_use]
    pub fn name(&self) -> String {
        self.spec.qualified_name()
    }

    #[must_use]
    pub fn key(&self) -> ContentKey {
        self.spec.key()
    }

    #[must_use]
    pub fn current_snapshot_id(&self) -> Option<i64> {
        self.metadata.current_snapshot_id
    }

    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.metadata.snapshots.len()
    }

    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, String> {
        &self.metadata.properties
    }
}

/// Operations the provisioning and audit engines need from a catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// The catalog's default branch at its current head.
    async fn default_branch(&self) -> Result<Reference, CatalogError>;

    /// Every branch and tag, each with its current head hash.
    async fn all_references(&self) -> Result<Vec<Reference>, CatalogError>;

    /// Create an empty table on `spec.branch()`.
    ///
    /// Fails with [`CatalogError::TableAlreadyExists`] when the key is taken.
    async fn create_table(&self, spec: &TableSpec) -> Result<TableHandle, CatalogError>;

    /// Fast-append one data file as a new snapshot.
    async fn commit_append(&self, table: &TableHandle, file: &DataFile)
    -> Result<(), CatalogError>;

    /// Reload `table` from the head of its branch.
    async fn refresh(&self, table: &mut TableHandle) -> Result<(), CatalogError>;

    /// Merge `properties` into the table properties and commit.
    async fn update_properties(
        &self,
        table: &TableHandle,
        properties: &BTreeMap<String, String>,
    ) -> Result<(), CatalogError>;

    /// Entries visible at `reference` (read at its hash when set).
    async fn entries(&self, reference: &Reference) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Content stored under `key` at `reference`, `None` when absent.
    async fn get_content(
        &self,
        reference: &Reference,
        key: &ContentKey,
    ) -> Result<Option<Content>, CatalogError>;

    /// Commit log of `reference`, newest first. With `fetch_all` each entry
    /// carries its operations.
    async fn commit_log(
        &self,
        reference: &Reference,
        fetch_all: bool,
    ) -> Result<Vec<LogEntry>, CatalogError>;
}
