//! In-memory catalog with Nessie-like commit semantics, for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use nt_core::{
    CatalogEntry, CommitMeta, Content, ContentKey, ContentType, DataFile, LogEntry, Operation,
    Reference, ReferenceKind, TableSpec,
};

use crate::metadata::{
    TableMetadata, manifest_list_location, metadata_file_location, new_snapshot_id, now_ms,
};
use crate::{CatalogClient, CatalogError, TableHandle};

const DEFAULT_BRANCH: &str = "main";

#[derive(Debug)]
struct Commit {
    parent: Option<String>,
    message: String,
    operations: Vec<Operation>,
    tree: BTreeMap<ContentKey, Content>,
}

#[derive(Debug)]
struct State {
    commits: HashMap<String, Commit>,
    references: BTreeMap<String, Reference>,
    metadata: HashMap<String, TableMetadata>,
    failing_tables: HashSet<String>,
    next_hash: u64,
    next_content_id: u64,
}

impl State {
    fn new_hash(&mut self) -> String {
        self.next_hash += 1;
        format!("{:016x}", self.next_hash)
    }

    fn head(&self, name: &str) -> Result<Reference, CatalogError> {
        self.references
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("reference {name}")))
    }

    /// Commit hash `reference` points at: its own hash if set, else the head.
    fn resolve(&self, reference: &Reference) -> Result<String, CatalogError> {
        if !reference.hash.is_empty() {
            return if self.commits.contains_key(&reference.hash) {
                Ok(reference.hash.clone())
            } else {
                Err(CatalogError::NotFound(format!("commit {}", reference.hash)))
            };
        }
        Ok(self.head(&reference.name)?.hash)
    }

    fn tree(&self, hash: &str) -> &BTreeMap<ContentKey, Content> {
        &self.commits[hash].tree
    }

    /// Apply `operations` on top of branch `name` and advance it.
    fn commit(
        &mut self,
        name: &str,
        message: String,
        operations: Vec<Operation>,
    ) -> Result<Reference, CatalogError> {
        let head = self.head(name)?;
        if head.kind != ReferenceKind::Branch {
            return Err(CatalogError::Api {
                status: 400,
                code: "BAD_REQUEST".to_string(),
                message: format!("{name} is not a branch"),
            });
        }

        let mut tree = self.tree(&head.hash).clone();
        for operation in &operations {
            match operation {
                Operation::Put { key, content } => {
                    tree.insert(key.clone(), content.clone());
                }
                Operation::Delete { key } => {
                    tree.remove(key);
                }
                Operation::Unchanged { .. } => {}
            }
        }

        let hash = self.new_hash();
        self.commits.insert(
            hash.clone(),
            Commit {
                parent: Some(head.hash),
                message,
                operations,
                tree,
            },
        );
        let advanced = Reference::branch(name, hash);
        self.references.insert(name.to_string(), advanced.clone());
        Ok(advanced)
    }

    fn content_id_for(&mut self, key: &ContentKey, tree: &BTreeMap<ContentKey, Content>) -> String {
        if let Some(id) = tree
            .get(key)
            .and_then(Content::as_iceberg_table)
            .and_then(|table| table.id.clone())
        {
            return id;
        }
        self.next_content_id += 1;
        format!("content-{}", self.next_content_id)
    }

    /// Commit a new metadata version for `table`, failing with a conflict if
    /// the branch head no longer holds the version `table` was loaded from.
    fn commit_metadata(
        &mut self,
        table: &TableHandle,
        metadata: TableMetadata,
        message: String,
    ) -> Result<(), CatalogError> {
        let head = self.head(table.spec.branch())?;
        let key = table.key();
        let current = self
            .tree(&head.hash)
            .get(&key)
            .and_then(Content::metadata_location);
        if current != Some(table.metadata_location.as_str()) {
            return Err(CatalogError::Conflict(format!(
                "{} changed since it was loaded",
                table.name()
            )));
        }

        let location = metadata_file_location(table.spec.location(), table.metadata.next_version());
        let content = Content::IcebergTable(metadata.to_content(table.content_id.clone(), &location));
        self.metadata.insert(location, metadata);
        self.commit(
            table.spec.branch(),
            message,
            vec![Operation::Put { key, content }],
        )?;
        Ok(())
    }
}

/// [`CatalogClient`] that keeps the whole commit graph in memory.
///
/// Starts with an empty `main` branch. Hashes are a hex counter, so every
/// commit hash is unique and references created from the same head share it.
#[derive(Debug)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        let mut state = State {
            commits: HashMap::new(),
            references: BTreeMap::new(),
            metadata: HashMap::new(),
            failing_tables: HashSet::new(),
            next_hash: 0,
            next_content_id: 0,
        };
        let root = state.new_hash();
        state.commits.insert(
            root.clone(),
            Commit {
                parent: None,
                message: String::new(),
                operations: Vec::new(),
                tree: BTreeMap::new(),
            },
        );
        state
            .references
            .insert(DEFAULT_BRANCH.to_string(), Reference::branch(DEFAULT_BRANCH, root));
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create branch `name` at the head of `from`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when `from` does not exist.
    pub fn create_branch(&self, name: &str, from: &str) -> Result<Reference, CatalogError> {
        let mut state = self.state();
        let reference = Reference::branch(name, state.head(from)?.hash);
        state.references.insert(name.to_string(), reference.clone());
        Ok(reference)
    }

    /// Create tag `name` at the head of `from`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when `from` does not exist.
    pub fn create_tag(&self, name: &str, from: &str) -> Result<Reference, CatalogError> {
        let mut state = self.state();
        let reference = Reference::tag(name, state.head(from)?.hash);
        state.references.insert(name.to_string(), reference.clone());
        Ok(reference)
    }

    /// Commit `content` under `key` on `branch`. Returns the new head.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when `branch` does not exist.
    pub fn put_content(
        &self,
        branch: &str,
        key: &ContentKey,
        content: Content,
    ) -> Result<Reference, CatalogError> {
        let mut state = self.state();
        let message = format!("Put {key}");
        state.commit(
            branch,
            message,
            vec![Operation::Put {
                key: key.clone(),
                content,
            }],
        )
    }

    /// Point the table `name` on `branch` at `metadata_location`, creating it
    /// if needed. Returns the new head.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when `branch` does not exist.
    pub fn put_table(
        &self,
        branch: &str,
        name: &str,
        metadata_location: &str,
    ) -> Result<Reference, CatalogError> {
        let key = ContentKey::of([name]);
        let mut state = self.state();
        let head = state.head(branch)?;
        let tree = state.tree(&head.hash).clone();
        let id = state.content_id_for(&key, &tree);
        let content = Content::IcebergTable(nt_core::IcebergTable {
            id: Some(id),
            metadata_location: metadata_location.to_string(),
            snapshot_id: -1,
            schema_id: 0,
            spec_id: 0,
            sort_order_id: 0,
        });
        state.commit(
            branch,
            format!("Put table {name}"),
            vec![Operation::Put { key, content }],
        )
    }

    /// Remove `name` from `branch`. Returns the new head.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when `branch` does not exist.
    pub fn delete_table(&self, branch: &str, name: &str) -> Result<Reference, CatalogError> {
        let mut state = self.state();
        state.commit(
            branch,
            format!("Delete table {name}"),
            vec![Operation::Delete {
                key: ContentKey::of([name]),
            }],
        )
    }

    /// Make `create_table` fail for the table `name` on any branch.
    pub fn fail_create(&self, name: &str) {
        self.state().failing_tables.insert(name.to_string());
    }

    /// Metadata of table `name` at the head of `branch`.
    #[must_use]
    pub fn table(&self, branch: &str, name: &str) -> Option<TableMetadata> {
        let state = self.state();
        let head = state.head(branch).ok()?;
        let location = state
            .tree(&head.hash)
            .get(&ContentKey::of([name]))?
            .metadata_location()?;
        state.metadata.get(location).cloned()
    }

    /// Commits made since construction, across all branches.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.state().commits.len() - 1
    }
}

#[async_trait]
impl CatalogClient for MemoryCatalog {
    async fn default_branch(&self) -> Result<Reference, CatalogError> {
        self.state().head(DEFAULT_BRANCH)
    }

    async fn all_references(&self) -> Result<Vec<Reference>, CatalogError> {
        Ok(self.state().references.values().cloned().collect())
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<TableHandle, CatalogError> {
        let mut state = self.state();
        if state.failing_tables.contains(spec.name()) {
            return Err(CatalogError::Api {
                status: 500,
                code: "SERVER_ERROR".to_string(),
                message: format!("cannot create {}", spec.qualified_name()),
            });
        }

        let key = spec.key();
        let head = state.head(spec.branch())?;
        let tree = state.tree(&head.hash).clone();
        if tree.contains_key(&key) {
            return Err(CatalogError::TableAlreadyExists(spec.qualified_name()));
        }

        let metadata = TableMetadata::create(spec, now_ms());
        let location = metadata_file_location(spec.location(), 0);
        let content_id = state.content_id_for(&key, &tree);
        let content = Content::IcebergTable(metadata.to_content(Some(content_id.clone()), &location));
        state.metadata.insert(location.clone(), metadata.clone());
        let reference = state.commit(
            spec.branch(),
            format!("Create table {}", spec.qualified_name()),
            vec![Operation::Put { key, content }],
        )?;

        Ok(TableHandle {
            spec: spec.clone(),
            reference,
            content_id: Some(content_id),
            metadata_location: location,
            metadata,
        })
    }

    async fn commit_append(&self, table: &TableHandle, file: &DataFile) -> Result<(), CatalogError> {
        let snapshot_id = new_snapshot_id();
        let metadata = table.metadata.appended(
            &table.metadata_location,
            snapshot_id,
            manifest_list_location(table.spec.location(), snapshot_id),
            file,
            now_ms(),
        );
        let message = format!("Append {} to {}", file.file_path, table.name());
        self.state().commit_metadata(table, metadata, message)
    }

    async fn refresh(&self, table: &mut TableHandle) -> Result<(), CatalogError> {
        let state = self.state();
        let head = state.head(table.spec.branch())?;
        let content = state
            .tree(&head.hash)
            .get(&table.key())
            .and_then(Content::as_iceberg_table)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("table {}", table.name())))?;
        let metadata = state
            .metadata
            .get(&content.metadata_location)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(content.metadata_location.clone()))?;

        table.reference = head;
        table.content_id = content.id;
        table.metadata_location = content.metadata_location;
        table.metadata = metadata;
        Ok(())
    }

    async fn update_properties(
        &self,
        table: &TableHandle,
        properties: &BTreeMap<String, String>,
    ) -> Result<(), CatalogError> {
        let metadata = table
            .metadata
            .with_properties(&table.metadata_location, properties, now_ms());
        let message = format!("Update properties of {}", table.name());
        self.state().commit_metadata(table, metadata, message)
    }

    async fn entries(&self, reference: &Reference) -> Result<Vec<CatalogEntry>, CatalogError> {
        let state = self.state();
        let hash = state.resolve(reference)?;
        Ok(state
            .tree(&hash)
            .iter()
            .map(|(key, content)| CatalogEntry {
                content_type: match content {
                    Content::IcebergTable(_) => ContentType::IcebergTable,
                    Content::Other => ContentType::Other,
                },
                name: key.clone(),
                content_id: content.as_iceberg_table().and_then(|table| table.id.clone()),
            })
            .collect())
    }

    async fn get_content(
        &self,
        reference: &Reference,
        key: &ContentKey,
    ) -> Result<Option<Content>, CatalogError> {
        let state = self.state();
        let hash = state.resolve(reference)?;
        Ok(state.tree(&hash).get(key).cloned())
    }

    async fn commit_log(
        &self,
        reference: &Reference,
        fetch_all: bool,
    ) -> Result<Vec<LogEntry>, CatalogError> {
        let state = self.state();
        let mut next = Some(state.resolve(reference)?);
        let mut log = Vec::new();

        while let Some(hash) = next {
            let commit = &state.commits[&hash];
            // The root commit is the empty beginning of history.
            let Some(parent) = commit.parent.clone() else {
                break;
            };
            log.push(LogEntry {
                commit_meta: CommitMeta {
                    hash,
                    message: commit.message.clone(),
                    commit_time: None,
                },
                parent_commit_hash: Some(parent.clone()),
                operations: fetch_all.then(|| commit.operations.clone()),
            });
            next = Some(parent);
        }
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use nt_core::table::GC_ENABLED;
    use pretty_assertions::assert_eq;

    use super::*;

    fn spec(name: &str) -> TableSpec {
        TableSpec::new(name, "main", "/tmp/wh").unwrap()
    }

    #[tokio::test]
    async fn create_append_refresh() {
        let catalog = MemoryCatalog::new();
        let mut table = catalog.create_table(&spec("table1")).await.unwrap();

        catalog
            .commit_append(&table, &DataFile::synthetic("/tmp/wh/table1/data/data_0.parquet"))
            .await
            .unwrap();
        catalog.refresh(&mut table).await.unwrap();
        catalog
            .commit_append(&table, &DataFile::synthetic("/tmp/wh/table1/data/data_1.parquet"))
            .await
            .unwrap();
        catalog.refresh(&mut table).await.unwrap();

        assert_eq!(table.snapshot_count(), 2);
        assert_eq!(catalog.table("main", "table1").unwrap(), table.metadata);
        assert_eq!(catalog.commit_count(), 3);
    }

    #[tokio::test]
    async fn stale_handle_conflicts() {
        let catalog = MemoryCatalog::new();
        let table = catalog.create_table(&spec("table1")).await.unwrap();
        let file = DataFile::synthetic("/tmp/wh/table1/data/data_0.parquet");

        catalog.commit_append(&table, &file).await.unwrap();
        let result = catalog.commit_append(&table, &file).await;
        assert!(matches!(result, Err(CatalogError::Conflict(_))));
    }

    #[tokio::test]
    async fn duplicate_create_rejected() {
        let catalog = MemoryCatalog::new();
        catalog.create_table(&spec("table1")).await.unwrap();
        let result = catalog.create_table(&spec("table1")).await;
        assert!(matches!(result, Err(CatalogError::TableAlreadyExists(_))));
    }

    #[tokio::test]
    async fn properties_are_merged() {
        let catalog = MemoryCatalog::new();
        let table = catalog.create_table(&spec("table1")).await.unwrap();
        let properties = BTreeMap::from([(GC_ENABLED.to_string(), "true".to_string())]);
        catalog.update_properties(&table, &properties).await.unwrap();

        assert_eq!(catalog.table("main", "table1").unwrap().properties, properties);
    }

    #[tokio::test]
    async fn branches_share_history_until_they_diverge() {
        let catalog = MemoryCatalog::new();
        catalog.put_table("main", "t1", "/m/t1.json").unwrap();
        let dev = catalog.create_branch("dev", "main").unwrap();
        let main = catalog.default_branch().await.unwrap();
        assert_eq!(dev.hash, main.hash);

        catalog.put_table("dev", "t2", "/m/t2.json").unwrap();
        let dev_log = catalog
            .commit_log(&Reference::branch("dev", ""), true)
            .await
            .unwrap();
        let main_log = catalog.commit_log(&main, false).await.unwrap();

        assert_eq!(dev_log.len(), 2);
        assert_eq!(main_log.len(), 1);
        assert_eq!(dev_log[1].hash(), main_log[0].hash());
        assert!(main_log[0].operations.is_none());
        assert_eq!(dev_log[0].operations().count(), 1);
    }

    #[tokio::test]
    async fn entries_at_pinned_hash_ignore_later_commits() {
        let catalog = MemoryCatalog::new();
        let pinned = catalog.put_table("main", "t1", "/m/t1.json").unwrap();
        catalog.put_table("main", "t2", "/m/t2.json").unwrap();

        let entries = catalog.entries(&pinned).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_table());

        let missing = catalog
            .get_content(&pinned, &ContentKey::of(["t2"]))
            .await
            .unwrap();
        assert_eq!(missing, None);
    }
}
