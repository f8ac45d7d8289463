//! Nessie REST API v2 client.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nt_config::NessieConfig;
use nt_core::{
    CatalogEntry, Content, ContentKey, DataFile, LogEntry, Operation, Reference, TableSpec,
};
use nt_storage::ObjectStorage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::http::{NessieErrorBody, check_response};
use crate::metadata::{
    ManifestList, TableMetadata, manifest_list_location, metadata_file_location,
    new_snapshot_id, now_ms,
};
use crate::{CatalogClient, CatalogError, TableHandle};

const USER_AGENT: &str = concat!("nessie-tools/", env!("CARGO_PKG_VERSION"));
const COMMIT_AUTHOR: &str = "nessie-tools";
const PAGE_SIZE: usize = 250;

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SingleReferenceResponse {
    reference: Reference,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferencesResponse {
    #[serde(default)]
    has_more: bool,
    token: Option<String>,
    references: Vec<Reference>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntriesResponse {
    #[serde(default)]
    has_more: bool,
    token: Option<String>,
    entries: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogResponse {
    #[serde(default)]
    has_more: bool,
    token: Option<String>,
    log_entries: Vec<LogEntry>,
}

#[derive(Deserialize)]
struct ContentResponse {
    content: Content,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitRequest<'a> {
    commit_meta: CommitMetaRequest<'a>,
    operations: &'a [Operation],
}

#[derive(Serialize)]
struct CommitMetaRequest<'a> {
    message: &'a str,
    authors: [&'a str; 1],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    target_branch: Reference,
    #[serde(default)]
    added_contents: Vec<AddedContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddedContent {
    key: ContentKey,
    content_id: String,
}

/// A paged listing response.
trait Page: DeserializeOwned {
    type Item;

    /// Items of this page and the token of the next one, if any.
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

fn next_token(has_more: bool, token: Option<String>) -> Option<String> {
    token.filter(|token| has_more && !token.is_empty())
}

impl Page for ReferencesResponse {
    type Item = Reference;

    fn into_parts(self) -> (Vec<Reference>, Option<String>) {
        (self.references, next_token(self.has_more, self.token))
    }
}

impl Page for EntriesResponse {
    type Item = CatalogEntry;

    fn into_parts(self) -> (Vec<CatalogEntry>, Option<String>) {
        (self.entries, next_token(self.has_more, self.token))
    }
}

impl Page for LogResponse {
    type Item = LogEntry;

    fn into_parts(self) -> (Vec<LogEntry>, Option<String>) {
        (self.log_entries, next_token(self.has_more, self.token))
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// A metadata change to commit to a table.
enum TableUpdate<'a> {
    Append(&'a DataFile),
    Properties(&'a BTreeMap<String, String>),
}

impl TableUpdate<'_> {
    fn message(&self, table: &TableHandle) -> String {
        match self {
            Self::Append(file) => format!("Append {} to {}", file.file_path, table.name()),
            Self::Properties(_) => format!("Update properties of {}", table.name()),
        }
    }
}

/// [`CatalogClient`] backed by a Nessie server. Iceberg metadata and
/// manifests are written through `io` under each table's location.
pub struct NessieCatalog {
    http: reqwest::Client,
    base: String,
    io: Arc<dyn ObjectStorage>,
    commit_retries: u32,
}

impl std::fmt::Debug for NessieCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NessieCatalog")
            .field("base", &self.base)
            .field("io", &self.io.kind())
            .field("commit_retries", &self.commit_retries)
            .finish_non_exhaustive()
    }
}

impl NessieCatalog {
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &NessieConfig, io: Arc<dyn ObjectStorage>) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base: config.base_uri().to_string(),
            io,
            commit_retries: config.commit_retries,
        })
    }

    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base
    }

    /// `<base>/trees/<ref>[/<suffix>]`, with the reference path-encoded.
    fn tree_url(&self, reference: &str, suffix: &str) -> String {
        let mut url = format!("{}/trees/{}", self.base, urlencoding::encode(reference));
        if !suffix.is_empty() {
            url.push('/');
            url.push_str(suffix);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let resp = check_response(self.http.get(url).send().await?).await?;
        Ok(resp.json().await?)
    }

    /// Follow `token`s until the listing is exhausted.
    async fn list_all<P: Page>(&self, url: &str, query: &str) -> Result<Vec<P::Item>, CatalogError> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut page_url = format!("{url}?max-records={PAGE_SIZE}");
            if !query.is_empty() {
                page_url.push('&');
                page_url.push_str(query);
            }
            if let Some(token) = &token {
                page_url.push_str("&page-token=");
                page_url.push_str(&urlencoding::encode(token));
            }

            let page: P = self.get_json(&page_url).await?;
            let (mut batch, next) = page.into_parts();
            items.append(&mut batch);
            match next {
                Some(next) => token = Some(next),
                None => return Ok(items),
            }
        }
    }

    /// Branch or tag `name` at its current head.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for unknown references.
    pub async fn reference(&self, name: &str) -> Result<Reference, CatalogError> {
        let resp: SingleReferenceResponse = self.get_json(&self.tree_url(name, "")).await?;
        Ok(resp.reference)
    }

    async fn commit(
        &self,
        branch: &Reference,
        message: &str,
        operations: &[Operation],
    ) -> Result<CommitResponse, CatalogError> {
        let url = self.tree_url(&branch.pinned(), "history/commit");
        let body = CommitRequest {
            commit_meta: CommitMetaRequest {
                message,
                authors: [COMMIT_AUTHOR],
            },
            operations,
        };
        let resp = check_response(self.http.post(&url).json(&body).send().await?).await?;
        let committed: CommitResponse = resp.json().await?;
        tracing::debug!(
            branch = %committed.target_branch.name,
            hash = %committed.target_branch.hash,
            message,
            "committed"
        );
        Ok(committed)
    }

    async fn read_metadata(&self, location: &str) -> Result<TableMetadata, CatalogError> {
        let bytes = self.io.read(location).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_json<T: Serialize + Sync>(
        &self,
        location: &str,
        value: &T,
    ) -> Result<(), CatalogError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.io.write(location, bytes).await?;
        Ok(())
    }

    async fn load_table(
        &self,
        spec: &TableSpec,
        reference: Reference,
    ) -> Result<TableHandle, CatalogError> {
        let content = self
            .get_content(&reference, &spec.key())
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("table {}", spec.qualified_name())))?;
        let table = content
            .as_iceberg_table()
            .ok_or_else(|| CatalogError::NotATable(spec.qualified_name()))?
            .clone();
        let metadata = self.read_metadata(&table.metadata_location).await?;

        Ok(TableHandle {
            spec: spec.clone(),
            reference,
            content_id: table.id,
            metadata_location: table.metadata_location,
            metadata,
        })
    }

    /// Write the next metadata version for `update`. Returns the new state and
    /// where it was written.
    async fn stage(
        &self,
        table: &TableHandle,
        update: &TableUpdate<'_>,
    ) -> Result<(TableMetadata, String), CatalogError> {
        let now = now_ms();
        let next = match update {
            TableUpdate::Append(file) => {
                let snapshot_id = new_snapshot_id();
                let manifest_location = manifest_list_location(table.spec.location(), snapshot_id);
                let manifest = ManifestList {
                    snapshot_id,
                    sequence_number: table.metadata.last_sequence_number + 1,
                    parent_manifest_list: table
                        .metadata
                        .current_snapshot()
                        .map(|snapshot| snapshot.manifest_list.clone()),
                    added_files: vec![(*file).clone()],
                };
                self.write_json(&manifest_location, &manifest).await?;
                table.metadata.appended(
                    &table.metadata_location,
                    snapshot_id,
                    manifest_location,
                    file,
                    now,
                )
            }
            TableUpdate::Properties(properties) => {
                table
                    .metadata
                    .with_properties(&table.metadata_location, properties, now)
            }
        };

        let location = metadata_file_location(table.spec.location(), table.metadata.next_version());
        self.write_json(&location, &next).await?;
        Ok((next, location))
    }

    /// Commit `update` against the hash `table` was loaded at. On conflict the
    /// table is reloaded and the update reapplied, up to the retry limit.
    async fn commit_update(
        &self,
        table: &TableHandle,
        update: TableUpdate<'_>,
    ) -> Result<(), CatalogError> {
        let attempts = self.commit_retries + 1;
        let mut current = table.clone();

        for attempt in 1..=attempts {
            let (metadata, location) = self.stage(&current, &update).await?;
            let operation = Operation::Put {
                key: current.key(),
                content: Content::IcebergTable(
                    metadata.to_content(current.content_id.clone(), &location),
                ),
            };

            match self
                .commit(&current.reference, &update.message(&current), &[operation])
                .await
            {
                Ok(_) => return Ok(()),
                Err(CatalogError::Conflict(reason)) if attempt < attempts => {
                    tracing::warn!(
                        table = %current.name(),
                        attempt,
                        %reason,
                        "commit conflict, refreshing and retrying"
                    );
                    self.refresh(&mut current).await?;
                }
                Err(CatalogError::Conflict(_)) => break,
                Err(error) => return Err(error),
            }
        }

        Err(CatalogError::CommitRetriesExhausted {
            table: table.name(),
            attempts,
        })
    }
}

#[async_trait]
impl CatalogClient for NessieCatalog {
    async fn default_branch(&self) -> Result<Reference, CatalogError> {
        self.reference("-").await
    }

    async fn all_references(&self) -> Result<Vec<Reference>, CatalogError> {
        let url = format!("{}/trees", self.base);
        self.list_all::<ReferencesResponse>(&url, "").await
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<TableHandle, CatalogError> {
        let key = spec.key();
        let metadata = TableMetadata::create(spec, now_ms());
        let location = metadata_file_location(spec.location(), 0);
        self.write_json(&location, &metadata).await?;

        let operations = [Operation::Put {
            key: key.clone(),
            content: Content::IcebergTable(metadata.to_content(None, &location)),
        }];
        let message = format!("Create table {}", spec.qualified_name());
        let attempts = self.commit_retries + 1;

        for attempt in 1..=attempts {
            let head = self.reference(spec.branch()).await?;
            if self.get_content(&head, &key).await?.is_some() {
                return Err(CatalogError::TableAlreadyExists(spec.qualified_name()));
            }

            match self.commit(&head, &message, &operations).await {
                Ok(committed) => {
                    let content_id = committed
                        .added_contents
                        .into_iter()
                        .find(|added| added.key == key)
                        .map(|added| added.content_id);
                    tracing::info!(table = %spec.qualified_name(), "created table");
                    return Ok(TableHandle {
                        spec: spec.clone(),
                        reference: committed.target_branch,
                        content_id,
                        metadata_location: location,
                        metadata,
                    });
                }
                Err(CatalogError::Conflict(reason)) => {
                    tracing::debug!(table = %spec.qualified_name(), attempt, %reason, "create conflicted");
                }
                Err(error) => return Err(error),
            }
        }

        Err(CatalogError::CommitRetriesExhausted {
            table: spec.qualified_name(),
            attempts,
        })
    }

    async fn commit_append(&self, table: &TableHandle, file: &DataFile) -> Result<(), CatalogError> {
        self.commit_update(table, TableUpdate::Append(file)).await
    }

    async fn refresh(&self, table: &mut TableHandle) -> Result<(), CatalogError> {
        let head = self.reference(table.spec.branch()).await?;
        *table = self.load_table(&table.spec, head).await?;
        Ok(())
    }

    async fn update_properties(
        &self,
        table: &TableHandle,
        properties: &BTreeMap<String, String>,
    ) -> Result<(), CatalogError> {
        self.commit_update(table, TableUpdate::Properties(properties))
            .await
    }

    async fn entries(&self, reference: &Reference) -> Result<Vec<CatalogEntry>, CatalogError> {
        let url = self.tree_url(&reference.pinned(), "entries");
        self.list_all::<EntriesResponse>(&url, "").await
    }

    async fn get_content(
        &self,
        reference: &Reference,
        key: &ContentKey,
    ) -> Result<Option<Content>, CatalogError> {
        let url = self.tree_url(
            &reference.pinned(),
            &format!("contents/{}", urlencoding::encode(&key.to_path_string())),
        );
        let resp = self.http.get(&url).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            let body: NessieErrorBody =
                serde_json::from_str(&resp.text().await.unwrap_or_default()).unwrap_or_default();
            if body.error_code == "REFERENCE_NOT_FOUND" {
                return Err(CatalogError::NotFound(body.message));
            }
            return Ok(None);
        }

        let found: ContentResponse = check_response(resp).await?.json().await?;
        Ok(Some(found.content))
    }

    async fn commit_log(
        &self,
        reference: &Reference,
        fetch_all: bool,
    ) -> Result<Vec<LogEntry>, CatalogError> {
        let url = self.tree_url(&reference.pinned(), "history");
        let query = if fetch_all { "fetch=ALL" } else { "" };
        self.list_all::<LogResponse>(&url, query).await
    }
}
