//! Catalog model: references, keys, contents and commit history.
//!
//! Field names and enum tags follow the Nessie REST API v2 JSON encoding.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Reference
// ---------------------------------------------------------------------------

/// Kind of a named reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceKind {
    Branch,
    Tag,
    #[serde(other)]
    Detached,
}

/// A named pointer into the catalog's commit graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub name: String,
    #[serde(default)]
    pub hash: String,
}

impl Reference {
    #[must_use]
    pub fn branch(name: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Branch,
            name: name.into(),
            hash: hash.into(),
        }
    }

    #[must_use]
    pub fn tag(name: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Tag,
            name: name.into(),
            hash: hash.into(),
        }
    }

    /// `name@hash` form used to read the reference at a fixed commit.
    #[must_use]
    pub fn pinned(&self) -> String {
        if self.hash.is_empty() {
            self.name.clone()
        } else {
            format!("{}@{}", self.name, self.hash)
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// ContentKey
// ---------------------------------------------------------------------------

/// Hierarchical name of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentKey {
    pub elements: Vec<String>,
}

impl ContentKey {
    #[must_use]
    pub fn of<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elements: elements.into_iter().map(Into::into).collect(),
        }
    }

    /// Path-segment encoding: elements joined by `.`, with a `.` inside an
    /// element replaced by the group separator (`\u{1D}`).
    #[must_use]
    pub fn to_path_string(&self) -> String {
        self.elements
            .iter()
            .map(|element| element.replace('.', "\u{1D}"))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.elements.join("."))
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Type tag of a catalog entry as reported by the entries listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    IcebergTable,
    IcebergView,
    Namespace,
    #[serde(other)]
    Other,
}

/// Iceberg table pointer stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcebergTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub metadata_location: String,
    #[serde(default = "no_snapshot")]
    pub snapshot_id: i64,
    #[serde(default)]
    pub schema_id: i32,
    #[serde(default)]
    pub spec_id: i32,
    #[serde(default)]
    pub sort_order_id: i32,
}

const fn no_snapshot() -> i64 {
    -1
}

/// Content stored under a key. Only Iceberg tables are interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Content {
    IcebergTable(IcebergTable),
    #[serde(other)]
    Other,
}

impl Content {
    #[must_use]
    pub const fn as_iceberg_table(&self) -> Option<&IcebergTable> {
        match self {
            Self::IcebergTable(table) => Some(table),
            Self::Other => None,
        }
    }

    #[must_use]
    pub fn metadata_location(&self) -> Option<&str> {
        self.as_iceberg_table()
            .map(|table| table.metadata_location.as_str())
    }
}

/// One row of a reference's entries listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: ContentKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

impl CatalogEntry {
    #[must_use]
    pub fn is_table(&self) -> bool {
        self.content_type == ContentType::IcebergTable
    }
}

// ---------------------------------------------------------------------------
// Commit log
// ---------------------------------------------------------------------------

/// A change to one key within a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Put { key: ContentKey, content: Content },
    Delete { key: ContentKey },
    Unchanged { key: ContentKey },
}

impl Operation {
    /// Key and Iceberg table of a `PUT` that stores a table.
    #[must_use]
    pub fn table_put(&self) -> Option<(&ContentKey, &IcebergTable)> {
        match self {
            Self::Put { key, content } => content.as_iceberg_table().map(|table| (key, table)),
            Self::Delete { .. } | Self::Unchanged { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMeta {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_time: Option<DateTime<Utc>>,
}

/// One historical commit of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub commit_meta: CommitMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_commit_hash: Option<String>,
    /// Only populated when the log is fetched with all details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<Operation>>,
}

impl LogEntry {
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.commit_meta.hash
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().flatten()
    }
}
