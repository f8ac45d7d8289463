//! Iceberg table metadata (format version 2) as written next to each table.
//!
//! Only what a fast-append and a property update touch is modelled: schemas,
//! the unpartitioned spec, the unsorted order, snapshots and their logs.

use std::collections::BTreeMap;

use nt_core::{DataFile, IcebergTable, SchemaField, TableSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const FORMAT_VERSION: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub schema_id: i32,
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionSpec {
    pub spec_id: i32,
    pub fields: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SortOrder {
    pub order_id: i32,
    pub fields: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Snapshot {
    pub snapshot_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_snapshot_id: Option<i64>,
    pub sequence_number: i64,
    pub timestamp_ms: i64,
    pub manifest_list: String,
    pub summary: BTreeMap<String, String>,
    pub schema_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotLogEntry {
    pub snapshot_id: i64,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetadataLogEntry {
    pub metadata_file: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TableMetadata {
    pub format_version: u8,
    pub table_uuid: String,
    pub location: String,
    pub last_sequence_number: i64,
    pub last_updated_ms: i64,
    pub last_column_id: i32,
    pub schemas: Vec<Schema>,
    pub current_schema_id: i32,
    pub partition_specs: Vec<PartitionSpec>,
    pub default_spec_id: i32,
    pub last_partition_id: i32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_snapshot_id: Option<i64>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub snapshot_log: Vec<SnapshotLogEntry>,
    #[serde(default)]
    pub metadata_log: Vec<MetadataLogEntry>,
    pub sort_orders: Vec<SortOrder>,
    pub default_sort_order_id: i32,
}

impl TableMetadata {
    /// Metadata of a fresh, empty table.
    #[must_use]
    pub fn create(spec: &TableSpec, now_ms: i64) -> Self {
        let fields = spec.fields().to_vec();
        Self {
            format_version: FORMAT_VERSION,
            table_uuid: Uuid::new_v4().to_string(),
            location: spec.location().to_string(),
            last_sequence_number: 0,
            last_updated_ms: now_ms,
            last_column_id: fields.iter().map(|field| field.id).max().unwrap_or(0),
            schemas: vec![Schema {
                schema_type: "struct".to_string(),
                schema_id: 0,
                fields,
            }],
            current_schema_id: 0,
            partition_specs: vec![PartitionSpec {
                spec_id: 0,
                fields: Vec::new(),
            }],
            default_spec_id: 0,
            // No partition fields yet; Iceberg starts field ids at 1000.
            last_partition_id: 999,
            properties: BTreeMap::new(),
            current_snapshot_id: None,
            snapshots: Vec::new(),
            snapshot_log: Vec::new(),
            metadata_log: Vec::new(),
            sort_orders: vec![SortOrder {
                order_id: 0,
                fields: Vec::new(),
            }],
            default_sort_order_id: 0,
        }
    }

    #[must_use]
    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        let current = self.current_snapshot_id?;
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.snapshot_id == current)
    }

    /// Version number for the next metadata file written from this state.
    #[must_use]
    pub const fn next_version(&self) -> usize {
        self.metadata_log.len() + 1
    }

    /// State after a fast-append of `file` in a new snapshot.
    ///
    /// `previous` is the location of the metadata file `self` was read from.
    #[must_use]
    pub fn appended(
        &self,
        previous: &str,
        snapshot_id: i64,
        manifest_list: String,
        file: &DataFile,
        now_ms: i64,
    ) -> Self {
        let mut next = self.successor(previous, now_ms);
        let sequence_number = self.last_sequence_number + 1;

        let parent_summary = self.current_snapshot().map(|s| &s.summary);
        let total = |name: &str, added: u64| {
            let before = parent_summary
                .and_then(|summary| summary.get(name))
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(0);
            (before + added).to_string()
        };

        let summary = BTreeMap::from([
            ("operation".to_string(), "append".to_string()),
            ("added-data-files".to_string(), "1".to_string()),
            ("added-records".to_string(), file.record_count.to_string()),
            (
                "added-files-size".to_string(),
                file.file_size_in_bytes.to_string(),
            ),
            ("total-data-files".to_string(), total("total-data-files", 1)),
            (
                "total-records".to_string(),
                total("total-records", file.record_count),
            ),
            (
                "total-files-size".to_string(),
                total("total-files-size", file.file_size_in_bytes),
            ),
        ]);

        next.snapshots.push(Snapshot {
            snapshot_id,
            parent_snapshot_id: self.current_snapshot_id,
            sequence_number,
            timestamp_ms: now_ms,
            manifest_list,
            summary,
            schema_id: self.current_schema_id,
        });
        next.snapshot_log.push(SnapshotLogEntry {
            snapshot_id,
            timestamp_ms: now_ms,
        });
        next.last_sequence_number = sequence_number;
        next.current_snapshot_id = Some(snapshot_id);
        next
    }

    /// State after merging `properties` into the table properties.
    #[must_use]
    pub fn with_properties(
        &self,
        previous: &str,
        properties: &BTreeMap<String, String>,
        now_ms: i64,
    ) -> Self {
        let mut next = self.successor(previous, now_ms);
        next.properties.extend(
            properties
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        next
    }

    /// Catalog pointer for this state stored at `metadata_location`.
    #[must_use]
    pub fn to_content(&self, id: Option<String>, metadata_location: &str) -> IcebergTable {
        IcebergTable {
            id,
            metadata_location: metadata_location.to_string(),
            snapshot_id: self.current_snapshot_id.unwrap_or(-1),
            schema_id: self.current_schema_id,
            spec_id: self.default_spec_id,
            sort_order_id: self.default_sort_order_id,
        }
    }

    fn successor(&self, previous: &str, now_ms: i64) -> Self {
        let mut next = self.clone();
        next.last_updated_ms = now_ms;
        next.metadata_log.push(MetadataLogEntry {
            metadata_file: previous.to_string(),
            timestamp_ms: self.last_updated_ms,
        });
        next
    }
}

/// JSON manifest naming the files a snapshot added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestList {
    pub snapshot_id: i64,
    pub sequence_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_manifest_list: Option<String>,
    pub added_files: Vec<DataFile>,
}

/// `<table>/metadata/<version:05>-<uuid>.metadata.json`
#[must_use]
pub fn metadata_file_location(table_location: &str, version: usize) -> String {
    format!(
        "{}/metadata/{version:05}-{}.metadata.json",
        table_location.trim_end_matches('/'),
        Uuid::new_v4()
    )
}

/// `<table>/metadata/snap-<snapshot-id>-<uuid>.json`
#[must_use]
pub fn manifest_list_location(table_location: &str, snapshot_id: i64) -> String {
    format!(
        "{}/metadata/snap-{snapshot_id}-{}.json",
        table_location.trim_end_matches('/'),
        Uuid::new_v4()
    )
}

/// Random positive snapshot id.
#[must_use]
pub fn new_snapshot_id() -> i64 {
    let (high, _) = Uuid::new_v4().as_u64_pair();
    i64::try_from(high >> 1).unwrap_or(i64::MAX)
}

/// Milliseconds since the epoch.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use nt_core::table::{COMMIT_NUM_RETRIES, GC_ENABLED};
    use pretty_assertions::assert_eq;

    use super::*;

    fn spec() -> TableSpec {
        TableSpec::new("table42", "main", "s3://bucket/wh").unwrap()
    }

    #[test]
    fn create_has_single_required_id_column() {
        let metadata = TableMetadata::create(&spec(), 1_000);
        assert_eq!(metadata.location, "s3://bucket/wh/table42");
        assert_eq!(metadata.last_column_id, 1);
        assert_eq!(metadata.schemas[0].fields, vec![SchemaField::id_column()]);
        assert_eq!(metadata.current_snapshot_id, None);
        assert_eq!(metadata.next_version(), 1);

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["format-version"], 2);
        assert_eq!(json["schemas"][0]["fields"][0]["type"], "int");
        assert_eq!(json["schemas"][0]["fields"][0]["required"], true);
        assert!(json.get("current-snapshot-id").is_none());
    }

    #[test]
    fn appends_chain_snapshots_and_totals() {
        let created = TableMetadata::create(&spec(), 1_000);
        let first = created.appended(
            "m0.json",
            11,
            "snap-11.json".into(),
            &DataFile::synthetic("s3://bucket/wh/table42/data/data_0.parquet"),
            2_000,
        );
        let second = first.appended(
            "m1.json",
            22,
            "snap-22.json".into(),
            &DataFile::synthetic("s3://bucket/wh/table42/data/data_1.parquet"),
            3_000,
        );

        assert_eq!(second.snapshots.len(), 2);
        assert_eq!(second.current_snapshot_id, Some(22));
        assert_eq!(second.snapshots[1].parent_snapshot_id, Some(11));
        assert_eq!(second.last_sequence_number, 2);

        let summary = &second.current_snapshot().unwrap().summary;
        assert_eq!(summary["operation"], "append");
        assert_eq!(summary["total-data-files"], "2");
        assert_eq!(summary["total-records"], "2");
        assert_eq!(summary["total-files-size"], "1118");

        let previous: Vec<_> = second
            .metadata_log
            .iter()
            .map(|entry| entry.metadata_file.as_str())
            .collect();
        assert_eq!(previous, ["m0.json", "m1.json"]);
        assert_eq!(second.next_version(), 3);
    }

    #[test]
    fn properties_merge_without_touching_snapshots() {
        let created = TableMetadata::create(&spec(), 1_000);
        let props = BTreeMap::from([
            (GC_ENABLED.to_string(), "true".to_string()),
            (COMMIT_NUM_RETRIES.to_string(), "4".to_string()),
        ]);
        let updated = created.with_properties("m0.json", &props, 5_000);

        assert_eq!(updated.properties, props);
        assert_eq!(updated.snapshots, created.snapshots);
        assert_eq!(updated.last_updated_ms, 5_000);
    }

    #[test]
    fn content_pointer_uses_current_snapshot() {
        let created = TableMetadata::create(&spec(), 1_000);
        assert_eq!(created.to_content(None, "m0.json").snapshot_id, -1);

        let appended = created.appended(
            "m0.json",
            7,
            "snap.json".into(),
            &DataFile::synthetic("f"),
            2_000,
        );
        let content = appended.to_content(Some("cid".into()), "m1.json");
        assert_eq!(content.snapshot_id, 7);
        assert_eq!(content.id.as_deref(), Some("cid"));
        assert_eq!(content.metadata_location, "m1.json");
    }

    #[test]
    fn file_locations_follow_iceberg_layout() {
        let metadata = metadata_file_location("/tmp/wh/t1/", 3);
        assert!(metadata.starts_with("/tmp/wh/t1/metadata/00003-"));
        assert!(metadata.ends_with(".metadata.json"));

        let manifest = manifest_list_location("s3://b/t1", 99);
        assert!(manifest.starts_with("s3://b/t1/metadata/snap-99-"));
        assert!(new_snapshot_id() > 0);
    }
}
