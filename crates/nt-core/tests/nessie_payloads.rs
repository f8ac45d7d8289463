//! Decoding of full Nessie API v2 response bodies into core types.

use nt_core::{CatalogEntry, Content, LogEntry, Operation, Reference, ReferenceKind};
use pretty_assertions::assert_eq;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferencesPage {
    references: Vec<Reference>,
    has_more: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogPage {
    log_entries: Vec<LogEntry>,
}

#[derive(Deserialize)]
struct EntriesPage {
    entries: Vec<CatalogEntry>,
}

#[test]
fn references_page_with_branches_and_tags() {
    let body = r#"{
        "references": [
            {"type": "BRANCH", "name": "main", "hash": "aa11", "metadata": null},
            {"type": "BRANCH", "name": "etl", "hash": "bb22"},
            {"type": "TAG", "name": "release-1", "hash": "aa11"}
        ],
        "hasMore": false,
        "token": null
    }"#;

    let page: ReferencesPage = serde_json::from_str(body).unwrap();
    assert!(!page.has_more);
    assert_eq!(page.references.len(), 3);
    assert_eq!(page.references[2].kind, ReferenceKind::Tag);
    assert_eq!(page.references[0].hash, page.references[2].hash);
}

#[test]
fn history_page_with_operations() {
    let body = r#"{
        "logEntries": [
            {
                "commitMeta": {
                    "hash": "c3",
                    "committer": "gentool",
                    "authors": ["gentool"],
                    "message": "Update table table10",
                    "commitTime": "2024-05-02T08:30:00.123Z",
                    "authorTime": "2024-05-02T08:30:00.123Z",
                    "properties": {}
                },
                "parentCommitHash": "c2",
                "operations": [
                    {
                        "type": "PUT",
                        "key": {"elements": ["table10"]},
                        "content": {
                            "type": "ICEBERG_TABLE",
                            "id": "7d7b",
                            "metadataLocation": "s3://wh/table10/metadata/00002-x.metadata.json",
                            "snapshotId": 9,
                            "schemaId": 0,
                            "specId": 0,
                            "sortOrderId": 0
                        }
                    }
                ]
            },
            {
                "commitMeta": {"hash": "c2", "message": "Drop legacy"},
                "parentCommitHash": "c1",
                "operations": [{"type": "DELETE", "key": {"elements": ["legacy"]}}]
            }
        ],
        "hasMore": false
    }"#;

    let page: LogPage = serde_json::from_str(body).unwrap();
    let hashes: Vec<_> = page.log_entries.iter().map(LogEntry::hash).collect();
    assert_eq!(hashes, ["c3", "c2"]);

    let first_put = page.log_entries[0]
        .operations()
        .find_map(Operation::table_put)
        .unwrap();
    assert_eq!(first_put.0.to_string(), "table10");
    assert_eq!(first_put.1.snapshot_id, 9);
    assert_eq!(page.log_entries[1].operations().filter_map(Operation::table_put).count(), 0);
}

#[test]
fn entries_page_keeps_unknown_types() {
    let body = r#"{
        "entries": [
            {"type": "ICEBERG_TABLE", "name": {"elements": ["db", "t"]}, "contentId": "1"},
            {"type": "ICEBERG_VIEW", "name": {"elements": ["db", "v"]}, "contentId": "2"},
            {"type": "UDF", "name": {"elements": ["f"]}}
        ],
        "hasMore": false
    }"#;

    let page: EntriesPage = serde_json::from_str(body).unwrap();
    assert_eq!(page.entries.iter().filter(|e| e.is_table()).count(), 1);
    assert_eq!(page.entries[0].name.to_string(), "db.t");
}

#[test]
fn iceberg_view_content_is_not_a_table() {
    let content: Content = serde_json::from_str(
        r#"{"type": "ICEBERG_VIEW", "id": "v", "metadataLocation": "s3://b/v.json", "versionId": 1}"#,
    )
    .unwrap();
    assert_eq!(content.metadata_location(), None);
}
