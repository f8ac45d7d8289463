//! NessieCatalog against a mocked Nessie REST API v2.

use std::sync::Arc;

use mockito::{Matcher, Mock, Server, ServerGuard};
use nt_catalog::{CatalogClient, CatalogError, NessieCatalog};
use nt_config::NessieConfig;
use nt_core::{ContentKey, DataFile, Reference, TableSpec};
use nt_storage::LocalStorage;
use pretty_assertions::assert_eq;

fn catalog(server: &ServerGuard, commit_retries: u32) -> NessieCatalog {
    let config = NessieConfig {
        uri: server.url(),
        commit_retries,
        ..NessieConfig::default()
    };
    NessieCatalog::new(&config, Arc::new(LocalStorage::new())).unwrap()
}

fn path(pattern: &str) -> Matcher {
    Matcher::Regex(format!("^{pattern}$"))
}

async fn mock_head(server: &mut ServerGuard, hash: &str) -> Mock {
    server
        .mock("GET", "/trees/main")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(format!(
            r#"{{"reference":{{"type":"BRANCH","name":"main","hash":"{hash}"}}}}"#
        ))
        .create_async()
        .await
}

async fn mock_content_missing(server: &mut ServerGuard, hash: &str) -> Mock {
    server
        .mock("GET", path(&format!("/trees/main(%40|@){hash}/contents/table1")))
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"status":404,"reason":"Not Found","message":"Could not find content for key 'table1'","errorCode":"CONTENT_NOT_FOUND"}"#)
        .create_async()
        .await
}

fn commit_response(hash: &str) -> String {
    format!(
        r#"{{"targetBranch":{{"type":"BRANCH","name":"main","hash":"{hash}"}},"addedContents":[{{"key":{{"elements":["table1"]}},"contentId":"cid-1"}}]}}"#
    )
}

#[tokio::test]
async fn default_branch_uses_dash_alias() {
    //* Given
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/trees/-")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"reference":{"type":"BRANCH","name":"main","hash":"abc"}}"#)
        .expect(1)
        .create_async()
        .await;

    //* When
    let branch = catalog(&server, 4).default_branch().await.unwrap();

    //* Then
    mock.assert_async().await;
    assert_eq!(branch, Reference::branch("main", "abc"));
}

#[tokio::test]
async fn references_follow_page_tokens() {
    //* Given
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/trees")
        .match_query(Matcher::Exact("max-records=250".into()))
        .with_status(200)
        .with_body(r#"{"hasMore":true,"token":"t2","references":[{"type":"BRANCH","name":"main","hash":"h1"}]}"#)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/trees")
        .match_query(Matcher::Exact("max-records=250&page-token=t2".into()))
        .with_status(200)
        .with_body(r#"{"hasMore":false,"references":[{"type":"TAG","name":"v1","hash":"h0"}]}"#)
        .expect(1)
        .create_async()
        .await;

    //* When
    let references = catalog(&server, 4).all_references().await.unwrap();

    //* Then
    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(
        references,
        vec![Reference::branch("main", "h1"), Reference::tag("v1", "h0")]
    );
}

#[tokio::test]
async fn create_table_writes_metadata_and_commits() {
    //* Given
    let warehouse = tempfile::tempdir().unwrap();
    let mut server = Server::new_async().await;
    let _head = mock_head(&mut server, "h1").await;
    let _missing = mock_content_missing(&mut server, "h1").await;
    let commit = server
        .mock("POST", path("/trees/main(%40|@)h1/history/commit"))
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJsonString(
            r#"{"operations":[{"type":"PUT","key":{"elements":["table1"]}}]}"#.into(),
        ))
        .with_status(200)
        .with_body(commit_response("h2"))
        .expect(1)
        .create_async()
        .await;
    let spec = TableSpec::new("table1", "main", &warehouse.path().to_string_lossy()).unwrap();

    //* When
    let table = catalog(&server, 4).create_table(&spec).await.unwrap();

    //* Then
    commit.assert_async().await;
    assert_eq!(table.reference, Reference::branch("main", "h2"));
    assert_eq!(table.content_id.as_deref(), Some("cid-1"));
    assert_eq!(table.current_snapshot_id(), None);
    assert!(table.metadata_location.contains("/table1/metadata/00000-"));
    assert!(std::path::Path::new(&table.metadata_location).is_file());
}

#[tokio::test]
async fn existing_table_is_not_recreated() {
    //* Given
    let mut server = Server::new_async().await;
    let _head = mock_head(&mut server, "h1").await;
    let _content = server
        .mock("GET", path("/trees/main(%40|@)h1/contents/table1"))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"content":{"type":"ICEBERG_TABLE","id":"cid-1","metadataLocation":"/wh/table1/metadata/00000-a.metadata.json"}}"#)
        .create_async()
        .await;
    let commit = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let warehouse = tempfile::tempdir().unwrap();
    let spec = TableSpec::new("table1", "main", &warehouse.path().to_string_lossy()).unwrap();

    //* When
    let result = catalog(&server, 4).create_table(&spec).await;

    //* Then
    commit.assert_async().await;
    assert!(matches!(result, Err(CatalogError::TableAlreadyExists(name)) if name == "table1@main"));
}

#[tokio::test]
async fn append_conflict_refreshes_and_retries() {
    //* Given
    let warehouse = tempfile::tempdir().unwrap();
    let mut server = Server::new_async().await;
    let head = mock_head(&mut server, "h1").await;
    let _missing = mock_content_missing(&mut server, "h1").await;
    let _create = server
        .mock("POST", path("/trees/main(%40|@)h1/history/commit"))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(commit_response("h2"))
        .create_async()
        .await;
    let spec = TableSpec::new("table1", "main", &warehouse.path().to_string_lossy()).unwrap();
    let catalog = catalog(&server, 4);
    let table = catalog.create_table(&spec).await.unwrap();
    head.remove_async().await;

    let conflict = server
        .mock("POST", path("/trees/main(%40|@)h2/history/commit"))
        .match_query(Matcher::Any)
        .with_status(409)
        .with_body(r#"{"status":409,"reason":"Conflict","message":"Hash h2 is not the head","errorCode":"REFERENCE_CONFLICT"}"#)
        .expect(1)
        .create_async()
        .await;
    let _moved = mock_head(&mut server, "h3").await;
    let _reload = server
        .mock("GET", path("/trees/main(%40|@)h3/contents/table1"))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(format!(
            r#"{{"content":{{"type":"ICEBERG_TABLE","id":"cid-1","metadataLocation":"{}"}}}}"#,
            table.metadata_location
        ))
        .create_async()
        .await;
    let retried = server
        .mock("POST", path("/trees/main(%40|@)h3/history/commit"))
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJsonString(
            r#"{"operations":[{"type":"PUT","content":{"id":"cid-1"}}]}"#.into(),
        ))
        .with_status(200)
        .with_body(commit_response("h4"))
        .expect(1)
        .create_async()
        .await;

    //* When
    let file = DataFile::synthetic(format!("{}/data/data_0.parquet", spec.location()));
    catalog.commit_append(&table, &file).await.unwrap();

    //* Then
    conflict.assert_async().await;
    retried.assert_async().await;
}

#[tokio::test]
async fn conflicts_exhaust_retries() {
    //* Given
    let warehouse = tempfile::tempdir().unwrap();
    let mut server = Server::new_async().await;
    let _head = mock_head(&mut server, "h1").await;
    let _missing = mock_content_missing(&mut server, "h1").await;
    let _commit = server
        .mock("POST", Matcher::Any)
        .with_status(409)
        .with_body(r#"{"status":409,"reason":"Conflict","message":"conflict","errorCode":"REFERENCE_CONFLICT"}"#)
        .create_async()
        .await;
    let spec = TableSpec::new("table1", "main", &warehouse.path().to_string_lossy()).unwrap();

    //* When
    let result = catalog(&server, 0).create_table(&spec).await;

    //* Then
    assert!(matches!(
        result,
        Err(CatalogError::CommitRetriesExhausted { attempts: 1, .. })
    ));
}

#[tokio::test]
async fn missing_reference_differs_from_missing_content() {
    //* Given
    let mut server = Server::new_async().await;
    let _gone = server
        .mock("GET", path("/trees/gone(%40|@)h9/contents/t1"))
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"status":404,"reason":"Not Found","message":"Named reference 'gone' not found","errorCode":"REFERENCE_NOT_FOUND"}"#)
        .create_async()
        .await;
    let _absent = mock_content_missing(&mut server, "h1").await;
    let catalog = catalog(&server, 4);

    //* When
    let gone = catalog
        .get_content(&Reference::branch("gone", "h9"), &ContentKey::of(["t1"]))
        .await;
    let absent = catalog
        .get_content(&Reference::branch("main", "h1"), &ContentKey::of(["table1"]))
        .await;

    //* Then
    assert!(matches!(gone, Err(CatalogError::NotFound(_))));
    assert_eq!(absent.unwrap(), None);
}

#[tokio::test]
async fn commit_log_requests_operations() {
    //* Given
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", path("/trees/dev(%40|@)h2/history"))
        .match_query(Matcher::UrlEncoded("fetch".into(), "ALL".into()))
        .with_status(200)
        .with_body(
            r#"{"hasMore":false,"logEntries":[
                {"commitMeta":{"hash":"h2","message":"add t2"},"parentCommitHash":"h1",
                 "operations":[{"type":"PUT","key":{"elements":["t2"]},
                   "content":{"type":"ICEBERG_TABLE","id":"c2","metadataLocation":"s3://b/t2/m.json"}}]},
                {"commitMeta":{"hash":"h1","message":"add t1"},"parentCommitHash":"h0"}]}"#,
        )
        .expect(1)
        .create_async()
        .await;

    //* When
    let log = catalog(&server, 4)
        .commit_log(&Reference::branch("dev", "h2"), true)
        .await
        .unwrap();

    //* Then
    mock.assert_async().await;
    assert_eq!(log.len(), 2);
    let (key, table) = log[0].operations().find_map(|op| op.table_put()).unwrap();
    assert_eq!(key, &ContentKey::of(["t2"]));
    assert_eq!(table.metadata_location, "s3://b/t2/m.json");
    assert_eq!(log[1].operations().count(), 0);
}

#[tokio::test]
async fn server_errors_carry_error_code() {
    //* Given
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/trees")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body(r#"{"status":500,"reason":"Internal Server Error","message":"boom","errorCode":"UNKNOWN"}"#)
        .create_async()
        .await;

    //* When
    let result = catalog(&server, 4).all_references().await;

    //* Then
    match result {
        Err(CatalogError::Api {
            status,
            code,
            message,
        }) => {
            assert_eq!(status, 500);
            assert_eq!(code, "UNKNOWN");
            assert_eq!(message, "boom");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}
