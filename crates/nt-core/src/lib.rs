//! # nt-core
//!
//! Core value types shared by every nessie-tools crate.
//!
//! - Catalog model as served by the Nessie REST API v2 (references, content
//!   keys, contents, commit log entries and their operations)
//! - Table provisioning descriptors (table spec, synthetic data files)
//! - Accessibility check results and audit findings
//! - Cross-cutting error types
//!
//! The catalog types derive `serde` with the exact field names Nessie uses on
//! the wire, so the HTTP client can decode responses straight into them.

pub mod catalog;
pub mod check;
pub mod errors;
pub mod table;

pub use catalog::{
    CatalogEntry, CommitMeta, Content, ContentKey, ContentType, IcebergTable, LogEntry, Operation,
    Reference, ReferenceKind,
};
pub use check::{AuditFinding, AuditTally, CheckResult, CheckStatus, FindingOrigin};
pub use errors::CoreError;
pub use table::{DataFile, FileFormat, SchemaField, SnapshotRequest, TableSpec};
