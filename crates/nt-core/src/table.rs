//! Descriptors for provisioned tables and their synthetic data files.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::ContentKey;
use crate::errors::CoreError;

/// Byte size recorded for every synthetic data file.
pub const SYNTHETIC_FILE_SIZE_BYTES: u64 = 559;

/// Record count recorded for every synthetic data file.
pub const SYNTHETIC_RECORD_COUNT: u64 = 1;

/// Table property enabling garbage collection of unreferenced files.
pub const GC_ENABLED: &str = "gc.enabled";

/// Table property bounding the catalog's commit retries.
pub const COMMIT_NUM_RETRIES: &str = "commit.retry.num-retries";

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub id: i32,
    pub name: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: String,
}

impl SchemaField {
    /// The single required `id: int` column every generated table carries.
    #[must_use]
    pub fn id_column() -> Self {
        Self {
            id: 1,
            name: "id".to_string(),
            required: true,
            field_type: "int".to_string(),
        }
    }
}

/// A table to create on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    name: String,
    branch: String,
    location: String,
    fields: Vec<SchemaField>,
}

impl TableSpec {
    /// Describe table `name` on `branch`, placing its files under
    /// `<warehouse>/<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTableName`] for empty names or names that
    /// contain `@` or `/`.
    pub fn new(name: &str, branch: &str, warehouse: &str) -> Result<Self, CoreError> {
        if name.is_empty() {
            return Err(CoreError::InvalidTableName {
                name: name.to_string(),
                reason: "name is empty".to_string(),
            });
        }
        if name.contains('@') || name.contains('/') {
            return Err(CoreError::InvalidTableName {
                name: name.to_string(),
                reason: "name must not contain '@' or '/'".to_string(),
            });
        }
        if branch.is_empty() {
            return Err(CoreError::Validation(format!(
                "table '{name}' has no target branch"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            branch: branch.to_string(),
            location: format!("{}/{name}", warehouse.trim_end_matches('/')),
            fields: vec![SchemaField::id_column()],
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Root location of the table's data and metadata files.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    #[must_use]
    pub fn key(&self) -> ContentKey {
        ContentKey::of([self.name.as_str()])
    }

    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}@{}", self.name, self.branch)
    }
}

impl fmt::Display for TableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.branch)
    }
}

/// On-disk format of a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileFormat {
    Parquet,
}

impl FileFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parquet => "PARQUET",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A data file appended by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DataFile {
    pub file_path: String,
    pub file_format: FileFormat,
    pub record_count: u64,
    pub file_size_in_bytes: u64,
}

impl DataFile {
    /// Descriptor for a copy of the template data file.
    #[must_use]
    pub fn synthetic(path: impl Into<String>) -> Self {
        Self {
            file_path: path.into(),
            file_format: FileFormat::Parquet,
            record_count: SYNTHETIC_RECORD_COUNT,
            file_size_in_bytes: SYNTHETIC_FILE_SIZE_BYTES,
        }
    }
}

/// One append to perform on a table: copy the template, then commit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub table: String,
    pub source: String,
    pub destination: String,
}

impl SnapshotRequest {
    /// The `index`-th append for `table`, numbered `data_<index>.parquet`.
    #[must_use]
    pub fn numbered(table: &TableSpec, template: &str, index: usize) -> Self {
        Self {
            table: table.qualified_name(),
            source: template.to_string(),
            destination: format!("{}/data/data_{index}.parquet", table.location()),
        }
    }

    #[must_use]
    pub fn data_file(&self) -> DataFile {
        DataFile::synthetic(self.destination.clone())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn spec_places_table_under_warehouse() {
        let spec = TableSpec::new("table7", "main", "s3://bucket/wh/").unwrap();
        assert_eq!(spec.location(), "s3://bucket/wh/table7");
        assert_eq!(spec.qualified_name(), "table7@main");
        assert_eq!(spec.key(), ContentKey::of(["table7"]));
        assert_eq!(spec.fields(), &[SchemaField::id_column()]);
    }

    #[rstest]
    #[case("")]
    #[case("a@b")]
    #[case("a/b")]
    fn invalid_names_rejected(#[case] name: &str) {
        assert!(TableSpec::new(name, "main", "/tmp/wh").is_err());
    }

    #[test]
    fn snapshot_requests_are_numbered() {
        let spec = TableSpec::new("table3", "main", "/tmp/wh").unwrap();
        let request = SnapshotRequest::numbered(&spec, "/tmp/wh/template_data.parquet", 1);
        assert_eq!(request.destination, "/tmp/wh/table3/data/data_1.parquet");
        assert_eq!(request.table, "table3@main");

        let file = request.data_file();
        assert_eq!(file.file_size_in_bytes, 559);
        assert_eq!(file.record_count, 1);
        assert_eq!(file.file_format, FileFormat::Parquet);
    }

    #[test]
    fn data_file_serializes_kebab_case() {
        let value = serde_json::to_value(DataFile::synthetic("s3://b/f.parquet")).unwrap();
        assert_eq!(value["file-path"], "s3://b/f.parquet");
        assert_eq!(value["file-format"], "PARQUET");
        assert_eq!(value["file-size-in-bytes"], 559);
    }
}
