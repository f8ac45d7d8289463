//! The one-row parquet file every synthetic snapshot is copied from.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{ArrayRef, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use nt_core::SchemaField;
use parquet::arrow::{ArrowWriter, PARQUET_FIELD_ID_META_KEY};
use parquet::file::properties::WriterProperties;
use tempfile::TempDir;

use crate::error::SetupError;

pub const TEMPLATE_FILE_NAME: &str = "template_data.parquet";

/// `<warehouse>/template_data.parquet`
#[must_use]
pub fn template_location(warehouse: &str) -> String {
    format!("{}/{TEMPLATE_FILE_NAME}", warehouse.trim_end_matches('/'))
}

/// A template data file in a private temp directory, removed on drop.
#[derive(Debug)]
pub struct TemplateFile {
    _dir: TempDir,
    path: PathBuf,
}

impl TemplateFile {
    /// Write one row matching `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if the temp directory cannot be created, a
    /// column type has no arrow mapping, or the parquet write fails.
    pub fn write(fields: &[SchemaField]) -> Result<Self, SetupError> {
        let dir = tempfile::Builder::new().prefix("nessie-tools-").tempdir()?;
        let path = dir.path().join(TEMPLATE_FILE_NAME);

        let (schema, columns) = one_row(fields)?;
        let batch = RecordBatch::try_new(Arc::clone(&schema), columns)
            .map_err(|e| SetupError::TemplateWrite(e.into()))?;

        let props = WriterProperties::builder()
            .set_created_by("nessie-tools".to_string())
            .build();
        let mut writer = ArrowWriter::try_new(File::create(&path)?, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = %path.display(), "wrote template data file");
        Ok(Self { _dir: dir, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn one_row(fields: &[SchemaField]) -> Result<(Arc<Schema>, Vec<ArrayRef>), SetupError> {
    let mut arrow_fields = Vec::with_capacity(fields.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.len());

    for field in fields {
        let (data_type, column): (DataType, ArrayRef) = match field.field_type.as_str() {
            "int" => (DataType::Int32, Arc::new(Int32Array::from(vec![1]))),
            "long" => (DataType::Int64, Arc::new(Int64Array::from(vec![1_i64]))),
            "string" => (DataType::Utf8, Arc::new(StringArray::from(vec!["1"]))),
            other => return Err(SetupError::UnsupportedColumn(other.to_string())),
        };
        arrow_fields.push(
            Field::new(&field.name, data_type, !field.required).with_metadata(HashMap::from([(
                PARQUET_FIELD_ID_META_KEY.to_string(),
                field.id.to_string(),
            )])),
        );
        columns.push(column);
    }

    Ok((Arc::new(Schema::new(arrow_fields)), columns))
}
