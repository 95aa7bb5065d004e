//! Discovery and decoding of partitioned Parquet datasets

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet_mount_file::ObjectBackend;
use std::sync::Arc;
use tracing::{debug, info};

use crate::partition::{is_hidden, parse_partitions, partition_keys};
use crate::{DataFile, Dataset, DatasetError, Result};

const PARQUET_EXTENSION: &str = ".parquet";

/// Options for reading a dataset
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Append `key=value` partition values as Utf8 columns
    pub partition_columns: bool,

    /// Required partition keys, in path order (e.g. `year`, `month`, `day`).
    /// When set, every file must sit under exactly these partition directories.
    pub expected_partitions: Option<Vec<String>>,

    /// Maximum rows per decoded record batch
    pub batch_size: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            partition_columns: false,
            expected_partitions: None,
            batch_size: 8192,
        }
    }
}

/// Key of `file_key` relative to the dataset root `root_key`
fn relative_to<'a>(root_key: &str, file_key: &'a str) -> &'a str {
    let root_key = root_key.trim_matches('/');
    if root_key.is_empty() || root_key == file_key {
        return file_key.rsplit('/').next().unwrap_or(file_key);
    }
    file_key
        .strip_prefix(root_key)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(file_key)
}

/// List the Parquet files making up the dataset at `key`.
///
/// Hidden files and directories (leading `_` or `.`) and files without a
/// `.parquet` extension are skipped. A key naming a single object is returned
/// as-is. Files come back in key order.
pub async fn discover(backend: &dyn ObjectBackend, key: &str) -> Result<Vec<DataFile>> {
    let root_key = key.trim_matches('/');
    let entries = backend.list(root_key, true).await?;

    if let [single] = entries.as_slice() {
        if single.key == root_key && !root_key.is_empty() {
            return Ok(vec![DataFile {
                key: single.key.clone(),
                size: single.size.unwrap_or(0),
                partitions: Vec::new(),
            }]);
        }
    }

    let mut files = Vec::new();
    for entry in entries {
        let relative = relative_to(root_key, &entry.key);
        if relative.split('/').any(is_hidden) {
            debug!("Skipping hidden file: {}", backend.display_key(&entry.key));
            continue;
        }
        if !relative.to_ascii_lowercase().ends_with(PARQUET_EXTENSION) {
            debug!("Skipping non-Parquet file: {}", backend.display_key(&entry.key));
            continue;
        }

        files.push(DataFile {
            partitions: parse_partitions(relative),
            size: entry.size.unwrap_or(0),
            key: entry.key,
        });
    }

    files.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(files)
}

fn check_partition_layout(
    backend: &dyn ObjectBackend,
    files: &[DataFile],
    options: &ReadOptions,
) -> Result<()> {
    let expected = match (&options.expected_partitions, files.first()) {
        (Some(expected), _) => expected.clone(),
        // Appended partition columns need one key set across all files
        (None, Some(first)) if options.partition_columns => partition_keys(&first.partitions),
        _ => return Ok(()),
    };

    for file in files {
        let found = partition_keys(&file.partitions);
        if found != expected {
            return Err(DatasetError::PartitionLayout {
                path: backend.display_key(&file.key),
                expected: expected.join(", "),
                found: found.join(", "),
            });
        }
    }
    Ok(())
}

/// Describe how `found` differs from `expected`, comparing names and types
fn schema_difference(expected: &Schema, found: &Schema) -> Option<String> {
    if expected.fields().len() != found.fields().len() {
        return Some(format!(
            "expected {} columns, found {}",
            expected.fields().len(),
            found.fields().len()
        ));
    }

    for (i, (want, got)) in expected
        .fields()
        .iter()
        .zip(found.fields().iter())
        .enumerate()
    {
        if want.name() != got.name() {
            return Some(format!(
                "column {i}: expected name '{}', found '{}'",
                want.name(),
                got.name()
            ));
        }
        if want.data_type() != got.data_type() {
            return Some(format!(
                "column '{}': expected type {}, found {}",
                want.name(),
                want.data_type(),
                got.data_type()
            ));
        }
    }
    None
}

/// Dataset schema: the file schema with every column nullable and no metadata,
/// plus partition columns when requested
fn build_dataset_schema(file_schema: &Schema, partition_keys: &[String]) -> Result<SchemaRef> {
    let mut fields: Vec<Field> = file_schema
        .fields()
        .iter()
        .map(|field| Field::new(field.name(), field.data_type().clone(), true))
        .collect();

    for key in partition_keys {
        if file_schema.field_with_name(key).is_ok() {
            return Err(DatasetError::SchemaMismatch {
                expected_from: "partition directories".to_string(),
                found_in: "data files".to_string(),
                detail: format!("partition column '{key}' also exists in the data"),
            });
        }
        fields.push(Field::new(key, DataType::Utf8, false));
    }

    Ok(Arc::new(Schema::new(fields)))
}

/// Decode one file into batches of the dataset schema
fn decode_file(
    backend: &dyn ObjectBackend,
    file: &DataFile,
    bytes: bytes::Bytes,
    options: &ReadOptions,
) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let display = backend.display_key(&file.key);
    let parquet_error = |source| DatasetError::Parquet {
        path: display.clone(),
        source,
    };

    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes).map_err(parquet_error)?;
    let file_schema = builder.schema().clone();
    let reader = builder
        .with_batch_size(options.batch_size)
        .build()
        .map_err(parquet_error)?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((file_schema, batches))
}

fn conform_batch(
    schema: &SchemaRef,
    batch: RecordBatch,
    file: &DataFile,
    options: &ReadOptions,
) -> Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    if options.partition_columns {
        for (_, value) in &file.partitions {
            let values = StringArray::from(vec![value.as_str(); batch.num_rows()]);
            columns.push(Arc::new(values));
        }
    }
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

/// Read every Parquet file under `key` into one dataset.
///
/// All files must share the first file's column names and types. Files are
/// read in key order, so row order is deterministic.
pub async fn read_parquet(
    backend: &dyn ObjectBackend,
    key: &str,
    options: &ReadOptions,
) -> Result<Dataset> {
    let files = discover(backend, key).await?;
    if files.is_empty() {
        return Err(DatasetError::NoDataFiles {
            path: backend.display_key(key),
        });
    }
    info!(
        "Reading {} Parquet files from {}",
        files.len(),
        backend.display_key(key)
    );

    check_partition_layout(backend, &files, options)?;

    let appended_keys = if options.partition_columns {
        partition_keys(&files[0].partitions)
    } else {
        Vec::new()
    };

    // First file's schema and where it came from, plus the resulting dataset schema
    let mut reference: Option<(SchemaRef, String, SchemaRef)> = None;
    let mut batches = Vec::new();

    for file in &files {
        let bytes = backend.get(&file.key).await?;
        let (file_schema, file_batches) = decode_file(backend, file, bytes, options)?;

        let dataset_schema = match &reference {
            Some((expected, expected_from, dataset_schema)) => {
                if let Some(detail) = schema_difference(expected, &file_schema) {
                    return Err(DatasetError::SchemaMismatch {
                        expected_from: expected_from.clone(),
                        found_in: backend.display_key(&file.key),
                        detail,
                    });
                }
                dataset_schema.clone()
            }
            None => {
                let dataset_schema = build_dataset_schema(&file_schema, &appended_keys)?;
                reference = Some((
                    file_schema.clone(),
                    backend.display_key(&file.key),
                    dataset_schema.clone(),
                ));
                dataset_schema
            }
        };

        let rows: usize = file_batches.iter().map(RecordBatch::num_rows).sum();
        debug!("Read {} rows from {}", rows, backend.display_key(&file.key));

        for batch in file_batches {
            batches.push(conform_batch(&dataset_schema, batch, file, options)?);
        }
    }

    let schema = match reference {
        Some((_, _, schema)) => schema,
        None => {
            return Err(DatasetError::NoDataFiles {
                path: backend.display_key(key),
            })
        }
    };
    let dataset = Dataset::new(schema, batches, files);
    info!(
        "Loaded {} rows x {} columns from {} files",
        dataset.num_rows(),
        dataset.num_columns(),
        dataset.files().len()
    );
    Ok(dataset)
}
