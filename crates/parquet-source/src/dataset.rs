//! In-memory tabular dataset

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

/// One Parquet file that contributed to a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    /// Key relative to the backend root
    pub key: String,
    /// Size in bytes as listed
    pub size: u64,
    /// Partition values from `key=value` directories, in path order
    pub partitions: Vec<(String, String)>,
}

/// Rows loaded from a Parquet file set, as Arrow record batches sharing one schema
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    files: Vec<DataFile>,
}

impl Dataset {
    pub(crate) fn new(schema: SchemaRef, batches: Vec<RecordBatch>, files: Vec<DataFile>) -> Self {
        Self {
            schema,
            batches,
            files,
        }
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn files(&self) -> &[DataFile] {
        &self.files
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    }

    /// All rows in a single batch
    pub fn concat(&self) -> crate::Result<RecordBatch> {
        Ok(arrow::compute::concat_batches(&self.schema, &self.batches)?)
    }
}
