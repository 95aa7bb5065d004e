//! Error types for dataset reads.

use thiserror::Error;

/// Errors that can occur while discovering or decoding a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// No Parquet files under the path.
    #[error("No Parquet files found under {path}")]
    NoDataFiles { path: String },

    /// A file could not be decoded as Parquet.
    #[error("Failed to read Parquet file {path}: {source}")]
    Parquet {
        path: String,
        #[source]
        source: parquet::errors::ParquetError,
    },

    /// A file's schema differs from the first file's.
    #[error("Schema mismatch: {found_in} does not match {expected_from}: {detail}")]
    SchemaMismatch {
        expected_from: String,
        found_in: String,
        detail: String,
    },

    /// A file sits under an unexpected partition layout.
    #[error("Unexpected partition layout for {path}: expected [{expected}], found [{found}]")]
    PartitionLayout {
        path: String,
        expected: String,
        found: String,
    },

    /// Arrow failure while assembling or rendering batches.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Writing the rendered table failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage failure (missing path, unreadable object, ...).
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
