//! Partitioned Parquet dataset reader for parquet-mount
//!
//! Loads every Parquet file under a storage path into Arrow record batches.
//!
//! - Hive-style `key=value` directories are recognised; their values can be
//!   appended as columns and their layout can be enforced
//! - Hidden entries (`_SUCCESS`, `_temporary/`, `.crc` files) are skipped
//! - All files must share one schema; the first file sets it

mod dataset;
mod display;
mod error;
mod partition;
mod read;

pub use dataset::{DataFile, Dataset};
pub use display::{display, format_dataset, DEFAULT_MAX_ROWS};
pub use error::{DatasetError, Result};
pub use partition::{is_hidden, parse_partitions};
pub use read::{discover, read_parquet, ReadOptions};
