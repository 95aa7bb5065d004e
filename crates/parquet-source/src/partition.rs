//! Hive-style `key=value` partition directories

/// Whether a path segment is hidden from dataset discovery (`_SUCCESS`, `.crc`, `_temporary`, ...)
pub fn is_hidden(segment: &str) -> bool {
    segment.starts_with('_') || segment.starts_with('.')
}

/// Partition values taken from the directories of a file's relative path.
///
/// `year=2024/month=01/part.parquet` yields `[("year", "2024"), ("month", "01")]`.
/// Directories without `=` contribute nothing.
pub fn parse_partitions(relative_path: &str) -> Vec<(String, String)> {
    let mut segments: Vec<&str> = relative_path.split('/').filter(|s| !s.is_empty()).collect();
    // Last segment is the file name
    segments.pop();

    segments
        .into_iter()
        .filter_map(|segment| segment.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Partition keys in path order
pub fn partition_keys(partitions: &[(String, String)]) -> Vec<String> {
    partitions.iter().map(|(key, _)| key.clone()).collect()
}
