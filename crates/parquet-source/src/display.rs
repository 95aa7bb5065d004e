//! Rendering datasets as text tables

use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use std::io::Write;

use crate::{Dataset, Result};

/// Rows rendered by default
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Render up to `max_rows` rows as an ASCII table followed by a size footer
pub fn format_dataset(dataset: &Dataset, max_rows: usize) -> Result<String> {
    let mut remaining = max_rows;
    let mut shown = Vec::new();
    for batch in dataset.batches() {
        if remaining == 0 {
            break;
        }
        let take = batch.num_rows().min(remaining);
        shown.push(batch.slice(0, take));
        remaining -= take;
    }
    if shown.is_empty() {
        // Header only
        shown.push(RecordBatch::new_empty(dataset.schema()));
    }

    let mut out = pretty_format_batches(&shown)?.to_string();
    out.push('\n');

    let total = dataset.num_rows();
    if total > max_rows {
        out.push_str(&format!("showing first {max_rows} rows\n"));
    }
    out.push_str(&format!(
        "{} rows x {} columns\n",
        total,
        dataset.num_columns()
    ));
    Ok(out)
}

/// Write the rendered table to `writer`
pub fn display(dataset: &Dataset, max_rows: usize, writer: &mut impl Write) -> Result<()> {
    writer.write_all(format_dataset(dataset, max_rows)?.as_bytes())?;
    writer.flush()?;
    Ok(())
}
