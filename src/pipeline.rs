//! The mount-and-read pipeline and the building blocks of each CLI command.
//!
//! `run_pipeline` is strictly linear: secret resolution, then mount, then read
//! and display. A failure at any step aborts before the next one starts.

use anyhow::Context;
use parquet_mount_file::ObjectEntry;
use parquet_mount_parquet_source::{display, read_parquet, Dataset, ReadOptions};
use parquet_mount_secrets::{resolve_credentials, SecretStore};
use parquet_mount_table::{MountFs, MountOutcome, MountRequest, MountTable};
use std::io::Write;

use crate::config::JobConfig;

/// Resolve the job's credentials and mount its source
pub async fn mount_from_job(
    job: &JobConfig,
    secrets: &dyn SecretStore,
    fs: &mut MountFs,
) -> anyhow::Result<MountOutcome> {
    let reference = job.credential_ref();
    let credentials = resolve_credentials(secrets, &reference).with_context(|| {
        format!(
            "Failed to resolve credentials from scope '{}'",
            reference.scope
        )
    })?;

    let source = job.source_uri();
    let request = MountRequest::new(&source, &job.mount_name)
        .extra_configs(job.extra_configs.clone())
        .credentials(reference, &credentials);

    let outcome = fs
        .mount(request)
        .await
        .with_context(|| format!("Failed to mount {} at {}", source, job.mount_name))?;

    match outcome {
        MountOutcome::Created => tracing::info!("Mounted {} at {}", source, job.mount_name),
        MountOutcome::AlreadyMounted => {
            tracing::info!("{} already mounted at {}", source, job.mount_name)
        }
    }
    Ok(outcome)
}

/// Load the dataset at a mounted (or direct `s3://` / `file://`) path
pub async fn read_path(
    fs: &mut MountFs,
    path: &str,
    options: &ReadOptions,
) -> anyhow::Result<Dataset> {
    let resolved = fs.resolve(path).await?;
    read_parquet(resolved.backend.as_ref(), &resolved.key, options)
        .await
        .with_context(|| format!("Failed to read Parquet dataset at {path}"))
}

/// Secret resolution, mount, dataset read and display, in that order
pub async fn run_pipeline(
    job: &JobConfig,
    secrets: &dyn SecretStore,
    fs: &mut MountFs,
    out: &mut impl Write,
) -> anyhow::Result<Dataset> {
    mount_from_job(job, secrets, fs).await?;

    let location = job.input_location();
    let dataset = read_path(fs, &location, &job.read_options()).await?;
    display(&dataset, job.max_rows, out)?;
    Ok(dataset)
}

/// One line per mount: mount point, source, non-secret configuration, secret scope
pub fn format_mounts(table: &MountTable) -> String {
    if table.is_empty() {
        return "No mounts\n".to_string();
    }

    let mut out = String::new();
    for binding in table.mounts() {
        out.push_str(&format!("{}\t{}", binding.mount_point, binding.source_uri));
        let configs: Vec<String> = binding
            .extra_configs
            .iter()
            .filter(|(key, _)| !parquet_mount_file::is_secret_option(key))
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        if !configs.is_empty() {
            out.push('\t');
            out.push_str(&configs.join(","));
        }
        if let Some(reference) = &binding.credential_ref {
            out.push_str(&format!("\tsecrets:{}", reference.scope));
        }
        out.push('\n');
    }
    out
}

/// One line per entry, directories suffixed with `/`
pub fn format_entries(entries: &[ObjectEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        if entry.is_dir {
            out.push_str(&format!("{}/\n", entry.name()));
        } else {
            out.push_str(&format!("{}\t{}\n", entry.name(), entry.size.unwrap_or(0)));
        }
    }
    out
}
