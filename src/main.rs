//! Command-line interface for parquet-mount
//!
//! # Usage Examples
//!
//! ## Whole pipeline
//! ```bash
//! # Resolve secrets, mount s3a://my-bucket at /mnt/my_mount, read and display
//! export PARQUET_MOUNT_SECRET__MY_SCOPE__AWS_ACCESS_KEY_ID=AKIA...
//! export PARQUET_MOUNT_SECRET__MY_SCOPE__AWS_SECRET_ACCESS_KEY=...
//! parquet-mount run \
//!   --bucket my-bucket \
//!   --mount-name /mnt/my_mount \
//!   --secret-scope my_scope \
//!   --input-path events \
//!   --expect-partitions year,month,day
//! ```
//!
//! ## Step by step
//! ```bash
//! parquet-mount mount --config job.toml
//! parquet-mount mounts
//! parquet-mount ls /mnt/my_mount/events
//! parquet-mount read /mnt/my_mount/events --max-rows 20
//! parquet-mount unmount /mnt/my_mount
//! ```
//!
//! ## Secrets
//! - `--secrets-file secrets.toml`: `[scope]` tables of `key = "value"`
//! - otherwise `PARQUET_MOUNT_SECRET__<SCOPE>__<KEY>` environment variables

use clap::{Parser, Subcommand};
use parquet_mount::config::JobArgs;
use parquet_mount::parquet_source::{display, ReadOptions, DEFAULT_MAX_ROWS};
use parquet_mount::pipeline::{format_entries, format_mounts, mount_from_job, read_path, run_pipeline};
use parquet_mount::StateOpts;

#[derive(Parser)]
#[command(name = "parquet-mount")]
#[command(about = "Mount S3 buckets with managed credentials and read partitioned Parquet datasets")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    state: StateOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve secrets, mount the bucket, read the dataset and display it
    Run {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Resolve secrets and mount the bucket into the registry
    Mount {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Remove a mount from the registry
    Unmount {
        /// Mount point to remove
        mount_point: String,
    },

    /// List registered mounts
    Mounts,

    /// List the entries directly under a mounted path
    Ls {
        /// Mounted path (or s3:// / file:// URI)
        path: String,
    },

    /// Read and display the Parquet dataset under a mounted path
    Read {
        /// Mounted path (or s3:// / file:// URI)
        path: String,

        /// Required partition keys, in order (comma-separated, e.g. "year,month,day")
        #[arg(long, value_delimiter = ',')]
        expect_partitions: Option<Vec<String>>,

        /// Append partition values as columns
        #[arg(long)]
        partition_columns: bool,

        /// Maximum rows to display
        #[arg(long, default_value_t = DEFAULT_MAX_ROWS)]
        max_rows: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let state = cli.state;

    match cli.command {
        Commands::Run { job } => {
            let job = job.resolve()?;
            tracing::info!(
                "Starting mount-and-read: {} -> {}",
                job.source_uri(),
                job.input_location()
            );

            let secrets = state.open_secret_store()?;
            let mut fs = state.open_mount_fs(Some(secrets.clone())).await?;
            let mut stdout = std::io::stdout().lock();
            run_pipeline(&job, secrets.as_ref(), &mut fs, &mut stdout).await?;

            tracing::info!("Mount-and-read completed successfully");
        }
        Commands::Mount { job } => {
            let job = job.resolve()?;
            let secrets = state.open_secret_store()?;
            let mut fs = state.open_mount_fs(Some(secrets.clone())).await?;
            mount_from_job(&job, secrets.as_ref(), &mut fs).await?;
        }
        Commands::Unmount { mount_point } => {
            let mut fs = state.open_mount_fs(None).await?;
            fs.unmount(&mount_point).await?;
        }
        Commands::Mounts => {
            let fs = state.open_mount_fs(None).await?;
            print!("{}", format_mounts(fs.table()));
        }
        Commands::Ls { path } => {
            let secrets = state.open_secret_store()?;
            let mut fs = state.open_mount_fs(Some(secrets)).await?;
            print!("{}", format_entries(&fs.ls(&path).await?));
        }
        Commands::Read {
            path,
            expect_partitions,
            partition_columns,
            max_rows,
        } => {
            let secrets = state.open_secret_store()?;
            let mut fs = state.open_mount_fs(Some(secrets)).await?;
            let options = ReadOptions {
                partition_columns,
                expected_partitions: expect_partitions,
                ..Default::default()
            };
            let dataset = read_path(&mut fs, &path, &options).await?;
            display(&dataset, max_rows, &mut std::io::stdout().lock())?;
        }
    }

    Ok(())
}
