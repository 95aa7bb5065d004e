//! End-to-end tests for the mount-and-read pipeline against a `file://` source
//!
//! The temporary directory stands in for the bucket; everything else (secret
//! resolution, mount table, dataset read, display) is the real code path.

use arrow::array::{Array, ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet_mount::config::JobConfig;
use parquet_mount::mount::{FilesystemMountStore, MountError, MountFs, MountOutcome, MountTable};
use parquet_mount::pipeline::{mount_from_job, read_path, run_pipeline};
use parquet_mount::secrets::InMemorySecretStore;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const FIXTURE_PATH: &str = "your_parquet_location/year=2024/month=01/day=01/part.parquet";

/// Write the 3-row, 2-column fixture
fn write_fixture(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("city", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![10, 20, 30])) as ArrayRef,
            Arc::new(StringArray::from(vec!["Oslo", "Lima", "Pune"])) as ArrayRef,
        ],
    )
    .unwrap();

    let file = std::fs::File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn bucket_with_fixture() -> TempDir {
    let bucket = TempDir::new().unwrap();
    write_fixture(&bucket.path().join(FIXTURE_PATH));
    std::fs::write(bucket.path().join("your_parquet_location/_SUCCESS"), "").unwrap();
    bucket
}

fn secrets() -> InMemorySecretStore {
    let mut secrets = InMemorySecretStore::new();
    secrets.insert("your_secret_scope", "aws-access-key-id", "AKIAEXAMPLE");
    secrets.insert("your_secret_scope", "aws-secret-access-key", "wJalrXUtnFEMI");
    secrets
}

fn job_for(bucket: &TempDir) -> JobConfig {
    JobConfig {
        source: Some(format!("file://{}", bucket.path().display())),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_pipeline_reads_fixture() {
    let bucket = bucket_with_fixture();
    let job = job_for(&bucket);
    let mut fs = MountFs::new(MountTable::new());
    let mut out = Vec::new();

    let dataset = run_pipeline(&job, &secrets(), &mut fs, &mut out)
        .await
        .unwrap();

    assert_eq!(dataset.num_rows(), 3);
    assert_eq!(dataset.column_names(), vec!["id", "city"]);

    let batch = dataset.concat().unwrap();
    let ids = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    let cities = batch.column(1).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(ids.values().to_vec(), vec![10, 20, 30]);
    assert_eq!(
        (0..cities.len()).map(|i| cities.value(i)).collect::<Vec<_>>(),
        vec!["Oslo", "Lima", "Pune"]
    );

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Lima"));
    assert!(text.ends_with("3 rows x 2 columns\n"));
    assert!(fs.table().get("/mnt/your_mount_name").is_some());
}

#[tokio::test]
async fn test_mounted_bucket_is_enumerable() {
    let bucket = bucket_with_fixture();
    let job = job_for(&bucket);
    let mut fs = MountFs::new(MountTable::new());

    let outcome = mount_from_job(&job, &secrets(), &mut fs).await.unwrap();
    assert_eq!(outcome, MountOutcome::Created);

    let entries = fs.ls("/mnt/your_mount_name").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "your_parquet_location");
    assert!(entries[0].is_dir);

    let files = fs.walk("/mnt/your_mount_name").await.unwrap();
    let keys: Vec<_> = files.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["your_parquet_location/_SUCCESS", FIXTURE_PATH]);
}

#[tokio::test]
async fn test_invalid_secret_key_prevents_mount() {
    let bucket = bucket_with_fixture();
    let job = JobConfig {
        secret_key_name: "no-such-key".to_string(),
        ..job_for(&bucket)
    };
    let mut fs = MountFs::new(MountTable::new());
    let mut out = Vec::new();

    let err = run_pipeline(&job, &secrets(), &mut fs, &mut out)
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("no-such-key"));
    assert!(fs.table().is_empty());
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_second_mount_identical_is_noop() {
    let bucket = bucket_with_fixture();
    let job = job_for(&bucket);
    let mut fs = MountFs::new(MountTable::new());

    mount_from_job(&job, &secrets(), &mut fs).await.unwrap();
    let outcome = mount_from_job(&job, &secrets(), &mut fs).await.unwrap();
    assert_eq!(outcome, MountOutcome::AlreadyMounted);
    assert_eq!(fs.table().len(), 1);
}

#[tokio::test]
async fn test_second_mount_other_source_fails() {
    let bucket = bucket_with_fixture();
    let other = TempDir::new().unwrap();
    let mut fs = MountFs::new(MountTable::new());

    mount_from_job(&job_for(&bucket), &secrets(), &mut fs)
        .await
        .unwrap();
    let err = mount_from_job(&job_for(&other), &secrets(), &mut fs)
        .await
        .unwrap_err();

    let mount_err = err.downcast_ref::<MountError>().unwrap();
    assert!(matches!(mount_err, MountError::AlreadyMounted { .. }));
}

#[tokio::test]
async fn test_registry_survives_between_sessions() {
    let bucket = bucket_with_fixture();
    let state = TempDir::new().unwrap();
    let registry = state.path().join("mounts.json");
    let job = job_for(&bucket);

    {
        let table = MountTable::open(Box::new(FilesystemMountStore::new(&registry)))
            .await
            .unwrap();
        let mut fs = MountFs::new(table);
        mount_from_job(&job, &secrets(), &mut fs).await.unwrap();
    }

    let stored = std::fs::read_to_string(&registry).unwrap();
    assert!(!stored.contains("AKIAEXAMPLE"));
    assert!(!stored.contains("wJalrXUtnFEMI"));

    let secrets = secrets();
    let table = MountTable::open(Box::new(FilesystemMountStore::new(&registry)))
        .await
        .unwrap();
    let mut fs = MountFs::with_secrets(table, Arc::new(secrets.clone()));

    let dataset = read_path(&mut fs, &job.input_location(), &job.read_options())
        .await
        .unwrap();
    assert_eq!(dataset.num_rows(), 3);

    // Same job again: identical binding, nothing to do
    let outcome = mount_from_job(&job, &secrets, &mut fs).await.unwrap();
    assert_eq!(outcome, MountOutcome::AlreadyMounted);
}

#[tokio::test]
async fn test_temporary_credentials_job_reruns_after_restart() {
    let bucket = bucket_with_fixture();
    let state = TempDir::new().unwrap();
    let registry = state.path().join("mounts.json");
    let job = JobConfig {
        session_token_name: Some("aws-session-token".to_string()),
        ..job_for(&bucket)
    };
    let mut secrets = secrets();
    secrets.insert("your_secret_scope", "aws-session-token", "FwoGZXIvYXdzEXAMPLE");

    for expected in [MountOutcome::Created, MountOutcome::AlreadyMounted] {
        let table = MountTable::open(Box::new(FilesystemMountStore::new(&registry)))
            .await
            .unwrap();
        let mut fs = MountFs::with_secrets(table, Arc::new(secrets.clone()));
        let mut out = Vec::new();

        let outcome = mount_from_job(&job, &secrets, &mut fs).await.unwrap();
        assert_eq!(outcome, expected);
        let dataset = run_pipeline(&job, &secrets, &mut fs, &mut out).await.unwrap();
        assert_eq!(dataset.num_rows(), 3);
    }

    let stored = std::fs::read_to_string(&registry).unwrap();
    assert!(!stored.contains("FwoGZXIvYXdzEXAMPLE"));
    assert!(stored.contains("aws-session-token"));
}

#[tokio::test]
async fn test_partition_layout_enforced() {
    let bucket = bucket_with_fixture();
    write_fixture(&bucket.path().join("your_parquet_location/year=2024/stray.parquet"));
    let job = JobConfig {
        expected_partitions: vec!["year".into(), "month".into(), "day".into()],
        ..job_for(&bucket)
    };
    let mut fs = MountFs::new(MountTable::new());
    let mut out = Vec::new();

    let err = run_pipeline(&job, &secrets(), &mut fs, &mut out)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Unexpected partition layout"));
}

#[tokio::test]
async fn test_missing_input_path_fails() {
    let bucket = bucket_with_fixture();
    let job = JobConfig {
        input_path: "does_not_exist".to_string(),
        ..job_for(&bucket)
    };
    let mut fs = MountFs::new(MountTable::new());
    let mut out = Vec::new();

    let err = run_pipeline(&job, &secrets(), &mut fs, &mut out)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Path does not exist"));
    // The mount itself happened before the read failed
    assert_eq!(fs.table().len(), 1);
}
