//! Static output materialized into content-addressed runtime bundles

use super::test_utils::{read_file, write_file, write_merge_templates};
use confetti::bundle::compute_bundle_id;
use confetti::config::{ArtifactsConfig, ResolvedPaths};
use confetti::error::{PipelineError, StoreError};
use confetti::overrides::Selector;
use confetti::render::ConfigRenderer;
use confetti::runtime::{MaterializeRequest, Materializer};
use confetti::store::{FsObjectStore, ObjectStore};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

fn artifacts() -> ArtifactsConfig {
    ArtifactsConfig {
        jar_root: "s3://jars/audience".to_string(),
        publish_prefix: "s3://bucket/runtime-configs".to_string(),
        ..ArtifactsConfig::default()
    }
}

fn generate(base: &Path, override_yaml: &str) {
    write_merge_templates(base);
    write_file(base, "config-overrides/prod/audience/merge/config.yml", override_yaml);
    ConfigRenderer::discover(ResolvedPaths::under(base))
        .unwrap()
        .generate_all(&Selector::validate("prod", None).unwrap())
        .unwrap();
}

/// Object store that fails writes for one file name and counts every attempt.
struct FailingStore {
    inner: FsObjectStore,
    fail_file: &'static str,
    writes: Mutex<Vec<String>>,
}

impl ObjectStore for FailingStore {
    fn read(&self, uri: &str) -> Result<String, StoreError> {
        self.inner.read(uri)
    }

    fn write(&self, uri: &str, body: &str) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push(uri.to_string());
        if uri.ends_with(self.fail_file) {
            return Err(StoreError::RequestFailed(format!("refused {}", uri)));
        }
        self.inner.write(uri, body)
    }
}

#[test]
fn test_generate_then_materialize_latest() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    generate(base, "jarBranch: master\njarVersion: latest\npartitions: 8\n");

    let store = FsObjectStore::new(base.join("object-store"));
    store
        .write("s3://jars/audience/prod/_CURRENT", "2024.03.01-abc\nprevious\n")
        .unwrap();

    let paths = ResolvedPaths::under(base);
    let artifacts = artifacts();
    let materializer = Materializer::new(&paths, &artifacts, &store);
    let request =
        MaterializeRequest::from_tokens(&["env=prod", "job=merge", "run_date=20240315"]).unwrap();
    let reports = materializer.run(&request).unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];

    let identity = "audienceJarPath: s3://jars/audience/snapshots/master/2024.03.01-abc/audience.jar\nenvironment: prod\n";
    let output = "data_namespace: prod\nrunDate: \"2024-03-15\"\noutputPath: \"s3://out/prod/date=20240315/\"\npartitions: 8\n";
    assert_eq!(report.hash_id, compute_bundle_id([identity, output]));

    let local = format!("runtime-configs/prod/audience/merge/{}", report.hash_id);
    assert_eq!(read_file(base, &format!("{}/identity_config.yml", local)), identity);
    assert_eq!(read_file(base, &format!("{}/output_config.yml", local)), output);

    let remote = format!(
        "object-store/bucket/runtime-configs/prod/audience/merge/{}",
        report.hash_id
    );
    assert_eq!(read_file(base, &format!("{}/identity_config.yml", remote)), identity);
    assert_eq!(read_file(base, &format!("{}/output_config.yml", remote)), output);

    // identical inputs reproduce the same bundle id
    let again = materializer.run(&request).unwrap();
    assert_eq!(again[0].hash_id, report.hash_id);

    // a different run date is a different bundle
    let next_day =
        MaterializeRequest::from_tokens(&["env=prod", "job=merge", "run_date=20240316"]).unwrap();
    assert_ne!(materializer.run(&next_day).unwrap()[0].hash_id, report.hash_id);
}

#[test]
fn test_latest_without_marker_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    generate(base, "jarBranch: feature-9\njarVersion: latest\npartitions: 1\n");

    let store = FsObjectStore::new(base.join("object-store"));
    let paths = ResolvedPaths::under(base);
    let artifacts = artifacts();
    let materializer = Materializer::new(&paths, &artifacts, &store);
    let request =
        MaterializeRequest::from_tokens(&["env=prod", "job=merge", "run_date=20240315"]).unwrap();

    let err = materializer.run(&request).unwrap_err();
    assert!(matches!(err, PipelineError::JobsFailed { ref failed } if failed == &vec!["merge".to_string()]));
    assert!(!base.join("runtime-configs").exists());
    assert!(!base.join("object-store/bucket").exists());
}

#[test]
fn test_partial_publish_failure_names_failed_file() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    generate(base, "jarBranch: master\njarVersion: 7\npartitions: 3\n");
    write_file(
        base,
        "configs/prod/audience/merge/execution_config.yml",
        "cores: 4\n",
    );

    let store = FailingStore {
        inner: FsObjectStore::new(base.join("object-store")),
        fail_file: "/identity_config.yml",
        writes: Mutex::new(Vec::new()),
    };
    let paths = ResolvedPaths::under(base);
    let artifacts = artifacts();
    let materializer = Materializer::new(&paths, &artifacts, &store);
    let request = MaterializeRequest::from_tokens(&["env=prod", "run_date=20240101"]).unwrap();

    let err = materializer
        .render_runtime_job(
            &request.env_path,
            &request.group,
            "merge",
            None,
            &request.args,
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "Object store upload failed for files: identity_config.yml");
    assert_eq!(store.writes.lock().unwrap().len(), 3);

    let runtime_job = base.join("runtime-configs/prod/audience/merge");
    let bundle_dirs: Vec<_> = std::fs::read_dir(&runtime_job).unwrap().collect();
    assert_eq!(bundle_dirs.len(), 1);
    let bundle_dir = bundle_dirs[0].as_ref().unwrap().path();
    assert_eq!(std::fs::read_dir(bundle_dir).unwrap().count(), 3);
}

#[test]
fn test_variant_selector_reads_variant_directory() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    write_file(
        base,
        "configs/prod/audience/merge/tuned/identity_config.yml",
        "audienceJarBranch: master\naudienceJarVersion: 1\nvariant: tuned\n",
    );

    let store = FsObjectStore::new(base.join("object-store"));
    let paths = ResolvedPaths::under(base);
    let artifacts = artifacts();
    let materializer = Materializer::new(&paths, &artifacts, &store);

    let request =
        MaterializeRequest::from_tokens(&["env=prod", "job=merge", "variant=tuned"]).unwrap();
    let reports = materializer.run(&request).unwrap();
    assert_eq!(reports[0].files, vec!["identity_config.yml".to_string()]);

    let missing =
        MaterializeRequest::from_tokens(&["env=prod", "job=merge", "variant=other"]).unwrap();
    assert!(materializer.run(&missing).is_err());
}
