//! Shared fixtures for integration tests
//!
//! Builds throwaway workspaces and serializes access to the environment variables that
//! config loading reads, so tests can run in parallel.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize HOME/XDG environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Environment variable state to restore after test
struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
        }
    }

    fn restore(self) {
        match self.home {
            Some(orig) => std::env::set_var("HOME", orig),
            None => std::env::remove_var("HOME"),
        }
        match self.xdg_config_home {
            Some(orig) => std::env::set_var("XDG_CONFIG_HOME", orig),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir`, so no global
/// `confetti/config.toml` from the real user leaks into the test.
pub fn with_isolated_home<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let home = test_dir.path().join("home");
    let config_home = test_dir.path().join("xdg-config");
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&config_home).unwrap();
    std::env::set_var("HOME", &home);
    std::env::set_var("XDG_CONFIG_HOME", &config_home);

    let result = f();
    env_state.restore();
    result
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

pub fn read_file(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap_or_else(|e| panic!("{}: {}", rel, e))
}

/// Templates for one `audience/merge` job: an identity config and an output config that
/// uses the deferred run date.
pub fn write_merge_templates(root: &Path) {
    write_file(
        root,
        "config-templates/audience/merge/identity_config.yml.j2",
        "job_name: merge\nenvironment: {{ environment }}\naudienceJarBranch: {{ jarBranch }}\naudienceJarVersion: {{ jarVersion }}\n",
    );
    write_file(
        root,
        "config-templates/audience/merge/output_config.yml.j2",
        "data_namespace: {{ data_namespace }}\nrunDate: \"{{ run_date }}\"\noutputPath: \"s3://out/{{ data_namespace }}/date={{ run_date.strftime(version_date_format) }}/\"\npartitions: {{ partitions }}\n",
    );
}

/// Workspace config pointing the jar root and publish prefix at a local object store.
pub const WORKSPACE_CONFIG: &str = r#"
[artifacts]
jar_root = "s3://jars/audience"
publish_prefix = "s3://bucket/runtime-configs"

[store]
backend = "fs"
root = "object-store"
"#;
