//! Override hierarchy: environments, experiments and groups under the override root.
//!
//! The layout is `{root}/prod/{group}/...` for standalone environments and
//! `{root}/{experiment|test}/{name}/{group}/...` for environments that carry an
//! experiment name.

use crate::error::PipelineError;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Selector value meaning "every environment" / "every experiment".
pub const ALL: &str = "all";

/// Deployment environments accepted by selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Env {
    Prod,
    Experiment,
    Test,
}

impl Env {
    pub fn as_str(&self) -> &'static str {
        match self {
            Env::Prod => "prod",
            Env::Experiment => "experiment",
            Env::Test => "test",
        }
    }

    /// Whether paths under this environment are nested one level by experiment name.
    pub fn requires_experiment(&self) -> bool {
        matches!(self, Env::Experiment | Env::Test)
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Env {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prod" => Ok(Env::Prod),
            "experiment" => Ok(Env::Experiment),
            "test" => Ok(Env::Test),
            other => Err(PipelineError::Validation(format!("Unknown env '{}'", other))),
        }
    }
}

/// Returns true for top-level names that are nested by experiment.
fn is_experiment_env(name: &str) -> bool {
    Env::from_str(name)
        .map(|env| env.requires_experiment())
        .unwrap_or(false)
}

/// A deployment coordinate: `prod` or `{experiment|test}/{name}`.
///
/// Construction enforces that `prod` (and any other standalone environment) has no
/// experiment while `experiment` and `test` always have one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvironmentPath {
    env: String,
    experiment: Option<String>,
}

impl EnvironmentPath {
    pub fn new(env: &str, experiment: Option<&str>) -> Result<Self, PipelineError> {
        let experiment = experiment.filter(|exp| !exp.is_empty());
        match (is_experiment_env(env), experiment) {
            (true, None) => Err(PipelineError::Validation(format!(
                "exp parameter is required when env is {}",
                env
            ))),
            (false, Some(_)) => Err(PipelineError::Validation(format!(
                "exp parameter is not allowed when env={}",
                env
            ))),
            (_, experiment) => Ok(Self {
                env: env.to_string(),
                experiment: experiment.map(str::to_string),
            }),
        }
    }

    /// Parse `prod` or `experiment/foo`.
    pub fn parse(path: &str) -> Result<Self, PipelineError> {
        match path.split_once('/') {
            Some((env, exp)) => Self::new(env, Some(exp)),
            None => Self::new(path, None),
        }
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn experiment(&self) -> Option<&str> {
        self.experiment.as_deref()
    }

    /// Value exposed to templates as `data_namespace`.
    pub fn data_namespace(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EnvironmentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.experiment {
            Some(exp) => write!(f, "{}/{}", self.env, exp),
            None => f.write_str(&self.env),
        }
    }
}

/// Validated env/exp filter for a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    env: String,
    experiment: String,
}

impl Selector {
    /// Validate the `env=`/`exp=` pair given on the command line.
    pub fn validate(env: &str, experiment: Option<&str>) -> Result<Self, PipelineError> {
        if env == ALL {
            if experiment.is_some() {
                return Err(PipelineError::Validation(
                    "When env=all, exp must not be provided".to_string(),
                ));
            }
            return Ok(Self::all());
        }

        let parsed = Env::from_str(env)?;
        if parsed == Env::Prod {
            if experiment.is_some() {
                return Err(PipelineError::Validation(
                    "exp parameter is not allowed when env=prod".to_string(),
                ));
            }
            return Ok(Self {
                env: parsed.as_str().to_string(),
                experiment: ALL.to_string(),
            });
        }

        match experiment {
            Some(exp) if !exp.is_empty() => Ok(Self {
                env: parsed.as_str().to_string(),
                experiment: exp.to_string(),
            }),
            _ => Err(PipelineError::Validation(
                "exp parameter is required when env is experiment or test".to_string(),
            )),
        }
    }

    pub fn all() -> Self {
        Self {
            env: ALL.to_string(),
            experiment: ALL.to_string(),
        }
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    pub fn matches_env(&self, path: &EnvironmentPath) -> bool {
        self.env == ALL || self.env == path.env()
    }

    pub fn matches(&self, path: &EnvironmentPath) -> bool {
        self.matches_env(path)
            && (self.experiment == ALL || path.experiment() == Some(self.experiment.as_str()))
    }
}

/// Sorted names of the direct subdirectories of `dir`.
pub(crate) fn subdirectories(dir: &Path) -> Result<Vec<String>, PipelineError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PipelineError::io_at(dir, e))? {
        let entry = entry.map_err(|e| PipelineError::io_at(dir, e))?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Enumerate every environment path under the override root.
pub fn list_environment_paths(override_root: &Path) -> Result<Vec<EnvironmentPath>, PipelineError> {
    if !override_root.is_dir() {
        return Err(PipelineError::Discovery(format!(
            "Override root not found: {}",
            override_root.display()
        )));
    }

    let mut paths = Vec::new();
    for env in subdirectories(override_root)? {
        if is_experiment_env(&env) {
            for exp in subdirectories(&override_root.join(&env))? {
                paths.push(EnvironmentPath::new(&env, Some(&exp))?);
            }
        } else {
            paths.push(EnvironmentPath::new(&env, None)?);
        }
    }
    Ok(paths)
}

/// Every direct subdirectory of an environment path is a group, with or without override files.
pub fn list_groups(
    override_root: &Path,
    env_path: &EnvironmentPath,
) -> Result<Vec<String>, PipelineError> {
    let base = override_root.join(env_path.to_string());
    if !base.is_dir() {
        return Ok(Vec::new());
    }
    subdirectories(&base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_environment_path_invariants() {
        assert!(EnvironmentPath::new("prod", None).is_ok());
        assert!(EnvironmentPath::new("prod", Some("x")).is_err());
        assert!(EnvironmentPath::new("experiment", None).is_err());
        assert!(EnvironmentPath::new("test", Some("")).is_err());

        let path = EnvironmentPath::parse("test/alpha").unwrap();
        assert_eq!(path.env(), "test");
        assert_eq!(path.experiment(), Some("alpha"));
        assert_eq!(path.data_namespace(), "test/alpha");

        let prod = EnvironmentPath::parse("prod").unwrap();
        assert_eq!(prod.experiment(), None);
        assert_eq!(prod.data_namespace(), "prod");
    }

    #[test]
    fn test_selector_rules() {
        let err = Selector::validate("all", Some("x")).unwrap_err();
        assert_eq!(err.to_string(), "When env=all, exp must not be provided");

        let err = Selector::validate("prod", Some("x")).unwrap_err();
        assert_eq!(err.to_string(), "exp parameter is not allowed when env=prod");

        let err = Selector::validate("test", None).unwrap_err();
        assert!(err.to_string().contains("exp parameter is required"));
        assert!(Selector::validate("experiment", Some("")).is_err());

        let err = Selector::validate("staging", None).unwrap_err();
        assert_eq!(err.to_string(), "Unknown env 'staging'");

        let prod = Selector::validate("prod", None).unwrap();
        assert_eq!(prod.experiment(), ALL);

        let all = Selector::validate("all", None).unwrap();
        assert_eq!(all, Selector::all());
    }

    #[test]
    fn test_selector_matches_exact_env_name() {
        let selector = Selector::validate("test", Some("alpha")).unwrap();
        assert!(selector.matches(&EnvironmentPath::parse("test/alpha").unwrap()));
        assert!(!selector.matches(&EnvironmentPath::parse("test/beta").unwrap()));
        assert!(!selector.matches(&EnvironmentPath::parse("testing").unwrap()));
        assert!(!selector.matches(&EnvironmentPath::parse("prod").unwrap()));

        let all = Selector::all();
        assert!(all.matches(&EnvironmentPath::parse("experiment/x").unwrap()));
    }

    #[test]
    fn test_list_environment_paths() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("prod/audience")).unwrap();
        fs::create_dir_all(root.join("experiment/exp1/audience")).unwrap();
        fs::create_dir_all(root.join("experiment/exp2")).unwrap();
        fs::create_dir_all(root.join("test/alpha")).unwrap();
        fs::create_dir_all(root.join("staging")).unwrap();
        fs::write(root.join("README.md"), "not an env").unwrap();
        fs::write(root.join("experiment/notes.txt"), "not an experiment").unwrap();

        let paths: Vec<String> = list_environment_paths(root)
            .unwrap()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(
            paths,
            vec!["experiment/exp1", "experiment/exp2", "prod", "staging", "test/alpha"]
        );
    }

    #[test]
    fn test_list_environment_paths_missing_root() {
        let temp = TempDir::new().unwrap();
        let err = list_environment_paths(&temp.path().join("nope")).unwrap_err();
        assert!(matches!(err, PipelineError::Discovery(_)));
    }

    #[test]
    fn test_groups_do_not_require_override_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("prod/audience/merge")).unwrap();
        fs::write(root.join("prod/audience/merge/config.yml"), "a: 1").unwrap();
        fs::create_dir_all(root.join("prod/empty_group")).unwrap();
        fs::write(root.join("prod/stray.yml"), "a: 1").unwrap();

        let prod = EnvironmentPath::parse("prod").unwrap();
        assert_eq!(list_groups(root, &prod).unwrap(), vec!["audience", "empty_group"]);

        let missing = EnvironmentPath::parse("test/ghost").unwrap();
        assert!(list_groups(root, &missing).unwrap().is_empty());
    }
}
