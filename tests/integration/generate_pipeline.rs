//! Static generation across environments, groups, jobs and variants

use super::test_utils::{read_file, write_file, write_merge_templates};
use confetti::config::ResolvedPaths;
use confetti::overrides::{EnvironmentPath, Selector};
use confetti::render::ConfigRenderer;
use serde_yaml::Value;
use std::fs;
use tempfile::TempDir;

fn renderer(base: &std::path::Path) -> ConfigRenderer {
    ConfigRenderer::discover(ResolvedPaths::under(base)).unwrap()
}

#[test]
fn test_experiment_job_without_manifest() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    write_file(
        base,
        "config-templates/audience/merge/job_config.yml.j2",
        "foo: {{ foo }}\nenvironment: {{ environment }}\nexperimentName: {{ experimentName }}\ndata_namespace: {{ data_namespace }}\nvariant: {{ variant }}\n",
    );
    write_file(base, "config-overrides/test/alpha/audience/merge/config.yml", "foo: 1\n");

    let report = renderer(base)
        .generate_all(&Selector::validate("test", Some("alpha")).unwrap())
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(
        report.written,
        vec![base.join("configs/test/alpha/audience/merge/job_config.yml")]
    );
    assert_eq!(
        read_file(base, "configs/test/alpha/audience/merge/job_config.yml"),
        "foo: 1\nenvironment: test\nexperimentName: alpha\ndata_namespace: test/alpha\nvariant: null\n"
    );
}

#[test]
fn test_override_values_win_over_base_defaults() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    write_file(
        base,
        "config-templates/audience/merge/job_config.yml.j2",
        "environment: {{ environment }}\ndata_namespace: {{ data_namespace }}\n",
    );
    write_file(
        base,
        "config-overrides/prod/audience/merge/config.yml",
        "environment: production\ndata_namespace: shared\n",
    );

    renderer(base)
        .generate_env(&EnvironmentPath::parse("prod").unwrap())
        .unwrap();
    assert_eq!(
        read_file(base, "configs/prod/audience/merge/job_config.yml"),
        "environment: production\ndata_namespace: shared\n"
    );
}

#[test]
fn test_generate_all_covers_every_environment_path() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    write_merge_templates(base);
    for env_path in ["prod", "experiment/alpha", "test/beta"] {
        write_file(
            base,
            &format!("config-overrides/{}/audience/merge/config.yml", env_path),
            "jarBranch: master\njarVersion: latest\npartitions: 4\n",
        );
    }
    // group with no override files is still processed
    fs::create_dir_all(base.join("config-overrides/prod/audience/idle")).unwrap();

    let report = renderer(base).generate_all(&Selector::all()).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.written.len(), 6);

    let output: Value = serde_yaml::from_str(&read_file(
        base,
        "configs/experiment/alpha/audience/merge/output_config.yml",
    ))
    .unwrap();
    assert_eq!(output["data_namespace"], Value::from("experiment/alpha"));
    assert_eq!(output["runDate"], Value::from("{{ run_date }}"));
    assert_eq!(
        output["outputPath"],
        Value::from("s3://out/experiment/alpha/date={{ run_date.strftime('%Y%m%d') }}/")
    );
    assert_eq!(output["partitions"], Value::from(4));

    let identity = read_file(base, "configs/prod/audience/merge/identity_config.yml");
    assert!(!identity.contains("job_name"));
    assert_eq!(
        identity,
        "environment: prod\naudienceJarBranch: master\naudienceJarVersion: latest\n"
    );
}

#[test]
fn test_generation_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    write_merge_templates(base);
    write_file(
        base,
        "config-overrides/prod/audience/merge/config.yml",
        "jarBranch: feature-1\njarVersion: 12\npartitions: 2\n",
    );

    let selector = Selector::validate("prod", None).unwrap();
    renderer(base).generate_all(&selector).unwrap();
    let first = read_file(base, "configs/prod/audience/merge/output_config.yml");
    renderer(base).generate_all(&selector).unwrap();
    assert_eq!(read_file(base, "configs/prod/audience/merge/output_config.yml"), first);
}

#[test]
fn test_variants_from_manifest_and_override() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    write_file(
        base,
        "config-templates/audience/merge/job_config.yml.j2",
        "variant: {{ variant }}\nmodel: {{ model }}\nweight: {{ weight }}\n",
    );
    write_file(
        base,
        "config-templates/audience/merge/variants.yml",
        "variants:\n- name: base\n  model: linear\n  weight: 1\n- name: tuned\n  model: gbm\n  weight: 2\n",
    );
    write_file(
        base,
        "config-overrides/prod/audience/merge/config.yml",
        "variants:\n- name: tuned\n  weight: 5\n- name: shadow\n  model: dnn\n  weight: 0\n- model: nameless\n",
    );

    let report = renderer(base)
        .generate_env(&EnvironmentPath::parse("prod").unwrap())
        .unwrap();
    assert!(report.is_clean());

    let job = "configs/prod/audience/merge";
    let written: Vec<_> = report
        .written
        .iter()
        .map(|p| p.strip_prefix(base.join(job)).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        written,
        vec![
            std::path::PathBuf::from("base/job_config.yml"),
            std::path::PathBuf::from("tuned/job_config.yml"),
            std::path::PathBuf::from("shadow/job_config.yml"),
        ]
    );
    assert_eq!(
        read_file(base, &format!("{}/tuned/job_config.yml", job)),
        "variant: tuned\nmodel: gbm\nweight: 5\n"
    );
    assert_eq!(
        read_file(base, &format!("{}/shadow/job_config.yml", job)),
        "variant: shadow\nmodel: dnn\nweight: 0\n"
    );
}

#[test]
fn test_missing_value_fails_only_that_file() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    write_merge_templates(base);
    // no `partitions`, so output_config fails while identity_config renders
    write_file(
        base,
        "config-overrides/prod/audience/merge/config.yml",
        "jarBranch: master\njarVersion: 3\n",
    );

    let report = renderer(base)
        .generate_env(&EnvironmentPath::parse("prod").unwrap())
        .unwrap();
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].location, "prod/audience/merge/output_config.yml");
    assert_eq!(report.failures[0].missing, vec!["partitions".to_string()]);
    assert!(base.join("configs/prod/audience/merge/identity_config.yml").exists());
    assert!(!base.join("configs/prod/audience/merge/output_config.yml").exists());
}
