//! End-to-end command routing through RunContext with a workspace config file

use super::test_utils::{with_isolated_home, write_file, write_merge_templates, WORKSPACE_CONFIG};
use confetti::cli::{map_error, Commands, RunContext};
use confetti::config::WORKSPACE_CONFIG_FILE;
use tempfile::TempDir;

fn generate(args: &[&str], format: &str) -> Commands {
    Commands::Generate {
        format: format.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
    }
}

fn materialize(args: &[&str], format: &str) -> Commands {
    Commands::Materialize {
        format: format.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn test_generate_and_materialize_through_cli_context() {
    let temp = TempDir::new().unwrap();
    with_isolated_home(&temp, || {
        let ws = temp.path().join("workspace");
        write_file(&ws, WORKSPACE_CONFIG_FILE, WORKSPACE_CONFIG);
        write_merge_templates(&ws);
        write_file(
            &ws,
            "config-overrides/test/alpha/audience/merge/config.yml",
            "jarBranch: feature-2\njarVersion: latest\npartitions: 16\n",
        );
        write_file(&ws, "object-store/jars/audience/mergerequests/feature-2/_CURRENT", "88\n");

        let context = RunContext::new(ws.clone(), None).unwrap();
        assert_eq!(context.config().artifacts.jar_root, "s3://jars/audience");

        let summary = context
            .execute(&generate(&["env=test", "exp=alpha"], "text"))
            .unwrap();
        assert!(summary.starts_with("Wrote 2 config file(s)"));

        let output = context
            .execute(&materialize(
                &["env=test", "exp=alpha", "run_date=20240102", "bare-token"],
                "json",
            ))
            .unwrap();
        let reports: serde_json::Value = serde_json::from_str(&output).unwrap();
        let hash = reports[0]["hash_id"].as_str().unwrap().to_string();
        assert_eq!(reports[0]["job"], "merge");

        let identity = std::fs::read_to_string(
            ws.join("object-store/bucket/runtime-configs/test/audience/merge")
                .join(&hash)
                .join("identity_config.yml"),
        )
        .unwrap();
        assert!(identity.contains(
            "audienceJarPath: s3://jars/audience/mergerequests/feature-2/88/audience.jar\n"
        ));
        assert!(identity.contains("environment: test\n"));
    });
}

#[test]
fn test_selector_rules_surface_as_messages() {
    let temp = TempDir::new().unwrap();
    with_isolated_home(&temp, || {
        let ws = temp.path().join("workspace");
        std::fs::create_dir_all(&ws).unwrap();
        let context = RunContext::new(ws, None).unwrap();

        let cases = [
            (generate(&["env=all", "exp=x"], "text"), "When env=all, exp must not be provided"),
            (generate(&["env=prod", "exp=x"], "text"), "exp parameter is not allowed when env=prod"),
            (
                generate(&["env=experiment"], "text"),
                "exp parameter is required when env is experiment or test",
            ),
            (generate(&["env=staging"], "text"), "Unknown env 'staging'"),
            (materialize(&["group=audience"], "text"), "env parameter is required"),
        ];
        for (command, expected) in cases {
            let err = context.execute(&command).unwrap_err();
            assert_eq!(map_error(&err), expected);
        }

        let err = context.execute(&generate(&[], "text")).unwrap_err();
        assert!(map_error(&err).starts_with("Usage: confetti generate"));

        let err = context.execute(&generate(&["env=prod"], "xml")).unwrap_err();
        assert!(map_error(&err).contains("Unknown output format"));
    });
}

#[test]
fn test_invalid_workspace_config_is_rejected() {
    let temp = TempDir::new().unwrap();
    with_isolated_home(&temp, || {
        let ws = temp.path().join("workspace");
        write_file(
            &ws,
            WORKSPACE_CONFIG_FILE,
            "[store]\nbackend = \"http\"\n",
        );
        let err = RunContext::new(ws, None).err().unwrap();
        assert!(map_error(&err).starts_with("Configuration error:"));
    });
}
