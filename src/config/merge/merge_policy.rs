//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("paths.template_root", "config-templates")?
        .set_default("paths.override_root", "config-overrides")?
        .set_default("paths.output_root", "configs")?
        .set_default("paths.runtime_root", "runtime-configs")?
        .set_default("paths.template_extension", "j2")?
        .set_default(
            "artifacts.jar_root",
            "s3://thetradedesk-mlplatform-us-east-1/libs/audience/jars",
        )?
        .set_default("artifacts.main_branch", "master")?
        .set_default("artifacts.identity_file", "identity_config.yml")?
        .set_default(
            "artifacts.publish_prefix",
            "s3://thetradedesk-mlplatform-us-east-1/configdata/confetti/runtime-configs",
        )?
        .set_default("store.backend", "fs")?
        .set_default("store.root", ".confetti/object-store")
}
