//! CLI parse: clap types for confetti. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// confetti - layered job-config generation and runtime bundle materialization
#[derive(Parser)]
#[command(name = "confetti")]
#[command(about = "Render job configs from templates and overrides, then materialize runtime bundles")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".", global = true)]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false", global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render static configs: env=<prod|experiment|test|all> [exp=<name|all>]
    Generate {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// key=value selector tokens
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Materialize runtime bundles: env=<name> [exp=] [group=] [job=] [variant=] key=value...
    Materialize {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// key=value request tokens and runtime template variables
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

impl Commands {
    /// Command name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Generate { .. } => "generate",
            Commands::Materialize { .. } => "materialize",
        }
    }
}
