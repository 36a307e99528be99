//! Integration tests for the confetti generation pipelines

mod cli_context;
mod generate_pipeline;
mod runtime_bundle;
mod test_utils;
