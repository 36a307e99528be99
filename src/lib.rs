//! confetti: layered job-config generation and runtime bundle materialization
//!
//! Job configs are rendered from templates layered with environment/experiment overrides
//! and per-job variants. At execution time the static output is re-rendered against
//! runtime arguments into a content-addressed bundle that is written locally and
//! mirrored to an object store.

pub mod artifact;
pub mod bundle;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod overrides;
pub mod placeholder;
pub mod render;
pub mod runtime;
pub mod store;
pub mod tokens;
pub mod variants;
pub mod yaml;
