//! CLI domain: parse, route, output, and presentation only.
//! Pipeline work lives in `render` and `runtime`; the route table only dispatches.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_bundle_reports_json, format_bundle_reports_text, format_generation_report_json,
    format_generation_report_text, OutputFormat,
};
pub use route::RunContext;
