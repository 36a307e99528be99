//! CLI presentation: text and json summaries for generation and materialization.

use crate::error::PipelineError;
use crate::render::GenerationReport;
use crate::runtime::BundleReport;
use serde_json::json;
use std::str::FromStr;

/// Summary format selected with `--format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(PipelineError::Validation(format!(
                "Unknown output format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

pub fn format_generation_report_text(report: &GenerationReport) -> String {
    let mut output = format!("Wrote {} config file(s)\n", report.written.len());
    if !report.failures.is_empty() {
        output.push_str(&format!("\nFailed to render {} file(s):\n", report.failures.len()));
        for failure in &report.failures {
            if failure.missing.is_empty() {
                output.push_str(&format!("  {}: {}\n", failure.location, failure.message));
            } else {
                output.push_str(&format!(
                    "  {}: missing {}\n",
                    failure.location,
                    failure.missing.join(", ")
                ));
            }
        }
    }
    output
}

pub fn format_generation_report_json(report: &GenerationReport) -> String {
    let failures: Vec<_> = report
        .failures
        .iter()
        .map(|failure| {
            json!({
                "location": failure.location,
                "message": failure.message,
                "missing": failure.missing,
            })
        })
        .collect();
    let result = json!({
        "written": report.written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        "failures": failures,
    });
    serde_json::to_string_pretty(&result).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_bundle_reports_text(reports: &[BundleReport]) -> String {
    if reports.is_empty() {
        return "No jobs materialized.".to_string();
    }
    let mut output = String::new();
    for report in reports {
        output.push_str(&format!("{} -> {}\n", report.job, report.hash_id));
        output.push_str(&format!("  local:  {}\n", report.local_dir.display()));
        output.push_str(&format!("  remote: {}/\n", report.remote_prefix));
        for file in &report.files {
            output.push_str(&format!("    - {}\n", file));
        }
    }
    output
}

pub fn format_bundle_reports_json(reports: &[BundleReport]) -> String {
    serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string())
}
