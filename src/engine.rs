//! Template engine setup shared by both pipeline stages.

use crate::placeholder::RunDatePlaceholder;
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior, Value};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Globals available to every static template.
pub const STATIC_GLOBALS: [&str; 4] = [
    "run_date",
    "run_date_format",
    "version_date_format",
    "full_version_date_format",
];

/// Strict engine: undefined variables fail the render, `none` renders as YAML `null`.
/// Rendered text keeps its final newline.
pub fn strict_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_formatter(|out, state, value| {
        if value.is_none() {
            return out.write_str("null").map_err(|_| {
                minijinja::Error::new(ErrorKind::WriteFailure, "failed to write null")
            });
        }
        minijinja::escape_formatter(out, state, value)
    });
    env
}

/// Engine for static generation, with the deferred `run_date` and date-format globals.
pub fn static_environment() -> Environment<'static> {
    let mut env = strict_environment();
    env.add_global("run_date", RunDatePlaceholder::value());
    env.add_global("run_date_format", Value::from("%Y-%m-%d"));
    env.add_global("version_date_format", Value::from("%Y%m%d"));
    env.add_global("full_version_date_format", Value::from("%Y%m%d000000"));
    env
}

pub fn is_undefined_error(err: &minijinja::Error) -> bool {
    err.kind() == ErrorKind::UndefinedError
}

fn quoted_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^']+)'").expect("static regex"))
}

fn references(line: &str, name: &str) -> bool {
    Regex::new(&format!(r"\b{}\b", regex::escape(name)))
        .map(|re| re.is_match(line))
        .unwrap_or(false)
}

/// Best-effort identification of the variables a failed render was missing.
///
/// Starts from the template's undeclared variables that the context does not provide and
/// keeps only those referenced on the line the engine failed at, so names behind
/// `is defined` guards elsewhere are not reported. Falls back to a quoted name in the
/// engine's error text. Empty when neither yields anything.
pub fn missing_variables(
    undeclared: impl IntoIterator<Item = String>,
    provided: &BTreeSet<String>,
    err: &minijinja::Error,
    source: &str,
) -> Vec<String> {
    let mut missing: Vec<String> = undeclared
        .into_iter()
        .filter(|name| !provided.contains(name) && !STATIC_GLOBALS.contains(&name.as_str()))
        .collect();
    let failing_line = err
        .line()
        .and_then(|n| source.lines().nth(n.checked_sub(1)?));
    if let Some(line) = failing_line {
        let on_line: Vec<String> = missing
            .iter()
            .filter(|name| references(line, name))
            .cloned()
            .collect();
        if !on_line.is_empty() {
            missing = on_line;
        }
    }
    if missing.is_empty() {
        if let Some(captures) = quoted_name().captures(&err.to_string()) {
            missing.push(captures[1].to_string());
        }
    }
    missing.sort();
    missing.dedup();
    missing
}
