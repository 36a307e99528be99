//! Run-date values exposed to templates.
//!
//! During static generation `run_date` is deferred: it renders as template text that the
//! runtime stage resolves later. During materialization it is a real calendar date.

use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, NaiveDate};
use minijinja::value::{from_args, Object, Value};
use minijinja::{Error, ErrorKind, State};
use std::fmt;
use std::sync::Arc;

/// Opening delimiter of a deferred placeholder.
pub const MARKER_OPEN: &str = "{{";
/// Closing delimiter of a deferred placeholder.
pub const MARKER_CLOSE: &str = "}}";

/// Whether a string carries deferred placeholder text.
pub fn contains_marker(s: &str) -> bool {
    s.contains(MARKER_OPEN) || s.contains(MARKER_CLOSE)
}

/// Text form of a run date that is resolved by a later stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredValue {
    /// `{{ run_date }}`
    Literal,
    /// `{{ run_date.strftime('<pattern>') }}`
    Formatted(String),
}

impl fmt::Display for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferredValue::Literal => write!(f, "{} run_date {}", MARKER_OPEN, MARKER_CLOSE),
            DeferredValue::Formatted(pattern) => write!(
                f,
                "{} run_date.strftime('{}') {}",
                MARKER_OPEN, pattern, MARKER_CLOSE
            ),
        }
    }
}

fn unknown_method(target: &str, method: &str) -> Error {
    Error::new(
        ErrorKind::UnknownMethod,
        format!("{} has no method named {}", target, method),
    )
}

/// `run_date` during static generation. Never yields a concrete date.
#[derive(Debug, Default)]
pub struct RunDatePlaceholder;

impl RunDatePlaceholder {
    pub fn value() -> Value {
        Value::from_object(RunDatePlaceholder)
    }
}

impl Object for RunDatePlaceholder {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "strftime" => {
                let (pattern,): (&str,) = from_args(args)?;
                Ok(Value::from(
                    DeferredValue::Formatted(pattern.to_string()).to_string(),
                ))
            }
            _ => Err(unknown_method("run_date", method)),
        }
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        Self: Sized + 'static,
    {
        write!(f, "{}", DeferredValue::Literal)
    }
}

/// `run_date` during materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDate(pub NaiveDate);

impl RunDate {
    /// Parse an eight digit `YYYYMMDD` token.
    pub fn parse(token: &str) -> Option<Self> {
        if token.len() != 8 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(token, "%Y%m%d").ok().map(RunDate)
    }

    pub fn value(self) -> Value {
        Value::from_object(self)
    }

    /// Format with a strftime pattern, rejecting patterns chrono cannot render.
    pub fn strftime(&self, pattern: &str) -> Option<String> {
        let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return None;
        }
        Some(self.0.format_with_items(items.into_iter()).to_string())
    }
}

impl Object for RunDate {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "year" => Some(Value::from(self.0.year())),
            "month" => Some(Value::from(self.0.month())),
            "day" => Some(Value::from(self.0.day())),
            _ => None,
        }
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "strftime" => {
                let (pattern,): (&str,) = from_args(args)?;
                self.strftime(pattern).map(Value::from).ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidOperation,
                        format!("invalid date format '{}'", pattern),
                    )
                })
            }
            _ => Err(unknown_method("run_date", method)),
        }
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        Self: Sized + 'static,
    {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
