//! Deterministic YAML output for rendered configs.
//!
//! Block style, keys in source insertion order (or sorted on request), no line wrapping.
//! Strings carrying deferred placeholder text are always double-quoted so the runtime
//! stage sees them as strings.

use crate::placeholder::contains_marker;
use regex::RegexSet;
use serde_yaml::{Mapping, Value};
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Key order used when writing mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrder {
    /// Keep the order in which keys appear in the source document
    Insertion,
    /// Sort keys by their scalar text
    Sorted,
}

/// Serialize a document. Always ends with a newline.
pub fn to_string(value: &Value, order: KeyOrder) -> String {
    let mut out = String::new();
    match value {
        Value::Mapping(map) if !map.is_empty() => write_mapping(&mut out, map, 0, order),
        Value::Sequence(items) if !items.is_empty() => write_sequence(&mut out, items, 0, order),
        Value::Tagged(tagged) => {
            let _ = writeln!(out, "{} {}", tagged.tag, inline(&tagged.value, order));
        }
        other => {
            out.push_str(&inline(other, order));
            out.push('\n');
        }
    }
    out
}

/// Whether a value is written on the same line as its key or dash.
fn is_inline(value: &Value) -> bool {
    match value {
        Value::Mapping(map) => map.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        Value::Tagged(tagged) => is_inline(&tagged.value),
        _ => true,
    }
}

fn sorted_entries(map: &Mapping, order: KeyOrder) -> Vec<(&Value, &Value)> {
    let mut entries: Vec<(&Value, &Value)> = map.iter().collect();
    if order == KeyOrder::Sorted {
        entries.sort_by_key(|(key, _)| match key {
            Value::String(s) => s.clone(),
            other => scalar(other),
        });
    }
    entries
}

fn write_mapping(out: &mut String, map: &Mapping, indent: usize, order: KeyOrder) {
    let pad = " ".repeat(indent);
    for (key, value) in sorted_entries(map, order) {
        let key_text = scalar(key);
        match value {
            Value::Tagged(tagged) if !is_inline(&tagged.value) => {
                let _ = writeln!(out, "{}{}: {}", pad, key_text, tagged.tag);
                write_block(out, &tagged.value, indent, order);
            }
            _ if is_inline(value) => {
                let _ = writeln!(out, "{}{}: {}", pad, key_text, inline(value, order));
            }
            _ => {
                let _ = writeln!(out, "{}{}:", pad, key_text);
                write_block(out, value, indent, order);
            }
        }
    }
}

/// Nested block under a key: mappings indent by two, sequences stay at the key's indent.
fn write_block(out: &mut String, value: &Value, indent: usize, order: KeyOrder) {
    match value {
        Value::Mapping(map) => write_mapping(out, map, indent + 2, order),
        Value::Sequence(items) => write_sequence(out, items, indent, order),
        _ => {}
    }
}

fn write_sequence(out: &mut String, items: &[Value], indent: usize, order: KeyOrder) {
    let pad = " ".repeat(indent);
    for item in items {
        if is_inline(item) {
            let _ = writeln!(out, "{}- {}", pad, inline(item, order));
            continue;
        }
        // Nested block starts on the dash line: render at indent + 2, then swap the
        // leading padding of its first line for the dash.
        let mut nested = String::new();
        match item {
            Value::Mapping(map) => write_mapping(&mut nested, map, indent + 2, order),
            Value::Sequence(inner) => write_sequence(&mut nested, inner, indent + 2, order),
            Value::Tagged(tagged) => {
                let _ = writeln!(out, "{}- {}", pad, tagged.tag);
                write_block(out, &tagged.value, indent + 2, order);
                continue;
            }
            _ => {}
        }
        out.push_str(&pad);
        out.push_str("- ");
        out.push_str(&nested[indent + 2..]);
    }
}

/// Flow text of a value that fits on one line.
fn inline(value: &Value, order: KeyOrder) -> String {
    match value {
        Value::Mapping(_) => "{}".to_string(),
        Value::Sequence(_) => "[]".to_string(),
        Value::Tagged(tagged) => format!("{} {}", tagged.tag, inline(&tagged.value, order)),
        other => scalar(other),
    }
}

/// Text of a scalar value (or key).
pub fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => string(s),
        // Complex keys are rare in configs; fall back to the library's flow rendering
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().replace('\n', " "))
            .unwrap_or_default(),
    }
}

/// Plain scalars that YAML 1.1 readers resolve to something other than a string.
fn yaml11_implicit() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new([
            // bool
            r"^(?:y|Y|yes|Yes|YES|n|N|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF)$",
            // null
            r"^(?:~|null|Null|NULL)$",
            // int, including underscores and base 60
            r"^[-+]?(?:0b[0-1_]+|0[0-7_]+|(?:0|[1-9][0-9_]*)|0x[0-9a-fA-F_]+|[1-9][0-9_]*(?::[0-5]?[0-9])+)$",
            // float, including base 60
            r"^(?:[-+]?[0-9][0-9_]*\.[0-9_]*(?:[eE][-+][0-9]+)?|\.[0-9][0-9_]*(?:[eE][-+][0-9]+)?|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
            // timestamp
            r"^(?:[0-9]{4}-[0-9]{2}-[0-9]{2}|[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}(?:[Tt]|[ \t]+)[0-9]{1,2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9]{1,2}(?::[0-9]{2})?))?)$",
            // merge key and value
            r"^(?:<<|=)$",
        ])
        .expect("static regex set")
    })
}

fn string(s: &str) -> String {
    if contains_marker(s) || s.contains('\n') || s.contains('\r') {
        return double_quoted(s);
    }
    if yaml11_implicit().is_match(s) {
        return single_quoted(s);
    }
    match serde_yaml::to_string(s) {
        Ok(text) if !text.trim_end().contains('\n') => text.trim_end().to_string(),
        _ => double_quoted(s),
    }
}

fn single_quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
