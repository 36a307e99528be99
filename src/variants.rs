//! Job variants: named parameterizations of a job.
//!
//! Defaults come from `{template_root}/{group}/{job}/variants.yml` and are merged with the
//! `variants` list of a job's override document. Defaults keep their order and come first;
//! override-only variants follow in override order.

use parking_lot::Mutex;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::warn;

/// File name of the per-job default variant manifest.
pub const VARIANTS_MANIFEST: &str = "variants.yml";

/// Key naming a variant inside a variant entry.
pub const NAME_KEY: &str = "name";

/// A named variant and the context fields it sets (without `name`).
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub fields: Mapping,
}

impl Variant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Mapping::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(Value::from(key), value.into());
        self
    }

    /// Same-key replace of `overlay` onto this variant's fields.
    fn overlay(&mut self, overlay: &Mapping) {
        for (key, value) in overlay {
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

fn scalar_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Whether `name` is exactly one normal path component, so it stays inside its job directory.
pub fn is_path_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Convert one list entry into a variant; `None` for non-mappings, unnamed entries and
/// names that are not a single path segment.
fn parse_entry(entry: &Value, source: &str) -> Option<Variant> {
    let Value::Mapping(map) = entry else {
        warn!(source, "Ignoring variant entry that is not a mapping");
        return None;
    };
    let Some(name) = map.get(NAME_KEY).and_then(scalar_name) else {
        warn!(source, "Ignoring variant entry without a name");
        return None;
    };
    if !is_path_segment(&name) {
        warn!(source, name = %name, "Ignoring variant whose name is not a single path segment");
        return None;
    }
    let mut fields = map.clone();
    fields.remove(NAME_KEY);
    Some(Variant { name, fields })
}

/// Parse every valid entry of a variant list, dropping invalid ones with a warning.
pub fn parse_list(entries: &[Value], source: &str) -> Vec<Variant> {
    entries
        .iter()
        .filter_map(|entry| parse_entry(entry, source))
        .collect()
}

/// Merge default variants with the `variants` value of an override document.
///
/// Matching names overlay fields (shallow, same-key replace). Override entries naming an
/// unknown variant are appended after all defaults, in their original order. A missing or
/// non-list override value leaves the defaults unchanged.
pub fn merge(defaults: &[Variant], overrides: Option<&Value>) -> Vec<Variant> {
    let entries = match overrides {
        None | Some(Value::Null) => return defaults.to_vec(),
        Some(Value::Sequence(entries)) => entries,
        Some(_) => {
            warn!("Override 'variants' is not a list; using defaults");
            return defaults.to_vec();
        }
    };

    let cleaned = parse_list(entries, "override");
    if defaults.is_empty() {
        return cleaned;
    }

    // name -> index into `pending`; later duplicates overlay onto the first occurrence
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut pending: Vec<Option<Variant>> = Vec::new();
    for variant in cleaned {
        match index.get(&variant.name) {
            Some(&i) => {
                if let Some(existing) = pending[i].as_mut() {
                    existing.overlay(&variant.fields);
                }
            }
            None => {
                index.insert(variant.name.clone(), pending.len());
                pending.push(Some(variant));
            }
        }
    }

    let mut merged = Vec::with_capacity(defaults.len() + pending.len());
    for default in defaults {
        let mut variant = default.clone();
        if let Some(&i) = index.get(&default.name) {
            if let Some(overlay) = pending[i].take() {
                variant.overlay(&overlay.fields);
            }
        }
        merged.push(variant);
    }
    merged.extend(pending.into_iter().flatten());
    merged
}

/// Per-(group, job) cache of default variant lists.
///
/// Each manifest is read at most once per cache; edits made afterwards are not observed
/// until [`VariantDefaults::clear`] or a new cache.
#[derive(Debug, Default)]
pub struct VariantDefaults {
    entries: Mutex<HashMap<(String, String), Arc<Vec<Variant>>>>,
}

impl VariantDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default variants of `group/job`; empty when the job has no manifest.
    pub fn load(&self, template_root: &Path, group: &str, job: &str) -> Arc<Vec<Variant>> {
        let key = (group.to_string(), job.to_string());
        let mut entries = self.entries.lock();
        if let Some(cached) = entries.get(&key) {
            return Arc::clone(cached);
        }
        let manifest = template_root.join(group).join(job).join(VARIANTS_MANIFEST);
        let loaded = Arc::new(read_manifest(&manifest));
        entries.insert(key, Arc::clone(&loaded));
        loaded
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Read a manifest that is either a list or a mapping with a `variants` list.
fn read_manifest(path: &Path) -> Vec<Variant> {
    if !path.is_file() {
        return Vec::new();
    }
    let source = path.display().to_string();
    let parsed: Value = match fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_yaml::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(value) => value,
        Err(e) => {
            warn!(manifest = %source, error = %e, "Failed to read variants manifest; ignoring");
            return Vec::new();
        }
    };

    match parsed {
        Value::Null => Vec::new(),
        Value::Sequence(entries) => parse_list(&entries, &source),
        Value::Mapping(mut map) => match map.remove("variants") {
            Some(Value::Sequence(entries)) => parse_list(&entries, &source),
            _ => {
                warn!(manifest = %source, "Variants manifest has no 'variants' list; ignoring");
                Vec::new()
            }
        },
        _ => {
            warn!(manifest = %source, "Variants manifest is not a list; ignoring");
            Vec::new()
        }
    }
}
