//! Configuration namespace access.
//!
//! The factory never owns configuration. It borrows a [`ConfigSource`] for the
//! duration of one call and reads typed values by dotted path. Keys are matched
//! case-insensitively, so `parseTime` and `parsetime` name the same value.
//!
//! Missing or unconvertible values read as the zero value of the requested
//! type (`""`, `0`, `false`, zero duration). Callers that need to tell
//! "absent" from "zero" check [`ConfigSource::contains`] or inspect the raw
//! string.

use crate::error::{DbError, DbResult};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

/// Read-only hierarchical key space addressed by dotted paths.
pub trait ConfigSource: Send + Sync {
    /// Raw value at `path`, if present.
    fn lookup(&self, path: &str) -> Option<&Value>;

    fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(|v| !v.is_null())
    }

    fn get_str(&self, path: &str) -> String {
        match self.lookup(path) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    fn get_int(&self, path: &str) -> i64 {
        match self.lookup(path) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            Some(Value::Bool(b)) => i64::from(*b),
            _ => 0,
        }
    }

    fn get_bool(&self, path: &str) -> bool {
        match self.lookup(path) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => parse_bool(s),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            _ => false,
        }
    }

    /// Integers are seconds; strings use human form such as `10s`, `1m30s`, `500ms`.
    fn get_duration(&self, path: &str) -> Duration {
        match self.lookup(path) {
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Duration::from_secs)
                .or_else(|| n.as_f64().and_then(|f| Duration::try_from_secs_f64(f).ok()))
                .unwrap_or_default(),
            Some(Value::String(s)) => parse_duration(s),
            _ => Duration::ZERO,
        }
    }

    /// View of this source with `prefix` prepended to every lookup.
    fn scoped(&self, prefix: &str) -> Scoped<'_>
    where
        Self: Sized,
    {
        Scoped::new(self, prefix)
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "1" | "yes" | "y" | "on"
    )
}

fn parse_duration(s: &str) -> Duration {
    let s = s.trim();
    if s.is_empty() {
        return Duration::ZERO;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Duration::from_secs(secs);
    }
    humantime::parse_duration(s).unwrap_or_default()
}

fn normalize_path(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_ascii_lowercase())
}

/// A [`ConfigSource`] restricted to one prefix.
#[derive(Clone)]
pub struct Scoped<'a> {
    inner: &'a dyn ConfigSource,
    prefix: String,
}

impl<'a> Scoped<'a> {
    pub fn new(inner: &'a dyn ConfigSource, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('.');
        Self {
            inner,
            prefix: if prefix.is_empty() {
                String::new()
            } else {
                format!("{}.", prefix)
            },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl ConfigSource for Scoped<'_> {
    fn lookup(&self, path: &str) -> Option<&Value> {
        self.inner.lookup(&format!("{}{}", self.prefix, path))
    }
}

impl std::fmt::Debug for Scoped<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scoped")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// In-memory configuration tree loaded from JSON or YAML.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: Value,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Wrap an existing JSON value. Keys are lowercased.
    pub fn from_value(value: Value) -> DbResult<Self> {
        match lowercase_keys(value) {
            root @ Value::Object(_) => Ok(Self { root }),
            other => Err(DbError::config(format!(
                "configuration root must be a mapping, got {}",
                value_kind(&other)
            ))),
        }
    }

    pub fn from_json_str(s: &str) -> DbResult<Self> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| DbError::config(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_yaml_str(s: &str) -> DbResult<Self> {
        let value: Value =
            serde_yaml::from_str(s).map_err(|e| DbError::config(format!("invalid YAML: {}", e)))?;
        Self::from_value(value)
    }

    /// Load a file, choosing the format from its extension (`json`, `yaml`, `yml`).
    pub fn from_file(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DbError::config(format!("failed to read {}: {}", path.display(), e))
        })?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Self::from_json_str(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => Err(DbError::config(format!(
                "unsupported configuration format: {}",
                path.display()
            ))),
        }
    }

    /// Set a value, creating intermediate mappings as needed.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let segments: Vec<String> = normalize_path(path).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut node = &mut self.root;
        for segment in parents {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = match node {
                Value::Object(map) => map
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new())),
                _ => return,
            };
        }

        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        if let Value::Object(map) = node {
            map.insert(last.clone(), lowercase_keys(value.into()));
        }
    }

    /// Builder form of [`ConfigTree::set`].
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }
}

impl ConfigSource for ConfigTree {
    fn lookup(&self, path: &str) -> Option<&Value> {
        let mut node = &self.root;
        for segment in normalize_path(path) {
            node = node.as_object()?.get(&segment)?;
        }
        Some(node)
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), lowercase_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
