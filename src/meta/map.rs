//! The ordered, typed metadata map.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// TagValue
// =============================================================================

/// One metadata value with its type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl TagValue {
    /// Name of the carried type.
    pub const fn type_name(&self) -> &'static str {
        match self {
            TagValue::Str(_) => "string",
            TagValue::Int(_) => "int",
            TagValue::Float(_) => "float",
        }
    }

    /// String view; numbers are formatted.
    pub fn as_string(&self) -> String {
        match self {
            TagValue::Str(s) => s.clone(),
            TagValue::Int(v) => v.to_string(),
            TagValue::Float(v) => v.to_string(),
        }
    }

    /// Integer view; strings parse, floats truncate.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TagValue::Str(s) => s.trim().parse().ok(),
            TagValue::Int(v) => Some(*v),
            TagValue::Float(v) => Some(*v as i64),
        }
    }

    /// Float view; strings parse, ints widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            TagValue::Str(s) => s.trim().parse().ok(),
            TagValue::Int(v) => Some(*v as f64),
            TagValue::Float(v) => Some(*v),
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

// =============================================================================
// MetadataMap
// =============================================================================

/// Ordered string-keyed map of typed metadata values.
///
/// Built fresh per page by the normalization layer; codecs write into it
/// through `append_metadata`. Iteration order is deterministic (sorted by
/// key), so two parses of the same page compare equal entry for entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataMap {
    entries: BTreeMap<String, TagValue>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value unconditionally, replacing any existing entry.
    pub fn set(&mut self, key: impl Into<String>, value: TagValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, TagValue::Str(value.into()));
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.set(key, TagValue::Int(value));
    }

    pub fn set_float(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, TagValue::Float(value));
    }

    /// Insert only when the key is absent. Returns true when inserted.
    ///
    /// This is the precedence rule of the normalization layer: generic
    /// derived tags never overwrite what a codec already supplied.
    pub fn append(&mut self, key: impl Into<String>, value: TagValue) -> bool {
        match self.entries.entry(key.into()) {
            btree_map::Entry::Vacant(e) => {
                e.insert(value);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn append_str(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        self.append(key, TagValue::Str(value.into()))
    }

    pub fn append_int(&mut self, key: impl Into<String>, value: i64) -> bool {
        self.append(key, TagValue::Int(value))
    }

    pub fn append_float(&mut self, key: impl Into<String>, value: f64) -> bool {
        self.append(key, TagValue::Float(value))
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.entries.get(key)
    }

    /// String value or `default` when absent.
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> String {
        self.get(key)
            .map(|v| v.as_string())
            .unwrap_or_else(|| default.to_string())
    }

    /// Integer value or `default` when absent or unparseable.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(|v| v.as_int()).unwrap_or(default)
    }

    /// Float value or `default` when absent or unparseable.
    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(|v| v.as_float()).unwrap_or(default)
    }

    /// Parse a comma-joined float list, e.g. the pyramid scale tag.
    pub fn get_float_list(&self, key: &str) -> Vec<f64> {
        self.get_str(key, "")
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<TagValue> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// =============================================================================
// Tests
// =============================================================================
