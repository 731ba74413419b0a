//! Exported properties.
//!
//! Rules export extracted content as `key = value` pairs. Keys use `.` to
//! flatten structure: `title` for a captured body, `title.lang` for one of its
//! attributes. Adding a value never overwrites: repeated keys accumulate in
//! insertion order.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Destination for exported properties.
pub trait PropertySink {
    /// Append `value` under `key`; earlier values for `key` are kept.
    fn add_property(&mut self, key: &str, value: &str);
}

/// Ordered, multi-valued property store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value exported under `key`.
    pub fn get<'a>(&'a self, key: &str) -> Option<&'a str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value exported under `key`, in export order.
    pub fn get_all<'a, 'k>(
        &'a self,
        key: &'k str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'k> {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// All entries in export order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Distinct keys in first-export order.
    pub fn keys(&self) -> Vec<&str> {
        self.grouped().into_iter().map(|(key, _)| key).collect()
    }

    /// Values grouped per key, keys in first-export order.
    fn grouped(&self) -> Vec<(&str, Vec<&str>)> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for (key, value) in &self.entries {
            let slot = *index.entry(key.as_str()).or_insert_with(|| {
                groups.push((key.as_str(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(value.as_str());
        }
        groups
    }

    /// Entries nested under `prefix.`, with the prefix stripped from the key.
    ///
    /// `children("bar")` over `bar.x=1`, `bar=hello` yields `("x", "1")`.
    pub fn children<'a, 'p>(
        &'a self,
        prefix: &'p str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + use<'a, 'p> {
        self.entries.iter().filter_map(move |(key, value)| {
            let child = key.strip_prefix(prefix)?.strip_prefix('.')?;
            Some((child, value.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PropertySink for Properties {
    fn add_property(&mut self, key: &str, value: &str) {
        self.entries.push((key.to_string(), value.to_string()));
    }
}

/// Serialized as `{ key: [values...] }` with keys in first-export order.
impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let groups = self.grouped();
        let mut map = serializer.serialize_map(Some(groups.len()))?;
        for (key, values) in &groups {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}
