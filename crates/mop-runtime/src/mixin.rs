//! Mixin extension
//!
//! Property maps are plain, ordered name → descriptor tables. They serve as
//! initial attribute sets for the factory and as mixin sources for `extend`.
//!
//! A provider may list names it does not want copied in its own `except`
//! attribute. `except` itself is never copied, and the provider is never
//! modified while its exclusion set is computed.

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};

use crate::value::Value;

/// Attribute that lists names a provider withholds from `extend`
pub const EXCEPT_KEY: &str = "except";

/// A data attribute with its enumerability
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Attribute value
    pub value: Value,
    /// Visible to enumeration and mixin copying
    pub enumerable: bool,
}

impl PropertyDescriptor {
    /// Enumerable descriptor
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            enumerable: true,
        }
    }

    /// Non-enumerable descriptor
    pub fn hidden(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            enumerable: false,
        }
    }
}

/// Ordered property map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: IndexMap<String, PropertyDescriptor, FxBuildHasher>,
}

impl PropertyMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `insert`
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder form of `define`
    pub fn with_descriptor(mut self, name: &str, descriptor: PropertyDescriptor) -> Self {
        self.define(name, descriptor);
        self
    }

    /// Assign a value. A new name becomes enumerable; an existing name keeps
    /// its enumerability and position. Returns the previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        let value = value.into();
        match self.entries.get_mut(name) {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value)),
            None => {
                self.entries
                    .insert(name.to_string(), PropertyDescriptor::new(value));
                None
            }
        }
    }

    /// Define (or redefine) an attribute with an explicit descriptor
    pub fn define(&mut self, name: &str, descriptor: PropertyDescriptor) {
        self.entries.insert(name.to_string(), descriptor);
    }

    /// Get a value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|d| &d.value)
    }

    /// Get a descriptor by name
    pub fn descriptor(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.entries.get(name)
    }

    /// Check if a name is present
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyDescriptor)> {
        self.entries.iter().map(|(name, d)| (name.as_str(), d))
    }

    /// Enumerable entries in insertion order
    pub fn enumerable(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .filter(|(_, d)| d.enumerable)
            .map(|(name, d)| (name.as_str(), &d.value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for (name, value) in iter {
            let name: String = name.into();
            map.insert(&name, value);
        }
        map
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, PropertyDescriptor);
    type IntoIter = indexmap::map::IntoIter<String, PropertyDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Names withheld by `provider`: its own `except` list plus `except` itself.
///
/// `except` may be an array of strings or a single string; any other value
/// contributes nothing.
fn exclusions(provider: &PropertyMap) -> FxHashSet<&str> {
    let mut excluded = FxHashSet::default();
    excluded.insert(EXCEPT_KEY);
    match provider.get(EXCEPT_KEY) {
        Some(Value::Array(names)) => {
            excluded.extend(names.iter().filter_map(Value::as_str));
        }
        Some(Value::Str(name)) => {
            excluded.insert(name);
        }
        _ => {}
    }
    excluded
}

/// Entries of `provider` that `extend` copies, in provider order
pub fn mixin_entries(provider: &PropertyMap) -> impl Iterator<Item = (&str, &Value)> {
    let excluded = exclusions(provider);
    provider
        .enumerable()
        .filter(move |(name, _)| !excluded.contains(name))
}

/// Copy every own enumerable, non-excluded attribute of each provider into
/// `consumer`, in argument order. Later providers win.
pub fn extend<'a>(consumer: &'a mut PropertyMap, providers: &[&PropertyMap]) -> &'a mut PropertyMap {
    for provider in providers {
        for (name, value) in mixin_entries(provider) {
            consumer.insert(name, value.clone());
        }
    }
    consumer
}
