//! Construction arguments: the named values handed to every constructor.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A merged bundle of named construction values.
///
/// Bundles merge shallowly, left to right: a key set by a later bundle
/// replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Merges an ordered list of bundles. Every bundle must be a JSON object.
    pub fn from_bundles<I>(bundles: I) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut merged = Self::new();
        for (index, bundle) in bundles.into_iter().enumerate() {
            merged.merge(&Self::try_from(bundle).map_err(|e| {
                Error::invalid_configuration(format!("argument bundle #{index}: {e}"))
            })?);
        }
        Ok(merged)
    }

    /// Merges `other` over `self` in place.
    pub fn merge(&mut self, other: &Arguments) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Returns a copy of `self` with `overrides` merged on top.
    pub fn merged(&self, overrides: &Arguments) -> Self {
        let mut copy = self.clone();
        copy.merge(overrides);
        copy
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Deserializes the value under `key` into a typed value.
    ///
    /// A missing key is an [`Error::InvalidConfiguration`], as is a value of
    /// the wrong shape.
    pub fn parse<D: DeserializeOwned>(&self, key: &str) -> Result<D> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| Error::invalid_configuration(format!("missing argument `{key}`")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::invalid_configuration(format!("argument `{key}`: {e}")))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Arguments {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(Error::invalid_configuration(format!(
                "expected an object of named values, got `{other}`"
            ))),
        }
    }
}
