//! Layered option bag attached to every hub.
//!
//! Setting options never mutates an existing [`Options`]: the new keys go into
//! a fresh layer whose lookups fall back to the previous one. Anyone holding
//! the previous `Rc<Options>` keeps seeing exactly what it saw before.

use crate::error::{OptionsError, Result};
use crate::event::Payload;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct Options {
    values: Payload,
    base: Option<Rc<Options>>,
}

impl Options {
    /// Create a root layer
    pub fn new(values: Payload) -> Self {
        Self { values, base: None }
    }

    /// Create a layer over `base`; keys in `values` shadow the base
    pub fn layered(base: &Rc<Options>, values: Payload) -> Self {
        Self {
            values,
            base: Some(Rc::clone(base)),
        }
    }

    /// Look a key up, newest layer first
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.values.get(key) {
            Some(value) => Some(value),
            None => self.base.as_deref().and_then(|base| base.get(key)),
        }
    }

    /// Look a key up and deserialize it
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .get(key)
            .ok_or_else(|| OptionsError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value.clone()).map_err(|e| OptionsError::InvalidType {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Look a key up with a default for missing or mistyped values
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_as(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All visible keys, sorted
    pub fn keys(&self) -> BTreeSet<String> {
        let mut keys = self.base.as_deref().map(Options::keys).unwrap_or_default();
        keys.extend(self.values.keys().cloned());
        keys
    }

    /// Keys set on this layer only
    pub fn own(&self) -> &Payload {
        &self.values
    }

    /// The layer this one falls back to
    pub fn base(&self) -> Option<&Rc<Options>> {
        self.base.as_ref()
    }

    /// Number of layers, this one included
    pub fn depth(&self) -> usize {
        1 + self.base.as_deref().map_or(0, Options::depth)
    }

    /// Flattened view of every visible key
    pub fn to_map(&self) -> Payload {
        let mut map = self.base.as_deref().map(Options::to_map).unwrap_or_default();
        map.extend(self.values.clone());
        map
    }
}

impl From<Payload> for Options {
    fn from(values: Payload) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_get_from_root() {
        let options = Options::new(payload(json!({"name": "map", "zoom": 3})));

        assert_eq!(options.get("name"), Some(&json!("map")));
        assert_eq!(options.get_as::<u32>("zoom").unwrap(), 3);
        assert!(options.get("missing").is_none());
        assert_eq!(options.depth(), 1);
    }

    #[test]
    fn test_layer_shadows_base() {
        let base = Rc::new(Options::new(payload(json!({"zoom": 3, "name": "map"}))));
        let layer = Options::layered(&base, payload(json!({"zoom": 5})));

        assert_eq!(layer.get_as::<u32>("zoom").unwrap(), 5);
        assert_eq!(layer.get_as::<String>("name").unwrap(), "map");
        assert_eq!(layer.depth(), 2);
        assert_eq!(layer.own().len(), 1);
    }

    #[test]
    fn test_layer_does_not_mutate_base() {
        let base = Rc::new(Options::new(payload(json!({"zoom": 3}))));
        let _layer = Options::layered(&base, payload(json!({"zoom": 5, "extra": true})));

        assert_eq!(base.get_as::<u32>("zoom").unwrap(), 3);
        assert!(!base.contains("extra"));
    }

    #[test]
    fn test_get_as_errors() {
        let options = Options::new(payload(json!({"zoom": "high"})));

        assert!(matches!(
            options.get_as::<u32>("missing"),
            Err(OptionsError::KeyNotFound(key)) if key == "missing"
        ));
        assert!(matches!(
            options.get_as::<u32>("zoom"),
            Err(OptionsError::InvalidType { .. })
        ));
        assert_eq!(options.get_or("zoom", 7u32), 7);
    }

    #[test]
    fn test_keys_and_to_map() {
        let base = Rc::new(Options::new(payload(json!({"a": 1, "b": 2}))));
        let layer = Options::layered(&base, payload(json!({"b": 3, "c": 4})));

        let keys: Vec<String> = layer.keys().into_iter().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(Value::Object(layer.to_map()), json!({"a": 1, "b": 3, "c": 4}));
    }
}
