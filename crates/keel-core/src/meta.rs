//! Merged configuration handed to a handler's setup routine.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ConfigMap;

/// Identity and merged configuration of a handler being set up.
///
/// The resolver builds one `Meta` per setup call by layering, lowest first:
/// the application's config section, the handler's config defaults, the
/// handler's own config section and finally the resolution-time meta
/// defaults. See [`merge_layers`].
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    interface: String,
    label: String,
    config: ConfigMap,
}

impl Meta {
    pub fn new(interface: impl Into<String>, label: impl Into<String>, config: ConfigMap) -> Self {
        Self {
            interface: interface.into(),
            label: label.into(),
            config,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &ConfigMap {
        &self.config
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(Value::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(Value::as_u64)
    }

    /// Returns a list of strings; a single string is treated as a one-item list.
    pub fn get_strings(&self, key: &str) -> Vec<String> {
        match self.config.get(key) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Deserializes the merged configuration into a handler's config struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.config.clone()))
    }
}

/// Merges configuration layers; later layers override earlier ones key by key.
pub fn merge_layers<'a, I>(layers: I) -> ConfigMap
where
    I: IntoIterator<Item = &'a ConfigMap>,
{
    let mut merged = ConfigMap::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn map(value: Value) -> ConfigMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_later_layers_win() {
        let app = map(json!({"level": "INFO", "color": true}));
        let defaults = map(json!({"level": "WARNING", "format": "short"}));
        let meta = map(json!({"format": "long"}));

        let merged = merge_layers([&app, &defaults, &meta]);
        assert_eq!(merged["level"], json!("WARNING"));
        assert_eq!(merged["color"], json!(true));
        assert_eq!(merged["format"], json!("long"));
    }

    #[test]
    fn test_typed_getters() {
        let meta = Meta::new(
            "mail",
            "dummy",
            map(json!({"to": "a@example.com", "cc": ["b@example.com", 3], "port": 25, "tls": false})),
        );
        assert_eq!(meta.interface(), "mail");
        assert_eq!(meta.label(), "dummy");
        assert_eq!(meta.get_strings("to"), vec!["a@example.com"]);
        assert_eq!(meta.get_strings("cc"), vec!["b@example.com"]);
        assert!(meta.get_strings("bcc").is_empty());
        assert_eq!(meta.get_u64("port"), Some(25));
        assert_eq!(meta.get_bool("tls"), Some(false));
        assert_eq!(meta.get_str("port"), None);
    }

    #[test]
    fn test_deserialize_into_struct() {
        #[derive(Deserialize)]
        struct CacheConfig {
            expire_time: u64,
            #[serde(default)]
            namespace: Option<String>,
        }

        let meta = Meta::new("cache", "memory", map(json!({"expire_time": 30, "extra": 1})));
        let config: CacheConfig = meta.deserialize().unwrap();
        assert_eq!(config.expire_time, 30);
        assert!(config.namespace.is_none());
    }
}
