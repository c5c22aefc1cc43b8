//! Sectioned key/value configuration.
//!
//! The registry consumes configuration through the [`ConfigSource`] contract,
//! which only knows about sections and keys. [`Config`] is the in-memory
//! implementation used by applications: it can be built programmatically or
//! loaded from YAML or JSON documents whose root is a mapping of section
//! names to mappings.
//!
//! ```yaml
//! myapp:
//!   debug: false
//!   log_handler: console
//! log.console:
//!   level: WARNING
//! ```
//!
//! Handler sections are named `<interface>.<label>`; see [`handler_section`].

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::ConfigError;

/// A single configuration section: option name to value.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Read-only access to sectioned configuration.
pub trait ConfigSource {
    /// Returns the value of `key` in `section`, if both exist.
    fn get(&self, section: &str, key: &str) -> Option<&Value>;

    /// Returns a copy of every key in `section`, or `None` if the section is absent.
    fn get_section_dict(&self, section: &str) -> Option<ConfigMap>;

    /// Returns true if `section` exists.
    fn has_section(&self, section: &str) -> bool {
        self.get_section_dict(section).is_some()
    }
}

/// Returns the config section name holding options for one handler.
pub fn handler_section(interface: &str, label: &str) -> String {
    format!("{interface}.{label}")
}

/// In-memory sectioned configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    sections: BTreeMap<String, ConfigMap>,
}

impl Config {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            origin: "yaml".into(),
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Parses a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            origin: "json".into(),
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Loads a configuration file, choosing the parser by extension
    /// (`.yaml`, `.yml` or `.json`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let origin = path.display().to_string();
        let relabel = |err: ConfigError| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                origin: origin.clone(),
                message,
            },
            other => other,
        };

        match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text).map_err(relabel),
            "json" => Self::from_json_str(&text).map_err(relabel),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Builds a configuration from a JSON value whose root maps section names
    /// to mappings. A `null` document (empty YAML file) is an empty config.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let root = match value {
            Value::Null => return Ok(Self::new()),
            Value::Object(map) => map,
            _ => {
                return Err(ConfigError::NotAMapping {
                    section: "<root>".into(),
                })
            }
        };

        let mut sections = BTreeMap::new();
        for (name, body) in root {
            match body {
                Value::Object(map) => {
                    sections.insert(name, map);
                }
                Value::Null => {
                    sections.insert(name, ConfigMap::new());
                }
                _ => return Err(ConfigError::NotAMapping { section: name }),
            }
        }
        Ok(Self { sections })
    }

    /// Sets a single value, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<Value>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Creates an empty section if it does not exist yet.
    pub fn add_section(&mut self, section: &str) {
        self.sections.entry(section.to_string()).or_default();
    }

    /// Merges `values` into `section`.
    ///
    /// With `overwrite = false` existing keys are kept, so merging the same
    /// defaults repeatedly leaves the section unchanged.
    pub fn merge(&mut self, section: &str, values: &ConfigMap, overwrite: bool) {
        let target = self.sections.entry(section.to_string()).or_default();
        for (key, value) in values {
            if overwrite || !target.contains_key(key) {
                target.insert(key.clone(), value.clone());
            }
        }
    }

    /// Layers another configuration on top of this one; its values win.
    pub fn merge_config(&mut self, other: &Config) {
        for (section, values) in &other.sections {
            self.merge(section, values, true);
        }
    }

    /// Returns a borrowed view of a section.
    pub fn section(&self, section: &str) -> Option<&ConfigMap> {
        self.sections.get(section)
    }

    /// Returns the section names in sorted order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Returns the keys of a section in sorted order.
    pub fn keys(&self, section: &str) -> Vec<&str> {
        self.sections
            .get(section)
            .map(|s| s.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns true if no section is defined.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl ConfigSource for Config {
    fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    fn get_section_dict(&self, section: &str) -> Option<ConfigMap> {
        self.sections.get(section).cloned()
    }

    fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yaml_sections() {
        let config = Config::from_yaml_str(
            r#"
myapp:
  debug: true
  log_handler: console
log.console:
  level: WARNING
empty:
"#,
        )
        .unwrap();

        assert_eq!(config.get("myapp", "debug"), Some(&json!(true)));
        assert_eq!(config.get("log.console", "level"), Some(&json!("WARNING")));
        assert!(config.has_section("empty"));
        assert_eq!(config.get_section_dict("empty"), Some(ConfigMap::new()));
        assert_eq!(
            config.sections().collect::<Vec<_>>(),
            vec!["empty", "log.console", "myapp"]
        );
    }

    #[test]
    fn test_scalar_section_rejected() {
        let err = Config::from_yaml_str("myapp: 3").unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { ref section } if section == "myapp"));

        let err = Config::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { .. }));
    }

    #[test]
    fn test_empty_document_is_empty_config() {
        assert!(Config::from_yaml_str("").unwrap().is_empty());
    }

    #[test]
    fn test_merge_without_overwrite_is_idempotent() {
        let mut config = Config::new();
        config.set("log.console", "level", "ERROR");

        let mut defaults = ConfigMap::new();
        defaults.insert("level".into(), json!("INFO"));
        defaults.insert("color".into(), json!(false));

        config.merge("log.console", &defaults, false);
        let once = config.clone();
        config.merge("log.console", &defaults, false);

        assert_eq!(config, once);
        assert_eq!(config.get("log.console", "level"), Some(&json!("ERROR")));
        assert_eq!(config.get("log.console", "color"), Some(&json!(false)));
    }

    #[test]
    fn test_merge_config_layers_values() {
        let mut base = Config::from_yaml_str("app:\n  a: 1\n  b: 2\n").unwrap();
        let top = Config::from_json_str(r#"{"app": {"b": 3}, "other": {"c": 4}}"#).unwrap();
        base.merge_config(&top);

        assert_eq!(base.get("app", "a"), Some(&json!(1)));
        assert_eq!(base.get("app", "b"), Some(&json!(3)));
        assert_eq!(base.keys("other"), vec!["c"]);
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("app.yml");
        std::fs::write(&yaml, "app:\n  name: demo\n").unwrap();
        let config = Config::from_file(&yaml).unwrap();
        assert_eq!(config.get("app", "name"), Some(&json!("demo")));

        let json_path = dir.path().join("app.json");
        std::fs::write(&json_path, r#"{"app": {"name": "json"}}"#).unwrap();
        let config = Config::from_file(&json_path).unwrap();
        assert_eq!(config.get("app", "name"), Some(&json!("json")));

        let ini = dir.path().join("app.ini");
        std::fs::write(&ini, "[app]\n").unwrap();
        assert!(matches!(
            Config::from_file(&ini),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            Config::from_file(&missing),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_handler_section_name() {
        assert_eq!(handler_section("log", "console"), "log.console");
    }
}
