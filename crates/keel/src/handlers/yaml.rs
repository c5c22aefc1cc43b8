//! YAML output handler.

use keel_core::{BoxError, Handler, Provides};
use serde_json::Value;

use crate::interfaces::output::{OutputHandler, CAPABILITIES};

#[derive(Debug, Default)]
pub struct YamlOutputHandler;

impl Provides for YamlOutputHandler {
    const LABEL: &'static str = "yaml";
    const CAPABILITIES: &'static [&'static str] = CAPABILITIES;
}

impl Handler for YamlOutputHandler {}

impl OutputHandler for YamlOutputHandler {
    fn render(&self, data: &Value) -> Result<String, BoxError> {
        Ok(serde_yaml::to_string(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_renders_mapping() {
        let out = YamlOutputHandler
            .render(&json!({"name": "keel", "count": 2}))
            .unwrap();
        assert_eq!(out, "count: 2\nname: keel\n");
    }
}
