//! JSON output handler.
//!
//! Config key `indent`: spaces per level, `0` for compact output. Defaults to 2.

use keel_core::{BoxError, ConfigMap, Handler, Meta, Provides};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

use crate::interfaces::output::{OutputHandler, CAPABILITIES};

#[derive(Debug)]
pub struct JsonOutputHandler {
    indent: usize,
}

impl Default for JsonOutputHandler {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

impl Provides for JsonOutputHandler {
    const LABEL: &'static str = "json";
    const CAPABILITIES: &'static [&'static str] = CAPABILITIES;

    fn config_defaults() -> ConfigMap {
        let mut defaults = ConfigMap::new();
        defaults.insert("indent".into(), Value::from(2));
        defaults
    }
}

impl Handler for JsonOutputHandler {
    fn setup(&mut self, meta: &Meta) -> Result<(), BoxError> {
        if let Some(value) = meta.get("indent") {
            let indent = value
                .as_u64()
                .ok_or_else(|| format!("'indent' must be a non-negative integer, got {value}"))?;
            self.indent = usize::try_from(indent)?;
        }
        Ok(())
    }
}

impl OutputHandler for JsonOutputHandler {
    fn render(&self, data: &Value) -> Result<String, BoxError> {
        if self.indent == 0 {
            return Ok(serde_json::to_string(data)?);
        }
        let indent = " ".repeat(self.indent);
        let mut out = Vec::new();
        let mut serializer =
            Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
        data.serialize(&mut serializer)?;
        Ok(String::from_utf8(out)?)
    }
}
