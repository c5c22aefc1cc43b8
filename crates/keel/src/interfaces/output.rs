//! The `output` interface.

use keel_core::{BoxError, Handler, InterfaceDefinition};
use serde_json::Value;

pub const INTERFACE: &str = "output";

pub const CAPABILITIES: &[&str] = &["render"];

/// Renders structured data to text.
pub trait OutputHandler: Handler {
    fn render(&self, data: &Value) -> Result<String, BoxError>;
}

pub fn definition() -> InterfaceDefinition {
    InterfaceDefinition::new::<dyn OutputHandler>(INTERFACE)
        .capabilities(CAPABILITIES.iter().copied())
        .description("renders data for display")
}
