//! The `platform` interface.

use keel_core::{Handler, InterfaceDefinition};

pub const INTERFACE: &str = "platform";

pub const CAPABILITIES: &[&str] = &["platform", "host", "pid"];

/// Facts about the running process.
pub trait PlatformHandler: Handler {
    /// Operating system and architecture, e.g. `linux-x86_64`.
    fn platform(&self) -> &str;

    fn host(&self) -> &str;

    fn pid(&self) -> u32;
}

pub fn definition() -> InterfaceDefinition {
    InterfaceDefinition::new::<dyn PlatformHandler>(INTERFACE)
        .capabilities(CAPABILITIES.iter().copied())
        .description("process and host information")
}
