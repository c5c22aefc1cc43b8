//! The `cache` interface.

use std::time::Duration;

use keel_core::{Handler, InterfaceDefinition};
use serde_json::Value;

pub const INTERFACE: &str = "cache";

pub const CAPABILITIES: &[&str] = &["get", "set", "delete", "purge"];

/// Key/value cache with optional expiry.
pub trait CacheHandler: Handler {
    /// Returns the value for `key`, or `None` if missing or expired.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores a value. `expire` of `None` uses the handler's default.
    fn set(&self, key: &str, value: Value, expire: Option<Duration>);

    /// Removes a key. Returns true if it was present.
    fn delete(&self, key: &str) -> bool;

    fn purge(&self);
}

pub fn definition() -> InterfaceDefinition {
    InterfaceDefinition::new::<dyn CacheHandler>(INTERFACE)
        .capabilities(CAPABILITIES.iter().copied())
        .description("key/value caching")
}
