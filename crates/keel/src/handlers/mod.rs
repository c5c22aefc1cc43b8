//! Built-in handler implementations.

pub mod console;
pub mod dummy_mail;
pub mod json;
pub mod memory_cache;
pub mod platform;
pub mod yaml;

pub use console::ConsoleLogHandler;
pub use dummy_mail::DummyMailHandler;
pub use json::JsonOutputHandler;
pub use memory_cache::MemoryCacheHandler;
pub use platform::KeelPlatformHandler;
pub use yaml::YamlOutputHandler;
