//! Interfaces every app defines.
//!
//! | Interface  | Trait                | Built-in handlers |
//! |------------|----------------------|-------------------|
//! | `log`      | [`LogHandler`]       | `console`         |
//! | `output`   | [`OutputHandler`]    | `json`, `yaml`    |
//! | `mail`     | [`MailHandler`]      | `dummy`           |
//! | `cache`    | [`CacheHandler`]     | `memory`          |
//! | `platform` | [`PlatformHandler`]  | `keel`            |
//!
//! The interfaces are defined when the app is built; their handlers come
//! from the [`Builtin`](crate::ext::Builtin) extension, which apps may leave
//! out and replace.

use keel_core::InterfaceDefinition;

pub mod cache;
pub mod log;
pub mod mail;
pub mod output;
pub mod platform;

pub use cache::CacheHandler;
pub use log::{LogHandler, LogLevel, ParseLevelError};
pub use mail::{MailHandler, MailMessage};
pub use output::OutputHandler;
pub use platform::PlatformHandler;

/// Definitions of every built-in interface, in definition order.
pub fn builtin() -> Vec<InterfaceDefinition> {
    vec![
        log::definition(),
        output::definition(),
        mail::definition(),
        cache::definition(),
        platform::definition(),
    ]
}
