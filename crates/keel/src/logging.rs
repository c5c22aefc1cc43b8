//! Process-wide `tracing` subscriber.
//!
//! The console log handler mirrors its messages as `tracing` events, and the
//! registry, resolver and hook dispatcher emit their own. Apps that want
//! those events on stderr call [`init`], or enable
//! [`AppBuilder::tracing`](crate::AppBuilder::tracing).
//!
//! `RUST_LOG` overrides the default filter when set.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a stderr subscriber filtered at `default_level`.
///
/// Returns false if a global subscriber was already installed, in which
/// case the existing one is kept.
pub fn init(default_level: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}

/// Filter level matching the app's debug flag.
pub fn default_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_second_init_keeps_existing_subscriber() {
        let _ = init("warn");
        assert!(!init("debug"));
    }

    #[test]
    fn test_default_level_follows_debug() {
        assert_eq!(default_level(true), "debug");
        assert_eq!(default_level(false), "warn");
    }
}
