//! Console log handler.
//!
//! Writes `LEVEL: message` lines to a [`Sink`] and mirrors every accepted
//! message as a `tracing` event with target `keel::log`.
//!
//! Config keys: `level` (default `INFO`) and `debug`, which forces `DEBUG`
//! when true. Both may come from the app section, so `debug: true` at the
//! top of the app's config turns on debug logging.

use std::cell::Cell;

use keel_core::{BoxError, ConfigMap, Handler, Meta, Provides};
use serde_json::Value;

use crate::interfaces::log::{LogHandler, LogLevel, CAPABILITIES};
use crate::sink::Sink;

#[derive(Debug)]
pub struct ConsoleLogHandler {
    sink: Sink,
    level: Cell<LogLevel>,
    namespace: String,
}

impl ConsoleLogHandler {
    pub fn new(sink: Sink) -> Self {
        Self {
            sink,
            level: Cell::new(LogLevel::Info),
            namespace: String::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Provides for ConsoleLogHandler {
    const LABEL: &'static str = "console";
    const CAPABILITIES: &'static [&'static str] = CAPABILITIES;

    fn config_defaults() -> ConfigMap {
        let mut defaults = ConfigMap::new();
        defaults.insert("level".into(), Value::from(LogLevel::Info.as_str()));
        defaults
    }
}

impl Handler for ConsoleLogHandler {
    fn setup(&mut self, meta: &Meta) -> Result<(), BoxError> {
        let level = match meta.get_str("level") {
            Some(name) => name.parse::<LogLevel>()?,
            None => LogLevel::Info,
        };
        self.level.set(if meta.get_bool("debug") == Some(true) {
            LogLevel::Debug
        } else {
            level
        });
        self.namespace = meta
            .get_str("namespace")
            .unwrap_or(meta.label())
            .to_string();
        Ok(())
    }
}

impl LogHandler for ConsoleLogHandler {
    fn set_level(&self, level: LogLevel) {
        self.level.set(level);
    }

    fn get_level(&self) -> LogLevel {
        self.level.get()
    }

    fn log(&self, level: LogLevel, msg: &str) {
        if level < self.level.get() {
            return;
        }
        let namespace = self.namespace.as_str();
        match level {
            LogLevel::Debug => tracing::debug!(target: "keel::log", namespace, "{msg}"),
            LogLevel::Info => tracing::info!(target: "keel::log", namespace, "{msg}"),
            LogLevel::Warning => tracing::warn!(target: "keel::log", namespace, "{msg}"),
            LogLevel::Error => tracing::error!(target: "keel::log", namespace, "{msg}"),
            LogLevel::Fatal => tracing::error!(target: "keel::log", namespace, fatal = true, "{msg}"),
        }
        // A closed pipe must not take the app down with it.
        let _ = self.sink.write_line(&format!("{level}: {msg}"));
    }
}
