//! The `log` interface.

use std::fmt;
use std::str::FromStr;

use keel_core::{Handler, InterfaceDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INTERFACE: &str = "log";

pub const CAPABILITIES: &[&str] = &[
    "set_level",
    "get_level",
    "info",
    "warning",
    "error",
    "critical",
    "debug",
];

/// Severity of a log message, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level '{0}'")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    /// Parses a level name, ignoring case. `WARN` and `CRITICAL` are accepted
    /// as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" | "CRITICAL" => Ok(LogLevel::Fatal),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Leveled logging.
///
/// Implementors write [`log`](Self::log); the per-level methods forward to it.
/// Messages below the current level are dropped.
pub trait LogHandler: Handler {
    fn set_level(&self, level: LogLevel);

    fn get_level(&self) -> LogLevel;

    fn log(&self, level: LogLevel, msg: &str);

    fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg)
    }

    fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg)
    }

    fn warning(&self, msg: &str) {
        self.log(LogLevel::Warning, msg)
    }

    fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg)
    }

    /// Logs at [`LogLevel::Fatal`].
    fn critical(&self, msg: &str) {
        self.log(LogLevel::Fatal, msg)
    }
}

pub fn definition() -> InterfaceDefinition {
    InterfaceDefinition::new::<dyn LogHandler>(INTERFACE)
        .capabilities(CAPABILITIES.iter().copied())
        .description("leveled application logging")
}
