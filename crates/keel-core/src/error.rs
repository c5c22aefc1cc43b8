//! Error types for registry, resolution, hook and configuration operations.
//!
//! Every variant carries the name of the interface, handler label or hook it
//! concerns, so a top-level report never needs extra context to be useful.
//!
//! - [`RegistryError`] - interface definition, handler registration, resolution
//! - [`HookError`] - hook definition, registration and dispatch
//! - [`ConfigError`] - loading configuration sources

use std::path::PathBuf;
use thiserror::Error;

/// A boxed error type for failures raised by handlers and hook callables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the interface registry, handler registry and resolver.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An interface with this identifier was already defined.
    #[error("interface '{interface}' is already defined")]
    DuplicateInterface { interface: String },

    /// No interface with this identifier was defined.
    #[error("interface '{interface}' is not defined")]
    UnknownInterface { interface: String },

    /// The handler (or the caller) uses a different trait object type than the
    /// one the interface is bound to.
    #[error("interface '{interface}' is bound to `{expected}`, not `{found}`")]
    InterfaceType {
        interface: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A handler with this label is already registered for the interface.
    #[error("handler '{label}' is already registered for interface '{interface}'")]
    DuplicateHandler { interface: String, label: String },

    /// The handler does not provide every capability the interface requires.
    #[error(
        "handler '{label}' does not implement interface '{interface}': missing {}",
        .missing.join(", ")
    )]
    InterfaceCompliance {
        interface: String,
        label: String,
        missing: Vec<String>,
    },

    /// The interface's validation predicate rejected the handler.
    #[error("handler '{label}' rejected by interface '{interface}': {reason}")]
    InterfaceValidation {
        interface: String,
        label: String,
        reason: String,
    },

    /// The requested handler label is not registered for the interface.
    #[error("handler '{label}' is not registered for interface '{interface}'")]
    UnknownHandler { interface: String, label: String },

    /// No label was given and no handler at all is registered.
    #[error("no handlers are registered for interface '{interface}'")]
    NoHandlers { interface: String },

    /// No label was given, no default is configured and several handlers exist.
    #[error(
        "interface '{interface}' has several handlers ({}); pass a label or configure a default",
        .candidates.join(", ")
    )]
    AmbiguousHandler {
        interface: String,
        candidates: Vec<String>,
    },

    /// The handler's setup routine failed.
    #[error("setup of handler '{label}' for interface '{interface}' failed")]
    HandlerSetup {
        interface: String,
        label: String,
        #[source]
        source: BoxError,
    },
}

impl RegistryError {
    /// Returns the interface identifier the error concerns.
    pub fn interface(&self) -> &str {
        match self {
            RegistryError::DuplicateInterface { interface }
            | RegistryError::UnknownInterface { interface }
            | RegistryError::InterfaceType { interface, .. }
            | RegistryError::DuplicateHandler { interface, .. }
            | RegistryError::InterfaceCompliance { interface, .. }
            | RegistryError::InterfaceValidation { interface, .. }
            | RegistryError::UnknownHandler { interface, .. }
            | RegistryError::NoHandlers { interface }
            | RegistryError::AmbiguousHandler { interface, .. }
            | RegistryError::HandlerSetup { interface, .. } => interface,
        }
    }
}

/// Errors raised by the hook dispatcher.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook was never defined.
    #[error("hook '{hook}' is not defined")]
    UnknownHook { hook: String },

    /// A hook with this name was already defined.
    #[error("hook '{hook}' is already defined")]
    DuplicateHook { hook: String },

    /// The hook is being dispatched; registrations and nested runs are rejected.
    #[error("hook '{hook}' is being dispatched")]
    Dispatching { hook: String },

    /// The hook was closed at teardown.
    #[error("hook '{hook}' is closed")]
    Closed { hook: String },

    /// A registered callable failed; the remaining callables were skipped.
    #[error("hook '{hook}' failed in callable #{position}{}", describe_label(.label))]
    Dispatch {
        hook: String,
        position: usize,
        label: Option<String>,
        #[source]
        source: BoxError,
    },
}

impl HookError {
    /// Returns the hook name the error concerns.
    pub fn hook(&self) -> &str {
        match self {
            HookError::UnknownHook { hook }
            | HookError::DuplicateHook { hook }
            | HookError::Dispatching { hook }
            | HookError::Closed { hook }
            | HookError::Dispatch { hook, .. } => hook,
        }
    }
}

fn describe_label(label: &Option<String>) -> String {
    label
        .as_deref()
        .map(|l| format!(" ({l})"))
        .unwrap_or_default()
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid YAML or JSON.
    #[error("failed to parse config from {origin}: {message}")]
    Parse { origin: String, message: String },

    /// The file extension is not one of `yaml`, `yml` or `json`.
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The document root or a section is not a mapping.
    #[error("config section '{section}' must be a mapping")]
    NotAMapping { section: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compliance_error_lists_missing() {
        let err = RegistryError::InterfaceCompliance {
            interface: "log".into(),
            label: "broken".into(),
            missing: vec!["info".into(), "debug".into()],
        };
        assert_eq!(
            err.to_string(),
            "handler 'broken' does not implement interface 'log': missing info, debug"
        );
        assert_eq!(err.interface(), "log");
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = HookError::Dispatch {
            hook: "pre_setup".into(),
            position: 2,
            label: Some("auth".into()),
            source: "boom".into(),
        };
        assert_eq!(err.to_string(), "hook 'pre_setup' failed in callable #2 (auth)");
        assert_eq!(err.hook(), "pre_setup");

        let unlabeled = HookError::Dispatch {
            hook: "post_run".into(),
            position: 0,
            label: None,
            source: "boom".into(),
        };
        assert_eq!(unlabeled.to_string(), "hook 'post_run' failed in callable #0");
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = RegistryError::AmbiguousHandler {
            interface: "output".into(),
            candidates: vec!["json".into(), "yaml".into()],
        };
        assert!(err.to_string().contains("(json, yaml)"));
    }
}
