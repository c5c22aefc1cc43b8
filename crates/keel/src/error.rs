//! Error type for application-level operations.
//!
//! [`Error`] wraps the registry, hook and configuration errors from
//! `keel-core` and adds the failures only the application layer can produce.
//! Messages always name the interface, handler, hook or extension involved;
//! [`render_chain`] formats an error with its causes for the top-level report.

use keel_core::{BoxError, ConfigError, HookError, RegistryError};
use thiserror::Error;

use crate::app::AppState;

/// Error type for application operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Interface definition, handler registration or resolution failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Hook definition, registration or dispatch failed.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Command-line arguments could not be parsed.
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// An extension failed while loading.
    #[error("extension '{label}' failed to load")]
    Extension {
        label: String,
        #[source]
        source: Box<Error>,
    },

    /// Data passed to `render` could not be serialized.
    #[error("render data could not be serialized")]
    Serialize(#[from] serde_json::Error),

    /// The output handler failed.
    #[error("output handler '{label}' failed to render")]
    Output {
        label: String,
        #[source]
        source: BoxError,
    },

    /// Rendered output could not be written.
    #[error("failed to write output")]
    Io(#[from] std::io::Error),

    /// A lifecycle method was called in the wrong state.
    #[error("cannot {action} an app that is {state}")]
    Lifecycle {
        action: &'static str,
        state: AppState,
    },

    /// The application's run callback failed.
    #[error(transparent)]
    Run(BoxError),
}

impl Error {
    /// Wraps an arbitrary failure raised by application code.
    pub fn run(err: impl Into<BoxError>) -> Self {
        Error::Run(err.into())
    }
}

/// Formats an error followed by one `caused by:` line per source.
pub fn render_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str("\n  caused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
