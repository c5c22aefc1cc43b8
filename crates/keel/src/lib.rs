//! # Keel - Pluggable Command-Line Applications
//!
//! Keel structures a CLI program around three ideas:
//!
//! - **Interfaces** are named contracts (a trait plus required capabilities).
//!   Logging, output rendering, mail, caching and platform information are
//!   built in; apps define their own the same way.
//! - **Handlers** implement an interface and are registered under a label.
//!   The app resolves the handler to use from an explicit label, a
//!   configured default, or the only one registered, and sets it up with
//!   merged configuration.
//! - **Hooks** are named points in the app's lifecycle where extensions and
//!   application code run callables in priority order.
//!
//! The registry, resolver and hook dispatcher live in [`keel_core`]; this
//! crate adds the [`App`] that owns them, the built-in interfaces and
//! handlers, extensions and `clap` integration.
//!
//! ## Quick Start
//!
//! ```rust
//! use keel::{App, Sink};
//!
//! let mut app = App::builder("hello")
//!     .stdout(Sink::writer(Vec::new()))
//!     .run(|app: &mut App| {
//!         app.log()?.info("starting");
//!         app.print(&serde_json::json!({"greeting": "hello"}))?;
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! app.setup().unwrap();
//! app.run_with(["hello"]).unwrap();
//! app.close().unwrap();
//! ```
//!
//! ## Configuration
//!
//! Configuration is sectioned. The app's own section (named after its label)
//! holds app-wide keys such as `debug` and `<interface>_handler`; a handler
//! reads the merge of the app section, its own defaults, its
//! `<interface>.<label>` section and any resolution-time defaults, in that
//! order of precedence from lowest to highest.
//!
//! ```yaml
//! hello:
//!   debug: false
//!   output_handler: yaml
//! log.console:
//!   level: WARNING
//! ```

pub mod app;
pub mod builder;
pub mod error;
pub mod ext;
pub mod extension;
pub mod handlers;
pub mod hooks;
pub mod interfaces;
pub mod logging;
pub mod sink;

pub use app::{App, AppState, RunFn};
pub use builder::AppBuilder;
pub use error::{render_chain, Error};
pub use extension::Extension;
pub use sink::Sink;

pub use interfaces::{
    CacheHandler, LogHandler, LogLevel, MailHandler, MailMessage, OutputHandler, PlatformHandler,
};

// Re-export the core types apps need to define their own interfaces.
pub use keel_core::{
    handler_section, BoxError, Config, ConfigError, ConfigMap, ConfigSource, Handler,
    HandlerRegistration, HookError, InterfaceDefinition, Meta, Provides, RegistryError, Resolve,
};
