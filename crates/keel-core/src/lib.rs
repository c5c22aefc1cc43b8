//! Registry, resolver and hook dispatcher for the Keel CLI framework.
//!
//! `keel-core` holds the pluggable part of a Keel application:
//!
//! - **Interfaces**: named contracts bound to a trait object type and a list
//!   of required capabilities ([`InterfaceRegistry`]).
//! - **Handlers**: implementations of an interface registered under a label,
//!   validated at registration time ([`HandlerRegistry`]).
//! - **Resolution**: picking the handler for an interface, configuring it and
//!   caching the instance ([`Resolver`]).
//! - **Hooks**: named, ordered extension points run during the application
//!   lifecycle ([`HookDispatcher`]).
//! - **Configuration**: the sectioned key/value contract the resolver reads
//!   ([`ConfigSource`], [`Config`]).
//!
//! Nothing here is global. An application owns one of each and passes them
//! by reference; two applications in the same process never share state.
//! All types are single-threaded (`Rc`, not `Arc`).
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use keel_core::{
//!     Config, Handler, HandlerRegistration, HandlerRegistry, InterfaceDefinition,
//!     InterfaceRegistry, Resolver,
//! };
//!
//! pub trait Log: Handler {
//!     fn info(&self, msg: &str);
//! }
//!
//! #[derive(Default)]
//! struct Memory {
//!     lines: RefCell<Vec<String>>,
//! }
//!
//! impl Handler for Memory {}
//! impl Log for Memory {
//!     fn info(&self, msg: &str) {
//!         self.lines.borrow_mut().push(msg.to_string());
//!     }
//! }
//!
//! let mut interfaces = InterfaceRegistry::new();
//! interfaces
//!     .define(InterfaceDefinition::new::<dyn Log>("log").capability("info"))
//!     .unwrap();
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers
//!     .register(
//!         &interfaces,
//!         HandlerRegistration::new::<dyn Log, _>("log", "memory", || Box::new(Memory::default()))
//!             .provides(["info"]),
//!     )
//!     .unwrap();
//!
//! let mut resolver = Resolver::new();
//! let log = resolver
//!     .resolve::<dyn Log>(&handlers, &Config::new(), "log")
//!     .unwrap();
//! log.info("hello");
//! ```

mod config;
mod error;
mod handler;
mod hooks;
mod interface;
mod meta;
mod resolver;

pub use config::{handler_section, Config, ConfigMap, ConfigSource};
pub use error::{BoxError, ConfigError, HookError, RegistryError};
pub use handler::{Handler, HandlerRegistration, HandlerRegistry, Provides};
pub use hooks::{HookBatch, HookDispatcher, HookFn, HookState};
pub use interface::{InterfaceDefinition, InterfaceRegistry, Validator};
pub use meta::{merge_layers, Meta};
pub use resolver::{Resolve, Resolver};
