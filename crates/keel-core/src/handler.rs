//! Handlers and the handler registry.
//!
//! A handler is a concrete implementation of an interface, registered under a
//! label. Registrations hold a factory rather than an instance: the
//! [`Resolver`](crate::Resolver) creates, configures and caches instances on
//! demand.
//!
//! # Declaring a handler
//!
//! Interfaces are traits with [`Handler`] as a supertrait. A handler type
//! implements the interface trait and declares, through [`Provides`], its
//! default label, the capabilities it offers and its config defaults:
//!
//! ```rust
//! use keel_core::{
//!     ConfigMap, Handler, HandlerRegistration, HandlerRegistry, InterfaceDefinition,
//!     InterfaceRegistry, Provides,
//! };
//!
//! pub trait Greeter: Handler {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! #[derive(Default)]
//! struct Polite;
//!
//! impl Handler for Polite {}
//! impl Greeter for Polite {
//!     fn greet(&self, name: &str) -> String {
//!         format!("Good day, {name}")
//!     }
//! }
//! impl Provides for Polite {
//!     const LABEL: &'static str = "polite";
//!     const CAPABILITIES: &'static [&'static str] = &["greet"];
//! }
//!
//! let mut interfaces = InterfaceRegistry::new();
//! interfaces
//!     .define(InterfaceDefinition::new::<dyn Greeter>("greeter").capability("greet"))
//!     .unwrap();
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers
//!     .register(
//!         &interfaces,
//!         HandlerRegistration::provided::<dyn Greeter, Polite, _>("greeter", || {
//!             Box::new(Polite)
//!         }),
//!     )
//!     .unwrap();
//!
//! assert_eq!(handlers.list("greeter").collect::<Vec<_>>(), vec!["polite"]);
//! ```
//!
//! # Duplicate and removal policy
//!
//! - [`HandlerRegistry::register`] rejects an existing `(interface, label)`
//!   with [`RegistryError::DuplicateHandler`].
//! - [`HandlerRegistry::register_override`] replaces it (last write wins) and
//!   logs a warning.
//! - [`HandlerRegistry::unregister`] of a missing pair fails with
//!   [`RegistryError::UnknownHandler`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::config::ConfigMap;
use crate::error::{BoxError, RegistryError};
use crate::interface::InterfaceRegistry;
use crate::meta::Meta;

/// Base trait of every interface trait.
///
/// `setup` is the handler's initialization routine. The resolver calls it
/// once per cached instance with the merged configuration.
pub trait Handler: 'static {
    fn setup(&mut self, meta: &Meta) -> Result<(), BoxError> {
        let _ = meta;
        Ok(())
    }
}

/// Static metadata a handler type declares about itself.
pub trait Provides {
    /// Label the handler is registered under by default.
    const LABEL: &'static str;

    /// Capability names the handler implements.
    const CAPABILITIES: &'static [&'static str];

    /// Configuration defaults merged under the app configuration at setup.
    fn config_defaults() -> ConfigMap {
        ConfigMap::new()
    }
}

type Factory = Rc<dyn Fn() -> Box<dyn Any>>;

/// A handler registered for one interface under one label.
#[derive(Clone)]
pub struct HandlerRegistration {
    interface: String,
    label: String,
    type_id: TypeId,
    type_name: &'static str,
    capabilities: Vec<String>,
    config_defaults: ConfigMap,
    factory: Factory,
    revision: u64,
}

impl HandlerRegistration {
    /// Creates a registration whose factory produces `Box<I>`, where `I` is
    /// the interface's trait object type.
    ///
    /// The registration declares no capabilities; add them with
    /// [`provides`](Self::provides) or use [`provided`](Self::provided).
    pub fn new<I, F>(interface: impl Into<String>, label: impl Into<String>, factory: F) -> Self
    where
        I: ?Sized + Handler,
        F: Fn() -> Box<I> + 'static,
    {
        Self {
            interface: interface.into(),
            label: label.into(),
            type_id: TypeId::of::<I>(),
            type_name: std::any::type_name::<I>(),
            capabilities: Vec::new(),
            config_defaults: ConfigMap::new(),
            factory: Rc::new(move || Box::new(factory()) as Box<dyn Any>),
            revision: 0,
        }
    }

    /// Creates a registration from a handler type's [`Provides`] metadata.
    pub fn provided<I, T, F>(interface: impl Into<String>, factory: F) -> Self
    where
        I: ?Sized + Handler,
        T: Provides,
        F: Fn() -> Box<I> + 'static,
    {
        Self::new::<I, F>(interface, T::LABEL, factory)
            .provides(T::CAPABILITIES.iter().copied())
            .config_defaults(T::config_defaults())
    }

    /// Declares capabilities the implementation provides.
    pub fn provides<C, S>(mut self, capabilities: C) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for cap in capabilities {
            let cap = cap.into();
            if !self.capabilities.contains(&cap) {
                self.capabilities.push(cap);
            }
        }
        self
    }

    /// Replaces the config defaults.
    pub fn config_defaults(mut self, defaults: ConfigMap) -> Self {
        self.config_defaults = defaults;
        self
    }

    /// Sets one config default.
    pub fn config_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config_defaults.insert(key.into(), value.into());
        self
    }

    /// Registers the handler under a different label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }

    pub fn provides_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c == name)
    }

    pub fn defaults(&self) -> &ConfigMap {
        &self.config_defaults
    }

    /// Revision assigned by the registry; bumps on every accepted registration.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Creates a fresh, un-configured instance as the trait object type `I`.
    pub fn instantiate<I>(&self) -> Result<Box<I>, RegistryError>
    where
        I: ?Sized + Handler,
    {
        self.ensure_type::<I>()?;
        (self.factory)()
            .downcast::<Box<I>>()
            .map(|boxed| *boxed)
            .map_err(|_| self.type_error::<I>())
    }

    pub(crate) fn ensure_type<I>(&self) -> Result<(), RegistryError>
    where
        I: ?Sized + Handler,
    {
        if TypeId::of::<I>() == self.type_id {
            Ok(())
        } else {
            Err(self.type_error::<I>())
        }
    }

    fn type_error<I: ?Sized>(&self) -> RegistryError {
        RegistryError::InterfaceType {
            interface: self.interface.clone(),
            expected: self.type_name,
            found: std::any::type_name::<I>(),
        }
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("interface", &self.interface)
            .field("label", &self.label)
            .field("type", &self.type_name)
            .field("capabilities", &self.capabilities)
            .field("config_defaults", &self.config_defaults)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

/// Stores handler registrations keyed by `(interface, label)`.
///
/// Labels are kept in registration order per interface; an override keeps
/// the replaced entry's position.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<HandlerRegistration>>,
    revision: u64,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler after validating it against its interface.
    pub fn register(
        &mut self,
        interfaces: &InterfaceRegistry,
        registration: HandlerRegistration,
    ) -> Result<(), RegistryError> {
        if self.contains(registration.interface(), registration.label()) {
            return Err(RegistryError::DuplicateHandler {
                interface: registration.interface().to_string(),
                label: registration.label().to_string(),
            });
        }
        self.insert(interfaces, registration).map(|_| ())
    }

    /// Registers a handler, replacing any existing one with the same label.
    ///
    /// Returns the replaced registration.
    pub fn register_override(
        &mut self,
        interfaces: &InterfaceRegistry,
        registration: HandlerRegistration,
    ) -> Result<Option<HandlerRegistration>, RegistryError> {
        let replaced = self.insert(interfaces, registration)?;
        if let Some(old) = &replaced {
            tracing::warn!(
                interface = old.interface(),
                label = old.label(),
                "handler registration overridden"
            );
        }
        Ok(replaced)
    }

    fn insert(
        &mut self,
        interfaces: &InterfaceRegistry,
        mut registration: HandlerRegistration,
    ) -> Result<Option<HandlerRegistration>, RegistryError> {
        interfaces
            .get(registration.interface())?
            .check(&registration)?;

        self.revision += 1;
        registration.revision = self.revision;
        tracing::debug!(
            interface = registration.interface(),
            label = registration.label(),
            revision = registration.revision,
            "registered handler"
        );

        let entries = self
            .handlers
            .entry(registration.interface().to_string())
            .or_default();
        match entries.iter().position(|r| r.label == registration.label) {
            Some(index) => Ok(Some(std::mem::replace(&mut entries[index], registration))),
            None => {
                entries.push(registration);
                Ok(None)
            }
        }
    }

    /// Removes a registration.
    ///
    /// Fails with [`RegistryError::UnknownHandler`] if the pair is absent.
    pub fn unregister(
        &mut self,
        interface: &str,
        label: &str,
    ) -> Result<HandlerRegistration, RegistryError> {
        let entries = self
            .handlers
            .get_mut(interface)
            .ok_or_else(|| unknown_handler(interface, label))?;
        let index = entries
            .iter()
            .position(|r| r.label == label)
            .ok_or_else(|| unknown_handler(interface, label))?;
        tracing::debug!(interface, label, "unregistered handler");
        Ok(entries.remove(index))
    }

    /// Looks up a registration.
    pub fn get(&self, interface: &str, label: &str) -> Result<&HandlerRegistration, RegistryError> {
        self.handlers
            .get(interface)
            .and_then(|entries| entries.iter().find(|r| r.label == label))
            .ok_or_else(|| unknown_handler(interface, label))
    }

    /// Returns true if `(interface, label)` is registered.
    pub fn contains(&self, interface: &str, label: &str) -> bool {
        self.get(interface, label).is_ok()
    }

    /// Returns the labels registered for an interface, in registration order.
    ///
    /// The iterator is lazy and cheap to clone, so it can be restarted.
    /// Unknown interfaces yield nothing.
    pub fn list<'a>(&'a self, interface: &str) -> impl Iterator<Item = &'a str> + Clone + 'a {
        self.handlers
            .get(interface)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|r| r.label.as_str())
    }

    /// Returns the number of handlers registered for an interface.
    pub fn count(&self, interface: &str) -> usize {
        self.handlers.get(interface).map_or(0, Vec::len)
    }

    /// Merges config defaults into a registration, keeping existing keys.
    ///
    /// Merging the same map twice has no further effect.
    pub fn merge_config_defaults(
        &mut self,
        interface: &str,
        label: &str,
        defaults: &ConfigMap,
    ) -> Result<(), RegistryError> {
        let registration = self
            .handlers
            .get_mut(interface)
            .and_then(|entries| entries.iter_mut().find(|r| r.label == label))
            .ok_or_else(|| unknown_handler(interface, label))?;
        for (key, value) in defaults {
            registration
                .config_defaults
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        Ok(())
    }
}

fn unknown_handler(interface: &str, label: &str) -> RegistryError {
    RegistryError::UnknownHandler {
        interface: interface.to_string(),
        label: label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::InterfaceDefinition;
    use serde_json::json;

    trait Store: Handler {
        fn name(&self) -> &'static str;
    }

    struct Disk;
    impl Handler for Disk {}
    impl Store for Disk {
        fn name(&self) -> &'static str {
            "disk"
        }
    }
    impl Provides for Disk {
        const LABEL: &'static str = "disk";
        const CAPABILITIES: &'static [&'static str] = &["name", "flush"];

        fn config_defaults() -> ConfigMap {
            let mut map = ConfigMap::new();
            map.insert("path".into(), json!("/tmp/store"));
            map
        }
    }

    struct Memory;
    impl Handler for Memory {}
    impl Store for Memory {
        fn name(&self) -> &'static str {
            "memory"
        }
    }

    fn interfaces() -> InterfaceRegistry {
        let mut interfaces = InterfaceRegistry::new();
        interfaces
            .define(InterfaceDefinition::new::<dyn Store>("store").capability("name"))
            .unwrap();
        interfaces
    }

    fn disk() -> HandlerRegistration {
        HandlerRegistration::provided::<dyn Store, Disk, _>("store", || Box::new(Disk))
    }

    fn memory() -> HandlerRegistration {
        HandlerRegistration::new::<dyn Store, _>("store", "memory", || Box::new(Memory))
            .provides(["name"])
    }

    #[test]
    fn test_provided_registration_metadata() {
        let reg = disk();
        assert_eq!(reg.interface(), "store");
        assert_eq!(reg.label(), "disk");
        assert_eq!(reg.capabilities().collect::<Vec<_>>(), vec!["name", "flush"]);
        assert_eq!(reg.defaults()["path"], json!("/tmp/store"));
    }

    #[test]
    fn test_register_and_list() {
        let interfaces = interfaces();
        let mut registry = HandlerRegistry::new();
        registry.register(&interfaces, disk()).unwrap();
        registry.register(&interfaces, memory()).unwrap();

        let labels = registry.list("store");
        assert_eq!(labels.clone().collect::<Vec<_>>(), vec!["disk", "memory"]);
        assert_eq!(labels.collect::<Vec<_>>(), vec!["disk", "memory"]);
        assert_eq!(registry.count("store"), 2);
        assert_eq!(registry.list("log").count(), 0);
    }

    #[test]
    fn test_register_unknown_interface() {
        let mut registry = HandlerRegistry::new();
        let err = registry
            .register(&InterfaceRegistry::new(), disk())
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownInterface { .. }));
    }

    #[test]
    fn test_register_missing_capability() {
        let interfaces = interfaces();
        let mut registry = HandlerRegistry::new();
        let bare = HandlerRegistration::new::<dyn Store, _>("store", "bare", || Box::new(Memory));

        let err = registry.register(&interfaces, bare).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InterfaceCompliance { ref missing, .. } if missing == &["name"]
        ));
        assert!(!registry.contains("store", "bare"));
    }

    #[test]
    fn test_duplicate_without_override_fails() {
        let interfaces = interfaces();
        let mut registry = HandlerRegistry::new();
        registry.register(&interfaces, disk()).unwrap();

        let err = registry.register(&interfaces, disk()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "handler 'disk' is already registered for interface 'store'"
        );
    }

    #[test]
    fn test_override_replaces_in_place() {
        let interfaces = interfaces();
        let mut registry = HandlerRegistry::new();
        registry.register(&interfaces, disk()).unwrap();
        registry.register(&interfaces, memory()).unwrap();
        let first_revision = registry.get("store", "disk").unwrap().revision();

        let replacement = memory().with_label("disk");
        let replaced = registry
            .register_override(&interfaces, replacement)
            .unwrap()
            .unwrap();
        assert_eq!(replaced.revision(), first_revision);

        let current = registry.get("store", "disk").unwrap();
        assert!(current.revision() > first_revision);
        assert_eq!(current.instantiate::<dyn Store>().unwrap().name(), "memory");
        assert_eq!(registry.list("store").collect::<Vec<_>>(), vec!["disk", "memory"]);
    }

    #[test]
    fn test_override_of_new_label_just_registers() {
        let interfaces = interfaces();
        let mut registry = HandlerRegistry::new();
        let replaced = registry.register_override(&interfaces, disk()).unwrap();
        assert!(replaced.is_none());
        assert!(registry.contains("store", "disk"));
    }

    #[test]
    fn test_unregister_missing_fails() {
        let interfaces = interfaces();
        let mut registry = HandlerRegistry::new();
        registry.register(&interfaces, disk()).unwrap();

        let removed = registry.unregister("store", "disk").unwrap();
        assert_eq!(removed.label(), "disk");

        let err = registry.unregister("store", "disk").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownHandler { .. }));
        let err = registry.unregister("nothing", "disk").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownHandler { .. }));
    }

    #[test]
    fn test_instantiate_wrong_type() {
        trait Other: Handler {}
        let err = disk().instantiate::<dyn Other>().err().unwrap();
        assert!(matches!(err, RegistryError::InterfaceType { .. }));
    }

    #[test]
    fn test_merge_config_defaults_is_idempotent() {
        let interfaces = interfaces();
        let mut registry = HandlerRegistry::new();
        registry.register(&interfaces, disk()).unwrap();

        let mut extra = ConfigMap::new();
        extra.insert("path".into(), json!("/ignored"));
        extra.insert("sync".into(), json!(true));

        registry.merge_config_defaults("store", "disk", &extra).unwrap();
        let once = registry.get("store", "disk").unwrap().defaults().clone();
        registry.merge_config_defaults("store", "disk", &extra).unwrap();

        let defaults = registry.get("store", "disk").unwrap().defaults();
        assert_eq!(defaults, &once);
        assert_eq!(defaults["path"], json!("/tmp/store"));
        assert_eq!(defaults["sync"], json!(true));
    }
}
