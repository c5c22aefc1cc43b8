//! Handler resolution and the instance cache.
//!
//! The resolver answers "which handler serves this interface?" and owns the
//! configured instances.
//!
//! # Label precedence
//!
//! 1. An explicit label on the [`Resolve`] request.
//! 2. An application default: first one set with [`Resolver::set_default`],
//!    then the `<interface>_handler` key in the application's config section.
//! 3. The only handler registered for the interface.
//!
//! With no label and several candidates resolution fails with
//! [`RegistryError::AmbiguousHandler`]; with none registered it fails with
//! [`RegistryError::NoHandlers`].
//!
//! # Configuration merge
//!
//! Setup receives a [`Meta`] whose config is merged from, lowest first:
//!
//! | Layer | Source |
//! |-------|--------|
//! | 1 | application config section (the app label) |
//! | 2 | the registration's config defaults |
//! | 3 | the handler's config section, `<interface>.<label>` |
//! | 4 | `meta_defaults` on the request |
//!
//! # Caching
//!
//! A resolution with setup enabled caches the instance under
//! `(interface, label)`. Later resolutions return the same `Rc` without
//! running setup again, unless the request forces a new instance or the
//! registration was overridden since the instance was built.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::config::{handler_section, ConfigMap, ConfigSource};
use crate::error::RegistryError;
use crate::handler::{Handler, HandlerRegistration, HandlerRegistry};
use crate::meta::{merge_layers, Meta};

/// A resolution request.
#[derive(Debug, Clone)]
pub struct Resolve {
    interface: String,
    label: Option<String>,
    setup: bool,
    force_new: bool,
    meta_defaults: ConfigMap,
}

impl Resolve {
    /// Requests the default handler of `interface`, with setup.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            label: None,
            setup: true,
            force_new: false,
            meta_defaults: ConfigMap::new(),
        }
    }

    /// Requests a specific handler label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns a fresh, un-configured instance that is not cached.
    pub fn without_setup(mut self) -> Self {
        self.setup = false;
        self
    }

    /// Rebuilds the instance even if one is cached, replacing the cache entry.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Adds a meta default; these override every other config layer.
    pub fn meta_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta_defaults.insert(key.into(), value.into());
        self
    }

    /// Adds several meta defaults.
    pub fn meta_defaults(mut self, defaults: ConfigMap) -> Self {
        self.meta_defaults.extend(defaults);
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl From<&str> for Resolve {
    fn from(interface: &str) -> Self {
        Resolve::new(interface)
    }
}

impl From<String> for Resolve {
    fn from(interface: String) -> Self {
        Resolve::new(interface)
    }
}

struct CachedInstance {
    revision: u64,
    // Holds an `Rc<I>` for the interface's trait object type.
    instance: Box<dyn Any>,
}

/// Selects, builds and caches handler instances.
#[derive(Default)]
pub struct Resolver {
    app_section: Option<String>,
    defaults: HashMap<String, String>,
    cache: HashMap<(String, String), CachedInstance>,
}

impl Resolver {
    /// Creates a resolver without an application config section.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver reading application-wide options from `section`.
    pub fn with_app_section(section: impl Into<String>) -> Self {
        Self {
            app_section: Some(section.into()),
            ..Self::default()
        }
    }

    /// Sets the default handler label for an interface.
    pub fn set_default(&mut self, interface: impl Into<String>, label: impl Into<String>) {
        self.defaults.insert(interface.into(), label.into());
    }

    /// Returns the configured default label for an interface, if any.
    pub fn default_for(&self, interface: &str, config: &dyn ConfigSource) -> Option<String> {
        if let Some(label) = self.defaults.get(interface) {
            return Some(label.clone());
        }
        let section = self.app_section.as_deref()?;
        config
            .get(section, &format!("{interface}_handler"))
            .and_then(Value::as_str)
            .map(String::from)
    }

    /// Applies the precedence rules and returns the label to use.
    pub fn select_label(
        &self,
        handlers: &HandlerRegistry,
        config: &dyn ConfigSource,
        interface: &str,
        explicit: Option<&str>,
    ) -> Result<String, RegistryError> {
        if let Some(label) = explicit {
            return Ok(label.to_string());
        }
        if let Some(label) = self.default_for(interface, config) {
            return Ok(label);
        }

        let mut labels = handlers.list(interface);
        match (labels.next(), labels.next()) {
            (Some(only), None) => Ok(only.to_string()),
            (None, _) => Err(RegistryError::NoHandlers {
                interface: interface.to_string(),
            }),
            (Some(_), Some(_)) => Err(RegistryError::AmbiguousHandler {
                interface: interface.to_string(),
                candidates: handlers.list(interface).map(String::from).collect(),
            }),
        }
    }

    /// Resolves a handler as the trait object type `I`.
    pub fn resolve<I>(
        &mut self,
        handlers: &HandlerRegistry,
        config: &dyn ConfigSource,
        request: impl Into<Resolve>,
    ) -> Result<Rc<I>, RegistryError>
    where
        I: ?Sized + Handler,
    {
        let request = request.into();
        let label = self.select_label(
            handlers,
            config,
            &request.interface,
            request.label.as_deref(),
        )?;
        let registration = handlers.get(&request.interface, &label)?;
        registration.ensure_type::<I>()?;

        if !request.setup {
            return registration.instantiate::<I>().map(Rc::from);
        }

        let key = (request.interface.clone(), label);
        if !request.force_new {
            if let Some(instance) = self.cached_revision::<I>(&key, registration.revision()) {
                tracing::trace!(interface = %key.0, label = %key.1, "resolved cached handler");
                return Ok(instance);
            }
        }

        let mut handler = registration.instantiate::<I>()?;
        let meta = self.build_meta(config, registration, &request.meta_defaults);
        handler
            .setup(&meta)
            .map_err(|source| RegistryError::HandlerSetup {
                interface: key.0.clone(),
                label: key.1.clone(),
                source,
            })?;
        tracing::debug!(interface = %key.0, label = %key.1, "handler set up");

        let instance: Rc<I> = Rc::from(handler);
        self.cache.insert(
            key,
            CachedInstance {
                revision: registration.revision(),
                instance: Box::new(Rc::clone(&instance)),
            },
        );
        Ok(instance)
    }

    fn cached_revision<I>(&self, key: &(String, String), revision: u64) -> Option<Rc<I>>
    where
        I: ?Sized + Handler,
    {
        let cached = self.cache.get(key)?;
        if cached.revision != revision {
            return None;
        }
        cached.instance.downcast_ref::<Rc<I>>().cloned()
    }

    /// Builds the merged [`Meta`] a registration would be set up with.
    pub fn build_meta(
        &self,
        config: &dyn ConfigSource,
        registration: &HandlerRegistration,
        meta_defaults: &ConfigMap,
    ) -> Meta {
        let app = self
            .app_section
            .as_deref()
            .and_then(|section| config.get_section_dict(section))
            .unwrap_or_default();
        let own = config
            .get_section_dict(&handler_section(
                registration.interface(),
                registration.label(),
            ))
            .unwrap_or_default();

        Meta::new(
            registration.interface(),
            registration.label(),
            merge_layers([&app, registration.defaults(), &own, meta_defaults]),
        )
    }

    /// Returns the cached instance for `(interface, label)`, if any.
    pub fn cached<I>(&self, interface: &str, label: &str) -> Option<Rc<I>>
    where
        I: ?Sized + Handler,
    {
        self.cache
            .get(&(interface.to_string(), label.to_string()))
            .and_then(|cached| cached.instance.downcast_ref::<Rc<I>>().cloned())
    }

    /// Drops the cached instance for `(interface, label)`.
    ///
    /// Returns true if an instance was cached.
    pub fn evict(&mut self, interface: &str, label: &str) -> bool {
        self.cache
            .remove(&(interface.to_string(), label.to_string()))
            .is_some()
    }

    /// Returns the number of cached instances.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached instance. Returns how many were dropped.
    pub fn teardown(&mut self) -> usize {
        let count = self.cache.len();
        self.cache.clear();
        tracing::debug!(count, "handler cache torn down");
        count
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("app_section", &self.app_section)
            .field("defaults", &self.defaults)
            .field("cached", &self.cache.len())
            .finish()
    }
}
