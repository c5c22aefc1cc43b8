//! Interface definitions and the interface registry.
//!
//! An interface is a named contract bound to a Rust trait object type (for
//! example `dyn LogHandler`) plus a list of capability names every handler
//! must declare. The trait object type pins the method signatures; the
//! capability list is compared against what a handler declares when it is
//! registered, so a handler that forgot a capability is rejected up front
//! instead of at first use.
//!
//! ```rust
//! use keel_core::{Handler, InterfaceDefinition, InterfaceRegistry};
//!
//! pub trait Greeter: Handler {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! let mut interfaces = InterfaceRegistry::new();
//! interfaces
//!     .define(InterfaceDefinition::new::<dyn Greeter>("greeter").capability("greet"))
//!     .unwrap();
//!
//! assert!(interfaces.get("greeter").unwrap().requires("greet"));
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::RegistryError;
use crate::handler::{Handler, HandlerRegistration};

/// Predicate run against every registration for an interface.
///
/// Returning `Err(reason)` rejects the registration.
pub type Validator = Rc<dyn Fn(&HandlerRegistration) -> Result<(), String>>;

/// A named contract handlers are registered against.
#[derive(Clone)]
pub struct InterfaceDefinition {
    id: String,
    type_id: TypeId,
    type_name: &'static str,
    capabilities: Vec<String>,
    description: Option<String>,
    validator: Option<Validator>,
}

impl InterfaceDefinition {
    /// Creates a definition bound to the trait object type `I`.
    pub fn new<I>(id: impl Into<String>) -> Self
    where
        I: ?Sized + Handler,
    {
        Self {
            id: id.into(),
            type_id: TypeId::of::<I>(),
            type_name: std::any::type_name::<I>(),
            capabilities: Vec::new(),
            description: None,
            validator: None,
        }
    }

    /// Adds a required capability. Duplicates are ignored.
    pub fn capability(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.capabilities.contains(&name) {
            self.capabilities.push(name);
        }
        self
    }

    /// Adds several required capabilities.
    pub fn capabilities<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |def, name| def.capability(name))
    }

    /// Sets a human-readable description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Sets the validation predicate run at registration time.
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerRegistration) -> Result<(), String> + 'static,
    {
        self.validator = Some(Rc::new(f));
        self
    }

    /// Returns the interface identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the description, if any.
    pub fn about(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the required capabilities in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }

    /// Returns true if `name` is a required capability.
    pub fn requires(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c == name)
    }

    /// Returns the name of the trait object type the interface is bound to.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Checks a registration against this definition: trait object type,
    /// then capabilities, then the validation predicate.
    pub fn check(&self, registration: &HandlerRegistration) -> Result<(), RegistryError> {
        if registration.type_id() != self.type_id {
            return Err(RegistryError::InterfaceType {
                interface: self.id.clone(),
                expected: self.type_name,
                found: registration.type_name(),
            });
        }

        let missing: Vec<String> = self
            .capabilities
            .iter()
            .filter(|cap| !registration.provides_capability(cap))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RegistryError::InterfaceCompliance {
                interface: self.id.clone(),
                label: registration.label().to_string(),
                missing,
            });
        }

        if let Some(validator) = &self.validator {
            validator(registration).map_err(|reason| RegistryError::InterfaceValidation {
                interface: self.id.clone(),
                label: registration.label().to_string(),
                reason,
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for InterfaceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceDefinition")
            .field("id", &self.id)
            .field("type", &self.type_name)
            .field("capabilities", &self.capabilities)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// Stores interface definitions for the lifetime of an application.
///
/// There is no removal: interfaces are constants once defined.
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    definitions: HashMap<String, InterfaceDefinition>,
    order: Vec<String>,
}

impl InterfaceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a new interface.
    pub fn define(&mut self, definition: InterfaceDefinition) -> Result<(), RegistryError> {
        if self.definitions.contains_key(definition.id()) {
            return Err(RegistryError::DuplicateInterface {
                interface: definition.id().to_string(),
            });
        }
        tracing::debug!(
            interface = definition.id(),
            capabilities = ?definition.capabilities,
            "defined interface"
        );
        self.order.push(definition.id().to_string());
        self.definitions
            .insert(definition.id().to_string(), definition);
        Ok(())
    }

    /// Looks up an interface definition.
    pub fn get(&self, id: &str) -> Result<&InterfaceDefinition, RegistryError> {
        self.definitions
            .get(id)
            .ok_or_else(|| RegistryError::UnknownInterface {
                interface: id.to_string(),
            })
    }

    /// Returns true if the interface is defined.
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Returns interface identifiers in definition order.
    pub fn list(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.order.iter().map(String::as_str)
    }

    /// Returns the number of defined interfaces.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is defined.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
