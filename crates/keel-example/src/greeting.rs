//! The `greeting` interface and its two handlers.

use keel::{
    App, BoxError, ConfigMap, Error, Extension, Handler, HandlerRegistration,
    InterfaceDefinition, Meta, Provides,
};
use serde_json::Value;

pub const INTERFACE: &str = "greeting";

pub trait Greeter: Handler {
    fn greet(&self, name: &str) -> String;
}

pub fn definition() -> InterfaceDefinition {
    InterfaceDefinition::new::<dyn Greeter>(INTERFACE)
        .capability("greet")
        .description("turns a name into a greeting")
        .validator(|registration| {
            if registration.label().chars().all(|c| c.is_ascii_lowercase()) {
                Ok(())
            } else {
                Err(format!(
                    "greeting labels are lowercase words, got '{}'",
                    registration.label()
                ))
            }
        })
}

/// `Hello, <name>!`, with configurable punctuation.
#[derive(Debug, Default)]
pub struct Plain {
    punctuation: String,
}

impl Provides for Plain {
    const LABEL: &'static str = "plain";
    const CAPABILITIES: &'static [&'static str] = &["greet"];

    fn config_defaults() -> ConfigMap {
        let mut defaults = ConfigMap::new();
        defaults.insert("punctuation".into(), Value::from("!"));
        defaults
    }
}

impl Handler for Plain {
    fn setup(&mut self, meta: &Meta) -> Result<(), BoxError> {
        self.punctuation = meta.get_str("punctuation").unwrap_or("!").to_string();
        Ok(())
    }
}

impl Greeter for Plain {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}{}", self.punctuation)
    }
}

/// `<salutation> <name>,` as a letter would open.
#[derive(Debug, Default)]
pub struct Formal {
    salutation: String,
}

impl Provides for Formal {
    const LABEL: &'static str = "formal";
    const CAPABILITIES: &'static [&'static str] = &["greet"];

    fn config_defaults() -> ConfigMap {
        let mut defaults = ConfigMap::new();
        defaults.insert("salutation".into(), Value::from("Dear"));
        defaults
    }
}

impl Handler for Formal {
    fn setup(&mut self, meta: &Meta) -> Result<(), BoxError> {
        let salutation = meta
            .get_str("salutation")
            .ok_or("'salutation' must be a string")?;
        if salutation.trim().is_empty() {
            return Err("'salutation' must not be empty".into());
        }
        self.salutation = salutation.to_string();
        Ok(())
    }
}

impl Greeter for Formal {
    fn greet(&self, name: &str) -> String {
        format!("{} {name},", self.salutation)
    }
}

/// Defines the interface and registers both handlers.
pub struct GreetingExtension;

impl Extension for GreetingExtension {
    fn label(&self) -> &str {
        "greeting"
    }

    fn load(&self, app: &mut App) -> Result<(), Error> {
        app.define_interface(definition())?;
        app.register(HandlerRegistration::provided::<dyn Greeter, Plain, _>(
            INTERFACE,
            || Box::new(Plain::default()),
        ))?;
        app.register(HandlerRegistration::provided::<dyn Greeter, Formal, _>(
            INTERFACE,
            || Box::new(Formal::default()),
        ))?;
        Ok(())
    }
}
