//! Extensions: named bundles of registrations loaded during setup.
//!
//! An extension's `load` runs once, between the `pre_setup` and
//! `post_setup` hooks, and may define interfaces, register handlers and
//! hook callables, or edit configuration. Loading an extension whose label
//! was already loaded is a no-op.

use crate::app::App;
use crate::error::Error;

pub trait Extension {
    /// Unique label, used for de-duplication and error messages.
    fn label(&self) -> &str;

    fn load(&self, app: &mut App) -> Result<(), Error>;
}

/// An [`Extension`] built from a closure. See [`from_fn`].
pub struct FnExtension<F> {
    label: String,
    load: F,
}

/// Creates an extension from a label and a load function.
///
/// ```rust
/// use keel::{extension, App};
///
/// let ext = extension::from_fn("motd", |app: &mut App| {
///     app.config_mut().set("motd", "text", "hello");
///     Ok(())
/// });
/// # let _ = ext;
/// ```
pub fn from_fn<F>(label: impl Into<String>, load: F) -> FnExtension<F>
where
    F: Fn(&mut App) -> Result<(), Error>,
{
    FnExtension {
        label: label.into(),
        load,
    }
}

impl<F> Extension for FnExtension<F>
where
    F: Fn(&mut App) -> Result<(), Error>,
{
    fn label(&self) -> &str {
        &self.label
    }

    fn load(&self, app: &mut App) -> Result<(), Error> {
        (self.load)(app)
    }
}
