//! AppBuilder for constructing App instances.
//!
//! The builder collects everything an app is made of and validates what it
//! can at [`build`](AppBuilder::build) time: interfaces are defined, hooks
//! are defined and their callables registered, configuration files are
//! loaded. Handler registrations are deferred to [`App::setup`] so that
//! extensions load first and builder-supplied handlers can override them.
//!
//! ```rust
//! use keel::{App, Config};
//!
//! let mut app = App::builder("demo")
//!     .config(Config::from_yaml_str("demo:\n  output_handler: yaml\n").unwrap())
//!     .build()
//!     .unwrap();
//! app.setup().unwrap();
//! assert_eq!(app.render(&vec!["a", "b"]).unwrap(), "- a\n- b\n");
//! ```

use std::ffi::OsString;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Command;
use keel_core::{
    BoxError, Config, ConfigMap, HandlerRegistration, HandlerRegistry, HookDispatcher, HookFn,
    InterfaceDefinition, InterfaceRegistry, Resolver,
};
use serde_json::Value;

use crate::app::{App, AppState, Pending, RunFn};
use crate::error::Error;
use crate::ext::Builtin;
use crate::extension::Extension;
use crate::hooks::BUILTIN_HOOKS;
use crate::interfaces::{self, output};
use crate::sink::Sink;

struct PendingHook {
    name: String,
    priority: i32,
    label: Option<String>,
    func: HookFn<App>,
}

/// Builder for constructing an [`App`].
pub struct AppBuilder {
    label: String,
    config: Config,
    config_files: Vec<PathBuf>,
    interfaces: Vec<InterfaceDefinition>,
    hook_names: Vec<String>,
    hooks: Vec<PendingHook>,
    handlers: Vec<Pending>,
    defaults: Vec<(String, String)>,
    extensions: Vec<Rc<dyn Extension>>,
    builtin: bool,
    command: Option<Command>,
    args: Option<Vec<OsString>>,
    run_fn: Option<RunFn>,
    debug: bool,
    tracing: bool,
    stdout: Sink,
    stderr: Sink,
}

impl AppBuilder {
    /// Creates a builder. `label` names the app's config section.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            config: Config::new(),
            config_files: Vec::new(),
            interfaces: Vec::new(),
            hook_names: Vec::new(),
            hooks: Vec::new(),
            handlers: Vec::new(),
            defaults: Vec::new(),
            extensions: Vec::new(),
            builtin: true,
            command: None,
            args: None,
            run_fn: None,
            debug: false,
            tracing: false,
            stdout: Sink::Stdout,
            stderr: Sink::Stderr,
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Merges a configuration; later calls override earlier ones per key.
    pub fn config(mut self, config: Config) -> Self {
        self.config.merge_config(&config);
        self
    }

    /// Loads a YAML or JSON file at build time, after any [`config`](Self::config).
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_files.push(path.into());
        self
    }

    /// Turns debug mode on, as if `--debug` was passed.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Installs a stderr `tracing` subscriber during setup.
    pub fn tracing(mut self, enabled: bool) -> Self {
        self.tracing = enabled;
        self
    }

    pub fn stdout(mut self, sink: Sink) -> Self {
        self.stdout = sink;
        self
    }

    pub fn stderr(mut self, sink: Sink) -> Self {
        self.stderr = sink;
        self
    }

    // ========================================================================
    // Command line
    // ========================================================================

    /// Sets the clap command parsed by [`App::run`]. A global `--debug` flag
    /// is added unless the command defines an argument with id `debug`.
    pub fn command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    /// Arguments to parse instead of the process arguments, program name first.
    pub fn args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the function [`App::run`] calls after argument parsing.
    pub fn run<F>(mut self, run: F) -> Self
    where
        F: Fn(&mut App) -> Result<(), BoxError> + 'static,
    {
        self.run_fn = Some(Rc::new(run));
        self
    }

    // ========================================================================
    // Interfaces, handlers, extensions
    // ========================================================================

    pub fn interface(mut self, definition: InterfaceDefinition) -> Self {
        self.interfaces.push(definition);
        self
    }

    /// Registers a handler during setup, after extensions load.
    pub fn handler(mut self, registration: HandlerRegistration) -> Self {
        self.handlers.push(Pending::Register(registration));
        self
    }

    /// Registers a handler during setup, replacing one with the same label.
    pub fn handler_override(mut self, registration: HandlerRegistration) -> Self {
        self.handlers.push(Pending::Override(registration));
        self
    }

    /// Uses `label` for `interface` when resolution names no label.
    ///
    /// Takes precedence over the `<interface>_handler` config key.
    pub fn default_handler(mut self, interface: impl Into<String>, label: impl Into<String>) -> Self {
        self.defaults.push((interface.into(), label.into()));
        self
    }

    pub fn extension<E: Extension + 'static>(mut self, extension: E) -> Self {
        self.extensions.push(Rc::new(extension));
        self
    }

    /// Leaves out the built-in handlers. The built-in interfaces stay defined.
    pub fn without_builtin(mut self) -> Self {
        self.builtin = false;
        self
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    /// Defines an app-specific hook point.
    pub fn define_hook(mut self, name: impl Into<String>) -> Self {
        self.hook_names.push(name.into());
        self
    }

    /// Registers a hook callable. Lower priorities run first.
    pub fn hook<F>(mut self, name: impl Into<String>, priority: i32, func: F) -> Self
    where
        F: Fn(&mut App) -> Result<(), BoxError> + 'static,
    {
        self.hooks.push(PendingHook {
            name: name.into(),
            priority,
            label: None,
            func: Rc::new(func),
        });
        self
    }

    /// Like [`hook`](Self::hook), with a label reported if the callable fails.
    pub fn hook_labeled<F>(
        mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        priority: i32,
        func: F,
    ) -> Self
    where
        F: Fn(&mut App) -> Result<(), BoxError> + 'static,
    {
        self.hooks.push(PendingHook {
            name: name.into(),
            priority,
            label: Some(label.into()),
            func: Rc::new(func),
        });
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Builds the app in the [`AppState::Built`] state.
    pub fn build(self) -> Result<App, Error> {
        let mut config = self.config;
        for path in &self.config_files {
            config.merge_config(&Config::from_file(path)?);
        }
        if self.builtin {
            let mut fallback = ConfigMap::new();
            fallback.insert(
                format!("{}_handler", output::INTERFACE),
                Value::from("json"),
            );
            config.merge(&self.label, &fallback, false);
        }

        let mut interfaces = InterfaceRegistry::new();
        for definition in interfaces::builtin().into_iter().chain(self.interfaces) {
            interfaces.define(definition)?;
        }

        let mut hooks = HookDispatcher::new();
        for name in BUILTIN_HOOKS.iter().copied().chain(self.hook_names.iter().map(String::as_str)) {
            hooks.define(name)?;
        }
        for hook in self.hooks {
            hooks.register_fn(&hook.name, hook.priority, hook.label, hook.func)?;
        }

        let mut resolver = Resolver::with_app_section(self.label.clone());
        for (interface, label) in self.defaults {
            resolver.set_default(interface, label);
        }

        let mut extensions: Vec<Rc<dyn Extension>> = Vec::new();
        if self.builtin {
            extensions.push(Rc::new(Builtin));
        }
        extensions.extend(self.extensions);

        tracing::debug!(
            app = %self.label,
            interfaces = interfaces.len(),
            extensions = extensions.len(),
            "app built"
        );

        Ok(App {
            label: self.label,
            state: AppState::Built,
            config,
            interfaces,
            handlers: HandlerRegistry::new(),
            resolver,
            hooks,
            extensions,
            loaded: Vec::new(),
            pending: self.handlers,
            command: self.command,
            args: self.args,
            matches: None,
            run_fn: self.run_fn,
            debug: self.debug,
            tracing: self.tracing,
            exit_code: 0,
            stdout: self.stdout,
            stderr: self.stderr,
            render_data: None,
            rendered: None,
        })
    }
}
