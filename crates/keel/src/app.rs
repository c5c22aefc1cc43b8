//! The application object and its lifecycle.
//!
//! An [`App`] owns everything a Keel program needs: its configuration, the
//! interface and handler registries, the resolver with its instance cache
//! and the hook dispatcher. Nothing is global, so tests can build as many
//! apps as they like in one process.
//!
//! # Lifecycle
//!
//! ```text
//! AppBuilder::build()  →  Built
//! App::setup()         →  Ready     pre_setup, extensions, post_setup
//! App::run()           →  Running   pre_run ... post_run, then Ready again
//! App::close()         →  Closed    pre_close, post_close, teardown
//! ```
//!
//! [`App::main`] runs the whole sequence, reports errors through the log
//! handler and turns the outcome into a process exit code.

use std::ffi::OsString;
use std::fmt;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Arg, ArgAction, ArgMatches, Command};
use keel_core::{
    BoxError, Config, Handler, HandlerRegistration, HandlerRegistry, HookDispatcher,
    InterfaceDefinition, InterfaceRegistry, Resolve, Resolver,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::{render_chain, Error};
use crate::extension::Extension;
use crate::hooks::{
    POST_ARGUMENT_PARSING, POST_CLOSE, POST_RENDER, POST_RUN, POST_SETUP, PRE_ARGUMENT_PARSING,
    PRE_CLOSE, PRE_RENDER, PRE_RUN, PRE_SETUP,
};
use crate::interfaces::{
    cache, log, mail, output, platform, CacheHandler, LogHandler, LogLevel, MailHandler,
    OutputHandler, PlatformHandler,
};
use crate::logging;
use crate::sink::Sink;

/// The application's run callback.
pub type RunFn = Rc<dyn Fn(&mut App) -> Result<(), BoxError>>;

/// Where an app is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Built but not set up.
    Built,
    /// Set up; may be run, render output or be closed.
    Ready,
    /// Inside [`App::run`].
    Running,
    /// Closed. Terminal.
    Closed,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::Built => write!(f, "not set up"),
            AppState::Ready => write!(f, "ready"),
            AppState::Running => write!(f, "running"),
            AppState::Closed => write!(f, "closed"),
        }
    }
}

/// A handler registration deferred until setup.
pub(crate) enum Pending {
    Register(HandlerRegistration),
    Override(HandlerRegistration),
}

/// A Keel application.
///
/// Create one with [`App::builder`].
///
/// # Single-Threaded Design
///
/// CLI applications run one command and exit. Handlers and hooks are shared
/// with `Rc`, and hook callables receive `&mut App` so they can resolve
/// handlers and edit configuration without locking.
pub struct App {
    pub(crate) label: String,
    pub(crate) state: AppState,
    pub(crate) config: Config,
    pub(crate) interfaces: InterfaceRegistry,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) resolver: Resolver,
    pub(crate) hooks: HookDispatcher<App>,
    pub(crate) extensions: Vec<Rc<dyn Extension>>,
    pub(crate) loaded: Vec<String>,
    pub(crate) pending: Vec<Pending>,
    pub(crate) command: Option<Command>,
    pub(crate) args: Option<Vec<OsString>>,
    pub(crate) matches: Option<ArgMatches>,
    pub(crate) run_fn: Option<RunFn>,
    pub(crate) debug: bool,
    pub(crate) tracing: bool,
    pub(crate) exit_code: u8,
    pub(crate) stdout: Sink,
    pub(crate) stderr: Sink,
    pub(crate) render_data: Option<Value>,
    pub(crate) rendered: Option<String>,
}

impl App {
    /// Creates a new builder for an app labeled `label`.
    pub fn builder(label: impl Into<String>) -> crate::AppBuilder {
        crate::AppBuilder::new(label)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Loads extensions and registers handlers. `Built` → `Ready`.
    pub fn setup(&mut self) -> Result<(), Error> {
        self.expect_state(AppState::Built, "set up")?;

        if self.app_flag("debug") || self.argv_requests_debug() {
            self.debug = true;
        }
        if self.debug {
            self.config.set(&self.label, "debug", true);
        }
        if self.tracing {
            logging::init(logging::default_level(self.debug));
        }
        tracing::debug!(app = %self.label, debug = self.debug, "setting up");

        self.run_hook(PRE_SETUP)?;

        for extension in self.extensions.clone() {
            self.load_extension(extension)?;
        }
        for pending in std::mem::take(&mut self.pending) {
            match pending {
                Pending::Register(registration) => self.register(registration)?,
                Pending::Override(registration) => {
                    self.register_override(registration)?;
                }
            }
        }

        self.run_hook(POST_SETUP)?;

        // Set up the log handler now so a bad log config fails setup rather
        // than the first message.
        if self
            .resolver
            .select_label(&self.handlers, &self.config, log::INTERFACE, None)
            .is_ok()
        {
            self.log()?;
        }

        self.state = AppState::Ready;
        Ok(())
    }

    /// Parses arguments and runs the run callback. `Ready` → `Running` → `Ready`.
    ///
    /// Arguments come from [`AppBuilder::args`](crate::AppBuilder::args), or
    /// from the process when none were given.
    pub fn run(&mut self) -> Result<(), Error> {
        let args = self.args.clone();
        self.run_args(args)
    }

    /// Like [`run`](Self::run) with explicit arguments, program name first.
    pub fn run_with<I, T>(&mut self, args: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.run_args(Some(args.into_iter().map(Into::into).collect()))
    }

    fn run_args(&mut self, args: Option<Vec<OsString>>) -> Result<(), Error> {
        self.expect_state(AppState::Ready, "run")?;
        self.state = AppState::Running;
        let result = self.run_lifecycle(args);
        if self.state == AppState::Running {
            self.state = AppState::Ready;
        }
        result
    }

    fn run_lifecycle(&mut self, args: Option<Vec<OsString>>) -> Result<(), Error> {
        self.run_hook(PRE_RUN)?;

        self.run_hook(PRE_ARGUMENT_PARSING)?;
        if let Some(command) = self.command.clone() {
            let command = with_debug_flag(command);
            let matches = match args {
                Some(args) => command.try_get_matches_from(args)?,
                None => command.try_get_matches()?,
            };
            let debug = debug_requested(&matches);
            self.matches = Some(matches);
            if debug {
                self.enable_debug();
            }
        }
        self.run_hook(POST_ARGUMENT_PARSING)?;

        if let Some(run) = self.run_fn.clone() {
            run(self).map_err(Error::Run)?;
        }

        self.run_hook(POST_RUN)
    }

    /// Runs the close hooks and drops every cached handler. Any state → `Closed`.
    ///
    /// Teardown happens even if a close hook fails; the first failure is
    /// returned.
    pub fn close(&mut self) -> Result<(), Error> {
        if self.state == AppState::Closed {
            return Err(Error::Lifecycle {
                action: "close",
                state: self.state,
            });
        }
        let pre = self.run_hook(PRE_CLOSE);
        let post = self.run_hook(POST_CLOSE);
        self.resolver.teardown();
        self.hooks.close();
        self.state = AppState::Closed;
        tracing::debug!(app = %self.label, exit_code = self.exit_code, "closed");
        pre.and(post)
    }

    /// Sets up, runs and closes the app, returning the process exit code.
    ///
    /// Errors are reported through the log handler when one is set up, and to
    /// the stderr sink otherwise. Help and version requests print to stdout
    /// and exit 0.
    pub fn main(mut self) -> ExitCode {
        ExitCode::from(self.execute())
    }

    /// Runs the full lifecycle like [`main`](Self::main) and returns the exit
    /// code as a number, leaving the app closed but inspectable.
    pub fn execute(&mut self) -> u8 {
        let outcome = self.setup().and_then(|()| self.run());
        if let Err(err) = outcome {
            self.fail(&err);
        }
        if self.state != AppState::Closed {
            if let Err(err) = self.close() {
                self.fail(&err);
            }
        }
        self.exit_code
    }

    fn fail(&mut self, err: &Error) {
        if let Error::Cli(cli) = err {
            let code = u8::try_from(cli.exit_code()).unwrap_or(1);
            if !cli.use_stderr() {
                let _ = self.stdout.write_str(&cli.render().to_string());
                return;
            }
            let _ = self.stderr.write_str(&cli.render().to_string());
            self.exit_code = code;
            return;
        }
        self.report(err);
        if self.exit_code == 0 {
            self.exit_code = 1;
        }
    }

    /// Writes an error and its causes to the log handler, or to the stderr
    /// sink when no log handler is active.
    pub fn report(&self, err: &Error) {
        let text = render_chain(err);
        match self.active_log() {
            Some(log) => log.error(&text),
            None => {
                let _ = self.stderr.write_line(&format!("error: {text}"));
            }
        }
    }

    fn active_log(&self) -> Option<Rc<dyn LogHandler>> {
        let label = self
            .resolver
            .select_label(&self.handlers, &self.config, log::INTERFACE, None)
            .ok()?;
        self.resolver.cached::<dyn LogHandler>(log::INTERFACE, &label)
    }

    fn expect_state(&self, expected: AppState, action: &'static str) -> Result<(), Error> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::Lifecycle {
                action,
                state: self.state,
            })
        }
    }

    fn app_flag(&self, key: &str) -> bool {
        self.config
            .section(&self.label)
            .and_then(|section| section.get(key))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Pre-parses the arguments [`run`](Self::run) will see, tolerating
    /// errors, so `--debug` applies before setup.
    fn argv_requests_debug(&self) -> bool {
        let Some(command) = self.command.clone() else {
            return false;
        };
        let command = with_debug_flag(command).ignore_errors(true);
        let matches = match &self.args {
            Some(args) => command.try_get_matches_from(args.clone()),
            None => command.try_get_matches(),
        };
        matches.is_ok_and(|matches| debug_requested(&matches))
    }

    /// Turns on debug mode and lowers the active log handler to `DEBUG`.
    pub fn enable_debug(&mut self) {
        self.debug = true;
        self.config.set(&self.label, "debug", true);
        if let Some(log) = self.active_log() {
            log.set_level(LogLevel::Debug);
        }
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    /// Runs every callable registered against `name`, fail-fast.
    pub fn run_hook(&mut self, name: &str) -> Result<(), Error> {
        let batch = self.hooks.begin(name)?;
        let result = batch.invoke(self);
        self.hooks.finish(name);
        Ok(result?)
    }

    /// Defines a new hook point.
    pub fn define_hook(&mut self, name: &str) -> Result<(), Error> {
        Ok(self.hooks.define(name)?)
    }

    /// Registers a callable against a defined hook. Lower priorities run first.
    pub fn register_hook<F>(&mut self, name: &str, priority: i32, func: F) -> Result<(), Error>
    where
        F: Fn(&mut App) -> Result<(), BoxError> + 'static,
    {
        Ok(self.hooks.register(name, priority, func)?)
    }

    pub fn hooks(&self) -> &HookDispatcher<App> {
        &self.hooks
    }

    // ========================================================================
    // Interfaces and handlers
    // ========================================================================

    pub fn define_interface(&mut self, definition: InterfaceDefinition) -> Result<(), Error> {
        Ok(self.interfaces.define(definition)?)
    }

    pub fn register(&mut self, registration: HandlerRegistration) -> Result<(), Error> {
        Ok(self.handlers.register(&self.interfaces, registration)?)
    }

    /// Registers a handler, replacing one with the same label.
    ///
    /// The next resolution of that label builds a fresh instance.
    pub fn register_override(
        &mut self,
        registration: HandlerRegistration,
    ) -> Result<Option<HandlerRegistration>, Error> {
        Ok(self
            .handlers
            .register_override(&self.interfaces, registration)?)
    }

    /// Removes a handler and drops its cached instance.
    pub fn unregister(
        &mut self,
        interface: &str,
        label: &str,
    ) -> Result<HandlerRegistration, Error> {
        let removed = self.handlers.unregister(interface, label)?;
        self.resolver.evict(interface, label);
        Ok(removed)
    }

    /// Sets the handler used for `interface` when no label is given.
    pub fn set_default_handler(&mut self, interface: &str, label: &str) {
        self.resolver.set_default(interface, label);
    }

    /// Resolves a handler through the app's registries and configuration.
    ///
    /// ```rust,ignore
    /// let log = app.resolve::<dyn LogHandler>("log")?;
    /// let yaml = app.resolve::<dyn OutputHandler>(Resolve::new("output").label("yaml"))?;
    /// ```
    pub fn resolve<I>(&mut self, request: impl Into<Resolve>) -> Result<Rc<I>, Error>
    where
        I: ?Sized + Handler,
    {
        Ok(self
            .resolver
            .resolve::<I>(&self.handlers, &self.config, request)?)
    }

    pub fn log(&mut self) -> Result<Rc<dyn LogHandler>, Error> {
        self.resolve::<dyn LogHandler>(log::INTERFACE)
    }

    pub fn output(&mut self) -> Result<Rc<dyn OutputHandler>, Error> {
        self.resolve::<dyn OutputHandler>(output::INTERFACE)
    }

    pub fn mail(&mut self) -> Result<Rc<dyn MailHandler>, Error> {
        self.resolve::<dyn MailHandler>(mail::INTERFACE)
    }

    pub fn cache(&mut self) -> Result<Rc<dyn CacheHandler>, Error> {
        self.resolve::<dyn CacheHandler>(cache::INTERFACE)
    }

    pub fn platform(&mut self) -> Result<Rc<dyn PlatformHandler>, Error> {
        self.resolve::<dyn PlatformHandler>(platform::INTERFACE)
    }

    pub(crate) fn load_extension(&mut self, extension: Rc<dyn Extension>) -> Result<(), Error> {
        let label = extension.label().to_string();
        if self.loaded.contains(&label) {
            tracing::debug!(extension = %label, "extension already loaded");
            return Ok(());
        }
        extension.load(self).map_err(|source| Error::Extension {
            label: label.clone(),
            source: Box::new(source),
        })?;
        tracing::debug!(extension = %label, "extension loaded");
        self.loaded.push(label);
        Ok(())
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Renders data through the output handler.
    ///
    /// `pre_render` callables may edit [`render_data_mut`](Self::render_data_mut);
    /// `post_render` callables may edit [`rendered_mut`](Self::rendered_mut).
    pub fn render<T>(&mut self, data: &T) -> Result<String, Error>
    where
        T: Serialize + ?Sized,
    {
        if !matches!(self.state, AppState::Ready | AppState::Running) {
            return Err(Error::Lifecycle {
                action: "render output for",
                state: self.state,
            });
        }

        self.render_data = Some(serde_json::to_value(data)?);
        self.run_hook(PRE_RENDER)?;
        let data = self.render_data.take().unwrap_or(Value::Null);

        let label =
            self.resolver
                .select_label(&self.handlers, &self.config, output::INTERFACE, None)?;
        let output =
            self.resolve::<dyn OutputHandler>(Resolve::new(output::INTERFACE).label(label.clone()))?;
        let text = output
            .render(&data)
            .map_err(|source| Error::Output { label, source })?;

        self.rendered = Some(text);
        self.run_hook(POST_RENDER)?;
        Ok(self.rendered.take().unwrap_or_default())
    }

    /// Renders data and writes it to the stdout sink.
    pub fn print<T>(&mut self, data: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let text = self.render(data)?;
        self.stdout.write_line(text.trim_end_matches('\n'))?;
        Ok(())
    }

    /// Data being rendered, available to `pre_render` callables.
    pub fn render_data(&self) -> Option<&Value> {
        self.render_data.as_ref()
    }

    pub fn render_data_mut(&mut self) -> Option<&mut Value> {
        self.render_data.as_mut()
    }

    /// Rendered text, available to `post_render` callables.
    pub fn rendered(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    pub fn rendered_mut(&mut self) -> Option<&mut String> {
        self.rendered.as_mut()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn interfaces(&self) -> &InterfaceRegistry {
        &self.interfaces
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Parsed arguments, once [`run`](Self::run) has parsed them.
    pub fn matches(&self) -> Option<&ArgMatches> {
        self.matches.as_ref()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Labels of the extensions loaded so far, in load order.
    pub fn extensions(&self) -> &[String] {
        &self.loaded
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn set_exit_code(&mut self, code: u8) {
        self.exit_code = code;
    }

    pub fn stdout(&self) -> &Sink {
        &self.stdout
    }

    pub fn stderr(&self) -> &Sink {
        &self.stderr
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("label", &self.label)
            .field("state", &self.state)
            .field("interfaces", &self.interfaces.list().collect::<Vec<_>>())
            .field("extensions", &self.loaded)
            .field("debug", &self.debug)
            .field("exit_code", &self.exit_code)
            .finish_non_exhaustive()
    }
}

/// Adds the global `--debug` flag unless the command defines its own.
fn debug_requested(matches: &ArgMatches) -> bool {
    matches
        .try_get_one::<bool>("debug")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

fn with_debug_flag(command: Command) -> Command {
    if command.get_arguments().any(|arg| arg.get_id() == "debug") {
        return command;
    }
    command.arg(
        Arg::new("debug")
            .long("debug")
            .global(true)
            .action(ArgAction::SetTrue)
            .help("Toggle debug output"),
    )
}
