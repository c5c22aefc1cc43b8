//! The extension that registers the built-in handlers.

use keel_core::HandlerRegistration;

use crate::app::App;
use crate::error::Error;
use crate::extension::Extension;
use crate::handlers::{
    ConsoleLogHandler, DummyMailHandler, JsonOutputHandler, KeelPlatformHandler,
    MemoryCacheHandler, YamlOutputHandler,
};
use crate::interfaces::{
    cache, log, mail, output, platform, CacheHandler, LogHandler, MailHandler, OutputHandler,
    PlatformHandler,
};

/// Registers `console`, `json`, `yaml`, `dummy`, `memory` and `keel`.
///
/// Loaded first by every app unless
/// [`AppBuilder::without_builtin`](crate::AppBuilder::without_builtin) is
/// used. Console logging writes to the app's stderr sink, dummy mail to its
/// stdout sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct Builtin;

impl Extension for Builtin {
    fn label(&self) -> &str {
        "keel.builtin"
    }

    fn load(&self, app: &mut App) -> Result<(), Error> {
        let stderr = app.stderr().clone();
        app.register(HandlerRegistration::provided::<dyn LogHandler, ConsoleLogHandler, _>(
            log::INTERFACE,
            move || Box::new(ConsoleLogHandler::new(stderr.clone())),
        ))?;

        app.register(HandlerRegistration::provided::<dyn OutputHandler, JsonOutputHandler, _>(
            output::INTERFACE,
            || Box::new(JsonOutputHandler::default()),
        ))?;
        app.register(HandlerRegistration::provided::<dyn OutputHandler, YamlOutputHandler, _>(
            output::INTERFACE,
            || Box::new(YamlOutputHandler),
        ))?;

        let stdout = app.stdout().clone();
        app.register(HandlerRegistration::provided::<dyn MailHandler, DummyMailHandler, _>(
            mail::INTERFACE,
            move || Box::new(DummyMailHandler::new(stdout.clone())),
        ))?;

        app.register(HandlerRegistration::provided::<dyn CacheHandler, MemoryCacheHandler, _>(
            cache::INTERFACE,
            || Box::new(MemoryCacheHandler::default()),
        ))?;
        app.register(
            HandlerRegistration::provided::<dyn PlatformHandler, KeelPlatformHandler, _>(
                platform::INTERFACE,
                || Box::new(KeelPlatformHandler::new()),
            ),
        )?;
        Ok(())
    }
}
