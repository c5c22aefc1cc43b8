use std::cell::RefCell;
use std::rc::Rc;

use clap::{Arg, Command};
use insta::assert_snapshot;
use keel::hooks::{
    POST_ARGUMENT_PARSING, POST_CLOSE, POST_RUN, POST_SETUP, PRE_ARGUMENT_PARSING, PRE_CLOSE,
    PRE_RUN, PRE_SETUP,
};
use keel::interfaces::log;
use keel::{
    extension, App, BoxError, Config, Error, Handler, HandlerRegistration, LogHandler, LogLevel,
    Meta, Provides, Sink,
};
use serde_json::json;

fn buffer() -> Rc<RefCell<Vec<u8>>> {
    Rc::new(RefCell::new(Vec::new()))
}

fn text(buffer: &Rc<RefCell<Vec<u8>>>) -> String {
    String::from_utf8(buffer.borrow().clone()).unwrap()
}

// Records every lifecycle hook it sees
fn recorder(seen: &Rc<RefCell<Vec<&'static str>>>) -> keel::AppBuilder {
    let mut builder = App::builder("demo")
        .stdout(Sink::Writer(buffer()))
        .stderr(Sink::Writer(buffer()));
    for hook in [
        PRE_SETUP,
        POST_SETUP,
        PRE_RUN,
        PRE_ARGUMENT_PARSING,
        POST_ARGUMENT_PARSING,
        POST_RUN,
        PRE_CLOSE,
        POST_CLOSE,
    ] {
        let seen = seen.clone();
        builder = builder.hook(hook, 0, move |_: &mut App| {
            seen.borrow_mut().push(hook);
            Ok(())
        });
    }
    builder
}

#[test]
fn test_lifecycle_hook_order() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let run_seen = seen.clone();
    let mut app = recorder(&seen)
        .run(move |_: &mut App| {
            run_seen.borrow_mut().push("run");
            Ok(())
        })
        .build()
        .unwrap();

    app.setup().unwrap();
    app.run_with(["demo"]).unwrap();
    app.close().unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            "pre_setup",
            "post_setup",
            "pre_run",
            "pre_argument_parsing",
            "post_argument_parsing",
            "run",
            "post_run",
            "pre_close",
            "post_close",
        ]
    );
}

#[test]
fn test_failing_hook_stops_lifecycle() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut app = recorder(&seen)
        .hook_labeled(PRE_RUN, "guard", -10, |_: &mut App| {
            Err::<(), BoxError>("not allowed".into())
        })
        .build()
        .unwrap();

    app.setup().unwrap();
    let err = app.run_with(["demo"]).unwrap_err();

    assert_eq!(
        keel::render_chain(&err),
        "hook 'pre_run' failed in callable #0 (guard)\n  caused by: not allowed"
    );
    assert_eq!(*seen.borrow(), vec!["pre_setup", "post_setup"]);
}

#[test]
fn test_log_end_to_end() {
    let err = buffer();
    let mut app = App::builder("demo")
        .stderr(Sink::Writer(err.clone()))
        .build()
        .unwrap();
    app.setup().unwrap();

    app.log().unwrap().info("hello");

    assert_eq!(text(&err), "INFO: hello\n");
}

#[test]
fn test_log_level_from_handler_section() {
    let err = buffer();
    let mut app = App::builder("demo")
        .config(Config::from_yaml_str("log.console:\n  level: ERROR\n").unwrap())
        .stderr(Sink::Writer(err.clone()))
        .build()
        .unwrap();
    app.setup().unwrap();

    let log = app.log().unwrap();
    log.warning("hidden");
    log.error("shown");

    assert_eq!(log.get_level(), LogLevel::Error);
    assert_eq!(text(&err), "ERROR: shown\n");
}

#[test]
fn test_bad_log_level_fails_setup() {
    let mut app = App::builder("demo")
        .config(Config::from_yaml_str("log.console:\n  level: LOUD\n").unwrap())
        .stderr(Sink::Writer(buffer()))
        .build()
        .unwrap();

    let err = app.setup().unwrap_err();
    assert_eq!(
        keel::render_chain(&err),
        "setup of handler 'console' for interface 'log' failed\n  caused by: unknown log level 'LOUD'"
    );
}

#[test]
fn test_debug_flag_lowers_log_level() {
    let err = buffer();
    let mut app = App::builder("demo")
        .command(Command::new("demo"))
        .stderr(Sink::Writer(err.clone()))
        .run(|app: &mut App| {
            app.log()?.debug("details");
            Ok(())
        })
        .build()
        .unwrap();

    app.setup().unwrap();
    app.run_with(["demo", "--debug"]).unwrap();

    assert!(app.debug());
    assert_eq!(text(&err), "DEBUG: details\n");
}

#[test]
fn test_command_arguments_reach_run() {
    let out = buffer();
    let mut app = App::builder("demo")
        .command(Command::new("demo").arg(Arg::new("name").required(true)))
        .stdout(Sink::Writer(out.clone()))
        .run(|app: &mut App| {
            let name = app
                .matches()
                .and_then(|m| m.get_one::<String>("name"))
                .cloned()
                .unwrap_or_default();
            app.print(&json!({ "hello": name }))?;
            Ok(())
        })
        .build()
        .unwrap();

    app.setup().unwrap();
    app.run_with(["demo", "world"]).unwrap();

    assert_snapshot!(text(&out), @r#"
    {
      "hello": "world"
    }
    "#);
}

#[test]
fn test_main_reports_errors_through_log() {
    let err = buffer();
    let mut app = App::builder("demo")
        .stderr(Sink::Writer(err.clone()))
        .run(|_: &mut App| Err("database unavailable".into()))
        .args(["demo"])
        .build()
        .unwrap();

    assert_eq!(app.execute(), 1);
    assert_eq!(app.state(), keel::AppState::Closed);
    assert_eq!(text(&err), "ERROR: database unavailable\n");
}

#[test]
fn test_main_respects_exit_code() {
    let mut app = App::builder("demo")
        .stderr(Sink::Writer(buffer()))
        .run(|app: &mut App| {
            app.set_exit_code(3);
            Ok(())
        })
        .args(["demo"])
        .build()
        .unwrap();

    assert_eq!(app.execute(), 3);
}

#[test]
fn test_main_usage_error_exits_2() {
    let err = buffer();
    let mut app = App::builder("demo")
        .command(Command::new("demo"))
        .stderr(Sink::Writer(err.clone()))
        .args(["demo", "--bogus"])
        .build()
        .unwrap();

    assert_eq!(app.execute(), 2);
    assert!(text(&err).contains("--bogus"));
}

#[test]
fn test_help_goes_to_stdout_and_exits_0() {
    let out = buffer();
    let mut app = App::builder("demo")
        .command(Command::new("demo").about("Demo app"))
        .stdout(Sink::Writer(out.clone()))
        .stderr(Sink::Writer(buffer()))
        .args(["demo", "--help"])
        .build()
        .unwrap();

    assert_eq!(app.execute(), 0);
    assert!(text(&out).contains("--debug"));
}

// ============================================================================
// Extensions and overrides
// ============================================================================

struct Shouting {
    sink: Sink,
}

impl Handler for Shouting {}

impl Provides for Shouting {
    const LABEL: &'static str = "console";
    const CAPABILITIES: &'static [&'static str] = log::CAPABILITIES;
}

impl LogHandler for Shouting {
    fn set_level(&self, _level: LogLevel) {}

    fn get_level(&self) -> LogLevel {
        LogLevel::Debug
    }

    fn log(&self, _level: LogLevel, msg: &str) {
        let _ = self.sink.write_line(&msg.to_uppercase());
    }
}

#[test]
fn test_handler_override_replaces_builtin() {
    let err = buffer();
    let sink = Sink::Writer(err.clone());
    let mut app = App::builder("demo")
        .stderr(Sink::Writer(buffer()))
        .handler_override(HandlerRegistration::provided::<dyn LogHandler, Shouting, _>(
            log::INTERFACE,
            move || Box::new(Shouting { sink: sink.clone() }),
        ))
        .build()
        .unwrap();
    app.setup().unwrap();

    app.log().unwrap().info("quiet please");

    assert_eq!(text(&err), "QUIET PLEASE\n");
}

#[test]
fn test_plain_handler_with_builtin_label_is_duplicate() {
    let mut app = App::builder("demo")
        .stderr(Sink::Writer(buffer()))
        .handler(HandlerRegistration::provided::<dyn LogHandler, Shouting, _>(
            log::INTERFACE,
            || Box::new(Shouting { sink: Sink::Writer(buffer()) }),
        ))
        .build()
        .unwrap();

    let err = app.setup().unwrap_err();
    assert_eq!(
        err.to_string(),
        "handler 'console' is already registered for interface 'log'"
    );
}

#[test]
fn test_extension_loads_once_and_errors_name_it() {
    let loads = Rc::new(RefCell::new(0));
    let counter = loads.clone();
    let ext = move || {
        let counter = counter.clone();
        extension::from_fn("counter", move |_: &mut App| {
            *counter.borrow_mut() += 1;
            Ok(())
        })
    };
    let mut app = App::builder("demo")
        .stderr(Sink::Writer(buffer()))
        .extension(ext())
        .extension(ext())
        .build()
        .unwrap();
    app.setup().unwrap();

    assert_eq!(*loads.borrow(), 1);
    assert_eq!(app.extensions(), ["keel.builtin", "counter"]);

    let mut broken = App::builder("demo")
        .without_builtin()
        .extension(extension::from_fn("mailer", |app: &mut App| {
            app.unregister("mail", "smtp")?;
            Ok(())
        }))
        .build()
        .unwrap();
    let err = broken.setup().unwrap_err();
    assert_eq!(
        keel::render_chain(&err),
        "extension 'mailer' failed to load\n  caused by: handler 'smtp' is not registered for interface 'mail'"
    );
}

// ============================================================================
// Custom interfaces
// ============================================================================

trait Greeter: Handler {
    fn greet(&self, name: &str) -> String;
}

struct Formal {
    title: String,
}

impl Handler for Formal {
    fn setup(&mut self, meta: &Meta) -> Result<(), BoxError> {
        self.title = meta.get_str("title").unwrap_or("Mx.").to_string();
        Ok(())
    }
}

impl Greeter for Formal {
    fn greet(&self, name: &str) -> String {
        format!("Good day, {} {name}", self.title)
    }
}

#[test]
fn test_custom_interface_resolves_with_meta_defaults() {
    let mut app = App::builder("demo")
        .stderr(Sink::Writer(buffer()))
        .interface(keel::InterfaceDefinition::new::<dyn Greeter>("greeter").capability("greet"))
        .handler(
            HandlerRegistration::new::<dyn Greeter, _>("greeter", "formal", || {
                Box::new(Formal {
                    title: String::new(),
                })
            })
            .provides(["greet"]),
        )
        .build()
        .unwrap();
    app.setup().unwrap();

    let greeter = app
        .resolve::<dyn Greeter>(
            keel::Resolve::new("greeter")
                .force_new()
                .meta_default("title", "Dr."),
        )
        .unwrap();
    assert_eq!(greeter.greet("Ada"), "Good day, Dr. Ada");

    let err = app.resolve::<dyn LogHandler>("greeter").err().unwrap();
    assert!(matches!(
        err,
        Error::Registry(keel::RegistryError::InterfaceType { .. })
    ));
}
