use keel::{App, AppState};
use keel_example::{app, greeting};
use keel_test::TestApp;
use serde_json::json;

fn greet() -> TestApp {
    TestApp::new(app()).unwrap()
}

#[test]
fn test_greets_world_by_default() {
    let mut app = greet();
    app.run(["greet"]).unwrap();
    assert_eq!(app.stdout().lines(), vec!["Hello, world!"]);
}

#[test]
fn test_formal_style() {
    let mut app = greet();
    app.run(["greet", "--style", "formal", "Ada", "Grace"])
        .unwrap();
    assert_eq!(app.stdout().lines(), vec!["Dear Ada,", "Dear Grace,"]);
}

#[test]
fn test_config_selects_handler_and_settings() {
    let mut app = TestApp::with_config(
        app(),
        "greet:\n  greeting_handler: formal\ngreeting.formal:\n  salutation: Hi\n",
    )
    .unwrap();
    app.run(["greet", "Ada"]).unwrap();
    assert_eq!(app.stdout().lines(), vec!["Hi Ada,"]);
}

#[test]
fn test_structured_output_uses_output_handler() {
    let mut app = greet();
    app.run(["greet", "--structured", "Ada"]).unwrap();

    let printed: serde_json::Value = serde_json::from_str(&app.stdout().contents()).unwrap();
    assert_eq!(printed, json!([{"name": "Ada", "text": "Hello, Ada!"}]));
}

#[test]
fn test_unknown_style_names_handler() {
    let mut app = greet();
    let err = app.run(["greet", "--style", "loud"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "handler 'loud' is not registered for interface 'greeting'"
    );
}

#[test]
fn test_debug_flag_logs_details() {
    let mut app = greet();
    app.run(["greet", "--debug", "Ada"]).unwrap();

    assert!(app.debug());
    assert_eq!(app.stderr().lines(), vec!["DEBUG: greeted 1 name(s)"]);
}

#[test]
fn test_last_greeted_is_cached() {
    let mut app = greet();
    app.run(["greet", "Ada", "Grace"]).unwrap();

    let cached = app.cache().unwrap().get("last_greeted");
    assert_eq!(cached, Some(json!(["Ada", "Grace"])));
}

#[test]
fn test_greeting_extension_is_loaded() {
    let app = greet();
    assert_eq!(app.state(), AppState::Ready);
    assert_eq!(app.extensions(), ["keel.builtin", "greeting"]);
    assert_eq!(
        app.handlers().list(greeting::INTERFACE).collect::<Vec<_>>(),
        vec!["plain", "formal"]
    );
}

#[test]
fn test_full_lifecycle_exit_code() {
    let mut app = keel_test::TestApp::unstarted(keel_example::app().args(["greet", "--style", "nope"]))
        .unwrap();
    let code = App::execute(&mut app);
    assert_eq!(code, 1);
    assert!(app
        .stderr()
        .contents()
        .contains("ERROR: handler 'nope' is not registered for interface 'greeting'"));
}
