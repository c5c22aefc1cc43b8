use clap::{Arg, Command};
use keel::hooks::{POST_CLOSE, PRE_RENDER};
use keel::{App, AppState, BoxError, Error, MailMessage};
use keel_test::{CaptureBuffer, TestApp};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct Task {
    id: u32,
    title: String,
}

#[test]
fn test_print_is_captured() {
    let mut app = TestApp::new(App::builder("todo")).unwrap();

    app.print(&Task {
        id: 1,
        title: "write tests".into(),
    })
    .unwrap();

    assert_eq!(
        app.stdout().contents(),
        "{\n  \"id\": 1,\n  \"title\": \"write tests\"\n}\n"
    );
}

#[test]
fn test_yaml_output_selected_by_config() {
    let mut app = TestApp::with_config(App::builder("todo"), "todo:\n  output_handler: yaml\n")
        .unwrap();

    app.print(&Task {
        id: 2,
        title: "ship".into(),
    })
    .unwrap();

    assert_eq!(app.stdout().lines(), vec!["id: 2", "title: ship"]);
}

#[test]
fn test_pre_render_hook_can_redact() {
    let builder = App::builder("todo").hook(PRE_RENDER, 0, |app: &mut App| {
        if let Some(Value::Object(map)) = app.render_data_mut() {
            map.remove("title");
        }
        Ok::<(), BoxError>(())
    });
    let mut app = TestApp::with_config(builder, "output.json:\n  indent: 0\n").unwrap();

    app.print(&Task {
        id: 3,
        title: "secret".into(),
    })
    .unwrap();

    assert_eq!(app.stdout().contents(), "{\"id\":3}\n");
}

#[test]
fn test_dummy_mail_writes_to_stdout() {
    let mut app = TestApp::with_config(
        App::builder("todo"),
        "mail.dummy:\n  from_addr: todo@example.com\n",
    )
    .unwrap();

    let sent = app
        .mail()
        .unwrap()
        .send("3 tasks due", &MailMessage::to(["me@example.com"]))
        .unwrap();

    assert!(sent);
    let out = app.stdout().contents();
    assert!(out.contains("From: todo@example.com"));
    assert!(out.contains("3 tasks due"));
}

#[test]
fn test_run_parses_args() {
    let mut app = TestApp::new(
        App::builder("todo")
            .command(Command::new("todo").arg(Arg::new("title").required(true)))
            .run(|app: &mut App| {
                let title = app
                    .matches()
                    .and_then(|m| m.get_one::<String>("title"))
                    .cloned()
                    .unwrap_or_default();
                app.log()?.info(&format!("added {title}"));
                Ok(())
            }),
    )
    .unwrap();

    app.run(["todo", "buy milk"]).unwrap();

    assert_eq!(app.stderr().lines(), vec!["INFO: added buy milk"]);
}

#[test]
fn test_missing_argument_is_cli_error() {
    let mut app = TestApp::new(
        App::builder("todo").command(Command::new("todo").arg(Arg::new("title").required(true))),
    )
    .unwrap();

    let err = app.run(["todo"]).unwrap_err();
    assert!(matches!(err, Error::Cli(_)));
}

#[test]
fn test_drop_closes_app() {
    let closed = CaptureBuffer::new();
    let sink = closed.sink();
    {
        let _app = TestApp::new(App::builder("todo").hook(POST_CLOSE, 0, move |_: &mut App| {
            sink.write_line("closed")?;
            Ok(())
        }))
        .unwrap();
    }
    assert_eq!(closed.lines(), vec!["closed"]);
}

#[test]
fn test_unstarted_app_is_built() {
    let app = TestApp::unstarted(App::builder("todo")).unwrap();
    assert_eq!(app.state(), AppState::Built);
}
