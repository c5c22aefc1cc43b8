//! `greet`: a small Keel application.
//!
//! Shows the pieces a real app uses: a custom interface with two handlers
//! loaded by an extension, a clap-derived command line, hooks, the built-in
//! log, output and cache handlers, and configuration selecting defaults.
//!
//! ```text
//! greet Ada Grace               Hello, Ada!  Hello, Grace!
//! greet --style formal Ada      Dear Ada,
//! greet --structured Ada        [{"name": "Ada", "text": "Hello, Ada!"}]
//! greet --debug Ada             also logs DEBUG lines to stderr
//! ```

pub mod greeting;

use anyhow::Context;
use clap::{CommandFactory, FromArgMatches, Parser};
use keel::hooks::POST_SETUP;
use keel::{App, AppBuilder, BoxError, Config, Resolve};
use serde::Serialize;
use serde_json::json;

use greeting::{Greeter, GreetingExtension};

pub const APP_LABEL: &str = "greet";

/// Command line of the `greet` binary.
#[derive(Parser, Debug)]
#[command(name = "greet", about = "Greets people, politely or not")]
pub struct Cli {
    /// Who to greet
    pub names: Vec<String>,

    /// Greeting handler to use (plain, formal)
    #[arg(long, short)]
    pub style: Option<String>,

    /// Print greetings through the output handler
    #[arg(long)]
    pub structured: bool,
}

#[derive(Debug, Serialize)]
pub struct Greeting {
    pub name: String,
    pub text: String,
}

/// The `greet` app, ready to build.
pub fn app() -> AppBuilder {
    App::builder(APP_LABEL)
        .config(defaults())
        .command(Cli::command())
        .extension(GreetingExtension)
        .hook(POST_SETUP, 100, log_platform)
        .run(|app: &mut App| run(app).map_err(BoxError::from))
}

fn defaults() -> Config {
    let mut config = Config::new();
    config.set(APP_LABEL, "greeting_handler", "plain");
    config
}

fn log_platform(app: &mut App) -> Result<(), BoxError> {
    let platform = app.platform()?;
    app.log()?.debug(&format!(
        "running on {} ({}) as pid {}",
        platform.platform(),
        platform.host(),
        platform.pid()
    ));
    Ok(())
}

fn run(app: &mut App) -> anyhow::Result<()> {
    let matches = app.matches().context("arguments were not parsed")?;
    let cli = Cli::from_arg_matches(matches)?;

    let mut request = Resolve::new(greeting::INTERFACE);
    if let Some(style) = &cli.style {
        request = request.label(style.clone());
    }
    let greeter = app.resolve::<dyn Greeter>(request)?;

    let names = if cli.names.is_empty() {
        vec!["world".to_string()]
    } else {
        cli.names
    };
    let greetings: Vec<Greeting> = names
        .iter()
        .map(|name| Greeting {
            name: name.clone(),
            text: greeter.greet(name),
        })
        .collect();
    app.log()?
        .debug(&format!("greeted {} name(s)", greetings.len()));

    if cli.structured {
        app.print(&greetings)?;
    } else {
        for greeting in &greetings {
            app.stdout().write_line(&greeting.text)?;
        }
    }

    app.cache()?.set("last_greeted", json!(names), None);
    Ok(())
}
