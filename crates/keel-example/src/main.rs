use std::process::ExitCode;

fn main() -> ExitCode {
    let mut builder = keel_example::app().tracing(true);
    if let Some(path) = std::env::var_os("GREET_CONFIG") {
        builder = builder.config_file(path);
    }
    match builder.build() {
        Ok(app) => app.main(),
        Err(err) => {
            eprintln!("error: {}", keel::render_chain(&err));
            ExitCode::FAILURE
        }
    }
}
