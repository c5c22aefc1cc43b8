//! In-process test harness for keel applications.
//!
//! [`TestApp`] builds an app with both sinks redirected to
//! [`CaptureBuffer`]s, sets it up, and closes it when dropped. Tests drive
//! it through the regular [`App`] API (it derefs to `App`) and assert on
//! captured output.
//!
//! ```rust
//! use keel::App;
//! use keel_test::TestApp;
//!
//! let mut app = TestApp::new(App::builder("demo")).unwrap();
//! app.log().unwrap().warning("careful");
//! assert_eq!(app.stderr().lines(), vec!["WARNING: careful"]);
//! ```

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::rc::Rc;

use keel::{App, AppBuilder, AppState, ConfigError, Error, Sink};
use tempfile::TempDir;

/// A shared in-memory buffer usable as a [`Sink`].
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink writing into this buffer.
    pub fn sink(&self) -> Sink {
        Sink::Writer(self.bytes.clone())
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(String::from).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.bytes.borrow_mut().clear();
    }
}

/// A set-up [`App`] with captured output.
///
/// Closed on drop unless the test closed it already.
pub struct TestApp {
    app: App,
    stdout: CaptureBuffer,
    stderr: CaptureBuffer,
    _config_dir: Option<TempDir>,
}

impl TestApp {
    /// Builds and sets up the app.
    pub fn new(builder: AppBuilder) -> Result<Self, Error> {
        Self::start(builder, None)
    }

    /// Like [`new`](Self::new), loading `yaml` as a config file.
    ///
    /// The file lives in a temporary directory removed with the `TestApp`.
    pub fn with_config(builder: AppBuilder, yaml: &str) -> Result<Self, Error> {
        let dir = TempDir::new().map_err(|source| config_io(std::env::temp_dir(), source))?;
        let path = dir.path().join("config.yaml");
        fs::write(&path, yaml).map_err(|source| config_io(path.clone(), source))?;
        Self::start(builder.config_file(path), Some(dir))
    }

    /// Builds the app without setting it up.
    pub fn unstarted(builder: AppBuilder) -> Result<Self, Error> {
        let stdout = CaptureBuffer::new();
        let stderr = CaptureBuffer::new();
        let app = builder.stdout(stdout.sink()).stderr(stderr.sink()).build()?;
        Ok(Self {
            app,
            stdout,
            stderr,
            _config_dir: None,
        })
    }

    fn start(builder: AppBuilder, config_dir: Option<TempDir>) -> Result<Self, Error> {
        let mut test_app = Self::unstarted(builder)?;
        test_app._config_dir = config_dir;
        test_app.app.setup()?;
        Ok(test_app)
    }

    /// Runs the app with `args`, program name first.
    pub fn run<I, T>(&mut self, args: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.app.run_with(args)
    }

    pub fn stdout(&self) -> &CaptureBuffer {
        &self.stdout
    }

    pub fn stderr(&self) -> &CaptureBuffer {
        &self.stderr
    }
}

fn config_io(path: PathBuf, source: io::Error) -> Error {
    Error::Config(ConfigError::Io { path, source })
}

impl Deref for TestApp {
    type Target = App;

    fn deref(&self) -> &App {
        &self.app
    }
}

impl DerefMut for TestApp {
    fn deref_mut(&mut self) -> &mut App {
        &mut self.app
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if self.app.state() != AppState::Closed {
            let _ = self.app.close();
        }
    }
}
