//! Output destinations for handlers and error reports.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

/// Where a handler writes text.
///
/// Apps carry a stdout and a stderr sink; built-in handlers write through
/// them, so a test can swap both for in-memory buffers.
#[derive(Clone, Default)]
pub enum Sink {
    Stdout,
    #[default]
    Stderr,
    /// Any shared writer, typically an in-memory buffer.
    Writer(Rc<RefCell<dyn Write>>),
}

impl Sink {
    /// Wraps a writer.
    pub fn writer<W: Write + 'static>(writer: W) -> Self {
        Sink::Writer(Rc::new(RefCell::new(writer)))
    }

    /// Writes text as-is.
    pub fn write_str(&self, text: &str) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().lock().write_all(text.as_bytes()),
            Sink::Stderr => io::stderr().lock().write_all(text.as_bytes()),
            Sink::Writer(writer) => writer.borrow_mut().write_all(text.as_bytes()),
        }
    }

    /// Writes text followed by a newline.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        self.write_str(line)?;
        self.write_str("\n")
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Stdout => write!(f, "Sink::Stdout"),
            Sink::Stderr => write!(f, "Sink::Stderr"),
            Sink::Writer(_) => write!(f, "Sink::Writer(..)"),
        }
    }
}
