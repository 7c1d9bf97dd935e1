//! Console output routing.
//!
//! All observable output of a program (the `console` builtins and the
//! uncaught-exception report at the program boundary) flows through a
//! [`ConsoleWriter`]. The default writes to the process streams; tests use
//! [`CollectConsole`] to capture output for assertions.

use std::cell::RefCell;
use std::io::{self, Write as _};
use std::rc::Rc;

/// Destination stream for one line of console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    /// `console.log` and timer reports.
    Out,
    /// `console.warn`, `console.error` and uncaught-exception reports.
    Err,
}

/// Sink for console output. One call per line, without a trailing newline.
pub trait ConsoleWriter {
    fn write_line(&mut self, stream: ConsoleStream, line: &str);
}

/// Writes to stdout/stderr.
#[derive(Debug, Default)]
pub struct StdConsole;

impl ConsoleWriter for StdConsole {
    fn write_line(&mut self, stream: ConsoleStream, line: &str) {
        match stream {
            ConsoleStream::Out => {
                let mut out = io::stdout().lock();
                let _ = writeln!(out, "{line}");
            }
            ConsoleStream::Err => {
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "{line}");
            }
        }
    }
}

/// Collects all output into a shared string buffer, one line per entry,
/// both streams interleaved in emission order.
#[derive(Debug, Default, Clone)]
pub struct CollectConsole {
    buffer: Rc<RefCell<String>>,
}

impl CollectConsole {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle reading the same buffer; keep one before handing the writer
    /// to the runtime.
    #[must_use]
    pub fn handle(&self) -> Self {
        self.clone()
    }

    /// The collected output so far.
    #[must_use]
    pub fn output(&self) -> String {
        self.buffer.borrow().clone()
    }
}

impl ConsoleWriter for CollectConsole {
    fn write_line(&mut self, _stream: ConsoleStream, line: &str) {
        let mut buffer = self.buffer.borrow_mut();
        buffer.push_str(line);
        buffer.push('\n');
    }
}

/// Discards all output.
#[derive(Debug, Default)]
pub struct NoConsole;

impl ConsoleWriter for NoConsole {
    fn write_line(&mut self, _stream: ConsoleStream, _line: &str) {}
}
