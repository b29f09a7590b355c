//! The stream triple and the interrupt flag.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Input, output and error handles used by every command invocation.
///
/// The shell owns one `Streams` value for the lifetime of its loop and lends
/// it to exactly one command at a time.
pub struct Streams {
    /// Line source for the loop and for commands that read input.
    ///
    /// `Send` so the loop can read it on a helper thread and abandon a
    /// pending read when interrupted.
    pub input: Box<dyn BufRead + Send>,
    /// Regular command output.
    pub output: Box<dyn Write>,
    /// Diagnostics. May be wrapped in a coloring decorator.
    pub error: Box<dyn Write>,
    /// Whether spawned child processes may inherit the process stdin.
    pub inherit_stdin: bool,
}

impl Streams {
    /// Build a stream set from arbitrary handles.
    pub fn new(
        input: impl BufRead + Send + 'static,
        output: impl Write + 'static,
        error: impl Write + 'static,
    ) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            error: Box::new(error),
            inherit_stdin: false,
        }
    }

    /// Stream set bound to the process stdin, stdout and stderr.
    ///
    /// Children inherit stdin only when it is a terminal; piped input
    /// belongs to the shell.
    pub fn stdio() -> Self {
        let stdin = io::stdin();
        let inherit_stdin = stdin.is_terminal();
        Self {
            input: Box::new(BufReader::new(stdin)),
            output: Box::new(io::stdout()),
            error: Box::new(io::stderr()),
            inherit_stdin,
        }
    }

    /// Write `Error: <message>` followed by a newline to the error stream.
    ///
    /// The line goes out in a single write so decorators see it whole.
    pub fn report_error(&mut self, message: impl fmt::Display) -> io::Result<()> {
        let line = format!("Error: {message}\n");
        self.error.write_all(line.as_bytes())
    }

    /// Flush output and error.
    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()?;
        self.error.flush()
    }
}

impl fmt::Debug for Streams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streams")
            .field("inherit_stdin", &self.inherit_stdin)
            .finish_non_exhaustive()
    }
}

/// Interrupt flag shared between the signal handler, the loop and commands.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Create a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Safe to call from a signal handler thread.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag is currently raised.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Lower the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// In-memory writer whose clones share one buffer.
///
/// Lets an embedding application hand the shell an output or error stream
/// and read back what was written.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Discard everything written so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
