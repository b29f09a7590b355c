//! Coloring decorator for output streams.

use std::io::{self, Write};

use owo_colors::{OwoColorize, Style};

/// Writer that forwards every write wrapped in a color style.
///
/// Composed around the error stream when the shell starts with color
/// enabled; the wrapped stream's contract is unchanged.
pub struct ColorizedWriter<W> {
    inner: W,
    style: Style,
}

impl<W: Write> ColorizedWriter<W> {
    /// Wrap `inner` with an arbitrary style.
    pub fn new(inner: W, style: Style) -> Self {
        Self { inner, style }
    }

    /// Wrap `inner` in red, the error-stream convention.
    pub fn red(inner: W) -> Self {
        Self::new(inner, Style::new().red())
    }

    /// Unwrap the decorated writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ColorizedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        write!(self.inner, "{}", text.style(self.style))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
