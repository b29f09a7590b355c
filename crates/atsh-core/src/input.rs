//! Line input read on a helper thread.
//!
//! The helper owns the underlying reader and reads one line per request.
//! The loop polls for the answer so a raised interrupt can abandon the wait
//! without losing the line: the request stays pending and the next line
//! that arrives answers it. Only line buffers cross threads.

use std::io::{self, BufRead, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::debug;

struct Channel {
    requests: Sender<()>,
    lines: Receiver<io::Result<String>>,
    pending: bool,
}

/// Handle to a reader thread. Clones share the same pending request.
#[derive(Clone)]
pub struct LineReader {
    channel: Arc<Mutex<Channel>>,
}

impl LineReader {
    /// Move `input` onto a helper thread.
    ///
    /// The thread exits once every handle is dropped and it is not blocked
    /// in a read.
    pub fn spawn(mut input: Box<dyn BufRead + Send>) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<()>();
        let (line_tx, line_rx) = mpsc::channel();
        thread::spawn(move || {
            while request_rx.recv().is_ok() {
                let mut line = String::new();
                let read = input.read_line(&mut line).map(|_| line);
                if line_tx.send(read).is_err() {
                    break;
                }
            }
            debug!("input reader thread finished");
        });
        Self {
            channel: Arc::new(Mutex::new(Channel {
                requests: request_tx,
                lines: line_rx,
                pending: false,
            })),
        }
    }

    /// Wait up to `timeout` for the next line.
    ///
    /// Returns `None` on timeout, leaving the request pending. An empty
    /// string means end of input.
    pub fn poll(&self, timeout: Duration) -> Option<io::Result<String>> {
        let mut channel = self.lock();
        if !channel.pending {
            if channel.requests.send(()).is_err() {
                return Some(Ok(String::new()));
            }
            channel.pending = true;
        }
        match channel.lines.recv_timeout(timeout) {
            Ok(read) => {
                channel.pending = false;
                Some(read)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                channel.pending = false;
                Some(Ok(String::new()))
            }
        }
    }

    /// Block until the next line arrives.
    pub fn wait(&self) -> io::Result<String> {
        loop {
            if let Some(read) = self.poll(Duration::from_secs(1)) {
                return read;
            }
        }
    }

    /// A [`BufRead`] view over this reader for commands that read input.
    pub fn reader(&self) -> ThreadedInput {
        ThreadedInput {
            lines: self.clone(),
            buf: Vec::new(),
            pos: 0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Channel> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Blocking [`BufRead`] fed line by line from a [`LineReader`].
pub struct ThreadedInput {
    lines: LineReader,
    buf: Vec<u8>,
    pos: usize,
}

impl Read for ThreadedInput {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for ThreadedInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.buf.len() {
            self.buf = self.lines.wait()?.into_bytes();
            self.pos = 0;
        }
        Ok(&self.buf[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buf.len());
    }
}
