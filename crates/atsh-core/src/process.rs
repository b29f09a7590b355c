//! External process execution with output pumped into [`Streams`].
//!
//! Child stdout and stderr are read on helper threads and forwarded over a
//! channel; the calling thread writes every chunk to the shell's streams and
//! kills the child when the interrupt flag is raised. Only bytes cross
//! threads; all shell state stays on the caller's thread.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use atsh_plugin::{Interrupt, Streams};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum Chunk {
    Out(Vec<u8>),
    Err(Vec<u8>),
}

/// Spawn `command`, forward its output to `streams` and wait for it.
///
/// Stdin is inherited only when the streams are bound to the real terminal.
/// A raised `interrupt` kills the child; the flag is left raised for the
/// caller to observe.
pub fn run_piped(
    command: &mut Command,
    streams: &mut Streams,
    interrupt: &Interrupt,
) -> io::Result<ExitStatus> {
    command
        .stdin(if streams.inherit_stdin {
            Stdio::inherit()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn()?;
    debug!(pid = child.id(), "spawned child process");

    let (tx, rx) = mpsc::channel();
    let readers = [
        child.stdout.take().map(|out| pump(out, tx.clone(), Chunk::Out)),
        child.stderr.take().map(|err| pump(err, tx.clone(), Chunk::Err)),
    ];
    drop(tx);

    let mut killed = false;
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Chunk::Out(bytes)) => {
                streams.output.write_all(&bytes)?;
                streams.output.flush()?;
            }
            Ok(Chunk::Err(bytes)) => {
                streams.error.write_all(&bytes)?;
                streams.error.flush()?;
            }
            Err(RecvTimeoutError::Timeout) => {
                if !killed && interrupt.is_raised() {
                    kill(&mut child);
                    killed = true;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for reader in readers.into_iter().flatten() {
        if reader.join().is_err() {
            warn!("output reader thread panicked");
        }
    }
    child.wait()
}

fn pump<R>(mut source: R, tx: Sender<Chunk>, wrap: fn(Vec<u8>) -> Chunk) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(wrap(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    })
}

fn kill(child: &mut Child) {
    debug!(pid = child.id(), "interrupt raised, killing child");
    if let Err(e) = child.kill() {
        warn!(error = %e, "failed to kill child process");
    }
}
