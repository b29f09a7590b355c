//! The dispatch loop.
//!
//! Each turn moves through three states:
//!
//! 1. **Idle** -- print the prompt, read one line.
//! 2. **Resolving** -- take the first shell word as the command name, look
//!    it up, and on a miss ask the loader for it.
//! 3. **Executing** -- invoke the command with the rest of the line.
//!
//! An interrupt raised while idle abandons the pending read, prints `^C`
//! and a fresh prompt; the line the user then types is dispatched as
//! usual. While resolving it abandons the turn. While executing it is the
//! command's job to notice it, and the loop prints `^C` once the command
//! returns.

use std::io::{self, Write};
use std::time::Duration;

use atsh_plugin::{Interrupt, PluginLoader, ShellHandle, Streams};
use tracing::{debug, warn};

use crate::builtins::register_builtins;
use crate::colorize::ColorizedWriter;
use crate::error::{RegistryError, ShellError};
use crate::input::LineReader;
use crate::registry::{Command, CommandContext, CommandRegistry, Flow};
use crate::session::ShellSession;

/// Token produced when the input stream is exhausted.
const EOF_TOKEN: &str = "EOF";

/// How often an idle read checks the interrupt flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// An interactive shell: registry, loader, session and streams.
pub struct Shell {
    registry: CommandRegistry,
    loader: Box<dyn PluginLoader>,
    session: ShellSession,
    configured: Option<Streams>,
    active: Option<Streams>,
    lines: Option<LineReader>,
    intro: Option<String>,
}

impl Shell {
    /// Create a shell with every built-in registered.
    ///
    /// `streams` are only activated when the loop starts; the process-wide
    /// stdio handles are never replaced.
    pub fn new(session: ShellSession, loader: impl PluginLoader + 'static, streams: Streams) -> Self {
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry);
        Self {
            registry,
            loader: Box::new(loader),
            session,
            configured: Some(streams),
            active: None,
            lines: None,
            intro: None,
        }
    }

    /// Banner printed when the loop starts.
    pub fn with_intro(mut self, intro: Option<String>) -> Self {
        self.intro = intro;
        self
    }

    /// The command registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Mutable access to the registry, for embedding extra commands.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    /// Session state.
    pub fn session(&self) -> &ShellSession {
        &self.session
    }

    /// Handle to the interrupt flag the loop polls.
    pub fn interrupt(&self) -> Interrupt {
        self.session.interrupt().clone()
    }

    /// Activate the configured streams, composing the error coloring.
    ///
    /// The input moves onto a reader thread; commands read it through a
    /// blocking view of the same thread.
    pub fn begin(&mut self) -> Result<(), ShellError> {
        if self.active.is_some() {
            return Ok(());
        }
        let mut streams = self.configured.take().ok_or(ShellError::StreamsUnavailable)?;
        if self.session.colored() {
            streams.error = Box::new(ColorizedWriter::red(streams.error));
        }
        let input = std::mem::replace(&mut streams.input, Box::new(io::empty()));
        let lines = LineReader::spawn(input);
        streams.input = Box::new(lines.reader());
        self.lines = Some(lines);
        self.active = Some(streams);
        Ok(())
    }

    /// Flush and release the active streams.
    pub fn end(&mut self) {
        self.lines = None;
        if let Some(mut streams) = self.active.take()
            && let Err(e) = streams.flush()
        {
            warn!(error = %e, "failed to flush shell streams");
        }
    }

    /// Run the loop until `exit` or end of input.
    pub fn run(&mut self) -> Result<(), ShellError> {
        self.begin()?;
        let result = self.run_loop();
        self.end();
        result
    }

    fn run_loop(&mut self) -> Result<(), ShellError> {
        if let Some(intro) = &self.intro {
            let streams = self.active.as_mut().ok_or(ShellError::StreamsUnavailable)?;
            writeln!(streams.output, "{intro}")?;
        }
        while self.step()? == Flow::Continue {}
        debug!("dispatch loop finished");
        Ok(())
    }

    /// One Idle → Resolving → Executing turn.
    pub fn step(&mut self) -> Result<Flow, ShellError> {
        self.write_prompt()?;
        let line = self.read_line()?;
        self.dispatch_line(line.trim_end_matches(['\n', '\r']))
    }

    fn write_prompt(&mut self) -> Result<(), ShellError> {
        let streams = self.active.as_mut().ok_or(ShellError::StreamsUnavailable)?;
        write!(streams.output, "{}", self.session.prompt())?;
        streams.output.flush()?;
        Ok(())
    }

    /// Wait for a line, answering every interrupt with `^C` and a new
    /// prompt. End of input and read failures yield the `EOF` token.
    fn read_line(&mut self) -> Result<String, ShellError> {
        let lines = self.lines.clone().ok_or(ShellError::StreamsUnavailable)?;
        loop {
            let polled = lines.poll(POLL_INTERVAL);
            if self.abandon_if_interrupted()? {
                self.write_prompt()?;
            }
            match polled {
                None => {}
                Some(Ok(line)) if line.is_empty() => return Ok(EOF_TOKEN.to_string()),
                Some(Ok(line)) => return Ok(line),
                Some(Err(e)) => {
                    warn!(error = %e, "input stream failed, leaving the loop");
                    return Ok(EOF_TOKEN.to_string());
                }
            }
        }
    }

    /// Resolve and execute one line. The streams must be active.
    pub fn dispatch_line(&mut self, line: &str) -> Result<Flow, ShellError> {
        let Some((mut name, args)) = split_command(line) else {
            return Ok(Flow::Continue);
        };
        if name == EOF_TOKEN {
            name = "exit".to_string();
        }

        let command = self.resolve(&name);
        if self.abandon_if_interrupted()? {
            return Ok(Flow::Continue);
        }

        let flow = self.execute(&name, args, command)?;
        self.abandon_if_interrupted()?;
        Ok(flow)
    }

    fn resolve(&mut self, name: &str) -> Option<Command> {
        if let Some(command) = self.registry.lookup(name) {
            return Some(command);
        }
        match self
            .registry
            .load(name, self.loader.as_ref(), self.session.plugin_root())
        {
            Ok(command) => Some(command),
            Err(RegistryError::Load(e)) if !e.is_unresolvable() => {
                warn!(command = %name, error = %e, "plugin unit is malformed");
                None
            }
            Err(e) => {
                debug!(command = %name, error = %e, "command did not resolve");
                None
            }
        }
    }

    fn execute(
        &mut self,
        name: &str,
        args: &str,
        command: Option<Command>,
    ) -> Result<Flow, ShellError> {
        let streams = self.active.as_mut().ok_or(ShellError::StreamsUnavailable)?;
        let Some(command) = command else {
            streams.report_error(format!("command '{name}' not found"))?;
            return Ok(Flow::Continue);
        };

        debug!(command = %name, "executing");
        let mut ctx = CommandContext {
            session: &mut self.session,
            registry: &mut self.registry,
            loader: self.loader.as_ref(),
            streams,
        };
        match command.invoke(args, &mut ctx) {
            Ok(flow) => Ok(flow),
            Err(e) => {
                debug!(command = %name, error = %e, "command returned an error");
                ctx.streams.report_error(e)?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Lower a raised interrupt and echo `^C`. Returns whether it was raised.
    fn abandon_if_interrupted(&mut self) -> Result<bool, ShellError> {
        if !self.session.interrupt().take() {
            return Ok(false);
        }
        let streams = self.active.as_mut().ok_or(ShellError::StreamsUnavailable)?;
        streams.output.write_all(b"^C\n")?;
        streams.output.flush()?;
        Ok(true)
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.end();
    }
}

/// Split a line into the command name and the remaining argument text.
///
/// The name is the first shell word (quotes and escapes honored); the
/// argument text is the rest of the line, trimmed but otherwise untouched.
/// A leading `?` stands for `help`. Returns `None` for blank or unparsable
/// lines.
pub fn split_command(line: &str) -> Option<(String, &str)> {
    let line = line.trim_start();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix('?') {
        return Some(("help".to_string(), rest.trim()));
    }

    let end = first_word_end(line);
    let mut words = shell_words::split(&line[..end]).ok()?.into_iter();
    let name = words.next().filter(|w| !w.is_empty())?;
    Some((name, line[end..].trim()))
}

/// Byte offset where the first unquoted whitespace occurs.
fn first_word_end(line: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('\''), _) => {}
            (Some('"'), '"') => quote = None,
            (_, '\\') => escaped = true,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, c) if c.is_whitespace() => return i,
            (None, _) => {}
        }
    }
    line.len()
}
