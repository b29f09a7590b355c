//! `run <STR>` -- run an external executable in the session's directory.

use std::io;
use std::path::PathBuf;
use std::process::Command;

use atsh_plugin::{PluginError, ShellHandle, split_words};
use tracing::debug;

use crate::process::run_piped;
use crate::registry::{Builtin, CommandContext, Flow};

pub(crate) struct RunCommand;

impl RunCommand {
    /// Programs containing a separator are paths relative to the cwd;
    /// bare names are looked up on `PATH`.
    fn locate(program: &str, ctx: &CommandContext<'_>) -> Option<PathBuf> {
        if program.contains('/') {
            let path = ctx.session.resolve_path(program);
            path.exists().then_some(path)
        } else {
            which::which(program).ok()
        }
    }
}

impl Builtin for RunCommand {
    fn name(&self) -> &str {
        "run"
    }

    fn usage(&self) -> &str {
        "Usage: run <STR>\nRun external executable with arguments.\n\
         (Just like running STR in external shell.)"
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let Some(words) = split_words(args, ctx.streams)? else {
            return Ok(Flow::Continue);
        };
        let Some((program, rest)) = words.split_first() else {
            ctx.streams.report_error("expected something after 'run'")?;
            return Ok(Flow::Continue);
        };
        let Some(path) = Self::locate(program, ctx) else {
            ctx.streams.report_error("file not found")?;
            return Ok(Flow::Continue);
        };

        debug!(program = %path.display(), args = rest.len(), "running external program");
        let mut command = Command::new(&path);
        command.args(rest).current_dir(ctx.session.cwd());

        match run_piped(&mut command, ctx.streams, ctx.session.interrupt()) {
            Ok(status) if status.success() => {}
            Ok(status) => match status.code() {
                Some(code) => ctx.streams.report_error(format!(
                    "command '{args}' returned non-zero exit status {code}"
                ))?,
                None if ctx.session.interrupt().is_raised() => {}
                None => ctx
                    .streams
                    .report_error(format!("command '{args}' was terminated"))?,
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                ctx.streams.report_error("file not found")?;
            }
            Err(e) => ctx.streams.report_error(e)?,
        }
        Ok(Flow::Continue)
    }
}
