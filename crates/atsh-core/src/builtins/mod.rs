//! Commands compiled into the shell.
//!
//! Built-ins are registered with [`Origin::Builtin`](crate::Origin) and
//! cannot be unloaded or reloaded:
//!
//! - `exit` -- leave the shell (also end of input)
//! - `help [name]` / `? [name]` -- list commands or show one command's usage
//! - `load <name>` -- load or reload a dynamic command
//! - `unload <name>` -- remove a dynamic command
//! - `echo` -- print the rest of the line
//! - `cd`, `cp`, `ls`, `mkdir`, `mv`, `pwd`, `rm`, `rmdir` -- see [`fs`]
//! - `run <STR>` -- see [`run`]

use std::io::Write;

use atsh_plugin::{LoadError, PluginError, split_exact};
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::registry::{Builtin, CommandContext, CommandRegistry, Flow};
use crate::session::ShellSession;

pub mod fs;
pub mod run;

#[cfg(test)]
pub(crate) mod harness;

/// Register every built-in into `registry`.
pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register_builtin(ExitCommand);
    registry.register_builtin(HelpCommand);
    registry.register_builtin(LoadCommand);
    registry.register_builtin(UnloadCommand);
    registry.register_builtin(EchoCommand);
    registry.register_builtin(fs::CdCommand);
    registry.register_builtin(fs::CpCommand);
    registry.register_builtin(fs::LsCommand);
    registry.register_builtin(fs::MkdirCommand);
    registry.register_builtin(fs::MvCommand);
    registry.register_builtin(fs::PwdCommand);
    registry.register_builtin(fs::RmCommand);
    registry.register_builtin(fs::RmdirCommand);
    registry.register_builtin(run::RunCommand);
}

/// Report a loader failure the way the user sees every resolution failure.
pub(crate) fn report_unresolved(
    name: &str,
    error: &RegistryError,
    ctx: &mut CommandContext<'_>,
) -> Result<(), PluginError> {
    match error {
        RegistryError::Load(e @ LoadError::Malformed { .. }) => {
            warn!(command = %name, error = %e, "plugin unit is malformed");
        }
        other => debug!(command = %name, error = %other, "command did not resolve"),
    }
    ctx.streams.report_error(format!("command '{name}' not found"))?;
    Ok(())
}

// ── exit ─────────────────────────────────────────────────────────────────

/// `exit` -- leave the dispatch loop.
struct ExitCommand;

impl Builtin for ExitCommand {
    fn name(&self) -> &str {
        "exit"
    }

    fn usage(&self) -> &str {
        "Exit from shell"
    }

    fn execute(&self, _args: &str, _ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        Ok(Flow::Exit)
    }
}

// ── help ─────────────────────────────────────────────────────────────────

/// `help [name]` -- list commands or print one command's documentation.
struct HelpCommand;

impl Builtin for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn usage(&self) -> &str {
        "Usage: help [NAME]\nList available commands, or show detailed help for NAME."
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let topic = args.trim();
        let out = &mut ctx.streams.output;

        if topic.is_empty() {
            write!(out, "{}", format_general_help(ctx.registry, ctx.session))?;
            return Ok(Flow::Continue);
        }

        let doc = ctx
            .registry
            .lookup(topic)
            .and_then(|cmd| cmd.documentation(ctx.session));
        match doc {
            Some(doc) => writeln!(out, "{doc}")?,
            None => writeln!(out, "*** No help on {topic}")?,
        }
        Ok(Flow::Continue)
    }
}

/// Listing of documented and undocumented commands.
fn format_general_help(registry: &CommandRegistry, session: &ShellSession) -> String {
    let (documented, undocumented): (Vec<&str>, Vec<&str>) =
        registry.names().into_iter().partition(|name| {
            registry
                .lookup(name)
                .and_then(|cmd| cmd.documentation(session))
                .is_some()
        });

    let mut output = String::new();
    push_section(&mut output, "Documented commands (type help <topic>):", &documented);
    push_section(&mut output, "Undocumented commands:", &undocumented);
    output
}

fn push_section(output: &mut String, header: &str, names: &[&str]) {
    if names.is_empty() {
        return;
    }
    output.push_str(header);
    output.push('\n');
    output.push_str(&"=".repeat(header.len()));
    output.push('\n');
    output.push_str(&names.join("  "));
    output.push_str("\n\n");
}

// ── load ─────────────────────────────────────────────────────────────────

/// `load <name>` -- load a dynamic command, or reload it if present.
struct LoadCommand;

impl Builtin for LoadCommand {
    fn name(&self) -> &str {
        "load"
    }

    fn usage(&self) -> &str {
        "Usage: load <ARG>\nTry to (re)load command ARG."
    }

    fn help(&self, session: &ShellSession) -> String {
        match session.plugin_root() {
            Some(root) => format!(
                "Usage: load <ARG>\nTry to (re)load command ARG from plugin root '{root}'."
            ),
            None => format!("{}\nDynamic loading is disabled.", self.usage()),
        }
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let Some(words) = split_exact(args, 1, ctx.streams)? else {
            return Ok(Flow::Continue);
        };
        let name = words[0].as_str();
        let root = ctx.session.plugin_root();

        let result = if ctx.registry.contains(name) {
            ctx.registry.reload(name, ctx.loader, root)
        } else {
            ctx.registry.load(name, ctx.loader, root).map(|_| ())
        };

        match result {
            Ok(()) => {}
            Err(RegistryError::Protected(_)) => {
                ctx.streams
                    .report_error(format!("internal command '{name}' cannot be reloaded"))?;
            }
            Err(e) => report_unresolved(name, &e, ctx)?,
        }
        Ok(Flow::Continue)
    }
}

// ── unload ───────────────────────────────────────────────────────────────

/// `unload <name>` -- remove a dynamic command.
struct UnloadCommand;

impl Builtin for UnloadCommand {
    fn name(&self) -> &str {
        "unload"
    }

    fn usage(&self) -> &str {
        "Usage: unload <ARG>\nTry to unload command ARG."
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let Some(words) = split_exact(args, 1, ctx.streams)? else {
            return Ok(Flow::Continue);
        };
        let name = words[0].as_str();

        match ctx.registry.unload(name) {
            Ok(()) => {}
            Err(RegistryError::Protected(_)) => ctx
                .streams
                .report_error(format!("internal command '{name}' cannot be unloaded"))?,
            Err(_) => ctx.streams.report_error(format!("command '{name}' not found"))?,
        }
        Ok(Flow::Continue)
    }
}

// ── echo ─────────────────────────────────────────────────────────────────

/// `echo` -- print the remaining part of the line verbatim.
struct EchoCommand;

impl Builtin for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }

    fn usage(&self) -> &str {
        "Print remaining part of line."
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        writeln!(ctx.streams.output, "{args}")?;
        Ok(Flow::Continue)
    }
}
