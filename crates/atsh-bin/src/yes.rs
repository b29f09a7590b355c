//! `yes [ARG]` -- print ARG (default `y`) and a newline until interrupted.

use std::io::Write;

use atsh_plugin::{CommandPlugin, PluginError, ShellHandle, Streams};

/// Constructor registered in the `bin` catalog.
pub fn factory() -> Box<dyn CommandPlugin> {
    Box::new(YesCommand)
}

/// The `yes` command.
pub struct YesCommand;

impl CommandPlugin for YesCommand {
    fn name(&self) -> &str {
        "yes"
    }

    fn description(&self) -> Option<&str> {
        Some("Usage: yes [ARG]\nConstantly print the ARG (default is 'y') and newline character.")
    }

    fn execute(
        &self,
        args: &str,
        shell: &dyn ShellHandle,
        streams: &mut Streams,
    ) -> Result<(), PluginError> {
        let text = if args.is_empty() { "y" } else { args };
        let interrupt = shell.interrupt();
        while !interrupt.is_raised() {
            writeln!(streams.output, "{text}")?;
        }
        streams.output.flush()?;
        Ok(())
    }
}
