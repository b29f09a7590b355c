//! `touch <FILE>` -- create FILE if absent, otherwise refresh its mtime.

use std::fs::OpenOptions;
use std::time::SystemTime;

use atsh_plugin::{CommandPlugin, PluginError, ShellHandle, Streams, split_exact};
use tracing::debug;

/// Constructor registered in the `bin` catalog.
pub fn factory() -> Box<dyn CommandPlugin> {
    Box::new(TouchCommand)
}

/// The `touch` command.
pub struct TouchCommand;

impl CommandPlugin for TouchCommand {
    fn name(&self) -> &str {
        "touch"
    }

    fn description(&self) -> Option<&str> {
        Some("Usage: touch <FILE>\nCreate new empty file FILE, if absent.")
    }

    fn execute(
        &self,
        args: &str,
        shell: &dyn ShellHandle,
        streams: &mut Streams,
    ) -> Result<(), PluginError> {
        let Some(words) = split_exact(args, 1, streams)? else {
            return Ok(());
        };
        let path = shell.resolve_path(&words[0]);
        debug!(path = %path.display(), "touch");

        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(e) => {
                streams.report_error(e)?;
                return Ok(());
            }
        };
        if let Err(e) = file.set_modified(SystemTime::now()) {
            streams.report_error(e)?;
        }
        Ok(())
    }
}
