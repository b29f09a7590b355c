//! Plugin trait definitions.

use std::path::{Path, PathBuf};

use crate::{Interrupt, LoadError, PluginError, PluginRoot, Streams};

/// Session context a plugin may consult while it runs.
///
/// Plugins get a shared reference only: session state such as the working
/// directory is changed by built-ins, never by loaded commands.
pub trait ShellHandle {
    /// Current working directory of the session.
    fn cwd(&self) -> &Path;

    /// Resolve a user-supplied path against the session's working directory.
    ///
    /// Call this after shell-splitting the argument text, never on the raw
    /// line.
    fn resolve_path(&self, raw: &str) -> PathBuf;

    /// Interrupt flag. Long-running commands poll it and return when raised.
    fn interrupt(&self) -> &Interrupt;
}

/// A dynamically loaded command.
///
/// The dispatch loop calls [`execute`](CommandPlugin::execute) with the
/// unparsed argument text. User-facing failures are written to
/// `streams.error`; an `Err` is reserved for failures the command cannot
/// report itself (typically a broken stream).
pub trait CommandPlugin {
    /// Command name, as typed at the prompt.
    fn name(&self) -> &str;

    /// Documentation shown by `help <name>`.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Run the command.
    fn execute(
        &self,
        args: &str,
        shell: &dyn ShellHandle,
        streams: &mut Streams,
    ) -> Result<(), PluginError>;
}

/// Constructor for a compiled-in plugin.
pub type PluginFactory = fn() -> Box<dyn CommandPlugin>;

/// Resolves command names to live plugins.
pub trait PluginLoader {
    /// Load `name` from the plugin root.
    ///
    /// `root` is `None` when dynamic loading is not configured; loaders must
    /// answer [`LoadError::Unconfigured`] in that case.
    fn load(
        &self,
        name: &str,
        root: Option<&PluginRoot>,
    ) -> Result<Box<dyn CommandPlugin>, LoadError>;
}
