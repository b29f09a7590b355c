//! Command registry.
//!
//! The [`CommandRegistry`] maps command names to [`Command`] values. Entries
//! are either built-ins (registered at startup, protected from unload and
//! reload) or dynamic (backed by a plugin produced by a
//! [`PluginLoader`], replaceable in place and removable).
//!
//! # Example
//!
//! ```rust,ignore
//! let mut registry = CommandRegistry::new();
//! registry.register("exit", Command::builtin(ExitCommand), Origin::Builtin);
//! assert!(registry.lookup("exit").is_some());
//! assert!(matches!(registry.unload("exit"), Err(RegistryError::Protected(_))));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use atsh_plugin::{CommandPlugin, PluginError, PluginLoader, PluginRoot, Streams};
use tracing::info;

use crate::error::RegistryError;
use crate::session::ShellSession;

/// What the dispatch loop should do after a command returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Go back to reading input.
    Continue,
    /// Leave the loop.
    Exit,
}

/// Where a registry entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Compiled into the shell; cannot be unloaded.
    Builtin,
    /// Produced by a plugin loader at runtime.
    Dynamic,
}

/// Everything a built-in may touch while it runs.
///
/// Borrowed from the shell for the duration of one invocation.
pub struct CommandContext<'a> {
    /// Session state (working directory, prompt, plugin root).
    pub session: &'a mut ShellSession,
    /// The registry, for `load`, `unload` and `help`.
    pub registry: &'a mut CommandRegistry,
    /// Loader used for explicit loads and reloads.
    pub loader: &'a dyn PluginLoader,
    /// Active streams.
    pub streams: &'a mut Streams,
}

/// Trait for a command compiled into the shell.
pub trait Builtin {
    /// Command name.
    fn name(&self) -> &str;

    /// Documentation shown by `help <name>`.
    fn usage(&self) -> &str;

    /// Documentation, possibly depending on session state.
    fn help(&self, _session: &ShellSession) -> String {
        self.usage().to_string()
    }

    /// Execute the command with the raw argument text.
    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError>;
}

#[derive(Clone)]
enum Implementation {
    Builtin(Rc<dyn Builtin>),
    Dynamic(Rc<dyn CommandPlugin>),
}

/// A named, invokable unit.
///
/// Cloning is cheap and shares the implementation, which lets the dispatch
/// loop hold a command while the command itself mutates the registry.
#[derive(Clone)]
pub struct Command {
    implementation: Implementation,
}

impl Command {
    /// Wrap a built-in.
    pub fn builtin(command: impl Builtin + 'static) -> Self {
        Self {
            implementation: Implementation::Builtin(Rc::new(command)),
        }
    }

    /// Wrap a loaded plugin.
    pub fn dynamic(plugin: Box<dyn CommandPlugin>) -> Self {
        Self {
            implementation: Implementation::Dynamic(Rc::from(plugin)),
        }
    }

    /// Name the implementation reports.
    pub fn name(&self) -> &str {
        match &self.implementation {
            Implementation::Builtin(b) => b.name(),
            Implementation::Dynamic(p) => p.name(),
        }
    }

    /// Documentation string, if the command has one.
    pub fn documentation(&self, session: &ShellSession) -> Option<String> {
        match &self.implementation {
            Implementation::Builtin(b) => Some(b.help(session)),
            Implementation::Dynamic(p) => p.description().map(str::to_string),
        }
    }

    /// Run the command. Plugins never end the loop.
    pub fn invoke(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        match &self.implementation {
            Implementation::Builtin(b) => b.execute(args, ctx),
            Implementation::Dynamic(p) => {
                p.execute(args, &*ctx.session, ctx.streams)?;
                Ok(Flow::Continue)
            }
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.implementation {
            Implementation::Builtin(_) => "builtin",
            Implementation::Dynamic(_) => "dynamic",
        };
        f.debug_struct("Command")
            .field("name", &self.name())
            .field("kind", &kind)
            .finish()
    }
}

struct Entry {
    command: Command,
    origin: Origin,
}

/// Registry of commands keyed by name.
///
/// Only the dispatch loop touches the registry, so no locking is involved.
#[derive(Default)]
pub struct CommandRegistry {
    entries: HashMap<String, Entry>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a command. Pure read.
    pub fn lookup(&self, name: &str) -> Option<Command> {
        self.entries.get(name).map(|e| e.command.clone())
    }

    /// Insert or overwrite a command.
    ///
    /// Registering with [`Origin::Builtin`] marks the name protected.
    pub fn register(&mut self, name: impl Into<String>, command: Command, origin: Origin) {
        self.entries.insert(name.into(), Entry { command, origin });
    }

    /// Register a built-in under its own name.
    pub fn register_builtin(&mut self, command: impl Builtin + 'static) {
        let name = command.name().to_string();
        self.register(name, Command::builtin(command), Origin::Builtin);
    }

    /// Resolve `name` through `loader` and register it as dynamic.
    pub fn load(
        &mut self,
        name: &str,
        loader: &dyn PluginLoader,
        root: Option<&PluginRoot>,
    ) -> Result<Command, RegistryError> {
        let command = Command::dynamic(loader.load(name, root)?);
        self.register(name, command.clone(), Origin::Dynamic);
        info!(command = %name, "loaded dynamic command");
        Ok(command)
    }

    /// Remove a dynamic command, releasing its plugin.
    pub fn unload(&mut self, name: &str) -> Result<(), RegistryError> {
        match self.entries.get(name).map(|e| e.origin) {
            None => Err(RegistryError::NotFound(name.to_string())),
            Some(Origin::Builtin) => Err(RegistryError::Protected(name.to_string())),
            Some(Origin::Dynamic) => {
                self.entries.remove(name);
                info!(command = %name, "unloaded dynamic command");
                Ok(())
            }
        }
    }

    /// Re-resolve a dynamic command's backing unit.
    ///
    /// On success the implementation and documentation are replaced in
    /// place. If the unit can no longer be located the entry is purged so
    /// later lookups see the name as unknown; a malformed unit leaves the
    /// previous implementation registered.
    pub fn reload(
        &mut self,
        name: &str,
        loader: &dyn PluginLoader,
        root: Option<&PluginRoot>,
    ) -> Result<(), RegistryError> {
        let Some(entry) = self.entries.get_mut(name) else {
            return Err(RegistryError::NotFound(name.to_string()));
        };
        if entry.origin == Origin::Builtin {
            return Err(RegistryError::Protected(name.to_string()));
        }

        match loader.load(name, root) {
            Ok(plugin) => {
                entry.command = Command::dynamic(plugin);
                info!(command = %name, "reloaded dynamic command");
                Ok(())
            }
            Err(e) if e.is_unresolvable() => {
                self.entries.remove(name);
                info!(command = %name, reason = %e, "purged stale dynamic command");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Origin of a registered command.
    pub fn origin(&self, name: &str) -> Option<Origin> {
        self.entries.get(name).map(|e| e.origin)
    }

    /// Whether a command is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All registered command names (sorted).
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
