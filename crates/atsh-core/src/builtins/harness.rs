//! Test fixture that runs built-ins against in-memory streams.

use std::io;
use std::path::Path;

use atsh_plugin::{PluginRoot, SharedBuffer, Streams};

use super::register_builtins;
use crate::loader::CatalogLoader;
use crate::registry::{CommandContext, CommandRegistry, Flow};
use crate::session::ShellSession;

pub(crate) struct Harness {
    pub registry: CommandRegistry,
    pub session: ShellSession,
    loader: CatalogLoader,
    streams: Streams,
    out: SharedBuffer,
    err: SharedBuffer,
}

impl Harness {
    /// Built-ins plus the bundled `bin` catalog, rooted at `/`.
    pub fn new() -> Self {
        Self::build("/", PluginRoot::parse("bin").ok())
    }

    /// Same, with dynamic loading disabled.
    pub fn unconfigured() -> Self {
        Self::build("/", None)
    }

    /// Rooted at `cwd`, loading from `bin`.
    pub fn in_dir(cwd: &Path) -> Self {
        Self::build(cwd, PluginRoot::parse("bin").ok())
    }

    fn build(cwd: impl AsRef<Path>, root: Option<PluginRoot>) -> Self {
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry);
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        Self {
            registry,
            session: ShellSession::new(cwd.as_ref(), root, false),
            loader: CatalogLoader::new().with_namespace(atsh_bin::NAMESPACE, atsh_bin::catalog()),
            streams: Streams::new(io::empty(), out.clone(), err.clone()),
            out,
            err,
        }
    }

    /// Invoke the registered command `name` with `args`.
    pub fn run(&mut self, name: &str, args: &str) -> Flow {
        let command = self.registry.lookup(name).unwrap();
        let mut ctx = CommandContext {
            session: &mut self.session,
            registry: &mut self.registry,
            loader: &self.loader,
            streams: &mut self.streams,
        };
        command.invoke(args, &mut ctx).unwrap()
    }

    /// Output written so far.
    pub fn out(&self) -> String {
        self.out.contents()
    }

    /// Errors written so far.
    pub fn err(&self) -> String {
        self.err.contents()
    }

    /// Discard captured output and errors.
    pub fn clear(&self) {
        self.out.clear();
        self.err.clear();
    }
}
