//! Core of the atsh shell.
//!
//! Wires the pieces together:
//!
//! - [`registry`] -- name → command mapping with protected built-ins.
//! - [`loader`] -- [`PluginLoader`](atsh_plugin::PluginLoader)
//!   implementations (compiled-in catalog, manifest directories, chain).
//! - [`shell`] -- the read / resolve / execute dispatch loop.
//! - [`input`] -- line input read on a helper thread so idle reads can be
//!   interrupted.
//! - [`session`] -- working directory, prompt and plugin root.
//! - [`builtins`] -- commands compiled into the shell.
//! - [`config`] -- configuration discovery and loading.

pub mod builtins;
pub mod colorize;
pub mod config;
pub mod error;
pub mod input;
pub mod loader;
pub mod process;
pub mod registry;
pub mod session;
pub mod shell;

pub use config::ShellConfig;
pub use error::{ConfigError, RegistryError, ShellError};
pub use loader::{CatalogLoader, ChainLoader, DirectoryLoader};
pub use registry::{Builtin, Command, CommandContext, CommandRegistry, Flow, Origin};
pub use session::ShellSession;
pub use shell::Shell;
