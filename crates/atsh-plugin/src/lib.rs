//! Command plugin contract for the atsh shell.
//!
//! This crate defines everything a command needs in order to be invoked by
//! the shell's dispatch loop, whether it is compiled into the binary or
//! loaded at runtime from a plugin root.
//!
//! # Trait Overview
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`CommandPlugin`] | The single entry point a loaded command exposes |
//! | [`ShellHandle`] | Read-only view of the session handed to plugins |
//! | [`PluginLoader`] | Resolves a command name under a [`PluginRoot`] |
//!
//! # Supporting Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Streams`] | The input/output/error triple threaded through invocations |
//! | [`Interrupt`] | Shared flag raised by the interrupt signal handler |
//! | [`PluginManifest`] | `plugin.json` schema for external command units |
//! | [`LoadError`] | Distinguishable loader failures |
//! | [`PluginError`] | Failures while a command runs |

pub mod args;
pub mod error;
pub mod manifest;
pub mod root;
pub mod streams;
pub mod traits;

// Re-export core types at crate root for convenience.
pub use args::{arity_message, split_exact, split_words};
pub use error::{LoadError, PluginError};
pub use manifest::{ExecSpec, MANIFEST_FILE, PluginManifest};
pub use root::{PluginRoot, is_valid_unit_name};
pub use streams::{Interrupt, SharedBuffer, Streams};
pub use traits::{CommandPlugin, PluginFactory, PluginLoader, ShellHandle};
