//! Error types for the shell core.

use std::path::PathBuf;

use atsh_plugin::LoadError;
use thiserror::Error;

/// Failures of registry mutations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No command with this name is registered.
    #[error("command '{0}' not found")]
    NotFound(String),

    /// The command is a built-in and cannot be unloaded or reloaded.
    #[error("internal command '{0}' is protected")]
    Protected(String),

    /// Re-resolving the backing unit failed.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The config file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config {}: {reason}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A value is semantically invalid.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures that stop the dispatch loop from running at all.
#[derive(Error, Debug)]
pub enum ShellError {
    /// The stream context has already been consumed by a finished loop.
    #[error("shell streams are not available")]
    StreamsUnavailable,

    /// Writing to the active streams failed outside any command.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}
