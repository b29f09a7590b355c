//! Plugin error types.
//!
//! [`LoadError`] classifies why a command name could not be turned into a
//! live plugin. [`PluginError`] covers failures while a command runs.

use thiserror::Error;

/// Why a loader could not produce a plugin for a command name.
///
/// The dispatch loop reports every variant to the user as "command not
/// found"; the distinction only drives fallback and registry purging.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No plugin root is configured, so dynamic loading is disabled.
    #[error("no plugin root configured")]
    Unconfigured,

    /// The plugin root holds no unit with this name.
    #[error("no command '{name}' under plugin root '{root}'")]
    NotFound {
        /// Requested command name.
        name: String,
        /// Plugin root that was searched.
        root: String,
    },

    /// A unit with this name exists but cannot be used as a command.
    #[error("command '{name}' is malformed: {reason}")]
    Malformed {
        /// Requested command name.
        name: String,
        /// What is wrong with the unit.
        reason: String,
    },
}

impl LoadError {
    /// Build a [`LoadError::NotFound`].
    pub fn not_found(name: &str, root: impl ToString) -> Self {
        Self::NotFound {
            name: name.to_string(),
            root: root.to_string(),
        }
    }

    /// Build a [`LoadError::Malformed`].
    pub fn malformed(name: &str, reason: impl ToString) -> Self {
        Self::Malformed {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the unit could not be located at all.
    ///
    /// A registry entry whose backing unit becomes unresolvable is purged
    /// on reload; a malformed unit leaves the previous implementation alone.
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Self::Unconfigured | Self::NotFound { .. })
    }
}

/// Errors produced while a command executes.
#[derive(Debug, Error)]
pub enum PluginError {
    /// I/O error on one of the streams or the filesystem.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Manifest deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Manifest content is invalid.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}
