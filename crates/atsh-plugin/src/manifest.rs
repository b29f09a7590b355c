//! Plugin manifest types.
//!
//! Defines [`PluginManifest`] and [`ExecSpec`] -- the schema of the
//! `plugin.json` file that describes an external command unit.
//!
//! ```json
//! {
//!   "name": "greet",
//!   "description": "Usage: greet [NAME]\nSay hello.",
//!   "version": "1.0.0",
//!   "exec": { "program": "./greet.sh", "args": ["--plain"] }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::PluginError;

/// File name of the manifest inside a command unit directory.
pub const MANIFEST_FILE: &str = "plugin.json";

/// Manifest parsed from `plugin.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Command name; must match the unit's directory name.
    pub name: String,

    /// Documentation shown by `help <name>`.
    #[serde(default)]
    pub description: Option<String>,

    /// Semantic version string (validated when present).
    #[serde(default)]
    pub version: Option<String>,

    /// Entry point. A manifest without one cannot be executed.
    #[serde(default)]
    pub exec: Option<ExecSpec>,
}

/// How to run an external command unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecSpec {
    /// Program to run. Paths starting with `./` or `../` are relative to the
    /// unit directory; bare names are looked up on `PATH`.
    pub program: String,

    /// Fixed arguments placed before the user's arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

impl PluginManifest {
    /// Validate the manifest. Returns an error describing the first
    /// validation failure, or `Ok(())` if the manifest is valid.
    ///
    /// A missing entry point is not a validation failure here; loaders
    /// report it separately so it can be told apart from a bad file.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.name.trim().is_empty() {
            return Err(PluginError::InvalidManifest("name is required".into()));
        }
        if let Some(version) = &self.version
            && semver::Version::parse(version).is_err()
        {
            return Err(PluginError::InvalidManifest(format!(
                "invalid semver version '{version}'"
            )));
        }
        if let Some(exec) = &self.exec
            && exec.program.trim().is_empty()
        {
            return Err(PluginError::InvalidManifest("exec.program is empty".into()));
        }
        Ok(())
    }

    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, PluginError> {
        let manifest: Self = serde_json::from_str(json)?;
        manifest.validate()?;
        tracing::trace!(name = %manifest.name, "parsed plugin manifest");
        Ok(manifest)
    }
}
