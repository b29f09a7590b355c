//! Configuration discovery and loading.
//!
//! The discovery order is:
//! 1. An explicit path (the `--config` flag).
//! 2. The `ATSH_CONFIG` environment variable.
//! 3. `~/.atsh/config.toml`
//! 4. `~/.atsh/config.json`
//! 5. If none found, [`ShellConfig::default`].
//!
//! Files are parsed as TOML or JSON by extension. Keys are normalized from
//! camelCase to snake_case before deserialization, so `pluginRoot` and
//! `plugin_root` are equivalent.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use atsh_plugin::{LoadError, PluginRoot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "ATSH_CONFIG";

/// Banner printed when the loop starts.
pub const DEFAULT_INTRO: &str = "Welcome to AT Shell!\nType 'help' or '?' to list commands.";

/// Plugin namespace used when the config does not name one.
pub const DEFAULT_PLUGIN_ROOT: &str = "bin";

/// Shell configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Plugin namespace searched for unknown commands. Empty or absent
    /// disables dynamic loading.
    pub plugin_root: Option<String>,

    /// Directories holding manifest plugins, searched in order. `~/` is
    /// expanded to the home directory.
    pub plugin_dirs: Vec<String>,

    /// Color the prompt, `ls` output and the error stream.
    pub colored: bool,

    /// Banner printed at loop start. `None` prints nothing.
    pub intro: Option<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            plugin_root: Some(DEFAULT_PLUGIN_ROOT.into()),
            plugin_dirs: vec!["~/.atsh/plugins".into()],
            colored: true,
            intro: Some(DEFAULT_INTRO.into()),
        }
    }
}

impl ShellConfig {
    /// The validated plugin root, or `None` when loading is disabled.
    pub fn plugin_root(&self) -> Result<Option<PluginRoot>, ConfigError> {
        let Some(raw) = self.plugin_root.as_deref() else {
            return Ok(None);
        };
        match PluginRoot::parse(raw) {
            Ok(root) => Ok(Some(root)),
            Err(LoadError::Unconfigured) => Ok(None),
            Err(_) => Err(ConfigError::Invalid(format!(
                "plugin_root '{raw}' is not a dotted namespace"
            ))),
        }
    }

    /// Plugin directories with `~/` expanded.
    pub fn plugin_search_dirs(&self) -> Vec<PathBuf> {
        self.plugin_dirs.iter().map(|d| expand_home(d)).collect()
    }

    /// Parse a config document. `path` only selects the format and labels
    /// errors.
    pub fn from_str_with_path(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let parse_err = |reason: String| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        };
        let raw: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(contents).map_err(|e| parse_err(e.to_string()))?,
            _ => toml::from_str(contents).map_err(|e| parse_err(e.to_string()))?,
        };
        serde_json::from_value(normalize_keys(raw)).map_err(|e| parse_err(e.to_string()))
    }
}

/// Load configuration from an explicit path or via discovery.
///
/// An explicit path that does not exist is an error; a discovered path
/// that has disappeared falls back to defaults.
pub fn load_config(config_override: Option<&Path>) -> Result<ShellConfig, ConfigError> {
    if let Some(path) = config_override {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        return read_config(path);
    }

    let discovered = discover_config_path(std::env::var_os(CONFIG_ENV), dirs::home_dir());
    let Some(path) = discovered else {
        info!("no config file found, using defaults");
        return Ok(ShellConfig::default());
    };
    if !path.exists() {
        warn!(path = %path.display(), "config path does not exist, using defaults");
        return Ok(ShellConfig::default());
    }
    read_config(&path)
}

fn read_config(path: &Path) -> Result<ShellConfig, ConfigError> {
    debug!(path = %path.display(), "loading config file");
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ShellConfig::from_str_with_path(&contents, path)
}

/// Discover the config file path using the fallback chain.
///
/// Returns `None` if no candidate exists. The environment variable wins
/// even when the file it names is missing, so the caller can warn about it.
pub fn discover_config_path(env_value: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(value) = env_value
        && !value.is_empty()
    {
        return Some(PathBuf::from(value));
    }

    let base = home?.join(".atsh");
    ["config.toml", "config.json"]
        .into_iter()
        .map(|name| base.join(name))
        .find(|candidate| candidate.exists())
}

/// Expand `~/` prefixes to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

/// Convert camelCase object keys to snake_case recursively.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| (camel_to_snake(&key), normalize_keys(val)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Convert a single camelCase string to snake_case.
///
/// A run of capitals is kept together (`"HTMLParser"` → `"html_parser"`).
pub fn camel_to_snake(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let starts_word = match prev {
                None | Some('_') => false,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                Some(_) => false,
            };
            if starts_word {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
