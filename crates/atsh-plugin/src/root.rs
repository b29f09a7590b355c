//! Package-style plugin root names.
//!
//! A plugin root is a dotted namespace such as `bin` or `plugins.extra`,
//! not a filesystem path. Directory-backed loaders map each segment to one
//! directory level below their search directories.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::LoadError;

/// Validated dotted namespace naming where dynamic commands live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginRoot(String);

impl PluginRoot {
    /// Parse and validate a namespace.
    ///
    /// Every dot-separated segment must be non-empty and consist of ASCII
    /// letters, digits, `_` or `-`.
    pub fn parse(raw: &str) -> Result<Self, LoadError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LoadError::Unconfigured);
        }
        if !raw.split('.').all(is_valid_segment) {
            return Err(LoadError::malformed(raw, "invalid plugin root namespace"));
        }
        Ok(Self(raw.to_string()))
    }

    /// The namespace as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Relative directory path for this namespace (`a.b` → `a/b`).
    pub fn to_relative_path(&self) -> PathBuf {
        self.segments().collect()
    }
}

impl fmt::Display for PluginRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PluginRoot {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Whether `name` can name a unit inside a plugin root.
///
/// Rejects anything that could escape the namespace when mapped onto a
/// directory (separators, dots, empty names).
pub fn is_valid_unit_name(name: &str) -> bool {
    is_valid_segment(name)
}
