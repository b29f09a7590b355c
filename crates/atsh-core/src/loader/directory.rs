//! Manifest-described command units on disk.
//!
//! Layout under each search directory:
//!
//! ```text
//! <search_dir>/<root segments...>/<name>/plugin.json
//! ```
//!
//! The manifest is read on every load, so `load <name>` picks up edits to
//! the manifest and to the program it points at without a restart.

use std::path::{Path, PathBuf};
use std::process::Command;

use atsh_plugin::{
    CommandPlugin, LoadError, MANIFEST_FILE, PluginError, PluginLoader, PluginManifest,
    PluginRoot, ShellHandle, Streams, is_valid_unit_name, split_words,
};
use tracing::{debug, trace};

use crate::process::run_piped;

/// Loader for `plugin.json` units found under a list of directories.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoader {
    search_dirs: Vec<PathBuf>,
}

impl DirectoryLoader {
    /// Search `dirs` in order; the first directory holding the unit wins.
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_dirs: dirs.into_iter().collect(),
        }
    }

    /// Directories searched, in order.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    fn read_unit(&self, name: &str, unit_dir: &Path) -> Result<ManifestPlugin, LoadError> {
        let manifest_path = unit_dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(LoadError::malformed(name, format!("missing {MANIFEST_FILE}")));
        }
        let json = std::fs::read_to_string(&manifest_path)
            .map_err(|e| LoadError::malformed(name, e))?;
        let manifest =
            PluginManifest::from_json(&json).map_err(|e| LoadError::malformed(name, e))?;

        if manifest.name != name {
            return Err(LoadError::malformed(
                name,
                format!("manifest names command '{}'", manifest.name),
            ));
        }
        let Some(exec) = manifest.exec else {
            return Err(LoadError::malformed(name, "manifest has no exec entry point"));
        };

        Ok(ManifestPlugin {
            name: manifest.name,
            description: manifest.description,
            program: exec.program,
            args: exec.args,
            unit_dir: unit_dir.to_path_buf(),
        })
    }
}

impl PluginLoader for DirectoryLoader {
    fn load(
        &self,
        name: &str,
        root: Option<&PluginRoot>,
    ) -> Result<Box<dyn CommandPlugin>, LoadError> {
        let Some(root) = root else {
            return Err(LoadError::Unconfigured);
        };
        if !is_valid_unit_name(name) {
            return Err(LoadError::not_found(name, root));
        }

        let relative = root.to_relative_path().join(name);
        for dir in &self.search_dirs {
            let unit_dir = dir.join(&relative);
            trace!(path = %unit_dir.display(), "probing plugin directory");
            if !unit_dir.is_dir() {
                continue;
            }
            let plugin = self.read_unit(name, &unit_dir)?;
            debug!(command = %name, path = %unit_dir.display(), "loaded manifest plugin");
            return Ok(Box::new(plugin));
        }
        Err(LoadError::not_found(name, root))
    }
}

/// A command backed by an external program described in `plugin.json`.
#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    name: String,
    description: Option<String>,
    program: String,
    args: Vec<String>,
    unit_dir: PathBuf,
}

impl ManifestPlugin {
    /// Directory the unit was loaded from.
    pub fn unit_dir(&self) -> &Path {
        &self.unit_dir
    }

    fn resolve_program(&self) -> Option<PathBuf> {
        let program = Path::new(&self.program);
        if self.program.starts_with("./") || self.program.starts_with("../") {
            Some(self.unit_dir.join(program))
        } else if program.is_absolute() {
            Some(program.to_path_buf())
        } else {
            which::which(program).ok()
        }
    }
}

impl CommandPlugin for ManifestPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn execute(
        &self,
        args: &str,
        shell: &dyn ShellHandle,
        streams: &mut Streams,
    ) -> Result<(), PluginError> {
        let Some(words) = split_words(args, streams)? else {
            return Ok(());
        };
        let Some(program) = self.resolve_program() else {
            streams.report_error("file not found")?;
            return Ok(());
        };

        let mut command = Command::new(&program);
        command.args(&self.args).args(&words).current_dir(shell.cwd());

        match run_piped(&mut command, streams, shell.interrupt()) {
            Ok(status) if status.success() => {}
            Ok(status) => match status.code() {
                Some(code) => streams.report_error(format!(
                    "command '{}' returned non-zero exit status {code}",
                    self.name
                ))?,
                None if shell.interrupt().is_raised() => {}
                None => streams.report_error(format!("command '{}' was terminated", self.name))?,
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                streams.report_error("file not found")?;
            }
            Err(e) => streams.report_error(e)?,
        }
        Ok(())
    }
}
