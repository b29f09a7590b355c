//! Shell session state.
//!
//! One [`ShellSession`] lives for the duration of a shell. Built-ins mutate
//! it (`cd`); loaded plugins only see it through
//! [`ShellHandle`](atsh_plugin::ShellHandle).

use std::path::{Component, Path, PathBuf};

use atsh_plugin::{Interrupt, PluginRoot, ShellHandle};
use owo_colors::OwoColorize;

/// Session-scoped context: working directory, prompt, plugin root.
#[derive(Debug)]
pub struct ShellSession {
    cwd: PathBuf,
    prompt: String,
    plugin_root: Option<PluginRoot>,
    colored: bool,
    interrupt: Interrupt,
}

impl ShellSession {
    /// Create a session rooted at `cwd`.
    ///
    /// `plugin_root` of `None` disables dynamic loading for this session.
    pub fn new(cwd: impl Into<PathBuf>, plugin_root: Option<PluginRoot>, colored: bool) -> Self {
        let cwd = cwd.into();
        let cwd = std::fs::canonicalize(&cwd).unwrap_or_else(|_| normalize_lexically(&cwd));
        let mut session = Self {
            prompt: String::new(),
            cwd: PathBuf::new(),
            plugin_root,
            colored,
            interrupt: Interrupt::new(),
        };
        session.change_cwd(cwd);
        session
    }

    /// Share an existing interrupt flag (typically the one the signal
    /// handler raises).
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Change the working directory and rebuild the prompt.
    pub fn change_cwd(&mut self, path: PathBuf) {
        self.prompt = if self.colored {
            format!("{}$ ", path.display().blue())
        } else {
            format!("{}$ ", path.display())
        };
        self.cwd = path;
    }

    /// Prompt text shown before each read.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Configured plugin root, if dynamic loading is enabled.
    pub fn plugin_root(&self) -> Option<&PluginRoot> {
        self.plugin_root.as_ref()
    }

    /// Whether cosmetic coloring is on.
    pub fn colored(&self) -> bool {
        self.colored
    }
}

impl ShellHandle for ShellSession {
    fn cwd(&self) -> &Path {
        &self.cwd
    }

    fn resolve_path(&self, raw: &str) -> PathBuf {
        let joined = self.cwd.join(raw);
        std::fs::canonicalize(&joined).unwrap_or_else(|_| normalize_lexically(&joined))
    }

    fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }
}

/// Remove `.` and `..` components without touching the filesystem.
///
/// Used for paths that do not exist yet, where canonicalization fails.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}
