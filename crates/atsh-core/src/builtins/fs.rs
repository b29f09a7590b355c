//! File commands working relative to the session's working directory.
//!
//! Every path argument is shell-split first and then resolved with
//! [`ShellHandle::resolve_path`], so `cd ..` and quoted names with spaces
//! behave as in a POSIX shell.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use atsh_plugin::{PluginError, ShellHandle, split_exact, split_words};
use owo_colors::OwoColorize;

use crate::registry::{Builtin, CommandContext, Flow};

/// Split `args` into exactly `expected` paths resolved against the cwd.
fn resolved(
    args: &str,
    expected: usize,
    ctx: &mut CommandContext<'_>,
) -> io::Result<Option<Vec<PathBuf>>> {
    let Some(words) = split_exact(args, expected, ctx.streams)? else {
        return Ok(None);
    };
    Ok(Some(
        words.iter().map(|w| ctx.session.resolve_path(w)).collect(),
    ))
}

/// Report a failed filesystem operation and keep the loop running.
fn report(result: io::Result<()>, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
    if let Err(e) = result {
        ctx.streams.report_error(e)?;
    }
    Ok(Flow::Continue)
}

/// Destination for `cp`/`mv`: a directory receives the source's file name.
fn destination(src: &Path, dst: PathBuf) -> PathBuf {
    match src.file_name() {
        Some(name) if dst.is_dir() => dst.join(name),
        _ => dst,
    }
}

/// Shared `cp`/`mv` precondition: SRC must be an existing regular file.
fn check_source(src: &Path, ctx: &mut CommandContext<'_>) -> io::Result<bool> {
    if !src.exists() {
        ctx.streams.report_error("no such file or directory")?;
        return Ok(false);
    }
    if !src.is_file() {
        ctx.streams.report_error("SRC is not a file")?;
        return Ok(false);
    }
    Ok(true)
}

// ── cd ───────────────────────────────────────────────────────────────────

pub(crate) struct CdCommand;

impl Builtin for CdCommand {
    fn name(&self) -> &str {
        "cd"
    }

    fn usage(&self) -> &str {
        "Usage: cd <DIR>\nChange current directory to DIR (relative paths are supported)"
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let Some(mut paths) = resolved(args, 1, ctx)? else {
            return Ok(Flow::Continue);
        };
        let dir = paths.remove(0);
        if !dir.exists() {
            ctx.streams.report_error("no such file or directory")?;
        } else if !dir.is_dir() {
            ctx.streams.report_error("not a directory")?;
        } else {
            ctx.session.change_cwd(dir);
        }
        Ok(Flow::Continue)
    }
}

// ── cp ───────────────────────────────────────────────────────────────────

pub(crate) struct CpCommand;

impl Builtin for CpCommand {
    fn name(&self) -> &str {
        "cp"
    }

    fn usage(&self) -> &str {
        "Usage: cp <SRC> <DST>\nCopy file SRC to path DST (file or directory)."
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let Some(paths) = resolved(args, 2, ctx)? else {
            return Ok(Flow::Continue);
        };
        let Ok([src, dst]) = <[PathBuf; 2]>::try_from(paths) else {
            return Ok(Flow::Continue);
        };
        if !check_source(&src, ctx)? {
            return Ok(Flow::Continue);
        }
        let dst = destination(&src, dst);
        report(copy_preserving_mtime(&src, &dst), ctx)
    }
}

fn copy_preserving_mtime(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let modified = fs::metadata(src)?.modified()?;
    fs::File::options().write(true).open(dst)?.set_modified(modified)
}

// ── ls ───────────────────────────────────────────────────────────────────

pub(crate) struct LsCommand;

impl Builtin for LsCommand {
    fn name(&self) -> &str {
        "ls"
    }

    fn usage(&self) -> &str {
        "Usage: ls [DIR]\nShow contents of DIR (default is current directory)"
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let Some(words) = split_words(args, ctx.streams)? else {
            return Ok(Flow::Continue);
        };
        let dir = match words.as_slice() {
            [] => ctx.session.cwd().to_path_buf(),
            [one] => ctx.session.resolve_path(one),
            more => {
                ctx.streams.report_error(format!(
                    "expected 0 or 1 argument, found {}",
                    more.len()
                ))?;
                return Ok(Flow::Continue);
            }
        };

        if !dir.exists() {
            ctx.streams.report_error("no such file or directory")?;
            return Ok(Flow::Continue);
        }
        if !dir.is_dir() {
            ctx.streams.report_error("not a directory")?;
            return Ok(Flow::Continue);
        }

        let mut entries = match fs::read_dir(&dir).and_then(|it| it.collect::<io::Result<Vec<_>>>()) {
            Ok(entries) => entries,
            Err(e) => {
                ctx.streams.report_error(e)?;
                return Ok(Flow::Continue);
            }
        };
        entries.sort_by_key(|e| e.file_name());

        let colored = ctx.session.colored();
        let out = &mut ctx.streams.output;
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !colored {
                writeln!(out, "{name}")?;
                continue;
            }
            match EntryKind::of(&entry.path()) {
                EntryKind::Dir => writeln!(out, "{}", name.blue())?,
                EntryKind::Symlink => writeln!(out, "{}", name.cyan())?,
                EntryKind::Executable => writeln!(out, "{}", name.green())?,
                EntryKind::Plain => writeln!(out, "{name}")?,
            }
        }
        Ok(Flow::Continue)
    }
}

enum EntryKind {
    Dir,
    Symlink,
    Executable,
    Plain,
}

impl EntryKind {
    fn of(path: &Path) -> Self {
        let Ok(meta) = fs::symlink_metadata(path) else {
            return Self::Plain;
        };
        if meta.file_type().is_symlink() {
            Self::Symlink
        } else if meta.is_dir() {
            Self::Dir
        } else if is_executable(&meta) {
            Self::Executable
        } else {
            Self::Plain
        }
    }
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    false
}

// ── mkdir ────────────────────────────────────────────────────────────────

pub(crate) struct MkdirCommand;

impl Builtin for MkdirCommand {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn usage(&self) -> &str {
        "Usage: mkdir <DIR>\nCreate directory DIR (if it does not exist)."
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let Some(paths) = resolved(args, 1, ctx)? else {
            return Ok(Flow::Continue);
        };
        let dir = &paths[0];
        if dir.exists() {
            ctx.streams.report_error("file or directory exists")?;
            return Ok(Flow::Continue);
        }
        report(fs::create_dir(dir), ctx)
    }
}

// ── mv ───────────────────────────────────────────────────────────────────

pub(crate) struct MvCommand;

impl Builtin for MvCommand {
    fn name(&self) -> &str {
        "mv"
    }

    fn usage(&self) -> &str {
        "Usage: mv <SRC> <DST>\nMove file SRC to path DST (file or directory)."
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let Some(paths) = resolved(args, 2, ctx)? else {
            return Ok(Flow::Continue);
        };
        let Ok([src, dst]) = <[PathBuf; 2]>::try_from(paths) else {
            return Ok(Flow::Continue);
        };
        if !check_source(&src, ctx)? {
            return Ok(Flow::Continue);
        }
        let dst = destination(&src, dst);
        report(move_file(&src, &dst), ctx)
    }
}

fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_preserving_mtime(src, dst)?;
            fs::remove_file(src)
        }
        other => other,
    }
}

// ── pwd ──────────────────────────────────────────────────────────────────

pub(crate) struct PwdCommand;

impl Builtin for PwdCommand {
    fn name(&self) -> &str {
        "pwd"
    }

    fn usage(&self) -> &str {
        "Print path to the current directory"
    }

    fn execute(&self, _args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        writeln!(ctx.streams.output, "{}", ctx.session.cwd().display())?;
        Ok(Flow::Continue)
    }
}

// ── rm ───────────────────────────────────────────────────────────────────

pub(crate) struct RmCommand;

impl Builtin for RmCommand {
    fn name(&self) -> &str {
        "rm"
    }

    fn usage(&self) -> &str {
        "Usage: rm <FILE>\nRemove file FILE."
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let Some(paths) = resolved(args, 1, ctx)? else {
            return Ok(Flow::Continue);
        };
        let file = &paths[0];
        if !file.exists() {
            ctx.streams.report_error("no such file or directory")?;
            return Ok(Flow::Continue);
        }
        if !file.is_file() {
            ctx.streams.report_error("not a file")?;
            return Ok(Flow::Continue);
        }
        report(fs::remove_file(file), ctx)
    }
}

// ── rmdir ────────────────────────────────────────────────────────────────

pub(crate) struct RmdirCommand;

impl Builtin for RmdirCommand {
    fn name(&self) -> &str {
        "rmdir"
    }

    fn usage(&self) -> &str {
        "Usage: rmdir <DIR>\nRemove directory DIR (if it is empty)."
    }

    fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> Result<Flow, PluginError> {
        let Some(paths) = resolved(args, 1, ctx)? else {
            return Ok(Flow::Continue);
        };
        let dir = &paths[0];
        if !dir.exists() {
            ctx.streams.report_error("no such file or directory")?;
            return Ok(Flow::Continue);
        }
        if !dir.is_dir() {
            ctx.streams.report_error("not a directory")?;
            return Ok(Flow::Continue);
        }
        let has_entries = fs::read_dir(dir).map(|mut it| it.next().is_some());
        match has_entries {
            Ok(true) => {
                ctx.streams.report_error("directory is not empty")?;
                Ok(Flow::Continue)
            }
            Ok(false) => report(fs::remove_dir(dir), ctx),
            Err(e) => report(Err(e), ctx),
        }
    }
}
