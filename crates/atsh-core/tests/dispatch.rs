//! Dispatch loop scenarios run against in-memory streams.
//!
//! Every shell here is rooted in a temporary directory with coloring off,
//! so output can be compared byte for byte.

use std::cell::Cell;
use std::fs;
use std::io::{self, BufRead, Cursor, Read, Write};
use std::path::Path;
use std::rc::Rc;

use atsh_core::{CatalogLoader, DirectoryLoader, Flow, Origin, Shell, ShellError, ShellSession};
use atsh_plugin::{
    CommandPlugin, Interrupt, LoadError, PluginError, PluginLoader, PluginRoot, SharedBuffer,
    ShellHandle, Streams,
};

struct Fixture {
    shell: Shell,
    out: SharedBuffer,
    err: SharedBuffer,
    _dir: tempfile::TempDir,
}

impl Fixture {
    fn new(loader: impl PluginLoader + 'static, root: Option<&str>) -> Self {
        Self::with_input(loader, root, "")
    }

    fn with_input(loader: impl PluginLoader + 'static, root: Option<&str>, input: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let root = root.map(|r| PluginRoot::parse(r).unwrap());
        let session = ShellSession::new(dir.path(), root, false);
        let streams = Streams::new(Cursor::new(input.to_string()), out.clone(), err.clone());
        let mut shell = Shell::new(session, loader, streams);
        shell.begin().unwrap();
        Self {
            shell,
            out,
            err,
            _dir: dir,
        }
    }

    fn bundled() -> Self {
        Self::new(bundled_loader(), Some("bin"))
    }

    fn send(&mut self, line: &str) -> Flow {
        self.shell.dispatch_line(line).unwrap()
    }

    fn cwd(&self) -> &Path {
        self.shell.session().cwd()
    }

    fn prompt(&self) -> String {
        self.shell.session().prompt().to_string()
    }
}

fn bundled_loader() -> CatalogLoader {
    CatalogLoader::new().with_namespace(atsh_bin::NAMESPACE, atsh_bin::catalog())
}

// ── Test plugins ─────────────────────────────────────────────────────────

/// Echoes its raw argument text between brackets.
struct Record;

impl CommandPlugin for Record {
    fn name(&self) -> &str {
        "record"
    }

    fn execute(&self, args: &str, _: &dyn ShellHandle, streams: &mut Streams) -> Result<(), PluginError> {
        writeln!(streams.output, "[{args}]")?;
        Ok(())
    }
}

/// Always fails with an error the loop has to report.
struct Broken;

impl CommandPlugin for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn execute(&self, _: &str, _: &dyn ShellHandle, _: &mut Streams) -> Result<(), PluginError> {
        Err(io::Error::other("boom").into())
    }
}

/// Prints the version it was built with.
struct Versioned(u32);

impl CommandPlugin for Versioned {
    fn name(&self) -> &str {
        "ver"
    }

    fn description(&self) -> Option<&str> {
        Some("Print the implementation version.")
    }

    fn execute(&self, _: &str, _: &dyn ShellHandle, streams: &mut Streams) -> Result<(), PluginError> {
        writeln!(streams.output, "v{}", self.0)?;
        Ok(())
    }
}

/// Loader whose `ver` implementation changes when `version` is bumped.
#[derive(Clone, Default)]
struct VersionLoader {
    version: Rc<Cell<u32>>,
    loads: Rc<Cell<u32>>,
    gone: Rc<Cell<bool>>,
}

impl PluginLoader for VersionLoader {
    fn load(&self, name: &str, root: Option<&PluginRoot>) -> Result<Box<dyn CommandPlugin>, LoadError> {
        let root = root.ok_or(LoadError::Unconfigured)?;
        if name != "ver" || self.gone.get() {
            return Err(LoadError::not_found(name, root));
        }
        self.loads.set(self.loads.get() + 1);
        Ok(Box::new(Versioned(self.version.get())))
    }
}

fn test_catalog() -> CatalogLoader {
    fn record() -> Box<dyn CommandPlugin> {
        Box::new(Record)
    }
    fn broken() -> Box<dyn CommandPlugin> {
        Box::new(Broken)
    }
    CatalogLoader::new().with_namespace(
        "test",
        [
            ("record", record as atsh_plugin::PluginFactory),
            ("broken", broken as atsh_plugin::PluginFactory),
        ],
    )
}

/// Loader that raises the interrupt while it resolves a command.
struct InterruptingLoader {
    inner: CatalogLoader,
    interrupt: Interrupt,
}

impl PluginLoader for InterruptingLoader {
    fn load(&self, name: &str, root: Option<&PluginRoot>) -> Result<Box<dyn CommandPlugin>, LoadError> {
        self.interrupt.raise();
        self.inner.load(name, root)
    }
}

/// Input that raises the interrupt on its first read, as Ctrl-C at the
/// prompt would, and then delivers what the user types next.
struct CtrlCThenType {
    typed: Cursor<Vec<u8>>,
    interrupt: Option<Interrupt>,
}

impl Read for CtrlCThenType {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for CtrlCThenType {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if let Some(interrupt) = self.interrupt.take() {
            interrupt.raise();
        }
        self.typed.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.typed.consume(amt);
    }
}

/// Writer that raises the interrupt after a number of writes.
struct InterruptAfter {
    inner: SharedBuffer,
    remaining: Option<usize>,
    interrupt: Interrupt,
}

impl Write for InterruptAfter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.remaining {
            Some(0) => {
                self.interrupt.raise();
                self.remaining = None;
            }
            Some(n) => self.remaining = Some(n - 1),
            None => {}
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

#[test]
fn unknown_command_with_loading_unconfigured() {
    let mut f = Fixture::new(bundled_loader(), None);
    assert_eq!(f.send("frobnicate --now"), Flow::Continue);
    assert_eq!(f.err.contents(), "Error: command 'frobnicate' not found\n");
    assert_eq!(f.out.contents(), "");
}

#[test]
fn unknown_command_under_configured_root() {
    let mut f = Fixture::bundled();
    f.send("frobnicate");
    assert_eq!(f.err.contents(), "Error: command 'frobnicate' not found\n");
    assert!(!f.shell.registry().contains("frobnicate"));
}

#[test]
fn argument_text_reaches_plugin_unchanged() {
    let mut f = Fixture::new(test_catalog(), Some("test"));
    f.send(r#"record  a 'b  c' "d" \e "#);
    assert_eq!(f.out.contents(), "[a 'b  c' \"d\" \\e]\n");
    assert_eq!(f.err.contents(), "");
    assert_eq!(f.shell.registry().origin("record"), Some(Origin::Dynamic));
}

#[test]
fn plugin_error_is_reported_by_loop() {
    let mut f = Fixture::new(test_catalog(), Some("test"));
    assert_eq!(f.send("broken"), Flow::Continue);
    assert_eq!(f.err.contents(), "Error: boom\n");
}

#[test]
fn blank_line_is_silent() {
    let mut f = Fixture::bundled();
    assert_eq!(f.send(""), Flow::Continue);
    assert_eq!(f.send("   "), Flow::Continue);
    assert_eq!(f.out.contents(), "");
    assert_eq!(f.err.contents(), "");
}

#[test]
fn eof_token_exits() {
    let mut f = Fixture::bundled();
    assert_eq!(f.send("EOF"), Flow::Exit);
}

// ── Reload and unload ────────────────────────────────────────────────────

#[test]
fn reload_uses_new_implementation() {
    let loader = VersionLoader::default();
    loader.version.set(1);
    let mut f = Fixture::new(loader.clone(), Some("bin"));

    f.send("ver");
    loader.version.set(2);
    f.send("ver");
    f.send("load ver");
    f.send("ver");

    assert_eq!(f.out.contents(), "v1\nv1\nv2\n");
    assert_eq!(f.err.contents(), "");
    assert_eq!(f.shell.registry().origin("ver"), Some(Origin::Dynamic));

    f.out.clear();
    f.send("help ver");
    assert_eq!(f.out.contents(), "Print the implementation version.\n");
}

#[test]
fn reload_of_vanished_unit_purges_it() {
    let loader = VersionLoader::default();
    let mut f = Fixture::new(loader.clone(), Some("bin"));
    f.send("ver");
    assert!(f.shell.registry().contains("ver"));

    loader.gone.set(true);
    f.send("load ver");
    assert_eq!(f.err.contents(), "Error: command 'ver' not found\n");
    assert!(!f.shell.registry().contains("ver"));

    f.err.clear();
    f.send("ver");
    assert_eq!(f.err.contents(), "Error: command 'ver' not found\n");
}

#[test]
fn unloading_exit_is_refused() {
    let mut f = Fixture::bundled();
    f.send("unload exit");
    assert_eq!(f.err.contents(), "Error: internal command 'exit' cannot be unloaded\n");
    assert_eq!(f.send("exit"), Flow::Exit);
}

#[test]
fn unload_then_use_loads_again() {
    let loader = VersionLoader::default();
    let mut f = Fixture::new(loader.clone(), Some("bin"));

    f.send("ver");
    f.send("unload ver");
    assert!(!f.shell.registry().contains("ver"));
    f.send("ver");

    assert_eq!(loader.loads.get(), 2);
    assert_eq!(f.out.contents(), "v0\nv0\n");
    assert_eq!(f.err.contents(), "");
}

// ── Bundled commands ─────────────────────────────────────────────────────

#[test]
fn yes_runs_until_interrupted_and_shell_survives() {
    let dir = tempfile::tempdir().unwrap();
    let interrupt = Interrupt::new();
    let out = SharedBuffer::new();
    let err = SharedBuffer::new();
    let writer = InterruptAfter {
        inner: out.clone(),
        remaining: Some(50),
        interrupt: interrupt.clone(),
    };
    let session = ShellSession::new(dir.path(), PluginRoot::parse("bin").ok(), false)
        .with_interrupt(interrupt.clone());
    let streams = Streams::new(io::empty(), writer, err.clone());
    let mut shell = Shell::new(session, bundled_loader(), streams);
    shell.begin().unwrap();

    assert_eq!(shell.dispatch_line("yes hi").unwrap(), Flow::Continue);
    assert!(!interrupt.is_raised());

    let text = out.contents();
    let body = text.strip_suffix("^C\n").unwrap();
    assert!(!body.is_empty());
    assert!(body.lines().all(|l| l == "hi"), "unexpected output: {body:?}");
    assert_eq!(err.contents(), "");

    out.clear();
    shell.dispatch_line("echo still here").unwrap();
    assert_eq!(out.contents(), "still here\n");
}

#[test]
fn touch_twice_is_idempotent() {
    let mut f = Fixture::bundled();
    let file = f.cwd().join("newfile.txt");

    f.send("touch newfile.txt");
    assert!(file.is_file());
    let first = fs::metadata(&file).unwrap().modified().unwrap();

    f.send("touch newfile.txt");
    let second = fs::metadata(&file).unwrap().modified().unwrap();
    assert!(second >= first);
    assert_eq!(fs::read(&file).unwrap(), b"");
    assert_eq!(f.out.contents(), "");
    assert_eq!(f.err.contents(), "");
}

#[test]
fn touch_follows_cd() {
    let mut f = Fixture::bundled();
    f.send("mkdir 'sub dir'");
    f.send("cd 'sub dir'");
    f.send("touch \"a b.txt\"");
    assert!(f.cwd().ends_with("sub dir"));
    assert!(f.cwd().join("a b.txt").is_file());
    assert_eq!(f.err.contents(), "");
}

// ── Full loop ────────────────────────────────────────────────────────────

#[test]
fn loop_exits_on_end_of_input() {
    let mut f = Fixture::with_input(bundled_loader(), Some("bin"), "");
    f.shell.run().unwrap();
    assert_eq!(f.out.contents(), f.prompt());
    assert_eq!(f.err.contents(), "");
}

#[test]
fn loop_ignores_blank_lines_and_stops_at_exit() {
    let mut f = Fixture::with_input(bundled_loader(), Some("bin"), "\n   \nexit\necho unreachable\n");
    f.shell.run().unwrap();
    assert_eq!(f.out.contents(), f.prompt().repeat(3));
}

#[test]
fn loop_prints_intro_and_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = SharedBuffer::new();
    let session = ShellSession::new(dir.path(), None, false);
    let prompt = session.prompt().to_string();
    let streams = Streams::new(Cursor::new("echo hi\n"), out.clone(), io::sink());
    let mut shell =
        Shell::new(session, bundled_loader(), streams).with_intro(Some("Welcome!".into()));

    shell.run().unwrap();
    assert_eq!(out.contents(), format!("Welcome!\n{prompt}hi\n{prompt}"));
}

#[test]
fn interrupt_while_idle_reprompts_and_keeps_next_line() {
    let mut f = Fixture::with_input(bundled_loader(), Some("bin"), "echo hi\n");
    f.shell.interrupt().raise();
    f.shell.run().unwrap();
    let prompt = f.prompt();
    assert_eq!(f.out.contents(), format!("{prompt}^C\n{prompt}hi\n{prompt}"));
    assert_eq!(f.err.contents(), "");
}

#[test]
fn ctrl_c_during_read_does_not_eat_typed_line() {
    let dir = tempfile::tempdir().unwrap();
    let interrupt = Interrupt::new();
    let out = SharedBuffer::new();
    let err = SharedBuffer::new();
    let session = ShellSession::new(dir.path(), None, false).with_interrupt(interrupt.clone());
    let prompt = session.prompt().to_string();
    let input = CtrlCThenType {
        typed: Cursor::new(b"echo typed after ctrl-c\n".to_vec()),
        interrupt: Some(interrupt.clone()),
    };
    let streams = Streams::new(input, out.clone(), err.clone());
    let mut shell = Shell::new(session, bundled_loader(), streams);

    shell.run().unwrap();
    assert_eq!(
        out.contents(),
        format!("{prompt}^C\n{prompt}typed after ctrl-c\n{prompt}")
    );
    assert_eq!(err.contents(), "");
    assert!(!interrupt.is_raised());
}

#[test]
fn interrupt_while_resolving_skips_execution() {
    let dir = tempfile::tempdir().unwrap();
    let interrupt = Interrupt::new();
    let out = SharedBuffer::new();
    let err = SharedBuffer::new();
    let loader = InterruptingLoader {
        inner: test_catalog(),
        interrupt: interrupt.clone(),
    };
    let session = ShellSession::new(dir.path(), PluginRoot::parse("test").ok(), false)
        .with_interrupt(interrupt.clone());
    let streams = Streams::new(io::empty(), out.clone(), err.clone());
    let mut shell = Shell::new(session, loader, streams);
    shell.begin().unwrap();

    assert_eq!(shell.dispatch_line("record never shown").unwrap(), Flow::Continue);
    assert_eq!(out.contents(), "^C\n");
    assert_eq!(err.contents(), "");
    assert!(!interrupt.is_raised());
    assert!(shell.registry().contains("record"));

    // Already registered, so the next turn runs without consulting the loader.
    assert_eq!(shell.dispatch_line("record again").unwrap(), Flow::Continue);
    assert_eq!(out.contents(), "^C\n[again]\n");
}

#[test]
fn loop_skips_unparsable_line() {
    let mut f = Fixture::with_input(bundled_loader(), Some("bin"), "'unterminated\nexit\n");
    f.shell.run().unwrap();
    assert_eq!(f.out.contents(), f.prompt().repeat(2));
    assert_eq!(f.err.contents(), "");
}

#[test]
fn streams_are_consumed_by_run() {
    let mut f = Fixture::with_input(bundled_loader(), Some("bin"), "exit\n");
    f.shell.run().unwrap();
    assert!(matches!(f.shell.run(), Err(ShellError::StreamsUnavailable)));
}

#[test]
fn colored_error_stream() {
    let dir = tempfile::tempdir().unwrap();
    let err = SharedBuffer::new();
    let session = ShellSession::new(dir.path(), None, true);
    let streams = Streams::new(io::empty(), io::sink(), err.clone());
    let mut shell = Shell::new(session, bundled_loader(), streams);
    shell.begin().unwrap();

    shell.dispatch_line("nope").unwrap();
    let text = err.contents();
    assert!(text.starts_with('\u{1b}'));
    assert!(text.contains("Error: command 'nope' not found\n"));
}

// ── Manifest plugins ─────────────────────────────────────────────────────

#[cfg(unix)]
mod manifest {
    use super::*;

    fn write_manifest(base: &Path, greeting: &str) {
        let unit = base.join("bin").join("greet");
        fs::create_dir_all(&unit).unwrap();
        fs::write(
            unit.join("plugin.json"),
            format!(
                r#"{{"name":"greet","description":"Say {greeting}.","exec":{{"program":"echo","args":["{greeting}"]}}}}"#
            ),
        )
        .unwrap();
    }

    #[test]
    fn reload_and_purge_from_disk() {
        let plugins = tempfile::tempdir().unwrap();
        write_manifest(plugins.path(), "hello");
        let mut f = Fixture::new(DirectoryLoader::new([plugins.path().to_path_buf()]), Some("bin"));

        f.send("greet world");
        assert_eq!(f.out.contents(), "hello world\n");

        write_manifest(plugins.path(), "bye");
        f.send("load greet");
        f.send("greet");
        f.send("help greet");
        assert_eq!(f.out.contents(), "hello world\nbye\nSay bye.\n");

        fs::remove_dir_all(plugins.path().join("bin").join("greet")).unwrap();
        f.send("load greet");
        assert_eq!(f.err.contents(), "Error: command 'greet' not found\n");
        assert!(!f.shell.registry().contains("greet"));
    }

    #[test]
    fn malformed_reload_keeps_previous() {
        let plugins = tempfile::tempdir().unwrap();
        write_manifest(plugins.path(), "hello");
        let mut f = Fixture::new(DirectoryLoader::new([plugins.path().to_path_buf()]), Some("bin"));
        f.send("greet");

        fs::write(plugins.path().join("bin/greet/plugin.json"), "{ broken").unwrap();
        f.send("load greet");
        assert_eq!(f.err.contents(), "Error: command 'greet' not found\n");

        f.send("greet");
        assert_eq!(f.out.contents(), "hello\nhello\n");
    }
}
