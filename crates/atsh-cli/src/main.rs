//! `atsh` -- the AT Shell.
//!
//! A minimal interactive shell with file built-ins and commands that are
//! loaded on first use from a plugin namespace (`bin` by default) and can
//! be reloaded or unloaded at runtime.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::Context;
use atsh_core::config::load_config;
use atsh_core::{CatalogLoader, ChainLoader, DirectoryLoader, Shell, ShellConfig, ShellSession};
use atsh_plugin::{Interrupt, Streams};
use clap::Parser;
use tracing::{debug, warn};

/// AT Shell: a minimal shell with dynamically loaded commands.
#[derive(Parser, Debug)]
#[command(name = "atsh", about = "AT Shell: a minimal shell with dynamically loaded commands", version)]
struct Cli {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Plugin namespace searched for unknown commands (e.g. `bin`).
    #[arg(long, value_name = "NS", conflicts_with = "no_plugins")]
    plugin_root: Option<String>,

    /// Disable dynamic command loading.
    #[arg(long)]
    no_plugins: bool,

    /// Extra directory holding manifest plugins (repeatable, searched first).
    #[arg(long, value_name = "DIR")]
    plugin_dir: Vec<String>,

    /// Disable colored prompt, listings and errors.
    #[arg(long)]
    no_color: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    fn apply(&self, mut config: ShellConfig) -> ShellConfig {
        if self.no_plugins {
            config.plugin_root = None;
        } else if let Some(root) = &self.plugin_root {
            config.plugin_root = Some(root.clone());
        }
        if !self.plugin_dir.is_empty() {
            let mut dirs = self.plugin_dir.clone();
            dirs.append(&mut config.plugin_dirs);
            config.plugin_dirs = dirs;
        }
        if self.no_color {
            config.colored = false;
        }
        config
    }
}

/// Loader chain: compiled-in commands first, then manifest directories.
fn build_loader(config: &ShellConfig) -> ChainLoader {
    let catalog = CatalogLoader::new().with_namespace(atsh_bin::NAMESPACE, atsh_bin::catalog());
    let dirs = config.plugin_search_dirs();
    debug!(?dirs, "manifest plugin search path");
    ChainLoader::new().with(catalog).with(DirectoryLoader::new(dirs))
}

/// Ctrl-C only raises the flag; the idle read and running commands poll it.
fn install_interrupt_handler(interrupt: Interrupt) {
    if let Err(e) = ctrlc::set_handler(move || interrupt.raise()) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = cli.apply(load_config(cli.config.as_deref())?);
    let plugin_root = config.plugin_root()?;
    let colored = config.colored && io::stderr().is_terminal();
    debug!(?plugin_root, colored, "starting shell");

    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let interrupt = Interrupt::new();
    install_interrupt_handler(interrupt.clone());

    let session = ShellSession::new(cwd, plugin_root, colored).with_interrupt(interrupt);
    let mut shell =
        Shell::new(session, build_loader(&config), Streams::stdio()).with_intro(config.intro);
    shell.run()?;
    Ok(())
}
