//! Dynamic commands shipped with atsh.
//!
//! These commands are not built-ins: they live in the `bin` plugin
//! namespace and are only registered when first typed (or explicitly
//! `load`ed), so they can be unloaded and reloaded like any other plugin.

use atsh_plugin::PluginFactory;

pub mod touch;
pub mod yes;

/// Plugin namespace these commands are published under.
pub const NAMESPACE: &str = "bin";

/// Every bundled command with its constructor.
pub fn catalog() -> Vec<(&'static str, PluginFactory)> {
    vec![("touch", touch::factory), ("yes", yes::factory)]
}
