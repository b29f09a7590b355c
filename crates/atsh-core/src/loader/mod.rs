//! Plugin loaders.
//!
//! | Loader | Source | Reload picks up changes |
//! |--------|--------|-------------------------|
//! | [`CatalogLoader`] | constructors compiled into the binary | no (restart) |
//! | [`DirectoryLoader`] | `plugin.json` units on disk | yes |
//! | [`ChainLoader`] | the above, tried in order | per source |

mod catalog;
mod directory;

pub use catalog::CatalogLoader;
pub use directory::{DirectoryLoader, ManifestPlugin};

use atsh_plugin::{CommandPlugin, LoadError, PluginLoader, PluginRoot};
use tracing::trace;

/// Tries each loader in turn and returns the first success.
///
/// When every loader fails, the most informative error wins: a malformed
/// unit beats "not found", which beats "unconfigured".
#[derive(Default)]
pub struct ChainLoader {
    loaders: Vec<Box<dyn PluginLoader>>,
}

impl ChainLoader {
    /// Create an empty chain. An empty chain finds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a loader to the chain.
    pub fn with(mut self, loader: impl PluginLoader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Number of loaders in the chain.
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Whether the chain has no loaders.
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

fn rank(err: &LoadError) -> u8 {
    match err {
        LoadError::Unconfigured => 0,
        LoadError::NotFound { .. } => 1,
        LoadError::Malformed { .. } => 2,
    }
}

impl PluginLoader for ChainLoader {
    fn load(
        &self,
        name: &str,
        root: Option<&PluginRoot>,
    ) -> Result<Box<dyn CommandPlugin>, LoadError> {
        let Some(root) = root else {
            return Err(LoadError::Unconfigured);
        };

        let mut best = LoadError::not_found(name, root);
        for loader in &self.loaders {
            match loader.load(name, Some(root)) {
                Ok(plugin) => return Ok(plugin),
                Err(e) => {
                    trace!(command = %name, error = %e, "loader declined");
                    if rank(&e) > rank(&best) {
                        best = e;
                    }
                }
            }
        }
        Err(best)
    }
}
