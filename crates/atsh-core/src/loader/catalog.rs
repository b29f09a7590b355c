use std::collections::HashMap;

use atsh_plugin::{CommandPlugin, LoadError, PluginFactory, PluginLoader, PluginRoot};
use tracing::debug;

/// Loader backed by constructors compiled into the binary.
///
/// Each namespace maps command names to factories. A reload re-runs the
/// factory, so it yields a fresh instance but the same code; picking up
/// edits needs a rebuild.
#[derive(Default)]
pub struct CatalogLoader {
    namespaces: HashMap<String, HashMap<String, PluginFactory>>,
}

impl CatalogLoader {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `entries` under `namespace`, merging with earlier entries.
    pub fn with_namespace<I, S>(mut self, namespace: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, PluginFactory)>,
        S: Into<String>,
    {
        let table = self.namespaces.entry(namespace.to_string()).or_default();
        table.extend(entries.into_iter().map(|(name, f)| (name.into(), f)));
        self
    }

    /// Names published under `namespace`, sorted.
    pub fn names(&self, namespace: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .namespaces
            .get(namespace)
            .map(|t| t.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }
}

impl PluginLoader for CatalogLoader {
    fn load(
        &self,
        name: &str,
        root: Option<&PluginRoot>,
    ) -> Result<Box<dyn CommandPlugin>, LoadError> {
        let Some(root) = root else {
            return Err(LoadError::Unconfigured);
        };
        let factory = self
            .namespaces
            .get(root.as_str())
            .and_then(|table| table.get(name))
            .ok_or_else(|| LoadError::not_found(name, root))?;

        let plugin = factory();
        if plugin.name() != name {
            return Err(LoadError::malformed(
                name,
                format!("constructor produced command '{}'", plugin.name()),
            ));
        }
        debug!(command = %name, root = %root, "instantiated compiled-in command");
        Ok(plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled() -> CatalogLoader {
        CatalogLoader::new().with_namespace(atsh_bin::NAMESPACE, atsh_bin::catalog())
    }

    #[test]
    fn loads_bundled_commands() {
        let loader = bundled();
        let root = PluginRoot::parse("bin").unwrap();
        assert_eq!(loader.names("bin"), vec!["touch", "yes"]);
        let yes = loader.load("yes", Some(&root)).ok().unwrap();
        assert_eq!(yes.name(), "yes");
        assert!(yes.description().is_some());
    }

    #[test]
    fn other_namespace_is_not_found() {
        let loader = bundled();
        let root = PluginRoot::parse("tools").unwrap();
        let err = loader.load("yes", Some(&root)).err().unwrap();
        assert_eq!(err.to_string(), "no command 'yes' under plugin root 'tools'");
    }

    #[test]
    fn unknown_name_is_not_found() {
        let root = PluginRoot::parse("bin").unwrap();
        let err = bundled().load("nope", Some(&root)).err().unwrap();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn missing_root_is_unconfigured() {
        let err = bundled().load("yes", None).err().unwrap();
        assert!(matches!(err, LoadError::Unconfigured));
    }

    #[test]
    fn mismatched_constructor_is_malformed() {
        let loader = CatalogLoader::new().with_namespace(
            "bin",
            [("alias", atsh_bin::yes::factory as PluginFactory)],
        );
        let root = PluginRoot::parse("bin").unwrap();
        let err = loader.load("alias", Some(&root)).err().unwrap();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }
}
