//! Handler and module artifacts.
//!
//! The registry and the resolver never construct handlers or modules directly.
//! They compute an artifact path from the directory conventions below and ask
//! an [`ArtifactLoader`] what that path defines.
//!
//! | artifact                 | path                                        |
//! |--------------------------|---------------------------------------------|
//! | module entry             | `<paths.modules>/<name>/module-entry`       |
//! | module configuration     | `<paths.modules>/<name>/config`             |
//! | handler                  | `<routing.handler_dir>/<handler>/<Type>`    |
//! | module-owned handler     | `<paths.modules>/<module>/<Type>`           |
//!
//! where `<Type>` is [`handler_type_name`] of the handler.
//!
//! [`Catalog`] is the bundled loader: an in-memory map that can also be filled
//! from link-time [`ArtifactRegistration`]s.

use crate::routing::Handler;
use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};
use sulfide_core::{ConfigError, Module};
use toml::Table;

/// Builds a fresh handler instance.
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// Builds a module instance.
pub type ModuleFactory = Arc<dyn Fn() -> Arc<dyn Module> + Send + Sync>;

/// One named thing an artifact defines.
#[derive(Clone)]
pub enum Definition {
    /// A handler type.
    Handler {
        /// The type name (`BlogHandler`).
        name: String,
        /// Constructor.
        factory: HandlerFactory,
    },
    /// A module type.
    Module {
        /// The type name, which must equal the module name.
        name: String,
        /// Constructor.
        factory: ModuleFactory,
    },
    /// Module-local configuration.
    Settings(Table),
}

impl Definition {
    /// The defined type name; `None` for settings.
    pub fn name(&self) -> Option<&str> {
        match self {
            Definition::Handler { name, .. } | Definition::Module { name, .. } => Some(name),
            Definition::Settings(_) => None,
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Handler { name, .. } => f.debug_tuple("Handler").field(name).finish(),
            Definition::Module { name, .. } => f.debug_tuple("Module").field(name).finish(),
            Definition::Settings(t) => f.debug_tuple("Settings").field(t).finish(),
        }
    }
}

/// Looks up artifacts by path.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used to look up artifacts",
    label = "missing `ArtifactLoader` implementation",
    note = "Use `Catalog` or implement `exists` and `load` for your loader."
)]
pub trait ArtifactLoader: Send + Sync {
    /// Whether an artifact exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Everything the artifact at `path` defines. Missing artifacts define nothing.
    fn load(&self, path: &Path) -> Vec<Definition>;
}

impl<L: ArtifactLoader + ?Sized> ArtifactLoader for Arc<L> {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn load(&self, path: &Path) -> Vec<Definition> {
        (**self).load(path)
    }
}

/// Upper-case the first character.
pub(crate) fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The type name a handler artifact must define: `blog` → `BlogHandler`.
pub fn handler_type_name(handler: &str) -> String {
    format!("{}Handler", ucfirst(handler))
}

/// `<modules_dir>/<name>/module-entry`
pub fn module_entry_path(modules_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    modules_dir.as_ref().join(name).join("module-entry")
}

/// `<modules_dir>/<name>/config`
pub fn module_config_path(modules_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    modules_dir.as_ref().join(name).join("config")
}

/// `<handler_dir>/<handler>/<Handler>Handler`
pub fn handler_path(handler_dir: impl AsRef<Path>, handler: &str) -> PathBuf {
    handler_dir
        .as_ref()
        .join(handler)
        .join(handler_type_name(handler))
}

/// `<modules_dir>/<module>/<Handler>Handler`
pub fn module_handler_path(modules_dir: impl AsRef<Path>, module: &str, handler: &str) -> PathBuf {
    modules_dir
        .as_ref()
        .join(module)
        .join(handler_type_name(handler))
}

/// A link-time artifact registration, gathered by [`Catalog::collected`].
///
/// ```rust,ignore
/// inventory::submit! {
///     ArtifactRegistration::handler("pages/home/HomeHandler", "HomeHandler", || Box::new(Home))
/// }
/// ```
pub struct ArtifactRegistration {
    path: &'static str,
    kind: Registered,
}

enum Registered {
    Handler(&'static str, fn() -> Box<dyn Handler>),
    Module(&'static str, fn() -> Arc<dyn Module>),
}

impl ArtifactRegistration {
    /// Register a handler type at `path`.
    pub const fn handler(
        path: &'static str,
        name: &'static str,
        factory: fn() -> Box<dyn Handler>,
    ) -> Self {
        Self {
            path,
            kind: Registered::Handler(name, factory),
        }
    }

    /// Register a module type at `path`.
    pub const fn module(
        path: &'static str,
        name: &'static str,
        factory: fn() -> Arc<dyn Module>,
    ) -> Self {
        Self {
            path,
            kind: Registered::Module(name, factory),
        }
    }

    /// The artifact path.
    pub fn path(&self) -> &'static str {
        self.path
    }

    fn definition(&self) -> Definition {
        match self.kind {
            Registered::Handler(name, factory) => Definition::Handler {
                name: name.to_owned(),
                factory: Arc::new(factory),
            },
            Registered::Module(name, factory) => Definition::Module {
                name: name.to_owned(),
                factory: Arc::new(factory),
            },
        }
    }
}

inventory::collect!(ArtifactRegistration);

/// An in-memory artifact loader.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    artifacts: HashMap<PathBuf, Vec<Definition>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog from every [`ArtifactRegistration`] linked into the binary.
    pub fn collected() -> Self {
        let mut catalog = Self::new();
        for registration in inventory::iter::<ArtifactRegistration> {
            catalog.insert(registration.path, registration.definition());
        }
        tracing::debug!(artifacts = catalog.len(), "collected artifact registrations");
        catalog
    }

    /// Add a definition to the artifact at `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, definition: Definition) {
        self.artifacts.entry(path.into()).or_default().push(definition);
    }

    /// Define a handler type at `path`.
    pub fn handler<H, F>(mut self, path: impl Into<PathBuf>, name: &str, factory: F) -> Self
    where
        H: Handler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.insert(
            path,
            Definition::Handler {
                name: name.to_owned(),
                factory: Arc::new(move || Box::new(factory()) as Box<dyn Handler>),
            },
        );
        self
    }

    /// Define a module type at `path`.
    pub fn module<M, F>(mut self, path: impl Into<PathBuf>, name: &str, factory: F) -> Self
    where
        M: Module,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.insert(
            path,
            Definition::Module {
                name: name.to_owned(),
                factory: Arc::new(move || Arc::new(factory()) as Arc<dyn Module>),
            },
        );
        self
    }

    /// Define module-local settings at `path`.
    pub fn settings(mut self, path: impl Into<PathBuf>, settings: Table) -> Self {
        self.insert(path, Definition::Settings(settings));
        self
    }

    /// Define module-local settings at `path`, read from a TOML file.
    pub fn settings_file(
        self,
        path: impl Into<PathBuf>,
        file: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let file = file.as_ref();
        let source = std::fs::read_to_string(file).map_err(|source| ConfigError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let settings: Table = toml::from_str(&source)?;
        Ok(self.settings(path, settings))
    }

    /// Number of artifact paths.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactLoader for Catalog {
    fn exists(&self, path: &Path) -> bool {
        self.artifacts.contains_key(path)
    }

    fn load(&self, path: &Path) -> Vec<Definition> {
        self.artifacts.get(path).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingModule;
    use std::io::Write;

    #[test]
    fn test_conventions() {
        assert_eq!(handler_type_name("blog"), "BlogHandler");
        assert_eq!(handler_type_name("view"), "ViewHandler");
        assert_eq!(
            handler_path("pages", "blog"),
            PathBuf::from("pages/blog/BlogHandler")
        );
        assert_eq!(
            module_handler_path("modules", "EventLogger", "view"),
            PathBuf::from("modules/EventLogger/ViewHandler")
        );
        assert_eq!(
            module_entry_path("modules", "audit"),
            PathBuf::from("modules/audit/module-entry")
        );
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = Catalog::new().module("modules/audit/module-entry", "audit", || {
            RecordingModule::unshared("audit")
        });

        let path = module_entry_path("modules", "audit");
        assert!(catalog.exists(&path));
        let defs = catalog.load(&path);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name(), Some("audit"));

        let missing = module_entry_path("modules", "ghost");
        assert!(!catalog.exists(&missing));
        assert!(catalog.load(&missing).is_empty());
    }

    #[test]
    fn test_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "level = \"debug\"").unwrap();

        let catalog = Catalog::new()
            .settings_file("modules/audit/config", file.path())
            .unwrap();
        match catalog.load(Path::new("modules/audit/config")).as_slice() {
            [Definition::Settings(t)] => assert_eq!(t["level"].as_str(), Some("debug")),
            other => panic!("unexpected definitions: {other:?}"),
        }
    }
}
