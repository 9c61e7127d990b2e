//! Application bootstrap.
//!
//! [`Application`] builds the single settings tree, module registry and
//! resolver of a process and injects them into each other. Nothing is global:
//! whatever serves requests holds the application and calls
//! [`Application::route`] once per request.
//!
//! The application is itself a subject (`core_core_*`). Code that has no
//! subject of its own announces process-wide events through
//! [`Application::raise`].

use crate::{
    artifacts::ArtifactLoader,
    collab::Database,
    config::ConfigTree,
    hooks::{HookRegistry, Hookable},
    modules::ModuleRegistry,
    routing::Resolver,
};
use std::sync::Arc;
use sulfide_core::{Arg, ConfigError, DispatchError, HookError, ModuleError, Reply, Response};

/// The wired request-dispatch core.
#[derive(Debug)]
pub struct Application {
    config: Arc<ConfigTree>,
    modules: Arc<ModuleRegistry>,
    resolver: Resolver,
    database: Option<Arc<Database>>,
    hooks: Arc<HookRegistry>,
}

impl Application {
    /// Wire the core around `config` and `loader`.
    pub fn new(config: ConfigTree, loader: impl ArtifactLoader + 'static) -> Self {
        let config = Arc::new(config);
        let loader: Arc<dyn ArtifactLoader> = Arc::new(loader);
        let modules = Arc::new(ModuleRegistry::new(config.clone(), loader.clone()));
        let resolver = Resolver::new(config.clone(), modules.clone(), loader);
        Self {
            config,
            modules,
            resolver,
            database: None,
            hooks: HookRegistry::new("core", "core"),
        }
    }

    /// Wire the core around the bundled default settings.
    pub fn with_defaults(loader: impl ArtifactLoader + 'static) -> Result<Self, ConfigError> {
        Ok(Self::new(ConfigTree::defaults()?, loader))
    }

    /// Also hook boot modules to `database`.
    pub fn with_database(mut self, database: Arc<Database>) -> Self {
        self.database = Some(database);
        self
    }

    /// The settings tree.
    pub fn config(&self) -> &Arc<ConfigTree> {
        &self.config
    }

    /// The module registry.
    pub fn modules(&self) -> &Arc<ModuleRegistry> {
        &self.modules
    }

    /// The resolver.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// The database handle, if one was supplied.
    pub fn database(&self) -> Option<&Arc<Database>> {
        self.database.as_ref()
    }

    /// Emit `event` through the application's own subject.
    pub fn raise(&self, event: &str, args: &[Arg<'_>]) -> Result<(), HookError> {
        self.hooks.emit(event, args)
    }

    /// Like [`Application::raise`], collecting one reply per subscriber.
    pub fn raise_collect(
        &self,
        event: &str,
        args: &[Arg<'_>],
    ) -> Result<Vec<Option<Reply>>, HookError> {
        self.hooks.collect(event, args)
    }

    /// Load every module listed in `boot.modules` and hook it to the
    /// process-wide subjects: the application, the database if any, the
    /// resolver and the module registry.
    pub fn boot(&self) -> Result<(), ModuleError> {
        let names = self.boot_modules()?;
        for name in &names {
            self.modules.load(name)?;
            for subject in self.subjects() {
                self.modules.hook(name, subject)?;
            }
        }
        tracing::info!(modules = ?names, "application booted");
        Ok(())
    }

    fn boot_modules(&self) -> Result<Vec<String>, ConfigError> {
        if !self.config.exists(&["boot", "modules"]) {
            return Ok(Vec::new());
        }
        self.config.get_as(&["boot", "modules"])
    }

    fn subjects(&self) -> Vec<&HookRegistry> {
        let mut subjects: Vec<&HookRegistry> = vec![&*self.hooks];
        if let Some(database) = &self.database {
            subjects.push(database.hooks());
        }
        subjects.push(self.resolver.hooks());
        subjects.push(self.modules.hooks());
        subjects
    }

    /// Handle one request.
    pub fn route(&self, path: &str) -> Result<Response, DispatchError> {
        self.resolver.route(path)
    }
}

impl Hookable for Application {
    fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifacts::Catalog,
        modules::{EVENT_LOGGER, EventLogger},
    };
    use toml::Value;

    fn app() -> Application {
        let catalog = EventLogger::register(Catalog::new(), "modules");
        let app = Application::with_defaults(catalog).unwrap();
        app.config()
            .add(
                Value::Array(vec![Value::String(EVENT_LOGGER.into())]),
                &["boot", "modules"],
            )
            .unwrap();
        app
    }

    #[test]
    fn test_boot_loads_and_hooks_modules() {
        let app = app();
        app.boot().unwrap();

        assert!(app.modules().contains(EVENT_LOGGER));
        assert!(app.hooks().contains(EVENT_LOGGER));
        assert!(app.resolver().hooks().contains(EVENT_LOGGER));
        assert!(app.modules().hooks().contains(EVENT_LOGGER));
        assert_eq!(app.modules().links(EVENT_LOGGER).len(), 3);
    }

    #[test]
    fn test_raise_reaches_boot_modules() {
        let app = app();
        app.boot().unwrap();
        app.raise("started", &[Arg::Text("worker-1")]).unwrap();

        let logger = app.modules().get_as::<EventLogger>(EVENT_LOGGER).unwrap();
        let record = logger.records().pop().unwrap();
        assert_eq!(record.method, "core_core_started");
        assert_eq!(record.args, vec![r#"Text("worker-1")"#.to_string()]);
        assert_eq!(app.raise_collect("started", &[]).unwrap().len(), 1);
    }

    #[test]
    fn test_route_through_application() {
        let app = app();
        app.boot().unwrap();

        let response = app.route("/EventLogger/view").unwrap();
        assert!(response.body().contains("core_routing_requested"));
        assert!(app.route("/nothing").unwrap().is_routing_failure());
    }

    #[test]
    fn test_boot_without_modules() {
        let app = Application::with_defaults(Catalog::new()).unwrap();
        app.boot().unwrap();
        assert!(app.modules().names().is_empty());
    }
}
