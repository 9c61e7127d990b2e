//! The process-wide module registry.

use crate::{
    artifacts::{ArtifactLoader, Definition, module_config_path, module_entry_path},
    config::ConfigTree,
    hooks::{HookRegistry, Hookable},
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::{any::Any, sync::Arc};
use sulfide_core::{Arg, ModuleError, Module, SubjectRef};
use toml::{Table, Value};

/// Emitted with the module name after a module is registered and loaded.
pub const LOADED: &str = "loaded";
/// Emitted with the module name after a module is removed.
pub const REMOVED: &str = "removed";

struct Slot {
    module: Arc<dyn Module>,
    links: Vec<SubjectRef>,
}

/// Loads modules by name and owns every loaded module.
///
/// A module name is registered at most once. The registry records which
/// subjects each module was hooked to through [`ModuleRegistry::hook`] so
/// that [`ModuleRegistry::remove`] can detach it everywhere first. Those links
/// are weak: a module never keeps a subject alive.
///
/// No internal lock is held while module code runs, so lifecycle hooks and
/// event handlers may call back into the registry.
pub struct ModuleRegistry {
    config: Arc<ConfigTree>,
    loader: Arc<dyn ArtifactLoader>,
    slots: RwLock<IndexMap<String, Slot>>,
    hooks: Arc<HookRegistry>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new(config: Arc<ConfigTree>, loader: Arc<dyn ArtifactLoader>) -> Self {
        Self {
            config,
            loader,
            slots: RwLock::new(IndexMap::new()),
            hooks: HookRegistry::new("core", "modules"),
        }
    }

    /// Load the module `name` from its entry artifact.
    ///
    /// The entry must define a module type named exactly `name` whose
    /// [`Module::name`] is also `name`. After registration, a module-local
    /// configuration artifact, if present, is merged under `modules.<name>`.
    pub fn load(&self, name: &str) -> Result<(), ModuleError> {
        let modules_dir = self.config.get_str(&["paths", "modules"])?;
        let entry = module_entry_path(&modules_dir, name);
        if !self.loader.exists(&entry) {
            return Err(ModuleError::NotFound {
                name: name.to_owned(),
            });
        }

        let factory = self
            .loader
            .load(&entry)
            .into_iter()
            .find_map(|def| match def {
                Definition::Module { name: n, factory } if n == name => Some(factory),
                _ => None,
            })
            .ok_or_else(|| ModuleError::Invalid {
                name: name.to_owned(),
                reason: format!("{} defines no module type named `{name}`", entry.display()),
            })?;

        let module = factory();
        if module.name() != name {
            return Err(ModuleError::Invalid {
                name: name.to_owned(),
                reason: format!("the module calls itself `{}`", module.name()),
            });
        }

        self.add(module)?;

        let config = module_config_path(&modules_dir, name);
        if self.loader.exists(&config) {
            let settings = self
                .loader
                .load(&config)
                .into_iter()
                .filter_map(|def| match def {
                    Definition::Settings(table) => Some(table),
                    _ => None,
                })
                .fold(Table::new(), |mut acc, table| {
                    acc.extend(table);
                    acc
                });
            self.merge_settings(name, settings)?;
        }
        Ok(())
    }

    fn merge_settings(&self, name: &str, settings: Table) -> Result<(), ModuleError> {
        let path = ["modules", name];
        let value = Value::Table(settings);
        // A reload after `remove` finds its own settings still in place.
        if self.config.exists(&path) && self.config.get(&path)? == value {
            return Ok(());
        }
        self.config.add(value, &path)?;
        tracing::debug!(module = name, "merged module configuration");
        Ok(())
    }

    /// Register an already constructed module and run its `load` hook.
    ///
    /// If `load` fails the module is unregistered again.
    pub fn add(&self, module: Arc<dyn Module>) -> Result<(), ModuleError> {
        let name = module.name().to_owned();
        {
            let mut slots = self.slots.write();
            if slots.contains_key(&name) {
                return Err(ModuleError::Duplicate { name });
            }
            slots.insert(
                name.clone(),
                Slot {
                    module: Arc::clone(&module),
                    links: Vec::new(),
                },
            );
        }

        if let Err(source) = module.load() {
            self.slots.write().shift_remove(&name);
            return Err(ModuleError::Lifecycle {
                name,
                stage: "load",
                source,
            });
        }

        tracing::info!(module = %name, "module loaded");
        self.hooks.emit(LOADED, &[Arg::Text(&name)])?;
        Ok(())
    }

    /// Detach the module from every subject, run its `unload` hook, and
    /// unregister it.
    pub fn remove(&self, name: &str) -> Result<(), ModuleError> {
        let (module, links) = {
            let slots = self.slots.read();
            let slot = slots.get(name).ok_or_else(|| ModuleError::NotFound {
                name: name.to_owned(),
            })?;
            (Arc::clone(&slot.module), slot.links.clone())
        };

        for link in links.iter().filter(|l| l.is_attached(name)) {
            link.detach(name)?;
        }

        module.unload().map_err(|source| ModuleError::Lifecycle {
            name: name.to_owned(),
            stage: "unload",
            source,
        })?;

        self.slots.write().shift_remove(name);
        tracing::info!(module = name, "module removed");
        self.hooks.emit(REMOVED, &[Arg::Text(name)])?;
        Ok(())
    }

    /// Look up a loaded module.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.slots.read().get(name).map(|s| Arc::clone(&s.module))
    }

    /// Look up a loaded module by its concrete type.
    pub fn get_as<T: Module>(&self, name: &str) -> Option<Arc<T>> {
        let module: Arc<dyn Any + Send + Sync> = self.get(name)?;
        module.downcast::<T>().ok()
    }

    /// Whether `name` is loaded.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.read().contains_key(name)
    }

    /// Loaded module names in load order.
    pub fn names(&self) -> Vec<String> {
        self.slots.read().keys().cloned().collect()
    }

    /// Hook the loaded module `name` to `subject`.
    pub fn hook(&self, name: &str, subject: &HookRegistry) -> Result<(), ModuleError> {
        let module = self.get(name).ok_or_else(|| ModuleError::NotFound {
            name: name.to_owned(),
        })?;
        subject.attach(name, module)?;

        if let Some(slot) = self.slots.write().get_mut(name) {
            if !slot.links.iter().any(|l| l.id() == subject.id()) {
                slot.links.push(subject.subject_ref());
            }
        }
        Ok(())
    }

    /// Unhook the loaded module `name` from `subject`.
    pub fn unhook(&self, name: &str, subject: &HookRegistry) -> Result<(), ModuleError> {
        if !self.contains(name) {
            return Err(ModuleError::NotFound {
                name: name.to_owned(),
            });
        }
        subject.detach(name)?;

        if let Some(slot) = self.slots.write().get_mut(name) {
            slot.links.retain(|l| l.id() != subject.id());
        }
        Ok(())
    }

    /// Subjects the module was hooked to through this registry and that are
    /// still alive.
    pub fn links(&self, name: &str) -> Vec<SubjectRef> {
        self.slots
            .read()
            .get(name)
            .map(|s| s.links.iter().filter(|l| l.is_alive()).cloned().collect())
            .unwrap_or_default()
    }
}

impl Hookable for ModuleRegistry {
    fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .field("hooks", &self.hooks)
            .finish()
    }
}
