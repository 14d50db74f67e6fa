//! Discovery of runnable scenarios
//!
//! Modules register their scenario types explicitly at startup. A module may
//! also declare abstract bases, which are listed but never executed.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{EngineError, EngineResult, ScenarioError, ScenarioResult};
use crate::scenario::Scenario;

/// Whether a scenario type may be executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Abstract,
    Concrete,
}

type Factory = Arc<dyn Fn() -> ScenarioResult<Box<dyn Scenario>> + Send + Sync>;

/// A registered scenario type
#[derive(Clone)]
pub struct ScenarioDef {
    pub name: String,
    pub module: String,
    pub description: Option<String>,
    pub kind: ScenarioKind,
    factory: Factory,
}

impl ScenarioDef {
    /// A runnable scenario built with `T::default()`
    pub fn concrete<T>(module: &str, name: &str) -> Self
    where
        T: Scenario + Default + 'static,
    {
        Self::with_factory(module, name, || Ok(Box::new(T::default()) as Box<dyn Scenario>))
    }

    /// A runnable scenario with a fallible constructor
    pub fn with_factory<F>(module: &str, name: &str, factory: F) -> Self
    where
        F: Fn() -> ScenarioResult<Box<dyn Scenario>> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            module: module.to_string(),
            description: None,
            kind: ScenarioKind::Concrete,
            factory: Arc::new(factory),
        }
    }

    /// A base other scenarios build on; listed, never run
    pub fn abstract_base(module: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            module: module.to_string(),
            description: None,
            kind: ScenarioKind::Abstract,
            factory: Arc::new(|| -> ScenarioResult<Box<dyn Scenario>> {
                Err(ScenarioError::other("abstract scenarios cannot be instantiated"))
            }),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_concrete(&self) -> bool {
        self.kind == ScenarioKind::Concrete
    }

    pub fn is_abstract(&self) -> bool {
        self.kind == ScenarioKind::Abstract
    }

    /// Construct a fresh instance
    pub fn instantiate(&self) -> ScenarioResult<Box<dyn Scenario>> {
        (self.factory)()
    }
}

impl std::fmt::Debug for ScenarioDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioDef")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("kind", &self.kind)
            .finish()
    }
}

/// All known scenario modules, in registration order
#[derive(Default)]
pub struct ScenarioRegistry {
    modules: Vec<(String, Vec<ScenarioDef>)>,
    cache: RwLock<BTreeMap<String, Vec<ScenarioDef>>>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a module without scenarios. Requesting it afterwards yields
    /// an empty batch instead of `UnknownModule`.
    pub fn declare_module(&mut self, module: &str) {
        if !self.modules.iter().any(|(name, _)| name == module) {
            self.modules.push((module.to_string(), Vec::new()));
        }
    }

    /// Add a scenario type; a second registration under the same name
    /// replaces the first
    pub fn register(&mut self, def: ScenarioDef) {
        let module = def.module.clone();
        self.declare_module(&module);
        if let Some((_, defs)) = self.modules.iter_mut().find(|(name, _)| *name == def.module) {
            match defs.iter_mut().find(|d| d.name == def.name) {
                Some(existing) => *existing = def,
                None => defs.push(def),
            }
        }
        self.invalidate();
    }

    /// Module names in registration order
    pub fn modules(&self) -> Vec<&str> {
        self.modules.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.iter().any(|(name, _)| name == module)
    }

    /// Every registered definition of a module, abstract ones included
    pub fn definitions(&self, module: &str) -> Option<&[ScenarioDef]> {
        self.modules
            .iter()
            .find(|(name, _)| name == module)
            .map(|(_, defs)| defs.as_slice())
    }

    pub fn get(&self, module: &str, name: &str) -> Option<&ScenarioDef> {
        self.definitions(module)?.iter().find(|d| d.name == name)
    }

    /// Description of the first concrete scenario registered under `name`
    pub fn describe(&self, name: &str) -> Option<&str> {
        self.modules
            .iter()
            .flat_map(|(_, defs)| defs.iter())
            .find(|d| d.is_concrete() && d.name == name)
            .and_then(|d| d.description.as_deref())
    }

    /// Drop cached discovery results
    pub fn invalidate(&self) {
        self.cache.write().clear();
    }

    fn concrete_in(&self, module: &str) -> Vec<ScenarioDef> {
        if let Some(cached) = self.cache.read().get(module) {
            return cached.clone();
        }
        let found: Vec<ScenarioDef> = self
            .definitions(module)
            .unwrap_or_default()
            .iter()
            .filter(|d| d.is_concrete())
            .cloned()
            .collect();
        debug!("Discovered {} scenarios in {}", found.len(), module);
        self.cache.write().insert(module.to_string(), found.clone());
        found
    }

    /// Resolve a request into the concrete scenarios to run.
    ///
    /// - no module and no name: every concrete scenario of every module
    /// - module only: that module's concrete scenarios
    /// - module and name: exactly that scenario
    /// - name without module: rejected
    pub fn find_scenarios(&self, module: Option<&str>, name: Option<&str>) -> EngineResult<Vec<ScenarioDef>> {
        match (module, name) {
            (None, Some(_)) => Err(EngineError::ScenarioWithoutModule),
            (None, None) => Ok(self
                .modules
                .iter()
                .flat_map(|(module, _)| self.concrete_in(module))
                .collect()),
            (Some(module), name) => {
                if !self.has_module(module) {
                    return Err(EngineError::UnknownModule(module.to_string()));
                }
                let found = self.concrete_in(module);
                match name {
                    None => Ok(found),
                    Some(name) => {
                        let matched: Vec<ScenarioDef> = found.into_iter().filter(|d| d.name == name).collect();
                        if matched.is_empty() {
                            Err(EngineError::ScenarioNotFound {
                                module: module.to_string(),
                                name: name.to_string(),
                            })
                        } else {
                            Ok(matched)
                        }
                    }
                }
            }
        }
    }
}
