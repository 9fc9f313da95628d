// go_flow/src/module/registry.rs

//! Defines `ModuleRegistry`, the name → `Module` table that `requires` lists
//! are resolved against, and the loading of a module into an injector.

use crate::error::{GoError, GoResult};
use crate::injector::Injector;
use crate::module::definition::Module;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, instrument, Level};

static GLOBAL_MODULES: Lazy<ModuleRegistry> = Lazy::new(ModuleRegistry::new);

/// A table of declared modules. Cloning shares the table.
///
/// Runners built with `Go::new` use the process-wide instance from
/// `ModuleRegistry::global()`; construct your own to keep module namespaces
/// apart (tests, multi-tenant hosts).
#[derive(Clone, Default)]
pub struct ModuleRegistry {
  modules: Arc<RwLock<HashMap<String, Module>>>,
}

impl ModuleRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// The process-wide registry.
  pub fn global() -> &'static ModuleRegistry {
    &GLOBAL_MODULES
  }

  /// Declares a module and returns its chainable handle.
  ///
  /// Declaring a name twice replaces the earlier descriptor; keeping module
  /// names unique is up to the caller.
  pub fn module<I, S>(&self, name: &str, requires: I) -> Module
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let module = Module::new(name, requires.into_iter().map(Into::into).collect());
    let previous = self.modules.write().insert(name.to_string(), module.clone());
    if previous.is_some() {
      event!(Level::WARN, module = %name, "Module redeclared, replacing the earlier descriptor.");
    } else {
      event!(Level::DEBUG, module = %name, "Module declared.");
    }
    module
  }

  pub fn get(&self, name: &str) -> Option<Module> {
    self.modules.read().get(name).cloned()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.modules.read().contains_key(name)
  }

  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
    names.sort();
    names
  }

  /// Applies module `name` to `injector`, loading its requirements first.
  ///
  /// A module is applied at most once per injector. Registrations already
  /// applied are not rolled back if a later requirement or config step fails.
  #[instrument(name = "ModuleRegistry::load", skip_all, fields(module = %name), err(Display))]
  pub fn load(&self, name: &str, injector: &Injector) -> GoResult<()> {
    let module = self.get(name).ok_or_else(|| {
      event!(Level::ERROR, "Module not found.");
      GoError::UnknownModule { name: name.to_string() }
    })?;

    if !injector.mark_loaded(name) {
      event!(Level::TRACE, "Module already loaded into this injector.");
      return Ok(());
    }

    // Marked before requirements so require cycles terminate; a failed load is
    // unmarked so a later retry applies it again.
    if let Err(err) = self.apply(&module, injector) {
      injector.unmark_loaded(name);
      return Err(err);
    }

    event!(Level::DEBUG, "Module loaded.");
    Ok(())
  }

  fn apply(&self, module: &Module, injector: &Injector) -> GoResult<()> {
    let def = module.snapshot();
    for required in &def.requires {
      self.load(required, injector)?;
    }

    let provide = injector.registry();
    for (n, p) in def.providers {
      provide.provider(&n, p);
    }
    for (n, ctor) in def.services {
      provide.service(&n, ctor);
    }
    for (n, f) in def.factories {
      provide.factory(&n, f);
    }
    for (n, v) in def.values {
      provide.value_shared(&n, v);
    }
    for (n, v) in def.constants {
      provide.constant_shared(&n, v);
    }

    if let Some(config) = def.config {
      event!(Level::DEBUG, "Running module config step.");
      injector.invoke(&config, None, None)?;
    }

    Ok(())
  }

  /// Loads each named module in order.
  pub fn load_all<I, S>(&self, names: I, injector: &Injector) -> GoResult<()>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    for name in names {
      self.load(name.as_ref(), injector)?;
    }
    Ok(())
  }
}

impl std::fmt::Debug for ModuleRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ModuleRegistry").field("modules", &self.names()).finish()
  }
}
