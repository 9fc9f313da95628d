// go_flow/src/module/definition.rs

//! Contains the `Module` descriptor: a named, deferred bundle of registrations
//! that is applied to an injector only when loaded.

use crate::core::injectable::Injectable;
use crate::core::value::Value;
use crate::injector::provider::ProviderDef;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;

/// Pending registrations, bucketed by kind. Buckets keep declaration order.
#[derive(Clone, Default)]
pub(crate) struct ModuleDef {
  pub(crate) name: String,
  pub(crate) requires: Vec<String>,
  pub(crate) config: Option<Injectable>,
  pub(crate) providers: IndexMap<String, ProviderDef>,
  pub(crate) services: IndexMap<String, Injectable>,
  pub(crate) factories: IndexMap<String, Injectable>,
  pub(crate) values: IndexMap<String, Value>,
  pub(crate) constants: IndexMap<String, Value>,
}

/// A chainable handle on a declared module.
///
/// Handles are obtained from `ModuleRegistry::module` (or the free
/// `go_flow::module`) and share the registered descriptor, so registrations
/// chained after declaration are visible to every later load. Loading only
/// reads the descriptor.
#[derive(Clone)]
pub struct Module {
  def: Arc<RwLock<ModuleDef>>,
}

impl Module {
  pub(crate) fn new(name: &str, requires: Vec<String>) -> Self {
    Self {
      def: Arc::new(RwLock::new(ModuleDef {
        name: name.to_string(),
        requires,
        ..ModuleDef::default()
      })),
    }
  }

  pub fn name(&self) -> String {
    self.def.read().name.clone()
  }

  pub fn requires(&self) -> Vec<String> {
    self.def.read().requires.clone()
  }

  /// Sets the step invoked through the injector after this module's
  /// registrations are applied.
  pub fn config(self, f: Injectable) -> Self {
    self.def.write().config = Some(f);
    self
  }

  pub fn provider(self, name: &str, def: impl Into<ProviderDef>) -> Self {
    self.def.write().providers.insert(name.to_string(), def.into());
    self
  }

  pub fn service(self, name: &str, ctor: Injectable) -> Self {
    self.def.write().services.insert(name.to_string(), ctor);
    self
  }

  pub fn factory(self, name: &str, f: Injectable) -> Self {
    self.def.write().factories.insert(name.to_string(), f);
    self
  }

  pub fn value<T: Any + Send + Sync>(self, name: &str, v: T) -> Self {
    self.value_shared(name, Arc::new(v))
  }

  pub fn value_shared(self, name: &str, v: Value) -> Self {
    self.def.write().values.insert(name.to_string(), v);
    self
  }

  /// Ignored if this module already has a pending constant named `name`.
  pub fn constant<T: Any + Send + Sync>(self, name: &str, v: T) -> Self {
    self.constant_shared(name, Arc::new(v))
  }

  pub fn constant_shared(self, name: &str, v: Value) -> Self {
    self.def.write().constants.entry(name.to_string()).or_insert(v);
    self
  }

  pub(crate) fn snapshot(&self) -> ModuleDef {
    self.def.read().clone()
  }
}

impl std::fmt::Debug for Module {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let def = self.def.read();
    f.debug_struct("Module")
      .field("name", &def.name)
      .field("requires", &def.requires)
      .field("has_config", &def.config.is_some())
      .field("providers", &def.providers.keys().collect::<Vec<_>>())
      .field("services", &def.services.keys().collect::<Vec<_>>())
      .field("factories", &def.factories.keys().collect::<Vec<_>>())
      .field("values", &def.values.keys().collect::<Vec<_>>())
      .field("constants", &def.constants.keys().collect::<Vec<_>>())
      .finish()
  }
}
