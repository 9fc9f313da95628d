// go_flow/src/injector/resolve.rs

//! Contains the `Injector`: resolution of named services against a
//! `ProviderRegistry`, the per-injector singleton cache, and invocation of
//! injectables with their declared dependencies.

use crate::core::injectable::Injectable;
use crate::core::value::{downcast_value, Instance, Invocation, Locals, Value};
use crate::error::{GoError, GoResult};
use crate::injector::provider::{provider_key, ProviderDescriptor, ProviderRegistry, Recipe};
use crate::module::registry::ModuleRegistry;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Resolves to the injector itself.
pub const INJECTOR: &str = "$injector";
/// Resolves to the injector's `ProviderRegistry`.
pub const PROVIDE: &str = "$provide";
/// Local carrying the undecorated service into a decorator.
pub const DELEGATE: &str = "delegate";

struct InjectorInner {
  registry: ProviderRegistry,
  cache: RwLock<HashMap<String, Value>>,
  // Serializes resolution so every service is built at most once, and tracks
  // the names currently being resolved on this thread.
  resolving: ReentrantMutex<RefCell<Vec<String>>>,
  loaded_modules: Mutex<HashSet<String>>,
  strict_di: bool,
}

/// The dependency-resolution engine. Cloning shares the registry and cache.
#[derive(Clone)]
pub struct Injector {
  inner: Arc<InjectorInner>,
}

impl Default for Injector {
  fn default() -> Self {
    Self::new()
  }
}

impl Injector {
  /// A non-strict injector over a fresh, empty registry.
  pub fn new() -> Self {
    Self::with_registry(ProviderRegistry::new(), false)
  }

  /// An injector resolving against `registry`. With `strict_di`, textual
  /// signatures are never inspected and only explicit annotations count.
  pub fn with_registry(registry: ProviderRegistry, strict_di: bool) -> Self {
    Self {
      inner: Arc::new(InjectorInner {
        registry,
        cache: RwLock::new(HashMap::new()),
        resolving: ReentrantMutex::new(RefCell::new(Vec::new())),
        loaded_modules: Mutex::new(HashSet::new()),
        strict_di,
      }),
    }
  }

  pub fn registry(&self) -> &ProviderRegistry {
    &self.inner.registry
  }

  pub fn is_strict(&self) -> bool {
    self.inner.strict_di
  }

  /// The dependency names `step` declares, under this injector's strictness.
  pub fn annotate(&self, step: &Injectable) -> Vec<String> {
    step.annotate(self.inner.strict_di)
  }

  /// True if `name` or `name + "Provider"` is registered.
  pub fn has(&self, name: &str) -> bool {
    name == INJECTOR
      || name == PROVIDE
      || self.inner.registry.is_registered(name)
      || self.inner.registry.is_registered(&provider_key(name))
  }

  /// True once `name` has been resolved through this injector.
  pub fn is_cached(&self, name: &str) -> bool {
    self.inner.cache.read().contains_key(name)
  }

  /// Resolves and caches a single named service.
  pub fn get(&self, name: &str) -> GoResult<Value> {
    self.get_with_caller(name, None)
  }

  /// Typed `get`.
  pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> GoResult<Arc<T>> {
    let v = self.get(name)?;
    downcast_value(name, &v)
  }

  /// `get`, binding the service's factory to `caller` if it has to be built.
  #[instrument(name = "Injector::get", skip_all, fields(service = %name), err(Display))]
  pub fn get_with_caller(&self, name: &str, caller: Option<Value>) -> GoResult<Value> {
    if let Some(v) = self.builtin(name) {
      return Ok(v);
    }
    if let Some(v) = self.cached(name) {
      return Ok(v);
    }

    let guard = self.inner.resolving.lock();
    // Another thread may have finished building it while we waited.
    if let Some(v) = self.cached(name) {
      return Ok(v);
    }
    {
      let mut path = guard.borrow_mut();
      if path.iter().any(|n| n == name) {
        let mut cycle = path.clone();
        cycle.push(name.to_string());
        event!(Level::ERROR, path = ?cycle, "Circular dependency detected.");
        return Err(GoError::CircularDependency { path: cycle });
      }
      path.push(name.to_string());
    }

    let result = self.resolve_uncached(name, caller);
    guard.borrow_mut().pop();
    result
  }

  fn builtin(&self, name: &str) -> Option<Value> {
    match name {
      INJECTOR => Some(Arc::new(self.clone())),
      PROVIDE => Some(Arc::new(self.inner.registry.clone())),
      _ => None,
    }
  }

  fn cached(&self, name: &str) -> Option<Value> {
    self.inner.cache.read().get(name).cloned()
  }

  fn store(&self, name: String, v: Value) {
    self.inner.cache.write().insert(name, v);
  }

  fn resolve_uncached(&self, name: &str, caller: Option<Value>) -> GoResult<Value> {
    let registry = &self.inner.registry;
    let provider_name = provider_key(name);

    let delegate = if let Some(provider) = self.cached(&provider_name) {
      self.invoke_provider(name, &provider, caller.clone())?
    } else if let Some(recipe) = registry.recipe(&provider_name) {
      event!(Level::DEBUG, provider = %provider_name, "Resolving provider.");
      let provider = self.run_recipe(recipe, None)?;
      self.store(provider_name, Arc::clone(&provider));
      self.invoke_provider(name, &provider, caller.clone())?
    } else if let Some(recipe) = registry.recipe(name) {
      self.run_recipe(recipe, caller.clone())?
    } else {
      event!(Level::DEBUG, service = %name, "No registration found.");
      return Err(GoError::UnknownService { name: name.to_string() });
    };

    let resolved = match registry.decorator_for(name) {
      Some(decorator) => {
        event!(Level::TRACE, service = %name, "Applying decorator.");
        let locals = Locals::new().with_value(DELEGATE, delegate);
        self.invoke(&decorator, caller, Some(&locals))?
      }
      None => delegate,
    };

    self.store(name.to_string(), Arc::clone(&resolved));
    event!(Level::DEBUG, service = %name, "Service resolved and cached.");
    Ok(resolved)
  }

  fn run_recipe(&self, recipe: Recipe, caller: Option<Value>) -> GoResult<Value> {
    match recipe {
      Recipe::Invoke(f) => self.invoke(&f, caller, None),
      Recipe::Instantiate(ctor) => self.instantiate(&ctor, None),
      Recipe::Literal(v) => Ok(v),
    }
  }

  fn invoke_provider(&self, name: &str, provider: &Value, caller: Option<Value>) -> GoResult<Value> {
    let descriptor = Arc::clone(provider)
      .downcast::<ProviderDescriptor>()
      .map_err(|_| GoError::InvalidProvider { name: name.to_string() })?;
    self.invoke(descriptor.get(), caller, None)
  }

  /// Calls `step` with its declared dependencies, bound to `this`.
  ///
  /// Each name is looked up in `locals` first, then in the registry. All
  /// names found in neither are reported together.
  pub fn invoke(&self, step: &Injectable, this: Option<Value>, locals: Option<&Locals>) -> GoResult<Value> {
    let names = self.annotate(step);
    let mut args = Vec::with_capacity(names.len());
    let mut not_found = Vec::new();

    for name in &names {
      if let Some(v) = locals.and_then(|l| l.get(name)) {
        args.push(Arc::clone(v));
      } else if self.has(name) {
        args.push(self.get(name)?);
      } else {
        not_found.push(name.clone());
      }
    }

    if !not_found.is_empty() {
      event!(Level::DEBUG, missing = ?not_found, "Unresolved dependencies.");
      return Err(GoError::MissingDependency { names: not_found });
    }

    let invocation = Invocation::new(names, args, this);
    step.call(&invocation).map_err(GoError::from)
  }

  /// Binds `ctor` to a fresh `Instance` and calls it. A unit return yields the
  /// instance; any other return value replaces it.
  pub fn instantiate(&self, ctor: &Injectable, locals: Option<&Locals>) -> GoResult<Value> {
    let instance: Value = Arc::new(Instance::new());
    let returned = self.invoke(ctor, Some(Arc::clone(&instance)), locals)?;
    if (*returned).is::<()>() {
      Ok(instance)
    } else {
      Ok(returned)
    }
  }

  /// Loads module `name` (and its requirements) from `modules` into this injector.
  pub fn load_module(&self, modules: &ModuleRegistry, name: &str) -> GoResult<()> {
    modules.load(name, self)
  }

  /// Records `module` as applied. False if it already was.
  pub(crate) fn mark_loaded(&self, module: &str) -> bool {
    self.inner.loaded_modules.lock().insert(module.to_string())
  }

  pub(crate) fn unmark_loaded(&self, module: &str) {
    self.inner.loaded_modules.lock().remove(module);
  }

  /// Names of the modules applied to this injector, sorted.
  pub fn loaded_modules(&self) -> Vec<String> {
    let mut names: Vec<String> = self.inner.loaded_modules.lock().iter().cloned().collect();
    names.sort();
    names
  }
}

impl std::fmt::Debug for Injector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Injector")
      .field("registry", &self.inner.registry)
      .field("cached", &self.inner.cache.read().len())
      .field("strict_di", &self.inner.strict_di)
      .finish()
  }
}
