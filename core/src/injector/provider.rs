// go_flow/src/injector/provider.rs

//! Defines `ProviderRegistry`, the mutable namespace an `Injector` resolves
//! against. Every registration primitive normalizes to a `Recipe` keyed by
//! name, or to a decorator keyed by the service it wraps.

use crate::core::injectable::Injectable;
use crate::core::value::Value;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

/// Suffix under which a provider's own output is registered and cached.
pub const PROVIDER_SUFFIX: &str = "Provider";

pub(crate) fn provider_key(name: &str) -> String {
  format!("{name}{PROVIDER_SUFFIX}")
}

/// How a registered name turns into a value on first resolution.
#[derive(Clone)]
pub(crate) enum Recipe {
  /// Call the injectable; its return value is the service.
  Invoke(Injectable),
  /// Bind the injectable to a fresh `Instance`; see `Injector::instantiate`.
  Instantiate(Injectable),
  /// Hand back the stored value.
  Literal(Value),
}

/// The `{get}` shape a provider resolves to. `get` is invoked once to produce
/// the service the provider configures.
#[derive(Clone, Debug)]
pub struct ProviderDescriptor {
  get: Injectable,
}

impl ProviderDescriptor {
  pub fn new(get: Injectable) -> Self {
    Self { get }
  }

  pub fn get(&self) -> &Injectable {
    &self.get
  }
}

/// What `provider(name, def)` accepts.
#[derive(Clone, Debug)]
pub enum ProviderDef {
  /// An injectable that must resolve to a `ProviderDescriptor`.
  Factory(Injectable),
  /// A descriptor supplied up front.
  Descriptor(ProviderDescriptor),
}

impl From<Injectable> for ProviderDef {
  fn from(f: Injectable) -> Self {
    ProviderDef::Factory(f)
  }
}

impl From<ProviderDescriptor> for ProviderDef {
  fn from(d: ProviderDescriptor) -> Self {
    ProviderDef::Descriptor(d)
  }
}

#[derive(Default)]
struct RegistryState {
  services: HashMap<String, Recipe>,
  decorators: HashMap<String, Injectable>,
}

/// Name-keyed registrations shared by an `Injector` and everything holding
/// `$provide`. Cloning shares the same namespace.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
  state: Arc<RwLock<RegistryState>>,
}

impl ProviderRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  fn add(&self, name: String, recipe: Recipe) {
    let replaced = self.state.write().services.insert(name.clone(), recipe).is_some();
    event!(Level::TRACE, service = %name, replaced, "Registration stored.");
  }

  /// Registers a deferred, configurable provider under `name + "Provider"`.
  pub fn provider(&self, name: &str, def: impl Into<ProviderDef>) -> &Self {
    let recipe = match def.into() {
      ProviderDef::Factory(f) => Recipe::Invoke(f),
      ProviderDef::Descriptor(d) => Recipe::Literal(Arc::new(d)),
    };
    self.add(provider_key(name), recipe);
    self
  }

  /// Registers `f` as the function whose return value is the service.
  pub fn factory(&self, name: &str, f: Injectable) -> &Self {
    self.add(name.to_string(), Recipe::Invoke(f));
    self
  }

  /// Registers `ctor` as a constructor; see `Injector::instantiate`.
  pub fn service(&self, name: &str, ctor: Injectable) -> &Self {
    self.add(name.to_string(), Recipe::Instantiate(ctor));
    self
  }

  /// Registers a literal. Overwrites any earlier registration of `name`.
  pub fn value<T: Any + Send + Sync>(&self, name: &str, v: T) -> &Self {
    self.value_shared(name, Arc::new(v))
  }

  /// Like `value`, for a value that is already shared (keeps its identity).
  pub fn value_shared(&self, name: &str, v: Value) -> &Self {
    self.add(name.to_string(), Recipe::Literal(v));
    self
  }

  /// Registers a literal only if nothing is registered under `name` yet.
  pub fn constant<T: Any + Send + Sync>(&self, name: &str, v: T) -> &Self {
    self.constant_shared(name, Arc::new(v))
  }

  pub fn constant_shared(&self, name: &str, v: Value) -> &Self {
    let mut state = self.state.write();
    if state.services.contains_key(name) {
      event!(Level::TRACE, service = %name, "Constant already registered, keeping the first.");
    } else {
      state.services.insert(name.to_string(), Recipe::Literal(v));
    }
    self
  }

  /// Registers a transform applied to the resolved `name` before it is cached.
  /// The resolved value reaches `f` as the local `delegate`.
  pub fn decorator(&self, name: &str, f: Injectable) -> &Self {
    self.state.write().decorators.insert(name.to_string(), f);
    self
  }

  /// True if `name` itself (not its provider) has a registration.
  pub fn is_registered(&self, name: &str) -> bool {
    self.state.read().services.contains_key(name)
  }

  /// Every registered key, provider keys included, sorted.
  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.state.read().services.keys().cloned().collect();
    names.sort();
    names
  }

  pub(crate) fn recipe(&self, name: &str) -> Option<Recipe> {
    self.state.read().services.get(name).cloned()
  }

  pub(crate) fn decorator_for(&self, name: &str) -> Option<Injectable> {
    self.state.read().decorators.get(name).cloned()
  }
}

impl std::fmt::Debug for ProviderRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.state.read();
    f.debug_struct("ProviderRegistry")
      .field("services", &state.services.len())
      .field("decorators", &state.decorators.len())
      .finish()
  }
}
