// go_flow/src/core/value.rs

//! Type-erased service values, invocation locals and the argument pack handed
//! to every injectable.

use crate::error::{GoError, GoResult};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A resolved service. Identity is `Arc::ptr_eq`.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Wraps any owned value as a `Value`.
pub fn value<T: Any + Send + Sync>(v: T) -> Value {
  Arc::new(v)
}

/// Checked downcast of a resolved `Value`, naming the service in the error.
pub fn downcast_value<T: Any + Send + Sync>(name: &str, v: &Value) -> GoResult<Arc<T>> {
  Arc::clone(v).downcast::<T>().map_err(|_| GoError::TypeMismatch {
    name: name.to_string(),
    expected: std::any::type_name::<T>().to_string(),
  })
}

/// Per-invocation values that take precedence over registry lookups.
#[derive(Clone, Default)]
pub struct Locals(IndexMap<String, Value>);

impl Locals {
  pub fn new() -> Self {
    Self(IndexMap::new())
  }

  /// Adds an owned value under `name`.
  pub fn with<T: Any + Send + Sync>(self, name: impl Into<String>, v: T) -> Self {
    self.with_value(name, Arc::new(v))
  }

  /// Adds an already type-erased value under `name`.
  pub fn with_value(mut self, name: impl Into<String>, v: Value) -> Self {
    self.0.insert(name.into(), v);
    self
  }

  pub fn insert(&mut self, name: impl Into<String>, v: Value) {
    self.0.insert(name.into(), v);
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.0.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.0.contains_key(name)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Debug for Locals {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.0.keys()).finish()
  }
}

/// The resolved arguments of one call, in declaration order.
pub struct Invocation {
  names: Vec<String>,
  args: Vec<Value>,
  receiver: Option<Value>,
}

impl Invocation {
  pub(crate) fn new(names: Vec<String>, args: Vec<Value>, receiver: Option<Value>) -> Self {
    debug_assert_eq!(names.len(), args.len());
    Self { names, args, receiver }
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }

  pub fn len(&self) -> usize {
    self.args.len()
  }

  pub fn is_empty(&self) -> bool {
    self.args.is_empty()
  }

  /// The raw value bound to a declared dependency name.
  pub fn value(&self, name: &str) -> Option<&Value> {
    self
      .names
      .iter()
      .position(|n| n == name)
      .map(|idx| &self.args[idx])
  }

  /// Typed access by dependency name. The name must have been declared.
  pub fn get<T: Any + Send + Sync>(&self, name: &str) -> GoResult<Arc<T>> {
    let v = self.value(name).ok_or_else(|| GoError::MissingDependency {
      names: vec![name.to_string()],
    })?;
    downcast_value(name, v)
  }

  /// Typed access by position.
  pub fn at<T: Any + Send + Sync>(&self, idx: usize) -> GoResult<Arc<T>> {
    match (self.names.get(idx), self.args.get(idx)) {
      (Some(name), Some(v)) => downcast_value(name, v),
      _ => Err(GoError::Internal(format!(
        "argument index {} out of range ({} declared)",
        idx,
        self.args.len()
      ))),
    }
  }

  /// The object this call is bound to, if any (`this` for the callee).
  pub fn receiver(&self) -> Option<&Value> {
    self.receiver.as_ref()
  }

  pub fn receiver_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.receiver.as_ref().and_then(|r| Arc::clone(r).downcast::<T>().ok())
  }
}

impl fmt::Debug for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Invocation")
      .field("names", &self.names)
      .field("has_receiver", &self.receiver.is_some())
      .finish()
  }
}

/// The fresh object `Injector::instantiate` binds a constructor to.
///
/// A constructor populates it through `Invocation::receiver_as::<Instance>()`
/// and returns `()`; returning anything else replaces the instance.
#[derive(Default)]
pub struct Instance {
  props: RwLock<HashMap<String, Value>>,
}

impl Instance {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set<T: Any + Send + Sync>(&self, name: impl Into<String>, v: T) {
    self.props.write().insert(name.into(), Arc::new(v));
  }

  pub fn set_value(&self, name: impl Into<String>, v: Value) {
    self.props.write().insert(name.into(), v);
  }

  pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
    let v = self.props.read().get(name).cloned()?;
    v.downcast::<T>().ok()
  }

  pub fn has(&self, name: &str) -> bool {
    self.props.read().contains_key(name)
  }
}

impl fmt::Debug for Instance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.props.read().keys()).finish()
  }
}
