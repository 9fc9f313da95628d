// go_flow/src/core/injectable.rs

//! Defines `Injectable`, a shared callable paired with the names of the
//! dependencies it wants, and the rules for discovering those names.

use crate::core::value::{Invocation, Value};
use std::fmt;
use std::sync::Arc;

/// The callable half of an `Injectable`.
pub type InjectFn = Arc<dyn Fn(&Invocation) -> anyhow::Result<Value> + Send + Sync + 'static>;

/// How an injectable declares its dependency names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
  /// Array form: names given together with the function.
  Inline(Vec<String>),
  /// A name list attached to an already existing function.
  Attached(Vec<String>),
  /// A textual parameter list such as `"|config, next|"`.
  ///
  /// Only read in non-strict mode. Renaming a parameter silently changes what
  /// gets injected, so prefer `Inline` for anything long-lived.
  Signature(String),
  /// Nothing declared; resolves to no dependencies.
  Unannotated,
}

/// A dependency-injectable function.
#[derive(Clone)]
pub struct Injectable {
  annotation: Annotation,
  func: InjectFn,
}

impl Injectable {
  /// Array form: `Injectable::new(["config", "next"], |inv| ...)`.
  pub fn new<I, S, F>(deps: I, f: F) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: Fn(&Invocation) -> anyhow::Result<Value> + Send + Sync + 'static,
  {
    Self {
      annotation: Annotation::Inline(deps.into_iter().map(Into::into).collect()),
      func: Arc::new(f),
    }
  }

  /// Array form for callables that produce nothing (steps, callbacks, config blocks).
  pub fn action<I, S, F>(deps: I, f: F) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: Fn(&Invocation) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    Self::new(deps, move |inv| {
      f(inv)?;
      Ok(unit())
    })
  }

  /// An unannotated function. Attach names later with `with_inject`.
  pub fn from_fn<F>(f: F) -> Self
  where
    F: Fn(&Invocation) -> anyhow::Result<Value> + Send + Sync + 'static,
  {
    Self {
      annotation: Annotation::Unannotated,
      func: Arc::new(f),
    }
  }

  /// Dependencies discovered from a textual parameter list in non-strict mode.
  pub fn from_signature<F>(signature: impl Into<String>, f: F) -> Self
  where
    F: Fn(&Invocation) -> anyhow::Result<Value> + Send + Sync + 'static,
  {
    Self {
      annotation: Annotation::Signature(signature.into()),
      func: Arc::new(f),
    }
  }

  /// Attaches an explicit dependency list, replacing any signature.
  pub fn with_inject<I, S>(mut self, deps: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.annotation = Annotation::Attached(deps.into_iter().map(Into::into).collect());
    self
  }

  /// A zero-dependency injectable that hands back the same value every call.
  pub fn returning(v: Value) -> Self {
    Self::new(Vec::<String>::new(), move |_| Ok(Arc::clone(&v)))
  }

  pub fn annotation(&self) -> &Annotation {
    &self.annotation
  }

  /// Ordered dependency names. Strict mode ignores `Signature` annotations.
  pub fn annotate(&self, strict: bool) -> Vec<String> {
    match &self.annotation {
      Annotation::Inline(names) | Annotation::Attached(names) => names.clone(),
      Annotation::Signature(sig) if !strict => parse_parameter_names(sig),
      Annotation::Signature(_) | Annotation::Unannotated => Vec::new(),
    }
  }

  /// Whether `name` is among the declared dependencies.
  pub fn declares(&self, name: &str, strict: bool) -> bool {
    self.annotate(strict).iter().any(|n| n == name)
  }

  pub(crate) fn call(&self, inv: &Invocation) -> anyhow::Result<Value> {
    (self.func)(inv)
  }
}

impl fmt::Debug for Injectable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Injectable").field("annotation", &self.annotation).finish()
  }
}

/// The "nothing returned" value.
pub fn unit() -> Value {
  Arc::new(())
}

/// Pulls parameter names out of `function (a, b)`, `fn(a: A, b: B)` or `|a, b|`.
fn parse_parameter_names(signature: &str) -> Vec<String> {
  let Some(open) = signature.find(['(', '|']) else {
    return Vec::new();
  };
  let close = if signature[open..].starts_with('(') { ')' } else { '|' };

  let body = &signature[open + 1..];
  let mut params = Vec::new();
  let mut current = String::new();
  let mut depth = 0usize;

  for c in body.chars() {
    match c {
      '<' | '(' | '[' => {
        depth += 1;
        current.push(c);
      }
      '>' | ']' => {
        depth = depth.saturating_sub(1);
        current.push(c);
      }
      ')' if depth > 0 => {
        depth -= 1;
        current.push(c);
      }
      c if c == close && depth == 0 => break,
      ',' if depth == 0 => params.push(std::mem::take(&mut current)),
      c => current.push(c),
    }
  }
  params.push(current);

  params
    .iter()
    .filter_map(|raw| {
      let name = raw.split(':').next()?.trim();
      let name = name.strip_prefix("mut ").unwrap_or(name).trim();
      (!name.is_empty()).then(|| name.to_string())
    })
    .collect()
}
