// tests/module_tests.rs
mod common;

use common::*;
use go_flow::{
  value, Go, GoError, Injectable, Injector, ModuleRegistry, ProviderDescriptor, ProviderRegistry, RunnerStatus,
};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn declare_counter_modules(modules: &ModuleRegistry, builds: Arc<AtomicUsize>) {
  modules.module("Base", Vec::<String>::new()).constant("start", 100i64).service(
    "counter",
    Injectable::new(Vec::<String>::new(), move |_| {
      builds.fetch_add(1, Ordering::SeqCst);
      Ok(value(Counter::default()))
    }),
  );
  modules
    .module("Feature", ["Base"])
    .factory(
      "startedCounter",
      Injectable::new(["counter", "start"], |inv| {
        let counter = inv.get::<Counter>("counter")?;
        let start = inv.get::<i64>("start")?;
        counter.add(*start);
        Ok(Arc::clone(inv.value("counter").ok_or_else(|| anyhow::anyhow!("no counter"))?))
      }),
    );
}

#[tokio::test]
async fn test_required_module_registrations_are_resolvable() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  let builds = Arc::new(AtomicUsize::new(0));
  declare_counter_modules(&modules, builds.clone());

  let go = Go::with_modules(&modules, ["Feature"]).unwrap();
  assert_eq!(go.injector().loaded_modules(), vec!["Base", "Feature"]);

  let log = Log::new();
  let step_log = log.clone();
  go.run(Injectable::action(["startedCounter", "counter"], move |inv| {
    let started = inv.get::<Counter>("startedCounter")?;
    let counter = inv.get::<Counter>("counter")?;
    assert!(Arc::ptr_eq(&started, &counter));
    step_log.push(format!("counter={}", counter.get()));
    Ok(())
  }))
  .start();

  assert_eq!(settle(&go).await, RunnerStatus::Completed);
  assert_eq!(log.entries(), vec!["counter=100"]);
  assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_module_loaded_into_two_runners_yields_independent_services() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  let builds = Arc::new(AtomicUsize::new(0));
  declare_counter_modules(&modules, builds.clone());

  let first = Go::with_modules(&modules, ["Feature"]).unwrap();
  let second = Go::with_modules(&modules, ["Feature"]).unwrap();

  let a = first.injector().get_as::<Counter>("startedCounter").unwrap();
  let b = second.injector().get_as::<Counter>("startedCounter").unwrap();
  a.add(1);

  assert!(!Arc::ptr_eq(&a, &b));
  assert_eq!(a.get(), 101);
  assert_eq!(b.get(), 100);
  assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unknown_module_at_construction() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  match Go::with_modules(&modules, ["Nope"]) {
    Err(GoError::UnknownModule { name }) => assert_eq!(name, "Nope"),
    other => panic!("Expected UnknownModule, got {:?}", other.map(|_| ())),
  }
}

#[test]
fn test_unknown_requirement_names_the_missing_module() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  modules.module("App", ["Core", "Missing"]);
  modules.module("Core", Vec::<String>::new()).value("core", true);

  let injector = Injector::new();
  match injector.load_module(&modules, "App") {
    Err(GoError::UnknownModule { name }) => assert_eq!(name, "Missing"),
    other => panic!("Expected UnknownModule, got {:?}", other),
  }
  // No rollback: the requirement that did load stays applied.
  assert!(injector.has("core"));
}

#[test]
fn test_failed_load_can_be_retried_after_declaring_requirement() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  modules.module("App", ["Storage"]).value("app_ready", 1u32);

  let injector = Injector::new();
  assert!(injector.load_module(&modules, "App").is_err());
  assert!(injector.loaded_modules().is_empty());
  assert!(!injector.has("app_ready"));

  modules.module("Storage", Vec::<String>::new()).value("storage_ready", 2u32);
  injector.load_module(&modules, "App").unwrap();

  assert_eq!(*injector.get_as::<u32>("app_ready").unwrap(), 1);
  assert_eq!(*injector.get_as::<u32>("storage_ready").unwrap(), 2);
  assert_eq!(injector.loaded_modules(), vec!["App", "Storage"]);
}

#[test]
fn test_failed_config_step_can_be_retried() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  let attempts = Arc::new(AtomicUsize::new(0));
  let a = attempts.clone();
  modules
    .module("Flaky", Vec::<String>::new())
    .config(Injectable::action(Vec::<String>::new(), move |_| {
      if a.fetch_add(1, Ordering::SeqCst) == 0 {
        anyhow::bail!("first attempt fails");
      }
      Ok(())
    }));

  let injector = Injector::new();
  assert!(injector.load_module(&modules, "Flaky").is_err());
  injector.load_module(&modules, "Flaky").unwrap();
  assert_eq!(attempts.load(Ordering::SeqCst), 2);
  assert_eq!(injector.loaded_modules(), vec!["Flaky"]);
}

#[test]
fn test_constant_first_wins_across_modules() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  modules.module("First", Vec::<String>::new()).constant("region", "eu");
  modules.module("Second", Vec::<String>::new()).constant("region", "us");
  modules.module("Both", ["First", "Second"]);

  let injector = Injector::new();
  injector.load_module(&modules, "Both").unwrap();
  assert_eq!(*injector.get_as::<&'static str>("region").unwrap(), "eu");

  let reversed = ModuleRegistry::new();
  reversed.module("First", Vec::<String>::new()).constant("region", "eu");
  reversed.module("Second", Vec::<String>::new()).constant("region", "us");
  reversed.module("Both", ["Second", "First"]);
  let injector = Injector::new();
  injector.load_module(&reversed, "Both").unwrap();
  assert_eq!(*injector.get_as::<&'static str>("region").unwrap(), "us");
}

#[test]
fn test_pending_constant_keeps_first_declaration() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  let module = modules
    .module("Limits", Vec::<String>::new())
    .constant("max", 1u32)
    .constant("max", 2u32)
    .value("min", 1u32)
    .value("min", 0u32);

  let injector = Injector::new();
  modules.load(&module.name(), &injector).unwrap();
  assert_eq!(*injector.get_as::<u32>("max").unwrap(), 1);
  assert_eq!(*injector.get_as::<u32>("min").unwrap(), 0);
}

#[test]
fn test_module_buckets_apply_in_fixed_order() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  // A value declared in the same module as a factory of the same name wins,
  // because values are applied after factories.
  modules
    .module("Ordered", Vec::<String>::new())
    .value("name", "value")
    .factory("name", Injectable::returning(value("factory")));

  let injector = Injector::new();
  injector.load_module(&modules, "Ordered").unwrap();
  assert_eq!(*injector.get_as::<&'static str>("name").unwrap(), "value");
}

#[test]
fn test_config_step_runs_after_registrations_with_injection() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  modules
    .module("Configured", Vec::<String>::new())
    .value("base_url", "https://api".to_string())
    .config(Injectable::action(["$provide", "base_url"], |inv| {
      let provide = inv.get::<ProviderRegistry>("$provide")?;
      let base = inv.get::<String>("base_url")?;
      provide.value("users_url", format!("{}/users", base));
      Ok(())
    }));

  let injector = Injector::new();
  injector.load_module(&modules, "Configured").unwrap();
  assert_eq!(*injector.get_as::<String>("users_url").unwrap(), "https://api/users");
}

#[test]
fn test_module_provider_registration() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  modules
    .module("Providers", Vec::<String>::new())
    .provider(
      "clock",
      ProviderDescriptor::new(Injectable::returning(value(1_700_000_000u64))),
    );
  let injector = Injector::new();
  injector.load_module(&modules, "Providers").unwrap();
  assert!(injector.has("clock"));
  assert_eq!(*injector.get_as::<u64>("clock").unwrap(), 1_700_000_000);
}

#[test]
fn test_shared_requirement_is_applied_once() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  let configs = Arc::new(AtomicUsize::new(0));
  let c = configs.clone();
  modules
    .module("Shared", Vec::<String>::new())
    .config(Injectable::action(Vec::<String>::new(), move |_| {
      c.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }));
  modules.module("Left", ["Shared"]);
  modules.module("Right", ["Shared"]);

  let go = Go::with_modules(&modules, ["Left", "Right"]).unwrap();
  assert_eq!(configs.load(Ordering::SeqCst), 1);
  assert_eq!(go.injector().loaded_modules(), vec!["Left", "Right", "Shared"]);
}

#[test]
fn test_require_cycle_terminates() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  modules.module("Ping", ["Pong"]).value("ping", 1u8);
  modules.module("Pong", ["Ping"]).value("pong", 2u8);

  let injector = Injector::new();
  injector.load_module(&modules, "Ping").unwrap();
  assert!(injector.has("ping"));
  assert!(injector.has("pong"));
}

#[test]
fn test_redeclaring_a_module_replaces_it() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  modules.module("Dup", Vec::<String>::new()).value("which", "old");
  modules.module("Dup", Vec::<String>::new()).value("which", "new");
  assert_eq!(modules.names(), vec!["Dup"]);

  let injector = Injector::new();
  injector.load_module(&modules, "Dup").unwrap();
  assert_eq!(*injector.get_as::<&'static str>("which").unwrap(), "new");
}

#[test]
fn test_separate_registries_are_isolated() {
  setup_tracing();
  let a = ModuleRegistry::new();
  let b = ModuleRegistry::new();
  a.module("OnlyInA", Vec::<String>::new());
  assert!(a.contains("OnlyInA"));
  assert!(!b.contains("OnlyInA"));
  assert!(Go::with_modules(&b, ["OnlyInA"]).is_err());
}

#[test]
#[serial]
fn test_global_module_registry() {
  setup_tracing();
  go_flow::module("GlobalTestModule", Vec::<String>::new()).value("global_flag", true);
  assert!(ModuleRegistry::global().contains("GlobalTestModule"));

  let go = Go::new(["GlobalTestModule"]).unwrap();
  assert!(*go.injector().get_as::<bool>("global_flag").unwrap());
}

#[test]
fn test_chained_registrations_after_declaration_are_seen() {
  setup_tracing();
  let modules = ModuleRegistry::new();
  let handle = modules.module("Late", Vec::<String>::new());
  let first = Injector::new();
  first.load_module(&modules, "Late").unwrap();
  assert!(!first.has("late_value"));

  handle.value("late_value", 3i32);
  let second = Injector::new();
  second.load_module(&modules, "Late").unwrap();
  assert_eq!(*second.get_as::<i32>("late_value").unwrap(), 3);
}
