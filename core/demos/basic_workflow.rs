// go_flow/demos/basic_workflow.rs

use go_flow::{Go, GoError, GoResult, Injectable, ModuleRegistry, Next, RunnerStatus};
use std::time::Duration;
use tracing::info;

#[derive(Debug)]
struct Inventory {
  items: parking_lot::Mutex<Vec<String>>,
}

#[tokio::main]
async fn main() -> GoResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Workflow Example ---");

  // 1. A runner with no modules; registrations go straight into its injector.
  let go = Go::with_modules(&ModuleRegistry::new(), Vec::<String>::new())?;
  go.value("warehouse", "north".to_string()).factory(
    "inventory",
    Injectable::new(Vec::<String>::new(), |_| {
      Ok(go_flow::value(Inventory {
        items: parking_lot::Mutex::new(Vec::new()),
      }))
    }),
  );

  // 2. A fire-and-forget step: advances as soon as it returns.
  go.run(Injectable::action(["inventory", "warehouse"], |inv| {
    let inventory = inv.get::<Inventory>("inventory")?;
    let warehouse = inv.get::<String>("warehouse")?;
    inventory.items.lock().push(format!("{}: crate", warehouse));
    info!("Step 1 stocked the {} warehouse.", warehouse);
    Ok(())
  }));

  // 3. A step that declares `next` and hands over from a background task.
  go.run(Injectable::action(["inventory", "next"], |inv| {
    let inventory = inv.get::<Inventory>("inventory")?;
    let next = inv.get::<Next>("next")?;
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(100)).await;
      inventory.items.lock().push("remote: pallet".to_string());
      info!("Step 2 finished its remote lookup.");
      next.proceed();
    });
    Ok(())
  }));

  // 4. A delayed step.
  go.run_delayed(
    Injectable::action(["inventory"], |inv| {
      let count = inv.get::<Inventory>("inventory")?.items.lock().len();
      info!("Step 3 counted {} items.", count);
      Ok(())
    }),
    Duration::from_millis(50),
  );

  go.then(
    Injectable::action(["inventory"], |inv| {
      info!("Success: {:?}", inv.get::<Inventory>("inventory")?.items.lock());
      Ok(())
    }),
    Injectable::action(["$error"], |inv| {
      let err = inv.get::<GoError>("$error")?;
      info!("Failure: {}", err);
      Ok(())
    }),
  )
  .finally(Injectable::action(Vec::<String>::new(), |_| {
    info!("Finally: workflow finished.");
    Ok(())
  }));

  go.start();
  let status = go.settled().await;
  info!("Runner settled with {:?}", status);
  assert_eq!(status, RunnerStatus::Completed);

  info!("--- Basic Workflow Example End ---");
  Ok(())
}
