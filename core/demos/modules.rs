// go_flow/demos/modules.rs

use go_flow::{Go, GoResult, Injectable, Instance, ProviderDescriptor, ProviderRegistry, RunnerStatus};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
struct HttpClient {
  base_url: String,
}

#[tokio::main]
async fn main() -> GoResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Modules Example ---");

  // 1. A base module with configuration and a configurable provider.
  go_flow::module("Config", Vec::<String>::new())
    .constant("api_root", "https://api.example.com".to_string())
    .provider(
      "client",
      Injectable::new(["api_root"], |inv| {
        let root = inv.get::<String>("api_root")?;
        let get = Injectable::new(Vec::<String>::new(), move |_| {
          Ok(go_flow::value(HttpClient {
            base_url: format!("{}/v1", root),
          }))
        });
        Ok(go_flow::value(ProviderDescriptor::new(get)))
      }),
    );

  // 2. A feature module that builds on it: a constructor-style service and a config step.
  go_flow::module("Users", ["Config"])
    .service(
      "users",
      Injectable::action(["client"], |inv| {
        let client = inv.get::<HttpClient>("client")?;
        if let Some(this) = inv.receiver_as::<Instance>() {
          this.set("endpoint", format!("{}/users", client.base_url));
        }
        Ok(())
      }),
    )
    .config(Injectable::action(["$provide"], |inv| {
      inv.get::<ProviderRegistry>("$provide")?.value("page_size", 25usize);
      Ok(())
    }));

  // 3. Two runners loading the same module get independent singletons.
  let first = Go::new(["Users"])?;
  let second = Go::new(["Users"])?;
  let a = first.injector().get_as::<Instance>("users")?;
  let b = second.injector().get_as::<Instance>("users")?;
  info!("Independent instances: {}", !Arc::ptr_eq(&a, &b));

  first
    .run(Injectable::action(["users", "page_size"], |inv| {
      let users = inv.get::<Instance>("users")?;
      let endpoint = users.get::<String>("endpoint").map(|e| e.to_string()).unwrap_or_default();
      info!("Fetching {} users from {}", inv.get::<usize>("page_size")?, endpoint);
      Ok(())
    }))
    .start();

  let status = first.settled().await;
  info!("Runner settled with {:?}", status);
  assert_eq!(status, RunnerStatus::Completed);

  info!("--- Modules Example End ---");
  Ok(())
}
