use std::{env, path::PathBuf, time::Duration};

use futures::StreamExt;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use typed_rpc::{diagnostics, generate::GenerateConfig};

mod api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,typed_rpc=debug")),
        )
        .init();

    let output_dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./bindings"));

    let router = diagnostics::mount(api::mount()?)?.build();

    let config =
        GenerateConfig::new(&output_dir).strip_prefix(module_path!().to_owned() + "::api");
    let bindings = typed_rpc::export(&router, &config)?;
    for (file, _) in bindings.files() {
        info!("exported {}", output_dir.join(file).display());
    }

    let mut counter = router.subscribe("Counter.Watch", json!(null))?;
    for by in [1, 2, 3] {
        router.call("Counter.Increment", json!(by)).await?;
    }

    // The current value followed by one value per increment.
    for _ in 0..4 {
        match tokio::time::timeout(Duration::from_secs(1), counter.next()).await {
            Ok(Some(value)) => info!("counter is now {}", value?),
            Ok(None) | Err(_) => break,
        }
    }

    let created = router
        .call("Users.Create", json!({ "name": "Ferris", "email": null, "role": "admin" }))
        .await?;
    info!("created {created}");

    let rejected = router
        .call("Users.Create", json!({ "name": "", "email": null, "role": "member" }))
        .await;
    if let Err(err) = rejected {
        info!("rejected as expected: {err}");
    }

    let status = router.call("Diagnostics.Status", json!(null)).await?;
    info!("serving {}", serde_json::to_string_pretty(&status)?);

    Ok(())
}
