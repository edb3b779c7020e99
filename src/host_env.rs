//! Best-effort host environment inspection.
//!
//! The resulting mapping is attached verbatim to the session registration
//! payload. Every lookup here is optional: failures degrade to an empty or
//! partial object and never fail the caller.

use serde_json::{json, Map, Value};

/// Collect host metadata for the registration payload.
pub async fn get_host_env() -> Value {
    let dependencies = tokio::task::spawn_blocking(read_manifest_dependencies)
        .await
        .ok()
        .flatten();

    let mut env = Map::new();

    env.insert(
        "OS".to_string(),
        json!({
            "OS": std::env::consts::OS,
            "Arch": std::env::consts::ARCH,
            "Family": std::env::consts::FAMILY,
        }),
    );

    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(0);
    env.insert("CPU".to_string(), json!({ "Total_cores": cores }));

    let mut sdk = Map::new();
    sdk.insert(
        "SDK_Name".to_string(),
        Value::String(env!("CARGO_PKG_NAME").to_string()),
    );
    sdk.insert(
        "SDK_Version".to_string(),
        Value::String(env!("CARGO_PKG_VERSION").to_string()),
    );
    match dependencies {
        Some(deps) => {
            sdk.insert("Project_Dependencies".to_string(), deps);
        }
        None => {
            tracing::debug!("no readable Cargo.toml in the working directory");
        }
    }
    env.insert("SDK".to_string(), Value::Object(sdk));

    Value::Object(env)
}

/// Dependency names from the working directory's Cargo.toml, if present.
fn read_manifest_dependencies() -> Option<Value> {
    let content = std::fs::read_to_string("Cargo.toml").ok()?;
    let manifest: toml::Value = toml::from_str(&content).ok()?;
    let table = manifest.get("dependencies")?.as_table()?;
    let names: Vec<Value> = table.keys().cloned().map(Value::String).collect();
    Some(Value::Array(names))
}
