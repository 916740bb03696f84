//! Example deployment CLI.
//!
//! Deploys the demo web stack against an in-process monitor and reports
//! what was registered and what each output resolved to.
//!
//! # Usage
//!
//! ```bash
//! webstack [--preview]
//! ```
//!
//! `--preview` runs a dry run: nothing is "provisioned", and values the
//! engine cannot determine stay unknown.

use example::build_stack;
use serde_json::json;
use std::sync::Arc;
use strata_core::resource::{ExternalId, Urn};
use strata_runtime::config::DeploymentSettings;
use strata_runtime::deployment::Deployment;
use strata_runtime::dev::RecordingMonitor;
use strata_runtime::monitor::RegisterResourceResponse;
use strata_runtime::telemetry::{TelemetryConfig, init_telemetry};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_telemetry(&TelemetryConfig::default());

    let preview = std::env::args().any(|arg| arg == "--preview");
    let settings = DeploymentSettings::from_env()
        .unwrap_or_else(|_| DeploymentSettings::new("acme-demo", "dev"))
        .with_dry_run(preview);

    let monitor = Arc::new(RecordingMonitor::new());
    // Plan a concrete answer for the database so dependent values have
    // something real to carry; everything else uses the default formula.
    let mut database_outputs = serde_json::Map::new();
    database_outputs.insert("endpoint".to_string(), json!("primary-db.internal.acme.dev"));
    monitor.respond_with(
        "primary-db",
        RegisterResourceResponse {
            urn: Urn::new("urn:acme:storage:Database::primary-db"),
            id: Some(ExternalId::new("db-7f3a")),
            object: database_outputs,
        },
    );

    let deployment = Deployment::new(settings, monitor.clone());
    let outcome = deployment
        .run(|context| async move {
            let stack = build_stack(&context).map_err(|error| error.to_string())?;

            let url = stack.url.data().await.map_err(|error| error.to_string())?;
            if url.known {
                tracing::info!(url = %url.value, secret = url.secret, "application url resolved");
            } else {
                tracing::info!("application url not determined in this preview");
            }

            for instance in &stack.instances {
                let ip = instance
                    .output("ip")
                    .expect("ip is declared on every instance")
                    .data()
                    .await
                    .map_err(|error| error.to_string())?;
                tracing::info!(
                    instance = instance.name(),
                    known = ip.known,
                    "instance address settled"
                );
            }
            Ok::<(), String>(())
        })
        .await;

    if let Err(error) = outcome {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }

    for request in monitor.requests() {
        tracing::info!(
            resource = %request.name,
            type_token = %request.type_token,
            dependencies = request.dependencies.len(),
            "registered"
        );
    }
}
