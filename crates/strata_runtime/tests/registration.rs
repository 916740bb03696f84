//! Integration tests for the full declaration → registration flow.
//!
//! Each test stands up a real [`Deployment`] over a [`RecordingMonitor`]
//! and checks what actually crossed the wire and how the resource's
//! futures settled:
//! - declaration is synchronous, resolution is asynchronous
//! - dependency closures see through composites to primitive URNs
//! - failures share one cause and never hang an awaiter
//! - previews keep undetermined values unknown

use serde_json::{Map, json};
use std::sync::Arc;
use strata_core::input::{Input, PropertyMap};
use strata_core::output::OutputError;
use strata_core::property::PropertyValue;
use strata_core::resource::{ExternalId, Urn};
use strata_runtime::config::DeploymentSettings;
use strata_runtime::deployment::Deployment;
use strata_runtime::dev::RecordingMonitor;
use strata_runtime::monitor::RegisterResourceResponse;
use strata_runtime::options::{CustomTimeouts, ResourceOptions};
use strata_runtime::serialize::{SECRET_SIG, SIG_KEY, UNKNOWN_VALUE};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn deployment_for(monitor: &Arc<RecordingMonitor>, dry_run: bool) -> Arc<Deployment> {
    Deployment::new(
        DeploymentSettings::new("acme", "test").with_dry_run(dry_run),
        monitor.clone(),
    )
}

fn no_properties() -> PropertyMap {
    PropertyMap::new()
}

// ─────────────────────────────────────────────────────────────────────────────
// End to end
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn planned_response_resolves_urn_id_and_outputs() {
    let monitor = Arc::new(RecordingMonitor::new());
    let mut outputs = Map::new();
    outputs.insert("endpoint".to_string(), json!("db.internal"));
    monitor.respond_with(
        "db",
        RegisterResourceResponse {
            urn: Urn::new("urn:acme:storage:Database::db"),
            id: Some(ExternalId::new("db-123")),
            object: outputs,
        },
    );
    let deployment = deployment_for(&monitor, false);

    deployment
        .run(|context| async move {
            let db = context
                .primitive_resource(
                    "acme:storage:Database",
                    "db",
                    vec!["endpoint".to_string(), "replica".to_string()],
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;

            assert_eq!(db.urn().value().await.unwrap().as_str(), "urn:acme:storage:Database::db");
            assert_eq!(
                db.external_id().expect("primitive").value().await.unwrap().as_str(),
                "db-123"
            );

            let endpoint = db.output("endpoint").expect("declared").data().await.unwrap();
            assert!(endpoint.known);
            assert_eq!(endpoint.value, PropertyValue::from("db.internal"));

            // Not in the response: finalization settles it known-but-empty
            // because this is a real run.
            let replica = db.output("replica").expect("declared").data().await.unwrap();
            assert!(replica.known);
            assert_eq!(replica.value, PropertyValue::Null);
            Ok::<(), String>(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn previews_leave_undetermined_values_unknown() {
    let monitor = Arc::new(RecordingMonitor::new());
    monitor.respond_with(
        "db",
        RegisterResourceResponse {
            urn: Urn::new("urn:acme:storage:Database::db"),
            id: Some(ExternalId::new("")),
            object: Map::new(),
        },
    );
    let deployment = deployment_for(&monitor, true);

    deployment
        .run(|context| async move {
            let db = context
                .primitive_resource(
                    "acme:storage:Database",
                    "db",
                    vec!["endpoint".to_string()],
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;

            // The URN exists even in previews.
            assert!(db.urn().data().await.unwrap().known);

            // An empty identifier means "not provisioned yet".
            let id = db.external_id().expect("primitive").data().await.unwrap();
            assert!(!id.known);
            assert!(id.value.is_empty());

            let endpoint = db.output("endpoint").expect("declared").data().await.unwrap();
            assert!(!endpoint.known);
            Ok::<(), String>(())
        })
        .await
        .unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure behavior
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rejection_fails_every_future_with_one_cause() {
    let monitor = Arc::new(RecordingMonitor::new());
    monitor.fail_with("db", "quota exceeded");
    let deployment = deployment_for(&monitor, false);

    deployment
        .run(|context| async move {
            let db = context
                .primitive_resource(
                    "acme:storage:Database",
                    "db",
                    vec!["endpoint".to_string()],
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;

            let urn_error = db.urn().data().await.unwrap_err();
            let id_error = db
                .external_id()
                .expect("primitive")
                .data()
                .await
                .unwrap_err();
            let endpoint_error = db.output("endpoint").expect("declared").data().await.unwrap_err();

            assert_eq!(urn_error, id_error);
            assert_eq!(urn_error, endpoint_error);
            let OutputError::Registration { label, reason } = urn_error else {
                panic!("expected a registration failure");
            };
            assert_eq!(label, "db[acme:storage:Database]");
            assert!(reason.contains("quota exceeded"));
            Ok::<(), String>(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn failures_do_not_hang_dependents() {
    let monitor = Arc::new(RecordingMonitor::new());
    monitor.fail_with("db", "quota exceeded");
    let deployment = deployment_for(&monitor, false);

    // The dependent awaits the failed resource's URN during prepare, so its
    // own registration fails with a cause naming the dependent, and the run
    // still drains to completion.
    deployment
        .run(|context| async move {
            let db = context
                .primitive_resource(
                    "acme:storage:Database",
                    "db",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;
            let app = context
                .primitive_resource(
                    "acme:compute:Instance",
                    "app",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new().depends_on(db),
                )
                .map_err(|error| error.to_string())?;

            let error = app.urn().data().await.unwrap_err();
            let OutputError::Registration { label, .. } = error else {
                panic!("expected a registration failure");
            };
            assert_eq!(label, "app[acme:compute:Instance]");
            Ok::<(), String>(())
        })
        .await
        .unwrap();

    assert!(monitor.request_for("app").is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Dependencies on the wire
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn composite_dependencies_expand_to_primitive_urns() {
    let monitor = Arc::new(RecordingMonitor::new());
    let deployment = deployment_for(&monitor, false);

    deployment
        .run(|context| async move {
            let group = context
                .composite_resource(
                    "acme:app:Group",
                    "group",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;
            context
                .primitive_resource(
                    "acme:compute:Instance",
                    "member",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new().with_parent(&group),
                )
                .map_err(|error| error.to_string())?;
            context
                .primitive_resource(
                    "acme:compute:Instance",
                    "app",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new().depends_on(group),
                )
                .map_err(|error| error.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .unwrap();

    let request = monitor.request_for("app").expect("registered");
    let dependencies: Vec<&str> = request.dependencies.iter().map(Urn::as_str).collect();
    // The composite itself never appears; its primitive member does.
    assert_eq!(dependencies, vec!["urn:acme:compute:Instance::member"]);
}

#[tokio::test]
async fn property_references_produce_per_property_dependencies() {
    let monitor = Arc::new(RecordingMonitor::new());
    let mut outputs = Map::new();
    outputs.insert("endpoint".to_string(), json!("db.internal"));
    monitor.respond_with(
        "db",
        RegisterResourceResponse {
            urn: Urn::new("urn:acme:storage:Database::db"),
            id: Some(ExternalId::new("db-123")),
            object: outputs,
        },
    );
    let deployment = deployment_for(&monitor, false);

    deployment
        .run(|context| async move {
            let db = context
                .primitive_resource(
                    "acme:storage:Database",
                    "db",
                    vec!["endpoint".to_string()],
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;

            let mut properties = PropertyMap::new();
            properties.insert("conn", db.output("endpoint").expect("declared"));
            properties.insert("size", "small");
            context
                .primitive_resource(
                    "acme:compute:Instance",
                    "app",
                    Vec::new(),
                    properties,
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .unwrap();

    let request = monitor.request_for("app").expect("registered");
    assert_eq!(request.object["conn"], json!("db.internal"));
    assert_eq!(
        request.property_dependencies["conn"]
            .iter()
            .map(Urn::as_str)
            .collect::<Vec<_>>(),
        vec!["urn:acme:storage:Database::db"]
    );
    assert!(!request.property_dependencies.contains_key("size"));
    // Property references also join the whole-resource set.
    assert_eq!(
        request.dependencies.iter().map(Urn::as_str).collect::<Vec<_>>(),
        vec!["urn:acme:storage:Database::db"]
    );
}

#[tokio::test]
async fn parents_register_before_their_children() {
    let monitor = Arc::new(RecordingMonitor::new());
    let deployment = deployment_for(&monitor, false);

    deployment
        .run(|context| async move {
            let parent = context
                .primitive_resource(
                    "acme:network:Network",
                    "net",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;
            context
                .primitive_resource(
                    "acme:network:Subnet",
                    "subnet",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new().with_parent(&parent),
                )
                .map_err(|error| error.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .unwrap();

    let requests = monitor.requests();
    let net_position = requests.iter().position(|r| r.name == "net").expect("net sent");
    let subnet_position = requests.iter().position(|r| r.name == "subnet").expect("subnet sent");
    assert!(net_position < subnet_position);
    assert_eq!(
        requests[subnet_position].parent.as_ref().map(Urn::as_str),
        Some("urn:acme:network:Network::net")
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Request assembly
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn aliases_deduplicate_keeping_first_occurrence() {
    let monitor = Arc::new(RecordingMonitor::new());
    let deployment = deployment_for(&monitor, false);

    deployment
        .run(|context| async move {
            context
                .primitive_resource(
                    "acme:storage:Bucket",
                    "assets",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new()
                        .with_alias(Urn::new("urn:old:assets"))
                        .with_alias(Urn::new("urn:old:assets"))
                        .with_alias(Urn::new("urn:older:assets")),
                )
                .map_err(|error| error.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .unwrap();

    let request = monitor.request_for("assets").expect("registered");
    let aliases: Vec<&str> = request.aliases.iter().map(Urn::as_str).collect();
    assert_eq!(aliases, vec!["urn:old:assets", "urn:older:assets"]);
}

#[tokio::test]
async fn secret_properties_are_wrapped_on_the_wire() {
    let monitor = Arc::new(RecordingMonitor::new());
    let deployment = deployment_for(&monitor, false);

    deployment
        .run(|context| async move {
            let mut properties = PropertyMap::new();
            properties.insert("password", Input::secret(PropertyValue::from("hunter2")));
            context
                .primitive_resource(
                    "acme:storage:Database",
                    "db",
                    Vec::new(),
                    properties,
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .unwrap();

    let request = monitor.request_for("db").expect("registered");
    assert_eq!(
        request.object["password"],
        json!({ SIG_KEY: SECRET_SIG, "value": "hunter2" })
    );
    assert!(request.accept_secrets);
}

#[tokio::test]
async fn unknown_values_cross_as_the_sentinel_in_previews() {
    let monitor = Arc::new(RecordingMonitor::new());
    // No planned response: in a preview the default formula still answers,
    // but the db's endpoint is never in the bag, so it settles unknown and
    // flows into the dependent as the sentinel.
    let deployment = deployment_for(&monitor, true);

    deployment
        .run(|context| async move {
            let db = context
                .primitive_resource(
                    "acme:storage:Database",
                    "db",
                    vec!["endpoint".to_string()],
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;

            let mut properties = PropertyMap::new();
            properties.insert("conn", db.output("endpoint").expect("declared"));
            context
                .primitive_resource(
                    "acme:compute:Instance",
                    "app",
                    Vec::new(),
                    properties,
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .unwrap();

    let request = monitor.request_for("app").expect("registered");
    assert_eq!(request.object["conn"], json!(UNKNOWN_VALUE));
}

#[tokio::test]
async fn options_are_plumbed_onto_the_request() {
    let monitor = Arc::new(RecordingMonitor::new());
    let deployment = deployment_for(&monitor, false);

    deployment
        .run(|context| async move {
            context
                .primitive_resource(
                    "acme:storage:Database",
                    "db",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new()
                        .with_protect(true)
                        .with_version("2.3.1")
                        .with_import(ExternalId::new("db-adopted"))
                        .with_delete_before_replace(false)
                        .with_additional_secret_output("connection_string")
                        .ignore_change("tags")
                        .with_custom_timeouts(CustomTimeouts::all("10m")),
                )
                .map_err(|error| error.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .unwrap();

    let request = monitor.request_for("db").expect("registered");
    assert!(request.protect);
    assert_eq!(request.version, "2.3.1");
    assert_eq!(request.import_id.as_ref().map(ExternalId::as_str), Some("db-adopted"));
    assert!(!request.delete_before_replace);
    assert!(request.delete_before_replace_defined);
    assert_eq!(request.additional_secret_outputs, vec!["connection_string"]);
    assert_eq!(request.ignore_changes, vec!["tags"]);
    assert_eq!(request.custom_timeouts.create.as_deref(), Some("10m"));
}

#[tokio::test]
async fn provider_references_await_the_provider_registration() {
    let monitor = Arc::new(RecordingMonitor::new());
    let deployment = deployment_for(&monitor, false);

    deployment
        .run(|context| async move {
            let provider = context
                .primitive_resource(
                    "strata:providers:acme",
                    "eu-central",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;
            context
                .primitive_resource(
                    "acme:compute:Instance",
                    "app",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new().with_provider(&provider),
                )
                .map_err(|error| error.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .unwrap();

    let request = monitor.request_for("app").expect("registered");
    assert_eq!(
        request.provider.as_deref(),
        Some("urn:strata:providers:acme::eu-central::id-eu-central")
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Program behavior
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn declaration_returns_before_registration_completes() {
    let monitor = Arc::new(RecordingMonitor::new());
    let deployment = deployment_for(&monitor, false);

    let probe = monitor.clone();
    deployment
        .run(|context| async move {
            let db = context
                .primitive_resource(
                    "acme:storage:Database",
                    "db",
                    Vec::new(),
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;

            // The handle is immediately usable; nothing has been sent yet
            // because this program has not yielded.
            assert_eq!(db.name(), "db");
            assert!(probe.request_for("db").is_none());
            Ok::<(), String>(())
        })
        .await
        .unwrap();

    assert!(monitor.request_for("db").is_some());
}

#[tokio::test]
async fn chained_outputs_resolve_inside_the_program() {
    let monitor = Arc::new(RecordingMonitor::new());
    let mut outputs = Map::new();
    outputs.insert("endpoint".to_string(), json!("db.internal"));
    monitor.respond_with(
        "db",
        RegisterResourceResponse {
            urn: Urn::new("urn:acme:storage:Database::db"),
            id: Some(ExternalId::new("db-123")),
            object: outputs,
        },
    );
    let deployment = deployment_for(&monitor, false);

    deployment
        .run(|context| async move {
            let db = context
                .primitive_resource(
                    "acme:storage:Database",
                    "db",
                    vec!["endpoint".to_string()],
                    no_properties(),
                    ResourceOptions::new(),
                )
                .map_err(|error| error.to_string())?;

            let banner = db
                .output("endpoint")
                .expect("declared")
                .map(|endpoint| format!("connected to {endpoint:?}"));
            let banner = banner.value().await.unwrap();
            assert!(banner.contains("db.internal"));
            Ok::<(), String>(())
        })
        .await
        .unwrap();
}
