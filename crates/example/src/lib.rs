//! Example web stack deployed with Strata.
//!
//! This example demonstrates the declaration model: resources are declared
//! synchronously, values flow between them as outputs, and registration
//! order falls out of what depends on what.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  core-net (network)                                  │
//! │      ▲                                               │
//! │      │ depends_on                                    │
//! │  primary-db (database) ──endpoint──┐                 │
//! │                                    ▼                 │
//! │  web-tier (composite group)                          │
//! │  ├── web-0 (instance, conn = db endpoint)            │
//! │  └── web-1 (instance, conn = db endpoint)            │
//! └──────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use strata_core::format_output;
use strata_core::input::{Input, PropertyMap};
use strata_core::output::Output;
use strata_core::property::PropertyValue;
use strata_core::resource::Resource;
use strata_runtime::deployment::Deployment;
use strata_runtime::options::{CustomTimeouts, OptionsError, ResourceOptions};

/// How many application servers the stack runs.
const SERVER_COUNT: usize = 2;

/// Handles to everything the demo stack declares.
#[derive(Debug)]
pub struct WebStack {
    /// The network everything attaches to.
    pub network: Resource,
    /// The database holding application state.
    pub database: Resource,
    /// Composite grouping the application servers.
    pub tier: Resource,
    /// The individual application servers.
    pub instances: Vec<Resource>,
    /// Application URL assembled from the database endpoint.
    pub url: Output<String>,
}

/// Declares the demo stack on `deployment`.
///
/// Declaration returns immediately for every resource; the registration
/// pipelines resolve concurrently while the deployment drains.
///
/// # Errors
///
/// Returns [`OptionsError`] when a declaration is malformed.
pub fn build_stack(deployment: &Arc<Deployment>) -> Result<WebStack, OptionsError> {
    let mut network_properties = PropertyMap::new();
    network_properties.insert("cidr", "10.0.0.0/16");
    let network = deployment.primitive_resource(
        "acme:network:Network",
        "core-net",
        vec!["cidr".to_string()],
        network_properties,
        ResourceOptions::new(),
    )?;

    let mut database_properties = PropertyMap::new();
    database_properties.insert("engine", "postgres");
    database_properties.insert("storage_gb", 64);
    database_properties.insert("password", Input::secret(PropertyValue::from("correct-horse-battery")));
    let database = deployment.primitive_resource(
        "acme:storage:Database",
        "primary-db",
        vec!["endpoint".to_string()],
        database_properties,
        ResourceOptions::new()
            .depends_on(network.clone())
            .with_custom_timeouts(CustomTimeouts::all("15m")),
    )?;

    let tier = deployment.composite_resource(
        "acme:compute:ServerGroup",
        "web-tier",
        Vec::new(),
        PropertyMap::new(),
        ResourceOptions::new(),
    )?;

    let endpoint = database
        .output("endpoint")
        .expect("endpoint is declared on the database")
        .map(property_text);

    let mut instances = Vec::with_capacity(SERVER_COUNT);
    for index in 0..SERVER_COUNT {
        let mut properties = PropertyMap::new();
        properties.insert("size", "small");
        properties.insert("conn", endpoint.clone());
        let instance = deployment.primitive_resource(
            "acme:compute:Instance",
            format!("web-{index}"),
            vec!["ip".to_string()],
            properties,
            ResourceOptions::new().with_parent(&tier),
        )?;
        instances.push(instance);
    }

    let url = format_output!("https://{}/app", endpoint);

    Ok(WebStack { network, database, tier, instances, url })
}

/// Collapses a property value to display text.
fn property_text(value: PropertyValue) -> String {
    match value {
        PropertyValue::String(text) => text,
        other => format!("{other:?}"),
    }
}
