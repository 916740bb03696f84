//! The RPC seam between deployment programs and the orchestration engine.
//!
//! The runtime never talks to providers directly. Every declaration becomes
//! one [`RegisterResourceRequest`] handed to a [`ResourceMonitor`], and the
//! monitor answers with the engine's resolution. The trait is the whole
//! contract: production monitors speak the engine's wire protocol, while
//! tests and demos plug in [`crate::dev::RecordingMonitor`].

use crate::options::CustomTimeouts;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use strata_core::resource::{ExternalId, Urn};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────

/// Failures surfaced by a monitor implementation.
///
/// A monitor failure never aborts the process. The pipeline converts it
/// into a registration failure carried by the resource's output futures.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The channel to the engine is unavailable.
    #[error("monitor unavailable: {0}")]
    Unavailable(String),

    /// The engine received the registration and rejected it.
    #[error("registration rejected: {0}")]
    Rejected(String),
}

// ─────────────────────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────────────────────

/// One fully prepared resource registration.
///
/// By the time a request is built, every awaited prerequisite has resolved:
/// the property bag is encoded, the parent and alias URNs are concrete, and
/// the dependency lists are expanded, sorted, and deduplicated so the same
/// program produces the same request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResourceRequest {
    /// Resource type token, e.g. `acme:compute:Instance`.
    pub type_token: String,
    /// Name unique within the parent.
    pub name: String,
    /// Whether the resource is primitive and provisioned by a provider.
    pub primitive: bool,
    /// Encoded property bag.
    pub object: Map<String, Value>,
    /// Parent URN. `None` only for the deployment root.
    pub parent: Option<Urn>,
    /// Handling provider reference in `<urn>::<id>` form. Primitive
    /// resources only.
    pub provider: Option<String>,
    /// Whether the engine must refuse to delete this resource.
    pub protect: bool,
    /// Provider plugin version. Empty when unpinned.
    pub version: String,
    /// Identifier of an existing provider object to adopt.
    pub import_id: Option<ExternalId>,
    /// Whether the caller understands secret markers in responses. Always
    /// true for this runtime.
    pub accept_secrets: bool,
    /// Output names the engine must additionally mark secret.
    pub additional_secret_outputs: Vec<String>,
    /// Property names the engine must ignore when diffing.
    pub ignore_changes: Vec<String>,
    /// Per-operation timeout overrides.
    pub custom_timeouts: CustomTimeouts,
    /// Forces delete-before-create replacement ordering.
    pub delete_before_replace: bool,
    /// Distinguishes an explicit `delete_before_replace: false` from the
    /// option never being set.
    pub delete_before_replace_defined: bool,
    /// Resolved alias URNs in first-written order.
    pub aliases: Vec<Urn>,
    /// URNs of every primitive resource this registration depends on,
    /// sorted.
    pub dependencies: Vec<Urn>,
    /// Primitive dependency URNs keyed by property name, each list sorted.
    pub property_dependencies: BTreeMap<String, Vec<Urn>>,
}

/// The engine's answer to one registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResourceResponse {
    /// Engine-assigned stable identifier.
    pub urn: Urn,
    /// Provider-assigned identifier. Absent for composite resources, and
    /// empty during previews of yet-unprovisioned primitives.
    pub id: Option<ExternalId>,
    /// Resolved output properties in wire encoding.
    pub object: Map<String, Value>,
}

// ─────────────────────────────────────────────────────────────────────────
// The seam
// ─────────────────────────────────────────────────────────────────────────

/// Transport-agnostic channel over which resources are registered.
///
/// Implementations are called from many registration tasks at once and
/// must be safe to share.
#[async_trait]
pub trait ResourceMonitor: Send + Sync {
    /// Registers one resource and returns the engine's resolution.
    async fn register_resource(
        &self,
        request: RegisterResourceRequest,
    ) -> Result<RegisterResourceResponse, MonitorError>;
}
