//! The registration pipeline: prepare, send, complete, finalize.
//!
//! Each declared resource gets one spawned task that drives these stages.
//! Prepare awaits everything the request needs, which is where
//! registration ordering comes from: awaiting a dependency's URN suspends
//! this pipeline until that resource's own pipeline has completed. Send
//! hands the assembled request to the monitor. Complete writes the
//! response into the resource's promises, and failures write one shared
//! cause instead. Finalize always runs and force-settles anything still
//! pending so no awaiter hangs.

use crate::dependency;
use crate::deployment::Deployment;
use crate::monitor::{MonitorError, RegisterResourceRequest, RegisterResourceResponse};
use crate::options::CustomTimeouts;
use crate::serialize::{self, SerializeError, SerializedProperties};
use hashbrown::HashSet;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::input::{Input, InputList, PropertyMap};
use strata_core::output::OutputError;
use strata_core::resource::{ExternalId, Resource, Urn};
use thiserror::Error;
use tracing::{debug, warn};

/// Stages a registration moves through, in telemetry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// Declared; prerequisites not yet awaited.
    Pending,
    /// Every prerequisite resolved; the request can be assembled.
    DependenciesResolved,
    /// Request handed to the monitor; awaiting the engine.
    Sent,
    /// Outputs resolved from the engine's response.
    Completed,
    /// Outputs failed with the registration cause.
    Failed,
}

/// What a declaration carries into the pipeline beyond the resource node
/// itself.
#[derive(Default)]
pub(crate) struct Declaration {
    pub properties: PropertyMap,
    pub depends_on: InputList<Resource>,
    pub protect: bool,
    pub ignore_changes: Vec<String>,
    pub version: Option<String>,
    pub custom_timeouts: Option<CustomTimeouts>,
    pub provider: Option<Resource>,
    pub delete_before_replace: Option<bool>,
    pub additional_secret_outputs: Vec<String>,
    pub import: Option<ExternalId>,
}

#[derive(Debug, Error)]
enum RegistrationFailure {
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error(transparent)]
    Monitor(#[from] MonitorError),
    #[error(transparent)]
    Dependency(#[from] OutputError),
}

/// Spawns the pipeline task for one freshly declared resource and tracks
/// it with the deployment's scheduler.
pub(crate) fn start(deployment: &Arc<Deployment>, resource: Resource, declaration: Declaration) {
    let task = tokio::spawn(register_resource(
        deployment.clone(),
        resource,
        declaration,
    ));
    deployment.scheduler().track(task);
}

/// Drives one registration to completion. Never returns an error: failures
/// land on the resource's output futures, and finalization runs on every
/// path.
async fn register_resource(
    deployment: Arc<Deployment>,
    resource: Resource,
    declaration: Declaration,
) {
    let label = resource.label();
    debug!(resource = %label, state = ?RegistrationState::Pending, "registration started");

    let dry_run = deployment.dry_run();
    match register_worker(&deployment, &resource, declaration).await {
        Ok(response) => match complete_from_response(&resource, &response, dry_run) {
            Ok(()) => {
                debug!(
                    resource = %label,
                    state = ?RegistrationState::Completed,
                    urn = %response.urn,
                    "registration completed"
                );
            }
            Err(error) => {
                fail_pending(&resource, &label, &error.to_string());
            }
        },
        Err(failure) => {
            fail_pending(&resource, &label, &failure.to_string());
        }
    }

    // Unconditional: promises never left pending, whatever happened above.
    for pending in resource.pending_outputs() {
        pending.settle_default(!dry_run);
    }
}

async fn register_worker(
    deployment: &Arc<Deployment>,
    resource: &Resource,
    declaration: Declaration,
) -> Result<RegisterResourceResponse, RegistrationFailure> {
    let Declaration {
        properties,
        depends_on,
        protect,
        ignore_changes,
        version,
        custom_timeouts,
        provider,
        delete_before_replace,
        additional_secret_outputs,
        import,
    } = declaration;

    let (serialized, explicit, parent, provider_ref, aliases) = futures::try_join!(
        async {
            serialize::serialize_properties(properties)
                .await
                .map_err(RegistrationFailure::from)
        },
        async {
            depends_on
                .into_output()
                .value()
                .await
                .map_err(RegistrationFailure::from)
        },
        async { parent_urn(resource).await.map_err(RegistrationFailure::from) },
        async {
            provider_reference(provider)
                .await
                .map_err(RegistrationFailure::from)
        },
        async {
            resolve_aliases(resource.aliases())
                .await
                .map_err(RegistrationFailure::from)
        },
    )?;
    debug!(
        resource = %resource.label(),
        state = ?RegistrationState::DependenciesResolved,
        "request prerequisites resolved"
    );

    let request = assemble_request(
        resource,
        serialized,
        explicit,
        parent,
        provider_ref,
        aliases,
        RequestOptions {
            protect,
            ignore_changes,
            version,
            custom_timeouts,
            delete_before_replace,
            additional_secret_outputs,
            import,
        },
    )
    .await?;

    debug!(
        resource = %resource.label(),
        state = ?RegistrationState::Sent,
        dependencies = request.dependencies.len(),
        "registration sent"
    );
    Ok(deployment.monitor().register_resource(request).await?)
}

struct RequestOptions {
    protect: bool,
    ignore_changes: Vec<String>,
    version: Option<String>,
    custom_timeouts: Option<CustomTimeouts>,
    delete_before_replace: Option<bool>,
    additional_secret_outputs: Vec<String>,
    import: Option<ExternalId>,
}

async fn assemble_request(
    resource: &Resource,
    serialized: SerializedProperties,
    explicit: Vec<Resource>,
    parent: Option<Urn>,
    provider_reference: Option<String>,
    aliases: Vec<Urn>,
    options: RequestOptions,
) -> Result<RegisterResourceRequest, RegistrationFailure> {
    // The whole-resource set covers explicit dependencies plus everything
    // any property mentioned; each is then expanded to primitive URNs.
    let mut all_direct = explicit;
    for direct in serialized.property_dependencies.values() {
        all_direct.extend(direct.iter().cloned());
    }
    let dependencies = dependency::primitive_dependency_urns(all_direct).await?;

    let mut property_dependencies = BTreeMap::new();
    for (name, direct) in serialized.property_dependencies {
        let urns = dependency::primitive_dependency_urns(direct).await?;
        if !urns.is_empty() {
            property_dependencies.insert(name, urns.into_iter().collect());
        }
    }

    Ok(RegisterResourceRequest {
        type_token: resource.type_token().to_string(),
        name: resource.name().to_string(),
        primitive: resource.kind().is_primitive(),
        object: serialized.object,
        parent,
        provider: provider_reference,
        protect: options.protect,
        version: options.version.unwrap_or_default(),
        import_id: options.import,
        accept_secrets: true,
        additional_secret_outputs: options.additional_secret_outputs,
        ignore_changes: options.ignore_changes,
        custom_timeouts: options.custom_timeouts.unwrap_or_default(),
        delete_before_replace: options.delete_before_replace.unwrap_or(false),
        delete_before_replace_defined: options.delete_before_replace.is_some(),
        aliases,
        dependencies: dependencies.into_iter().collect(),
        property_dependencies,
    })
}

async fn parent_urn(resource: &Resource) -> Result<Option<Urn>, OutputError> {
    match resource.parent() {
        Some(parent) => Ok(Some(parent.urn().value().await?)),
        None => Ok(None),
    }
}

/// Builds the `<urn>::<id>` provider reference, awaiting the provider's
/// own registration first.
async fn provider_reference(provider: Option<Resource>) -> Result<Option<String>, OutputError> {
    let Some(provider) = provider else {
        return Ok(None);
    };
    let urn = provider.urn().value().await?;
    let id = match provider.external_id() {
        Some(output) => output.value().await?,
        None => ExternalId::default(),
    };
    Ok(Some(format!("{urn}::{id}")))
}

/// Resolves alias expressions to URNs. The first occurrence of a URN wins
/// and later duplicates are dropped, keeping the written order.
async fn resolve_aliases(aliases: &[Input<Urn>]) -> Result<Vec<Urn>, OutputError> {
    let mut resolved = Vec::with_capacity(aliases.len());
    let mut seen: HashSet<Urn> = HashSet::new();
    for alias in aliases {
        let urn = alias.clone().into_output().value().await?;
        if seen.insert(urn.clone()) {
            resolved.push(urn);
        }
    }
    Ok(resolved)
}

/// Writes the engine's response into the resource's promises.
///
/// The URN resolves first so dependents unblock as early as possible. An
/// external identifier is known only once it is non-empty; previews leave
/// it empty until the object exists. Output fields named by the response
/// resolve from the wire encoding, and fields the response omits are left
/// for finalization.
fn complete_from_response(
    resource: &Resource,
    response: &RegisterResourceResponse,
    dry_run: bool,
) -> Result<(), SerializeError> {
    resource.urn_promise().resolve(response.urn.clone(), true, false);
    if let Some(promise) = resource.external_id_promise() {
        let id = response.id.clone().unwrap_or_default();
        let known = !id.is_empty();
        promise.resolve(id, known, false);
    }
    for (name, promise) in resource.output_promises() {
        if let Some(value) = response.object.get(name) {
            let data = serialize::decode_output(name, value, dry_run)?;
            promise.resolve(data.value, data.known, data.secret);
        }
    }
    Ok(())
}

/// Fails everything still pending with one shared cause.
fn fail_pending(resource: &Resource, label: &str, reason: &str) {
    warn!(
        resource = %label,
        state = ?RegistrationState::Failed,
        reason,
        "registration failed"
    );
    let cause = OutputError::Registration {
        label: label.to_string(),
        reason: reason.to_string(),
    };
    for pending in resource.pending_outputs() {
        pending.fail_pending(&cause);
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────
