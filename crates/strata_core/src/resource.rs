//! The resource entity: identity, kind, hierarchy, and declared outputs.
//!
//! A [`Resource`] is one concrete entity carrying a [`ResourceKind`] tag
//! rather than a class hierarchy: primitive resources are provisioned by an
//! external provider and carry an external identifier, composite resources
//! only aggregate children. The handle is cheap to clone and compares by
//! identity.
//!
//! Identity and child bookkeeping are established synchronously at
//! construction, before any registration work suspends, so a resource is
//! structurally visible to concurrently-constructing children while its own
//! registration is still in flight.
//!
//! Value containers reference resources through the non-owning
//! [`ResourceRef`]; the parent/child tree (rooted in the deployment
//! context) is what keeps resources alive.

use crate::completion::{PendingOutput, Promise};
use crate::input::Input;
use crate::output::Output;
use crate::property::PropertyValue;
use core::fmt;
use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

// ─────────────────────
// Identifiers
// ─────────────────────

/// Engine-assigned stable identifier of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    /// Creates a URN from its string form.
    #[must_use]
    pub fn new(urn: impl Into<String>) -> Self {
        Self(urn.into())
    }

    /// The string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty placeholder URN.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Urn {
    fn from(urn: String) -> Self {
        Self(urn)
    }
}

impl From<&str> for Urn {
    fn from(urn: &str) -> Self {
        Self(urn.to_string())
    }
}

/// Provider-assigned external identifier of a primitive resource.
///
/// Empty in engine responses while the resource has not been created yet
/// (previews), which is surfaced as an unknown value rather than an empty
/// known one.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Creates an external identifier from its string form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty (not yet assigned).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExternalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ExternalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ─────────────────────
// Kind and identity
// ─────────────────────

/// Distinguishes externally provisioned resources from pure groupings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Provisioned by an external provider; carries an external identifier.
    Primitive,
    /// Aggregates child resources without being provisioned itself.
    Composite,
}

impl ResourceKind {
    /// Whether this is [`ResourceKind::Primitive`].
    #[must_use]
    pub fn is_primitive(self) -> bool {
        matches!(self, Self::Primitive)
    }

    /// Whether this is [`ResourceKind::Composite`].
    #[must_use]
    pub fn is_composite(self) -> bool {
        matches!(self, Self::Composite)
    }
}

/// Process-unique identity of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey(u64);

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource_{}", self.0)
    }
}

/// Allocates process-unique resource keys.
///
/// Cloning shares the underlying counter.
#[derive(Debug, Clone, Default)]
pub struct KeyAllocator {
    next: Arc<AtomicU64>,
}

impl KeyAllocator {
    /// Creates an allocator starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused key.
    pub fn allocate(&self) -> ResourceKey {
        ResourceKey(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

// ─────────────────────
// Resource
// ─────────────────────

struct ResourceState {
    key: ResourceKey,
    type_token: String,
    name: String,
    kind: ResourceKind,
    parent: Option<Weak<ResourceState>>,
    children: Mutex<HashSet<Resource>>,
    aliases: Vec<Input<Urn>>,
    urn: Promise<Urn>,
    external_id: Option<Promise<ExternalId>>,
    outputs: HashMap<String, Promise<PropertyValue>>,
}

/// Handle to one declared resource.
///
/// Cheap to clone; equality and hashing follow resource identity, not
/// structure. The registration pipeline resolves the identifier and output
/// fields exactly once, asynchronously, after the registration call
/// completes or fails.
#[derive(Clone)]
pub struct Resource {
    state: Arc<ResourceState>,
}

impl Resource {
    /// Creates a resource node and attaches it to `parent`'s children set.
    ///
    /// Normally called by the deployment context, which owns key allocation
    /// and starts the registration pipeline. Everything here is synchronous:
    /// the node is structurally visible before any registration work runs.
    #[must_use]
    pub fn new(
        key: ResourceKey,
        type_token: impl Into<String>,
        name: impl Into<String>,
        kind: ResourceKind,
        parent: Option<&Resource>,
        aliases: Vec<Input<Urn>>,
        output_names: Vec<String>,
    ) -> Self {
        let state = Arc::new_cyclic(|weak: &Weak<ResourceState>| {
            let self_ref = ResourceRef {
                key,
                state: weak.clone(),
            };
            let deps = DependencySet::from_iter([self_ref]);
            ResourceState {
                key,
                type_token: type_token.into(),
                name: name.into(),
                kind,
                parent: parent.map(|p| Arc::downgrade(&p.state)),
                children: Mutex::new(HashSet::new()),
                aliases,
                urn: Promise::with_dependencies(deps.clone()),
                external_id: kind
                    .is_primitive()
                    .then(|| Promise::with_dependencies(deps.clone())),
                outputs: output_names
                    .into_iter()
                    .map(|name| {
                        let promise = Promise::with_dependencies(deps.clone());
                        (name, promise)
                    })
                    .collect(),
            }
        });
        let resource = Self { state };
        if let Some(parent) = parent {
            parent.state.children.lock().insert(resource.clone());
        }
        resource
    }

    /// The process-unique identity key.
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        self.state.key
    }

    /// The resource type token, e.g. `acme:compute:Instance`.
    #[must_use]
    pub fn type_token(&self) -> &str {
        &self.state.type_token
    }

    /// The display name given at declaration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Primitive or composite.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.state.kind
    }

    /// Display label used in logs and failure causes.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}[{}]", self.state.name, self.state.type_token)
    }

    /// The parent handle, if one was declared and is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Resource> {
        self.state
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|state| Resource { state })
    }

    /// Snapshot of the children set.
    #[must_use]
    pub fn children(&self) -> Vec<Resource> {
        self.state.children.lock().iter().cloned().collect()
    }

    /// Declared alias expressions, unresolved.
    #[must_use]
    pub fn aliases(&self) -> &[Input<Urn>] {
        &self.state.aliases
    }

    /// The resolved-identifier future.
    #[must_use]
    pub fn urn(&self) -> Output<Urn> {
        self.state.urn.output()
    }

    /// The provider-assigned identifier future; `None` for composites.
    #[must_use]
    pub fn external_id(&self) -> Option<Output<ExternalId>> {
        self.state.external_id.as_ref().map(Promise::output)
    }

    /// A declared output field by name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<Output<PropertyValue>> {
        self.state.outputs.get(name).map(Promise::output)
    }

    /// The promise backing the identifier future.
    #[must_use]
    pub fn urn_promise(&self) -> &Promise<Urn> {
        &self.state.urn
    }

    /// The promise backing the external identifier future.
    #[must_use]
    pub fn external_id_promise(&self) -> Option<&Promise<ExternalId>> {
        self.state.external_id.as_ref()
    }

    /// Declared output fields and their backing promises.
    pub fn output_promises(&self) -> impl Iterator<Item = (&str, &Promise<PropertyValue>)> {
        self.state
            .outputs
            .iter()
            .map(|(name, promise)| (name.as_str(), promise))
    }

    /// Every promise of this resource viewed uniformly, for the failure
    /// and finalization sweeps.
    #[must_use]
    pub fn pending_outputs(&self) -> Vec<&dyn PendingOutput> {
        let mut pending: Vec<&dyn PendingOutput> = Vec::with_capacity(2 + self.state.outputs.len());
        pending.push(&self.state.urn);
        if let Some(id) = self.state.external_id.as_ref() {
            pending.push(id);
        }
        pending.extend(
            self.state
                .outputs
                .values()
                .map(|promise| promise as &dyn PendingOutput),
        );
        pending
    }

    /// A non-owning reference for dependency sets.
    #[must_use]
    pub fn downgrade(&self) -> ResourceRef {
        ResourceRef {
            key: self.state.key,
            state: Arc::downgrade(&self.state),
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.state.key == other.state.key
    }
}

impl Eq for Resource {}

impl core::hash::Hash for Resource {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.state.key.hash(state);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("key", &self.state.key)
            .field("type_token", &self.state.type_token)
            .field("name", &self.state.name)
            .field("kind", &self.state.kind)
            .finish_non_exhaustive()
    }
}

// ─────────────────────
// Non-owning references
// ─────────────────────

/// Non-owning reference to a resource, stored in dependency sets.
///
/// Value containers track contributing resources by identity without
/// keeping them alive; the deployment tree owns resource lifetimes.
#[derive(Clone)]
pub struct ResourceRef {
    key: ResourceKey,
    state: Weak<ResourceState>,
}

impl ResourceRef {
    /// The referenced resource's identity.
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Upgrades to a full handle if the resource is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Resource> {
        self.state.upgrade().map(|state| Resource { state })
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ResourceRef {}

impl core::hash::Hash for ResourceRef {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceRef").field(&self.key).finish()
    }
}

/// Set of contributing resources carried by value containers.
pub type DependencySet = HashSet<ResourceRef>;
