//! Declaration options, validated against the declared resource kind.
//!
//! One options type covers both resource kinds. A handful of fields only
//! make sense for one kind; those are checked synchronously when the
//! declaration is made, so misuse fails before anything reaches the engine.

use serde::{Deserialize, Serialize};
use strata_core::input::{Input, InputList};
use strata_core::resource::{ExternalId, Resource, ResourceKind, Urn};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────

/// Usage errors raised synchronously at declaration time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// The resource type token was empty.
    #[error("resource type token must not be empty")]
    EmptyTypeToken,

    /// The resource name was empty.
    #[error("resource name must not be empty")]
    EmptyName,

    /// A composite-only option was supplied for a primitive resource.
    #[error("option 'providers' applies only to composite resources; use 'provider' instead")]
    ProvidersOnPrimitive,

    /// A primitive-only option was supplied for a composite resource.
    #[error("option '{0}' applies only to primitive resources")]
    PrimitiveOnly(&'static str),

    /// The provider option referenced a composite resource.
    #[error("option 'provider' must reference a primitive provider resource")]
    CompositeProvider,
}

// ─────────────────────────────────────────────────────────────────────────
// Timeouts
// ─────────────────────────────────────────────────────────────────────────

/// Per-operation timeout overrides, expressed as duration strings such as
/// `"5m"` or `"90s"`. Unset operations keep the provider default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTimeouts {
    /// Timeout for create operations.
    pub create: Option<String>,
    /// Timeout for update operations.
    pub update: Option<String>,
    /// Timeout for delete operations.
    pub delete: Option<String>,
}

impl CustomTimeouts {
    /// Overrides with every operation bounded by the same duration.
    #[must_use]
    pub fn all(duration: impl Into<String>) -> Self {
        let duration = duration.into();
        Self {
            create: Some(duration.clone()),
            update: Some(duration.clone()),
            delete: Some(duration),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────

/// Options accepted by every resource declaration.
///
/// `provider`, `delete_before_replace`, `additional_secret_outputs`, and
/// `import` apply only to primitive resources; `providers` only to
/// composites. Everything else is valid for both kinds.
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    /// Parent resource. Resources declared without a parent are adopted by
    /// the deployment root.
    pub parent: Option<Resource>,
    /// Resources that must finish registering before this one is sent.
    pub depends_on: InputList<Resource>,
    /// Asks the engine to refuse deletion while set.
    pub protect: bool,
    /// Prior identifiers this resource may be known by, so renames update
    /// in place instead of replacing.
    pub aliases: Vec<Input<Urn>>,
    /// Property names the engine must ignore when diffing.
    pub ignore_changes: Vec<String>,
    /// Provider plugin version override.
    pub version: Option<String>,
    /// Per-operation timeout overrides.
    pub custom_timeouts: Option<CustomTimeouts>,
    /// Provider resource that will handle this resource. Primitive only.
    pub provider: Option<Resource>,
    /// Forces delete-before-create replacement ordering. Primitive only.
    pub delete_before_replace: Option<bool>,
    /// Output names to additionally mark secret. Primitive only.
    pub additional_secret_outputs: Vec<String>,
    /// Adopts an existing provider object by identifier. Primitive only.
    pub import: Option<ExternalId>,
    /// Provider resources made available to descendants. Composite only.
    pub providers: Vec<Resource>,
}

impl ResourceOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parent resource.
    #[must_use]
    pub fn with_parent(mut self, parent: &Resource) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Adds one explicit dependency.
    #[must_use]
    pub fn depends_on(mut self, dependency: impl Into<Input<Resource>>) -> Self {
        self.depends_on.push(dependency);
        self
    }

    /// Asks the engine to refuse deletion.
    #[must_use]
    pub fn with_protect(mut self, protect: bool) -> Self {
        self.protect = protect;
        self
    }

    /// Adds one alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<Input<Urn>>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Adds one property name for the engine to ignore when diffing.
    #[must_use]
    pub fn ignore_change(mut self, property: impl Into<String>) -> Self {
        self.ignore_changes.push(property.into());
        self
    }

    /// Pins the provider plugin version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets per-operation timeout overrides.
    #[must_use]
    pub fn with_custom_timeouts(mut self, timeouts: CustomTimeouts) -> Self {
        self.custom_timeouts = Some(timeouts);
        self
    }

    /// Sets the handling provider. Primitive resources only.
    #[must_use]
    pub fn with_provider(mut self, provider: &Resource) -> Self {
        self.provider = Some(provider.clone());
        self
    }

    /// Forces delete-before-create replacement ordering. Primitive
    /// resources only.
    #[must_use]
    pub fn with_delete_before_replace(mut self, ordered: bool) -> Self {
        self.delete_before_replace = Some(ordered);
        self
    }

    /// Marks one output name as additionally secret. Primitive resources
    /// only.
    #[must_use]
    pub fn with_additional_secret_output(mut self, name: impl Into<String>) -> Self {
        self.additional_secret_outputs.push(name.into());
        self
    }

    /// Adopts an existing provider object. Primitive resources only.
    #[must_use]
    pub fn with_import(mut self, id: impl Into<ExternalId>) -> Self {
        self.import = Some(id.into());
        self
    }

    /// Makes provider resources available to descendants. Composite
    /// resources only.
    #[must_use]
    pub fn with_providers(mut self, providers: Vec<Resource>) -> Self {
        self.providers = providers;
        self
    }

    /// Checks kind-specific fields against the declared kind.
    pub(crate) fn validate(&self, kind: ResourceKind) -> Result<(), OptionsError> {
        match kind {
            ResourceKind::Primitive => {
                if !self.providers.is_empty() {
                    return Err(OptionsError::ProvidersOnPrimitive);
                }
                if let Some(provider) = &self.provider
                    && provider.kind().is_composite()
                {
                    return Err(OptionsError::CompositeProvider);
                }
            }
            ResourceKind::Composite => {
                if self.provider.is_some() {
                    return Err(OptionsError::PrimitiveOnly("provider"));
                }
                if self.delete_before_replace.is_some() {
                    return Err(OptionsError::PrimitiveOnly("delete_before_replace"));
                }
                if !self.additional_secret_outputs.is_empty() {
                    return Err(OptionsError::PrimitiveOnly("additional_secret_outputs"));
                }
                if self.import.is_some() {
                    return Err(OptionsError::PrimitiveOnly("import"));
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────
