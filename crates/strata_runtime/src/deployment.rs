//! The deployment context: one explicit value owning a whole run.
//!
//! Nothing here is process-global. A [`Deployment`] carries the settings,
//! the monitor channel, the task scheduler, and the resource tree root;
//! programs receive it as an argument and declare resources through it.
//! Embedding two deployments in one process, as the tests do freely, is
//! ordinary use.

use crate::config::DeploymentSettings;
use crate::monitor::ResourceMonitor;
use crate::options::{OptionsError, ResourceOptions};
use crate::register::{self, Declaration};
use crate::scheduler::TaskScheduler;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use strata_core::input::PropertyMap;
use strata_core::resource::{KeyAllocator, Resource, ResourceKind};
use thiserror::Error;
use tracing::debug;

/// Type token of the synthetic composite every deployment registers first.
/// All otherwise-parentless resources become its children.
pub const ROOT_TYPE_TOKEN: &str = "strata:runtime:Root";

// ─────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────

/// Failures reported by [`Deployment::run`].
///
/// Individual registration failures are not run failures: they are carried
/// by the affected resource's outputs and observed by whatever awaits
/// them. A run fails only when the program itself returns an error or a
/// pipeline task panics.
#[derive(Debug, Error)]
pub enum RunError {
    /// The deployment program returned an error.
    #[error("deployment program failed: {0}")]
    Program(String),

    /// A registration task panicked.
    #[error("registration task panicked: {0}")]
    TaskPanicked(String),
}

// ─────────────────────────────────────────────────────────────────────────
// Deployment
// ─────────────────────────────────────────────────────────────────────────

/// The context one deployment run lives in.
pub struct Deployment {
    settings: DeploymentSettings,
    monitor: Arc<dyn ResourceMonitor>,
    scheduler: TaskScheduler,
    keys: KeyAllocator,
    root: OnceLock<Resource>,
}

impl Deployment {
    /// Creates a deployment context over the given monitor channel.
    #[must_use]
    pub fn new(settings: DeploymentSettings, monitor: Arc<dyn ResourceMonitor>) -> Arc<Self> {
        Arc::new(Self {
            settings,
            monitor,
            scheduler: TaskScheduler::new(),
            keys: KeyAllocator::new(),
            root: OnceLock::new(),
        })
    }

    /// The settings this run was started with.
    #[must_use]
    pub fn settings(&self) -> &DeploymentSettings {
        &self.settings
    }

    /// Whether this run is a preview.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.settings.dry_run
    }

    /// The monitor channel registrations are sent over.
    #[must_use]
    pub fn monitor(&self) -> &Arc<dyn ResourceMonitor> {
        &self.monitor
    }

    pub(crate) fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// The root composite, once the run has started.
    #[must_use]
    pub fn root(&self) -> Option<&Resource> {
        self.root.get()
    }

    /// Runs a deployment program to completion.
    ///
    /// Registers the root composite, invokes `program` with this context,
    /// then drains the scheduler until no registration task is
    /// outstanding. Draining happens even when the program errors, so
    /// already-declared resources settle either way.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Program`] when the program errors and
    /// [`RunError::TaskPanicked`] when a pipeline task panicked. A program
    /// error takes precedence.
    pub async fn run<F, Fut, E>(self: &Arc<Self>, program: F) -> Result<(), RunError>
    where
        F: FnOnce(Arc<Deployment>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: fmt::Display,
    {
        self.ensure_root();
        let program_result = program(self.clone()).await;
        let drain_result = self.scheduler.drain().await;
        if let Err(error) = program_result {
            return Err(RunError::Program(error.to_string()));
        }
        drain_result.map_err(|error| RunError::TaskPanicked(error.to_string()))
    }

    /// Declares a primitive resource and starts its registration.
    ///
    /// Returns synchronously: the handle is immediately usable as a parent
    /// or dependency, while the identifier and the outputs named in
    /// `declared_outputs` resolve once the engine answers.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError`] for empty identity fields or options that
    /// do not apply to primitive resources.
    pub fn primitive_resource(
        self: &Arc<Self>,
        type_token: impl Into<String>,
        name: impl Into<String>,
        declared_outputs: Vec<String>,
        properties: PropertyMap,
        options: ResourceOptions,
    ) -> Result<Resource, OptionsError> {
        self.declare(
            type_token.into(),
            name.into(),
            ResourceKind::Primitive,
            declared_outputs,
            properties,
            options,
        )
    }

    /// Declares a composite resource and starts its registration.
    ///
    /// Composites group other resources and never correspond to an
    /// engine-managed object, so they carry no external identifier.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError`] for empty identity fields or options that
    /// do not apply to composite resources.
    pub fn composite_resource(
        self: &Arc<Self>,
        type_token: impl Into<String>,
        name: impl Into<String>,
        declared_outputs: Vec<String>,
        properties: PropertyMap,
        options: ResourceOptions,
    ) -> Result<Resource, OptionsError> {
        self.declare(
            type_token.into(),
            name.into(),
            ResourceKind::Composite,
            declared_outputs,
            properties,
            options,
        )
    }

    fn declare(
        self: &Arc<Self>,
        type_token: String,
        name: String,
        kind: ResourceKind,
        declared_outputs: Vec<String>,
        properties: PropertyMap,
        options: ResourceOptions,
    ) -> Result<Resource, OptionsError> {
        if type_token.is_empty() {
            return Err(OptionsError::EmptyTypeToken);
        }
        if name.is_empty() {
            return Err(OptionsError::EmptyName);
        }
        options.validate(kind)?;

        let ResourceOptions {
            parent,
            depends_on,
            protect,
            aliases,
            ignore_changes,
            version,
            custom_timeouts,
            provider,
            delete_before_replace,
            additional_secret_outputs,
            import,
            providers: _,
        } = options;

        // Identity, parenting, and child bookkeeping are synchronous, so
        // the handle is a valid parent or dependency the moment this
        // returns; only the pipeline task suspends.
        let effective_parent = parent.or_else(|| self.root().cloned());
        let resource = Resource::new(
            self.keys.allocate(),
            type_token,
            name,
            kind,
            effective_parent.as_ref(),
            aliases,
            declared_outputs,
        );
        debug!(resource = %resource.label(), kind = ?kind, "resource declared");

        register::start(
            self,
            resource.clone(),
            Declaration {
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
            },
        );
        Ok(resource)
    }

    fn ensure_root(self: &Arc<Self>) {
        if self.root.get().is_some() {
            return;
        }
        let name = format!("{}-{}", self.settings.project, self.settings.stack);
        let root = Resource::new(
            self.keys.allocate(),
            ROOT_TYPE_TOKEN,
            name,
            ResourceKind::Composite,
            None,
            Vec::new(),
            Vec::new(),
        );
        if self.root.set(root.clone()).is_ok() {
            register::start(self, root, Declaration::default());
        }
    }
}

impl fmt::Debug for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployment")
            .field("project", &self.settings.project)
            .field("stack", &self.settings.stack)
            .field("dry_run", &self.settings.dry_run)
            .field("pending_tasks", &self.scheduler.pending())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────
