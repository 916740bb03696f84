//! Deployment runtime over the core value model.
//!
//! [`strata_core`] defines what values and resources are; this crate makes
//! declarations actually happen. A [`deployment::Deployment`] owns one
//! run: it loads [`config::DeploymentSettings`], registers a root
//! composite, hands the context to the program, and drains the
//! [`scheduler::TaskScheduler`] until every spawned registration pipeline
//! has settled.
//!
//! # Core Concepts
//!
//! - **Declaration is synchronous, registration is not.** Declaring a
//!   resource validates its [`options::ResourceOptions`], attaches it to
//!   the tree, and returns a usable handle; a spawned task then resolves
//!   prerequisites, serializes properties, and calls the monitor.
//! - **The monitor is the only exit.** Every registration becomes one
//!   [`monitor::RegisterResourceRequest`] on the
//!   [`monitor::ResourceMonitor`] seam. Production monitors speak to a
//!   real engine; [`dev::RecordingMonitor`] answers in-process.
//! - **Failures stay local.** A failed registration fails that resource's
//!   outputs with one shared cause and the run keeps draining; finalize
//!   force-settles whatever is left so nothing awaits forever.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strata_core::input::PropertyMap;
//! use strata_runtime::config::DeploymentSettings;
//! use strata_runtime::deployment::Deployment;
//! use strata_runtime::dev::RecordingMonitor;
//! use strata_runtime::options::{OptionsError, ResourceOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Builder::new_current_thread().build()?;
//! runtime.block_on(async {
//!     let monitor = Arc::new(RecordingMonitor::new());
//!     let deployment = Deployment::new(DeploymentSettings::new("acme", "dev"), monitor.clone());
//!
//!     deployment
//!         .run(|context| async move {
//!             let mut properties = PropertyMap::new();
//!             properties.insert("size", "small");
//!             context.primitive_resource(
//!                 "acme:compute:Instance",
//!                 "web",
//!                 vec!["ip".to_string()],
//!                 properties,
//!                 ResourceOptions::new(),
//!             )?;
//!             Ok::<(), OptionsError>(())
//!         })
//!         .await?;
//!
//!     let request = monitor.request_for("web").expect("web was registered");
//!     assert_eq!(request.type_token, "acme:compute:Instance");
//!     Ok::<(), Box<dyn std::error::Error>>(())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Seams**: [`monitor`] is the wire contract, [`serialize`] its value
//!   encoding. Everything the engine ever sees passes through these two.
//! - **Pipeline**: [`register`] drives prepare, send, complete, and
//!   finalize for one resource; [`dependency`] expands composite
//!   dependencies to primitive URNs during prepare.
//! - **Run plumbing**: [`deployment`] owns the context and the resource
//!   tree root, [`scheduler`] tracks pipeline tasks, [`config`] and
//!   [`telemetry`] handle bootstrap.

/// Bootstrap settings for a deployment run.
pub mod config;
/// Transitive dependency expansion across the resource tree.
pub mod dependency;
/// The deployment context owning one run.
pub mod deployment;
/// In-memory monitor for tests, demos, and local development.
pub mod dev;
/// The RPC seam to the orchestration engine.
pub mod monitor;
/// Declaration options and their kind-specific validation.
pub mod options;
/// The registration pipeline.
pub mod register;
/// Tracking of in-flight registration tasks.
pub mod scheduler;
/// Wire encoding of property bags and engine responses.
pub mod serialize;
/// Telemetry bootstrap for deployment programs.
pub mod telemetry;

/// Convenient single import for runtime users.
///
/// ```
/// use strata_runtime::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigError, DeploymentSettings};
    pub use crate::deployment::{Deployment, ROOT_TYPE_TOKEN, RunError};
    pub use crate::dev::RecordingMonitor;
    pub use crate::monitor::{
        MonitorError, RegisterResourceRequest, RegisterResourceResponse, ResourceMonitor,
    };
    pub use crate::options::{CustomTimeouts, OptionsError, ResourceOptions};
    pub use crate::register::RegistrationState;
    pub use crate::scheduler::TaskScheduler;
    pub use crate::serialize::{SerializeError, decode_output, encode_output};
    pub use crate::telemetry::{TelemetryConfig, TelemetryFormat, init_telemetry};
}

pub use config::DeploymentSettings;
pub use deployment::{Deployment, RunError};
pub use dev::RecordingMonitor;
pub use monitor::{RegisterResourceRequest, RegisterResourceResponse, ResourceMonitor};
pub use options::ResourceOptions;
