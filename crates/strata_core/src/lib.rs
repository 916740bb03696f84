//! Core value and resource model for Strata (Layer 1).
//!
//! `strata_core` provides the dataflow containers a Strata program is
//! written in and the resource entity they feed into. Values may be
//! unknown (not yet provisioned), secret, or both, and every derived value
//! remembers which resources contributed to it.
//!
//! # Core Concepts
//!
//! - [`Output`] - Asynchronous value carrying unknown/secret taint and contributing resources
//! - [`Input`] - Normalized union of literal and asynchronous values
//! - [`Promise`](completion::Promise) - Single-assignment writer connecting the pipeline to outputs
//! - [`Resource`] - One concrete resource entity with a primitive/composite kind tag
//! - [`PropertyValue`] - Pure-data property tree, including asset and archive literals
//!
//! # Example
//!
//! ```
//! use strata_core::{Output, format_output};
//!
//! futures::executor::block_on(async {
//!     let region = Output::new("eu-west-1".to_string());
//!     let endpoint = format_output!("https://s3.{}.acme.test", region);
//!     assert_eq!(
//!         endpoint.value().await.unwrap(),
//!         "https://s3.eu-west-1.acme.test"
//!     );
//! });
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 1 of the Strata architecture:
//!
//! - **Layer 1** (`strata_core`): value and resource model (this crate)
//! - **Layer 2** (`strata_runtime`): registration pipeline, dependency walk, scheduler, RPC seam
//! - **Facade** (`strata`): re-exports everything via `strata_internal`

/// Single-assignment promises feeding resolved values into outputs.
pub mod completion;

/// Normalization of literals and asynchronous values into inputs.
pub mod input;

/// Asynchronous values with taint and dependency tracking.
pub mod output;

/// Pure-data property values, assets, and archives.
pub mod property;

/// The resource entity: identity, kind, hierarchy, declared outputs.
pub mod resource;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::completion::{PendingOutput, Promise};
    pub use crate::format_output;
    pub use crate::input::{Input, InputList, InputMap, PropertyMap};
    pub use crate::output::{Output, OutputData, OutputError};
    pub use crate::property::{Archive, Asset, PropertyValue};
    pub use crate::resource::{
        DependencySet, ExternalId, KeyAllocator, Resource, ResourceKey, ResourceKind, ResourceRef,
        Urn,
    };
}

// Re-export key types at crate root for convenience
pub use input::{Input, InputList, InputMap, PropertyMap};
pub use output::{Output, OutputData, OutputError};
pub use property::{Archive, Asset, PropertyValue};
pub use resource::{ExternalId, Resource, ResourceKind, Urn};
