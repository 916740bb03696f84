//! # Strata Internal Library
//!
//! Re-exports the core Strata crates for convenience.

/// Layer 1: values, resources, and the dependency model.
pub use strata_core;

/// Layer 2: the deployment runtime and engine seam.
pub use strata_runtime;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use strata_core::prelude::*;
    pub use strata_runtime::prelude::*;
}
