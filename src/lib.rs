//! A client-side runtime for declarative infrastructure in Rust.
//!

pub use strata_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use strata_internal::prelude::*;
}
