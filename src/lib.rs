//! # Recruiter Infer
//!
//! A model serving core for recruiter screening workloads. Self-describing
//! model artifacts are loaded into an in-memory store at startup, a batching
//! inference engine executes requests on a fixed worker pool, and an HTTP
//! gateway exposes screening, recommendation, and generic predict endpoints.
//!
//! ## Architecture
//!
//! - [`artifact`]: the on-disk model format and its validation
//! - [`models`]: the model store holding loaded artifacts
//! - [`inference`]: the batching engine and its worker pool
//! - [`api`]: the HTTP gateway, request types, and middleware
//! - [`lifecycle`]: server state machine and drain coordination
//! - [`config`]: layered configuration from defaults, file, and environment
//! - [`metrics`]: request counters and latency quantiles

pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod inference;
pub mod lifecycle;
pub mod metrics;
pub mod models;
pub mod test_utils;
pub mod utils;

pub use config::Config;
pub use error::{EngineError, Result};
pub use inference::{InferenceEngine, InferenceRequest, InferenceResponse, RequestId};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use models::{ModelHandle, ModelStore};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
