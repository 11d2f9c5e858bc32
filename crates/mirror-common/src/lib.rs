//! Common types for the registry-mirror extension: errors, field-error
//! aggregates, telemetry and Kubernetes client helpers

#![deny(missing_docs)]

pub mod error;
pub mod field;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension type of the registry mirror extension
pub const REGISTRY_MIRROR_EXTENSION_TYPE: &str = "registry-mirror";

/// Extension type of the sibling registry cache extension
pub const REGISTRY_CACHE_EXTENSION_TYPE: &str = "registry-cache";

/// The only container runtime the mirror configuration can be rendered for
pub const CONTAINERD_RUNTIME: &str = "containerd";
