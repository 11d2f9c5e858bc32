//! Admission of shoots that enable the registry-mirror extension

pub mod secrets;
pub mod validator;

pub use secrets::validate_upstream_registry_secret;
pub use validator::{validate_upstreams_disjoint, ShootValidator, CONTAINERD_REQUIRED_MSG};
