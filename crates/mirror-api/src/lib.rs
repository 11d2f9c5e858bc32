//! MirrorConfig API for the registry-mirror extension
//!
//! # Modules
//!
//! - [`mirror`] - internal (in-memory) MirrorConfig representation
//! - [`v1alpha1`] - external wire version with defaulting and conversion
//! - [`scheme`] - process-wide type registry and strict codec
//! - [`validation`] - URL/host and MirrorConfig validation
//! - [`helper`] - canonical server URLs for well-known upstreams
//! - [`cache`] - sibling registry-cache provider config, used for cross-checks

#![deny(missing_docs)]

pub mod cache;
pub mod helper;
pub mod mirror;
pub mod scheme;
pub mod v1alpha1;
pub mod validation;

/// API group of the MirrorConfig provider config
pub const GROUP_NAME: &str = "mirror.extensions.gardener.cloud";
