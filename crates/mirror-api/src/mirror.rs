//! Internal MirrorConfig representation
//!
//! This is the canonical in-memory shape consumed by the validators and the
//! OperatingSystemConfig ensurer. It is never serialized; documents reach it
//! through [`crate::scheme::Decoder`], which decodes the external version,
//! fills defaults and converts.

use std::collections::{BTreeMap, BTreeSet};

/// Capability value for pulling manifests and blobs by digest
pub const CAPABILITY_PULL: &str = "pull";
/// Capability value for resolving manifests by name
pub const CAPABILITY_RESOLVE: &str = "resolve";
/// All capability values a mirror host may declare
pub const SUPPORTED_CAPABILITIES: [&str; 2] = [CAPABILITY_PULL, CAPABILITY_RESOLVE];

/// Mirror configuration for a shoot
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MirrorConfig {
    /// Mirrors in declaration order
    pub mirrors: Vec<MirrorConfiguration>,
    /// Values of external-only fields, kept so conversion back is lossless
    pub(crate) preserved: PreservedFields,
}

impl MirrorConfig {
    /// Build a config from mirrors with no external-only values
    pub fn new(mirrors: Vec<MirrorConfiguration>) -> Self {
        Self {
            mirrors,
            preserved: PreservedFields::default(),
        }
    }

    /// User-supplied `server` of the mirror at `index` in the external document
    pub fn external_server(&self, index: usize) -> Option<&str> {
        self.preserved.servers.get(&index).map(String::as_str)
    }

    /// Whether the external document set `override_path` on the given host
    pub fn external_override_path(&self, mirror: usize, host: usize) -> bool {
        self.preserved.override_paths.contains(&(mirror, host))
    }

    /// All mirror upstreams in declaration order
    pub fn upstreams(&self) -> impl Iterator<Item = &str> {
        self.mirrors.iter().map(|m| m.upstream.as_str())
    }
}

/// Mirror hosts for one upstream registry
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MirrorConfiguration {
    /// Remote registry host being mirrored, `host[:port]`
    pub upstream: String,
    /// Mirror hosts in priority order
    pub hosts: Vec<MirrorHost>,
}

/// A single mirror host
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MirrorHost {
    /// Mirror URL, `scheme://host[:port][/path]`
    pub host: String,
    /// Operations this host is trusted to serve
    pub capabilities: Vec<MirrorHostCapability>,
    /// Name of a `spec.resources` entry referencing upstream credentials
    pub secret_reference_name: Option<String>,
}

/// Capability of a mirror host
///
/// Kept as a string so unknown values survive decoding and are reported by
/// validation instead of failing the whole document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MirrorHostCapability(String);

impl MirrorHostCapability {
    /// The `pull` capability
    pub fn pull() -> Self {
        Self(CAPABILITY_PULL.to_string())
    }

    /// The `resolve` capability
    pub fn resolve() -> Self {
        Self(CAPABILITY_RESOLVE.to_string())
    }

    /// Raw capability value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of [`SUPPORTED_CAPABILITIES`]
    pub fn is_supported(&self) -> bool {
        SUPPORTED_CAPABILITIES.contains(&self.0.as_str())
    }
}

impl From<&str> for MirrorHostCapability {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MirrorHostCapability {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// External-only field values, keyed by position in the document
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PreservedFields {
    /// `mirrors[i].server`
    pub(crate) servers: BTreeMap<usize, String>,
    /// `(i, j)` for every `mirrors[i].hosts[j].override_path == true`
    pub(crate) override_paths: BTreeSet<(usize, usize)>,
}
