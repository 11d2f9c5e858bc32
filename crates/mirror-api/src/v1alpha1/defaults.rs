//! Default values for the v1alpha1 MirrorConfig
//!
//! Defaults are applied exactly once, right after decoding.

use super::{MirrorConfig, MirrorHostCapability};

/// Fill unset fields with their defaults
///
/// Hosts without capabilities get `[pull]`.
pub fn set_defaults_mirror_config(cfg: &mut MirrorConfig) {
    for host in cfg.mirrors.iter_mut().flat_map(|m| m.hosts.iter_mut()) {
        if host.capabilities.is_empty() {
            host.capabilities = vec![MirrorHostCapability::pull()];
        }
    }
}
