//! Conversion between v1alpha1 and the internal representation
//!
//! `server` and `override_path` only exist externally. Converting to internal
//! moves their values into the internal config's preserved fields, and
//! converting back restores them, so a round trip is lossless.

use crate::mirror;

use super::{MirrorConfig, MirrorConfiguration, MirrorHost, MirrorHostCapability, API_VERSION, KIND};

impl From<&MirrorConfig> for mirror::MirrorConfig {
    fn from(external: &MirrorConfig) -> Self {
        let mut internal = mirror::MirrorConfig::new(Vec::with_capacity(external.mirrors.len()));

        for (i, m) in external.mirrors.iter().enumerate() {
            if let Some(server) = &m.server {
                internal.preserved.servers.insert(i, server.clone());
            }
            for (j, h) in m.hosts.iter().enumerate() {
                if h.override_path {
                    internal.preserved.override_paths.insert((i, j));
                }
            }
            internal.mirrors.push(mirror::MirrorConfiguration {
                upstream: m.upstream.clone(),
                hosts: m.hosts.iter().map(mirror::MirrorHost::from).collect(),
            });
        }

        internal
    }
}

impl From<MirrorConfig> for mirror::MirrorConfig {
    fn from(external: MirrorConfig) -> Self {
        mirror::MirrorConfig::from(&external)
    }
}

impl From<&MirrorHost> for mirror::MirrorHost {
    fn from(external: &MirrorHost) -> Self {
        mirror::MirrorHost {
            host: external.host.clone(),
            capabilities: external
                .capabilities
                .iter()
                .map(|c| mirror::MirrorHostCapability::from(c.0.as_str()))
                .collect(),
            secret_reference_name: external.secret_reference_name.clone(),
        }
    }
}

impl From<&mirror::MirrorConfig> for MirrorConfig {
    fn from(internal: &mirror::MirrorConfig) -> Self {
        let mirrors = internal
            .mirrors
            .iter()
            .enumerate()
            .map(|(i, m)| MirrorConfiguration {
                upstream: m.upstream.clone(),
                server: internal.external_server(i).map(str::to_string),
                hosts: m
                    .hosts
                    .iter()
                    .enumerate()
                    .map(|(j, h)| MirrorHost {
                        host: h.host.clone(),
                        capabilities: h
                            .capabilities
                            .iter()
                            .map(|c| MirrorHostCapability(c.as_str().to_string()))
                            .collect(),
                        override_path: internal.external_override_path(i, j),
                        secret_reference_name: h.secret_reference_name.clone(),
                    })
                    .collect(),
            })
            .collect();

        MirrorConfig {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            mirrors,
        }
    }
}
