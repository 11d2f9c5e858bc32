//! Structural validation of a MirrorConfig document

use std::collections::HashSet;

use mirror_common::field::{ErrorList, FieldError, Path};

use crate::mirror::{MirrorConfig, MirrorHostCapability, SUPPORTED_CAPABILITIES};

use super::url::{validate_upstream, validate_url_path};

/// Validate a MirrorConfig, reporting every problem in document order
///
/// A user-supplied `server` from the external document is validated as a URL
/// when present.
pub fn validate_mirror_config(cfg: &MirrorConfig, fld_path: &Path) -> ErrorList {
    let mut errs = ErrorList::new();
    let mirrors_path = fld_path.child("mirrors");

    if cfg.mirrors.is_empty() {
        errs.push(FieldError::required(
            &mirrors_path,
            "at least one mirror must be configured",
        ));
    }

    let mut upstreams = HashSet::new();
    for (i, mirror) in cfg.mirrors.iter().enumerate() {
        let mirror_path = mirrors_path.index(i);
        let upstream_path = mirror_path.child("upstream");

        errs.extend(validate_upstream(&upstream_path, &mirror.upstream));
        if !upstreams.insert(mirror.upstream.as_str()) {
            errs.push(FieldError::duplicate(&upstream_path, &mirror.upstream));
        }

        if let Some(server) = cfg.external_server(i) {
            errs.extend(validate_url_path(&mirror_path.child("server"), server));
        }

        let hosts_path = mirror_path.child("hosts");
        if mirror.hosts.is_empty() {
            errs.push(FieldError::required(
                &hosts_path,
                "at least one host must be configured",
            ));
        }

        let mut hosts = HashSet::new();
        for (j, host) in mirror.hosts.iter().enumerate() {
            let host_path = hosts_path.index(j);
            let url_path = host_path.child("host");

            errs.extend(validate_url_path(&url_path, &host.host));
            if !hosts.insert(host.host.as_str()) {
                errs.push(FieldError::duplicate(&url_path, &host.host));
            }

            errs.extend(validate_capabilities(
                &host_path.child("capabilities"),
                &host.capabilities,
            ));
        }
    }

    errs
}

/// Every capability must be supported and appear at most once
pub fn validate_capabilities(fld_path: &Path, capabilities: &[MirrorHostCapability]) -> ErrorList {
    let mut errs = ErrorList::new();
    let mut seen = HashSet::new();

    for (k, capability) in capabilities.iter().enumerate() {
        let path = fld_path.index(k);
        if !capability.is_supported() {
            errs.push(FieldError::not_supported(
                &path,
                capability.as_str(),
                &SUPPORTED_CAPABILITIES,
            ));
        } else if !seen.insert(capability) {
            errs.push(FieldError::duplicate(&path, capability.as_str()));
        }
    }

    errs
}
