//! Shoot admission validation

use std::collections::HashSet;
use std::sync::Arc;

use kube::api::DynamicObject;
use kube::ResourceExt;
use tracing::{debug, instrument};

use mirror_api::cache::{self, RegistryConfig};
use mirror_api::mirror::MirrorConfig;
use mirror_api::scheme::Decoder;
use mirror_api::validation::validate_mirror_config;
use mirror_common::field::{ErrorList, FieldError, Path};
use mirror_common::{
    Error, CONTAINERD_RUNTIME, REGISTRY_CACHE_EXTENSION_TYPE, REGISTRY_MIRROR_EXTENSION_TYPE,
};

use super::secrets::validate_upstream_registry_secret;
use crate::gardener::shoot::SECRET_KIND;
use crate::gardener::{SecretReader, Shoot};

/// Kind of the objects this validator admits
pub const SHOOT_KIND: &str = "Shoot";

/// Message returned when a worker pool does not run containerd
pub const CONTAINERD_REQUIRED_MSG: &str =
    "container runtime needs to be containerd when the registry-mirror extension is enabled";

/// Validates the registry-mirror configuration of shoots
///
/// Holds no per-request state and can be shared across concurrent requests.
pub struct ShootValidator {
    secrets: Arc<dyn SecretReader>,
    decoder: Decoder,
}

impl ShootValidator {
    /// Create a validator reading secrets through the given live reader
    pub fn new(secrets: Arc<dyn SecretReader>) -> Self {
        Self {
            secrets,
            decoder: Decoder::new(),
        }
    }

    /// Validate a shoot on create or update
    ///
    /// `old` is not consulted. Field problems come back as a single
    /// [`Error::Invalid`]; anything else is a fatal error.
    #[instrument(skip_all, fields(shoot = %new.name_any()))]
    pub async fn validate(
        &self,
        new: &DynamicObject,
        _old: Option<&DynamicObject>,
    ) -> Result<(), Error> {
        let shoot = decode_shoot(new)?;

        let Some((index, extension)) = shoot.spec.find_extension(REGISTRY_MIRROR_EXTENSION_TYPE)
        else {
            debug!("registry-mirror extension not enabled, nothing to validate");
            return Ok(());
        };

        if shoot
            .spec
            .provider
            .workers
            .iter()
            .any(|w| w.cri_name() != CONTAINERD_RUNTIME)
        {
            return Err(Error::precondition(CONTAINERD_REQUIRED_MSG));
        }

        let provider_config_path = Path::new("spec")
            .child("extensions")
            .index(index)
            .child("providerConfig");

        let Some(raw) = extension.provider_config() else {
            return Err(Error::Invalid(
                vec![FieldError::required(
                    &provider_config_path,
                    "providerConfig is required for the registry-mirror extension",
                )]
                .into(),
            ));
        };

        let config = self.decoder.decode_value(raw)?;
        let mut errs = validate_mirror_config(&config, &provider_config_path);

        if let Some((_, cache_extension)) = shoot.spec.find_extension(REGISTRY_CACHE_EXTENSION_TYPE)
        {
            let cache_raw = cache_extension.provider_config().ok_or_else(|| {
                Error::precondition(format!(
                    "providerConfig is required for the {REGISTRY_CACHE_EXTENSION_TYPE} extension"
                ))
            })?;
            let cache_config = cache::decode_registry_config_value(cache_raw)?;

            errs.extend(validate_upstreams_disjoint(
                &config,
                &cache_config,
                &provider_config_path,
            ));
            errs.extend(
                self.validate_credentials(&shoot, &config, &provider_config_path)
                    .await?,
            );
        }

        debug!(errors = errs.len(), "validated registry-mirror config");
        errs.into_result().map_err(Error::Invalid)
    }

    /// Check every secret referenced by a mirror host
    ///
    /// Reader failures abort validation; problems with the reference or the
    /// secret's content become field errors.
    async fn validate_credentials(
        &self,
        shoot: &Shoot,
        config: &MirrorConfig,
        fld_path: &Path,
    ) -> Result<ErrorList, Error> {
        let mut errs = ErrorList::new();
        let namespace = shoot.namespace().unwrap_or_default();

        for (i, mirror) in config.mirrors.iter().enumerate() {
            for (j, host) in mirror.hosts.iter().enumerate() {
                let Some(reference) = host.secret_reference_name.as_deref() else {
                    continue;
                };
                let ref_path = fld_path
                    .child("mirrors")
                    .index(i)
                    .child("hosts")
                    .index(j)
                    .child("secretReferenceName");

                let resource = match shoot.spec.find_resource(reference) {
                    Some(r) if r.resource_ref.kind == SECRET_KIND => r,
                    _ => {
                        errs.push(FieldError::invalid(
                            &ref_path,
                            reference,
                            format!(
                                "failed to find referenced resource with name {reference} and kind {SECRET_KIND}"
                            ),
                        ));
                        continue;
                    }
                };

                let secret = self
                    .secrets
                    .get_secret(&namespace, &resource.resource_ref.name)
                    .await?;
                errs.extend(validate_upstream_registry_secret(
                    &secret, &ref_path, reference,
                ));
            }
        }

        Ok(errs)
    }
}

/// Mirror upstreams must not also be served by a registry cache
pub fn validate_upstreams_disjoint(
    config: &MirrorConfig,
    cache_config: &RegistryConfig,
    fld_path: &Path,
) -> ErrorList {
    let cached: HashSet<&str> = cache_config.upstreams().collect();

    config
        .mirrors
        .iter()
        .enumerate()
        .filter(|(_, m)| cached.contains(m.upstream.as_str()))
        .map(|(i, m)| {
            let path = fld_path.child("mirrors").index(i).child("upstream");
            FieldError::duplicate(&path, &m.upstream).with_detail(format!(
                "upstream host '{}' is also configured as a registry cache upstream",
                m.upstream
            ))
        })
        .collect()
}

fn decode_shoot(obj: &DynamicObject) -> Result<Shoot, Error> {
    let kind = obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default();
    if kind != SHOOT_KIND {
        let kind = if kind.is_empty() { "<unknown>" } else { kind };
        return Err(Error::wrong_object_type(kind));
    }

    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|e| {
            Error::internal_with_context("shoot_validator", format!("failed to decode Shoot: {e}"))
        })
}
