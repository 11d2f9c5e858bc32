//! Validation of upstream registry credential secrets

use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;

use mirror_common::field::{ErrorList, FieldError, Path};
use mirror_common::kube_utils::object_key;

/// Data key holding the registry user name
pub const USERNAME_KEY: &str = "username";
/// Data key holding the registry password
pub const PASSWORD_KEY: &str = "password";

/// Validate a secret referenced as upstream registry credentials
///
/// The secret must be immutable and carry exactly a `username` and a
/// `password` data entry. Errors are reported at `fld_path` with the
/// reference name as the offending value.
pub fn validate_upstream_registry_secret(
    secret: &Secret,
    fld_path: &Path,
    secret_reference_name: &str,
) -> ErrorList {
    let mut errs = ErrorList::new();
    let secret_ref = object_key(&secret.namespace().unwrap_or_default(), &secret.name_any());
    let mut invalid =
        |detail: String| errs.push(FieldError::invalid(fld_path, secret_reference_name, detail));

    if secret.immutable != Some(true) {
        invalid(format!("referenced secret {secret_ref:?} should be immutable"));
    }

    let data = secret.data.as_ref();
    let entries = data.map(|d| d.len()).unwrap_or(0);
    if entries != 2 {
        invalid(format!(
            "referenced secret {secret_ref:?} should have only two data entries"
        ));
    }
    for key in [USERNAME_KEY, PASSWORD_KEY] {
        if !data.is_some_and(|d| d.contains_key(key)) {
            invalid(format!(
                "missing {key:?} data entry in referenced secret {secret_ref:?}"
            ));
        }
    }

    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn secret(immutable: Option<bool>, keys: &[&str]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("ro-docker".to_string()),
                namespace: Some("garden-team".to_string()),
                ..Default::default()
            },
            immutable,
            data: Some(
                keys.iter()
                    .map(|k| (k.to_string(), ByteString(b"value".to_vec())))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        }
    }

    fn path() -> Path {
        Path::new("spec.extensions[0].providerConfig.mirrors[0].hosts[0].secretReferenceName")
    }

    #[test]
    fn immutable_secret_with_credentials_is_valid() {
        let errs =
            validate_upstream_registry_secret(&secret(Some(true), &["username", "password"]), &path(), "creds");
        assert!(errs.is_empty(), "{errs}");
    }

    #[test]
    fn mutable_secret_is_rejected() {
        let errs =
            validate_upstream_registry_secret(&secret(None, &["username", "password"]), &path(), "creds");
        assert_eq!(errs.len(), 1);
        let err = errs.iter().next().unwrap();
        assert_eq!(err.bad_value.as_deref(), Some("creds"));
        assert_eq!(
            err.detail,
            "referenced secret \"garden-team/ro-docker\" should be immutable"
        );
    }

    #[test]
    fn extra_and_missing_keys_are_each_reported() {
        let errs =
            validate_upstream_registry_secret(&secret(Some(true), &["username", "token", "ca"]), &path(), "creds");
        let details: Vec<&str> = errs.iter().map(|e| e.detail.as_str()).collect();
        assert_eq!(
            details,
            vec![
                "referenced secret \"garden-team/ro-docker\" should have only two data entries",
                "missing \"password\" data entry in referenced secret \"garden-team/ro-docker\"",
            ]
        );
    }

    #[test]
    fn secret_without_data_reports_everything() {
        let mut s = secret(Some(false), &[]);
        s.data = None;
        let errs = validate_upstream_registry_secret(&s, &path(), "creds");
        assert_eq!(errs.len(), 4);
    }
}
