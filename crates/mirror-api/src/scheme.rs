//! Type registry and strict codec for MirrorConfig documents
//!
//! The scheme maps `(apiVersion, kind)` to the routine that decodes that
//! version, fills its defaults and converts it to the internal form. It is
//! built once per process and read-only afterwards; [`scheme()`] hands out the
//! shared instance.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use mirror_common::Error;
use serde::Deserialize;
use tracing::debug;

use crate::mirror;
use crate::v1alpha1;

/// Decodes raw bytes of one registered version into the internal form
pub type DecodeFn = fn(&[u8]) -> Result<mirror::MirrorConfig, Error>;

/// Registry of known MirrorConfig versions
#[derive(Default)]
pub struct Scheme {
    decoders: BTreeMap<(String, String), DecodeFn>,
}

impl std::fmt::Debug for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.decoders.keys()).finish()
    }
}

impl Scheme {
    /// Empty scheme
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder for a type; registering the same type again replaces it
    pub fn add_known_type(&mut self, api_version: &str, kind: &str, decode: DecodeFn) {
        self.decoders
            .insert((api_version.to_string(), kind.to_string()), decode);
    }

    /// Whether a decoder is registered for the type
    pub fn recognizes(&self, api_version: &str, kind: &str) -> bool {
        self.decoders
            .contains_key(&(api_version.to_string(), kind.to_string()))
    }

    /// Decode a document of any registered version into the internal form
    pub fn decode(&self, raw: &[u8]) -> Result<mirror::MirrorConfig, Error> {
        let meta = TypeMeta::peek(raw)?;
        let decode = self
            .decoders
            .get(&(meta.api_version.clone(), meta.kind.clone()))
            .ok_or_else(|| meta.not_registered())?;
        decode(raw)
    }
}

/// Register all MirrorConfig versions with the scheme
///
/// Safe to call more than once.
pub fn add_to_scheme(scheme: &mut Scheme) {
    scheme.add_known_type(v1alpha1::API_VERSION, v1alpha1::KIND, decode_v1alpha1);
    debug!(
        api_version = v1alpha1::API_VERSION,
        kind = v1alpha1::KIND,
        "registered MirrorConfig version"
    );
}

/// The process-wide scheme with every version registered
pub fn scheme() -> &'static Scheme {
    static SCHEME: OnceLock<Scheme> = OnceLock::new();
    SCHEME.get_or_init(|| {
        let mut scheme = Scheme::new();
        add_to_scheme(&mut scheme);
        scheme
    })
}

/// Strict decoder for MirrorConfig provider configs
#[derive(Clone, Copy, Debug)]
pub struct Decoder {
    scheme: &'static Scheme,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Decoder backed by the process-wide scheme
    pub fn new() -> Self {
        Self { scheme: scheme() }
    }

    /// Decode, default and convert to the internal form
    pub fn decode(&self, raw: &[u8]) -> Result<mirror::MirrorConfig, Error> {
        self.scheme.decode(raw)
    }

    /// Decode a JSON value (e.g. a `RawExtension`) to the internal form
    pub fn decode_value(&self, value: &serde_json::Value) -> Result<mirror::MirrorConfig, Error> {
        let raw = serde_json::to_vec(value).map_err(|e| Error::decode(e.to_string()))?;
        self.decode(&raw)
    }

    /// Decode and default the external v1alpha1 form
    pub fn decode_v1alpha1(&self, raw: &[u8]) -> Result<v1alpha1::MirrorConfig, Error> {
        let meta = TypeMeta::peek(raw)?;
        if meta.api_version != v1alpha1::API_VERSION || meta.kind != v1alpha1::KIND {
            return Err(meta.not_registered());
        }
        decode_v1alpha1_external(raw)
    }
}

fn decode_v1alpha1(raw: &[u8]) -> Result<mirror::MirrorConfig, Error> {
    decode_v1alpha1_external(raw).map(mirror::MirrorConfig::from)
}

fn decode_v1alpha1_external(raw: &[u8]) -> Result<v1alpha1::MirrorConfig, Error> {
    let mut cfg: v1alpha1::MirrorConfig = serde_json::from_slice(raw)
        .map_err(|e| Error::decode_for_kind(v1alpha1::KIND, e.to_string()))?;
    v1alpha1::set_defaults_mirror_config(&mut cfg);
    Ok(cfg)
}

/// The type meta of a document, read leniently before strict decoding
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeMeta {
    #[serde(default)]
    api_version: String,
    #[serde(default)]
    kind: String,
}

impl TypeMeta {
    fn peek(raw: &[u8]) -> Result<Self, Error> {
        let meta: TypeMeta =
            serde_json::from_slice(raw).map_err(|e| Error::decode(e.to_string()))?;
        if meta.api_version.is_empty() || meta.kind.is_empty() {
            return Err(Error::decode("object has no apiVersion or kind set"));
        }
        Ok(meta)
    }

    fn not_registered(&self) -> Error {
        Error::decode(format!(
            "no kind {:?} is registered for version {:?}",
            self.kind, self.api_version
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "apiVersion": "mirror.extensions.gardener.cloud/v1alpha1",
        "kind": "MirrorConfig",
        "mirrors": [{"upstream": "docker.io", "hosts": [{"host": "https://mirror.gcr.io"}]}]
    }"#;

    #[test]
    fn decode_defaults_and_converts() {
        let cfg = Decoder::new().decode(MINIMAL.as_bytes()).expect("decode");
        assert_eq!(cfg.mirrors[0].upstream, "docker.io");
        assert_eq!(
            cfg.mirrors[0].hosts[0].capabilities,
            vec![mirror::MirrorHostCapability::pull()]
        );
    }

    #[test]
    fn decode_external_keeps_external_fields() {
        let raw = r#"{
            "apiVersion": "mirror.extensions.gardener.cloud/v1alpha1",
            "kind": "MirrorConfig",
            "mirrors": [{"upstream": "docker.io", "server": "https://registry-1.docker.io",
                         "hosts": [{"host": "https://mirror.gcr.io", "override_path": true}]}]
        }"#;
        let cfg = Decoder::new().decode_v1alpha1(raw.as_bytes()).expect("decode");
        assert_eq!(
            cfg.mirrors[0].server.as_deref(),
            Some("https://registry-1.docker.io")
        );
        assert!(cfg.mirrors[0].hosts[0].override_path);
        assert_eq!(
            cfg.mirrors[0].hosts[0].capabilities,
            vec![v1alpha1::MirrorHostCapability::pull()]
        );
    }

    #[test]
    fn unknown_fields_fail_decoding() {
        let raw = r#"{
            "apiVersion": "mirror.extensions.gardener.cloud/v1alpha1",
            "kind": "MirrorConfig",
            "mirrors": [],
            "caches": []
        }"#;
        let err = Decoder::new().decode(raw.as_bytes()).unwrap_err();
        assert!(err.to_string().starts_with("failed to decode providerConfig"));
        assert!(err.to_string().contains("caches"));
    }

    #[test]
    fn missing_type_meta_fails_decoding() {
        let err = Decoder::new()
            .decode(br#"{"mirrors": []}"#)
            .unwrap_err();
        assert!(err.to_string().contains("no apiVersion or kind"));
    }

    #[test]
    fn unregistered_version_fails_decoding() {
        let raw = r#"{"apiVersion": "mirror.extensions.gardener.cloud/v1", "kind": "MirrorConfig"}"#;
        let err = Decoder::new().decode(raw.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("is registered for version"));
    }

    #[test]
    fn decode_value_accepts_raw_extension_payloads() {
        let value: serde_json::Value = serde_json::from_str(MINIMAL).unwrap();
        let cfg = Decoder::new().decode_value(&value).expect("decode");
        assert_eq!(cfg.mirrors.len(), 1);
    }

    #[test]
    fn registration_is_idempotent() {
        let mut scheme = Scheme::new();
        add_to_scheme(&mut scheme);
        add_to_scheme(&mut scheme);
        assert!(scheme.recognizes(v1alpha1::API_VERSION, v1alpha1::KIND));
        assert!(scheme.decode(MINIMAL.as_bytes()).is_ok());
    }

    #[test]
    fn shared_scheme_is_initialised_once() {
        assert!(std::ptr::eq(scheme(), scheme()));
    }
}
