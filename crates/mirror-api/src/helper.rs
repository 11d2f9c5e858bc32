//! Canonical server URLs for upstream registries

/// Upstreams whose registry API is not served at `https://<upstream>`
const KNOWN_UPSTREAM_URLS: &[(&str, &str)] = &[("docker.io", "https://registry-1.docker.io")];

/// The URL containerd uses to reach an upstream registry directly
pub fn upstream_url(upstream: &str) -> String {
    KNOWN_UPSTREAM_URLS
        .iter()
        .find(|(known, _)| *known == upstream)
        .map(|(_, url)| url.to_string())
        .unwrap_or_else(|| format!("https://{}", upstream))
}
