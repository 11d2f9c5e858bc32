//! Host, port and URL validation
//!
//! Pure functions: nothing here performs I/O or name resolution.

use mirror_common::field::{ErrorList, FieldError, Path};

/// Maximum length of an RFC 1123 subdomain
const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
/// Maximum length of a single RFC 1123 label
const DNS1123_LABEL_MAX_LENGTH: usize = 63;

/// Message for hosts that are not RFC 1123 subdomains
pub const INVALID_SUBDOMAIN_MSG: &str = "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character";
/// Message for malformed ports
pub const INVALID_PORT_MSG: &str = "port must be a number between 1 and 65535 without leading zeros";
/// Message for URLs without an http(s) scheme
pub const INVALID_SCHEME_MSG: &str = "url must start with 'http://' or 'https://' scheme";

/// Characters allowed in a URL path: RFC 3986 unreserved, reserved and `%`
const URL_PATH_PUNCTUATION: &str = "-._~:/?#[]@!$&'()*+,;=%";

/// Validate `host[:port]`, returning one message per problem
pub fn validate_host_port(s: &str) -> Vec<String> {
    if s.is_empty() {
        return vec!["host must not be empty".to_string()];
    }

    let (host, port) = match s.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (s, None),
    };

    let mut msgs = Vec::new();
    if !is_dns1123_subdomain(host) {
        msgs.push(INVALID_SUBDOMAIN_MSG.to_string());
    }
    if let Some(port) = port {
        if !is_valid_port(port) {
            msgs.push(INVALID_PORT_MSG.to_string());
        }
    }
    msgs
}

/// Validate a full `scheme://host[:port][/path]` URL
///
/// Every problem is reported as an Invalid error at `fld_path`.
pub fn validate_url_path(fld_path: &Path, url: &str) -> ErrorList {
    let mut errs = ErrorList::new();
    let mut invalid = |detail: &str| errs.push(FieldError::invalid(fld_path, url, detail));

    let (scheme, rest) = url.split_once("://").unwrap_or(("", url));
    if scheme != "http" && scheme != "https" {
        invalid(INVALID_SCHEME_MSG);
    }

    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };

    for msg in validate_host_port(authority) {
        invalid(&msg);
    }

    if !path.is_empty() {
        if !path.starts_with('/') {
            invalid("path must start with '/'");
        }
        if path.chars().any(char::is_whitespace) {
            invalid("path must not contain spaces");
        }
        if path
            .chars()
            .any(|c| !c.is_whitespace() && !is_url_path_char(c))
        {
            invalid("path contains characters that are not allowed in a URL");
        }
    }

    errs
}

/// Validate an upstream registry host, `host[:port]` without scheme or path
pub fn validate_upstream(fld_path: &Path, upstream: &str) -> ErrorList {
    let mut errs = ErrorList::new();
    let mut invalid = |detail: &str| errs.push(FieldError::invalid(fld_path, upstream, detail));

    if upstream.contains("://") {
        invalid("upstream must not include a scheme");
        return errs;
    }
    if upstream.contains('/') {
        invalid("upstream must not include a path");
    }
    if upstream.starts_with('.') {
        invalid("upstream must not start with '.'");
    }
    if upstream.ends_with('.') {
        invalid("upstream must not end with '.'");
    }

    let host_port = upstream.split('/').next().unwrap_or_default();
    for msg in validate_host_port(host_port) {
        invalid(&msg);
    }

    errs
}

fn is_dns1123_subdomain(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= DNS1123_SUBDOMAIN_MAX_LENGTH
        && s.split('.').all(is_dns1123_label)
}

fn is_dns1123_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            label.len() <= DNS1123_LABEL_MAX_LENGTH
                && is_lower_alnum(*first)
                && is_lower_alnum(*last)
                && bytes.iter().all(|b| is_lower_alnum(*b) || *b == b'-')
        }
        _ => false,
    }
}

fn is_lower_alnum(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}

fn is_valid_port(port: &str) -> bool {
    if port.is_empty() || port.starts_with('0') || !port.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(port.parse::<u32>(), Ok(1..=65535))
}

fn is_url_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || URL_PATH_PUNCTUATION.contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_common::field::ErrorType;
    use rstest::rstest;

    fn path() -> Path {
        Path::new("mirrors").index(0).child("hosts").index(0).child("host")
    }

    #[rstest]
    #[case::plain("docker.io")]
    #[case::with_port("registry.example.com:5000")]
    #[case::max_port("registry.example.com:65535")]
    #[case::single_label("localhost")]
    #[case::digits("10.0.0.1")]
    fn valid_host_ports(#[case] input: &str) {
        assert!(validate_host_port(input).is_empty(), "{input} should be valid");
    }

    #[rstest]
    #[case::empty("")]
    #[case::uppercase("Docker.io")]
    #[case::leading_hyphen("-docker.io")]
    #[case::trailing_dot("docker.io.")]
    #[case::empty_label("docker..io")]
    #[case::underscore("my_registry.io")]
    #[case::zero_port("docker.io:0")]
    #[case::leading_zero_port("docker.io:0443")]
    #[case::port_too_large("docker.io:65536")]
    #[case::non_numeric_port("docker.io:https")]
    #[case::empty_port("docker.io:")]
    fn invalid_host_ports(#[case] input: &str) {
        assert!(!validate_host_port(input).is_empty(), "{input} should be invalid");
    }

    #[test]
    fn overlong_label_is_invalid() {
        let label = "a".repeat(64);
        assert!(!validate_host_port(&format!("{label}.io")).is_empty());
        assert!(validate_host_port(&format!("{}.io", "a".repeat(63))).is_empty());
    }

    #[rstest]
    #[case::https("https://mirror.gcr.io")]
    #[case::http_port("http://10.0.0.1:5000")]
    #[case::path("https://mirror.example.com/v2/docker-hub")]
    #[case::reserved_chars("https://mirror.example.com/a~b;c=d%20e")]
    fn valid_urls(#[case] url: &str) {
        let errs = validate_url_path(&path(), url);
        assert!(errs.is_empty(), "{url}: {errs}");
    }

    #[test]
    fn missing_scheme_is_single_invalid_error() {
        let errs = validate_url_path(&path(), "public-mirror.example.com");
        assert_eq!(errs.len(), 1);
        let err = errs.iter().next().unwrap();
        assert_eq!(err.error_type, ErrorType::Invalid);
        assert_eq!(err.field, "mirrors[0].hosts[0].host");
        assert_eq!(err.detail, INVALID_SCHEME_MSG);
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let errs = validate_url_path(&path(), "ftp://mirror.example.com");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.iter().next().unwrap().detail, INVALID_SCHEME_MSG);
    }

    #[test]
    fn url_errors_accumulate() {
        let errs = validate_url_path(&path(), "ftp://Mirror.example.com:0/a b");
        let details: Vec<&str> = errs.iter().map(|e| e.detail.as_str()).collect();
        assert_eq!(
            details,
            vec![
                INVALID_SCHEME_MSG,
                INVALID_SUBDOMAIN_MSG,
                INVALID_PORT_MSG,
                "path must not contain spaces",
            ]
        );
    }

    #[test]
    fn disallowed_path_characters_are_rejected() {
        let errs = validate_url_path(&path(), "https://mirror.example.com/a\"b");
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn empty_authority_is_rejected() {
        let errs = validate_url_path(&path(), "https:///v2");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.iter().next().unwrap().detail, "host must not be empty");
    }

    #[rstest]
    #[case::plain("docker.io")]
    #[case::with_port("registry.example.com:5000")]
    fn valid_upstreams(#[case] upstream: &str) {
        assert!(validate_upstream(&Path::new("upstream"), upstream).is_empty());
    }

    #[rstest]
    #[case::empty("")]
    #[case::trailing_dot("docker.io.")]
    #[case::leading_dot(".docker.io")]
    #[case::scheme("https://docker.io")]
    #[case::leading_zero_port("docker.io:0443")]
    #[case::path("docker.io/library")]
    fn invalid_upstreams(#[case] upstream: &str) {
        let errs = validate_upstream(&Path::new("upstream"), upstream);
        assert!(!errs.is_empty(), "{upstream:?} should be invalid");
        assert!(errs
            .iter()
            .all(|e| e.error_type == ErrorType::Invalid && e.field == "upstream"));
    }

    #[test]
    fn scheme_in_upstream_reports_only_the_scheme() {
        let errs = validate_upstream(&Path::new("upstream"), "https://docker.io");
        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs.iter().next().unwrap().detail,
            "upstream must not include a scheme"
        );
    }
}
