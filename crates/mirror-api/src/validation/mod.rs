//! Validation of MirrorConfig documents and their URLs

mod config;
mod url;

pub use config::{validate_capabilities, validate_mirror_config};
pub use url::{
    validate_host_port, validate_upstream, validate_url_path, INVALID_PORT_MSG,
    INVALID_SCHEME_MSG, INVALID_SUBDOMAIN_MSG,
};
