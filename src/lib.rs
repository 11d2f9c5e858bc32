//! registry-mirror - container registry mirrors for Gardener shoots
//!
//! Users list upstream registries and mirror hosts in the shoot's
//! `registry-mirror` extension. This crate admits only well-formed mirror
//! configurations and writes accepted ones into the containerd section of the
//! OperatingSystemConfigs of the shoot's workers.
//!
//! # Modules
//!
//! - [`admission`] - Shoot validation, including the registry-cache cross-check
//! - [`ensurer`] - containerd registry injection into OperatingSystemConfigs
//! - [`gardener`] - Gardener resources and the readers used to fetch them
//! - [`webhook`] - axum handlers and webhook registration
//! - [`config`] - Command line and environment configuration
//! - [`server`] - Client construction and the HTTPS server

#![deny(missing_docs)]

pub mod admission;
pub mod config;
pub mod ensurer;
pub mod gardener;
pub mod server;
pub mod webhook;

pub use mirror_common::{Error, Result};
