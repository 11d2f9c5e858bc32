//! Gardener resources the extension reads or mutates

pub mod cri;
pub mod extension;
pub mod readers;
pub mod shoot;

pub use cri::{ContainerdConfig, CriConfig, RegistryCapability, RegistryConfig, RegistryHost};
pub use extension::{Cluster, ClusterSpec, Extension, ExtensionSpec};
pub use readers::{
    ApiClusterReader, ApiSecretReader, CachedExtensionReader, ClusterContext, ClusterReader,
    ExtensionReader, GardenContext, SecretReader,
};
pub use shoot::{NamedResourceReference, Shoot, ShootExtension, ShootSpec, Worker};
