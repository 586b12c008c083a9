//! CLI command implementations

pub mod clean;
pub mod config;
pub mod install;
pub mod status;
pub mod version;

use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use keystone_core::{BundleLayout, HierarchicalConfigLoader, InstallerConfig};
use std::path::Path;

/// Load the installer configuration, from `path` when given
pub(crate) fn load_config(path: Option<&Utf8Path>) -> Result<InstallerConfig> {
    let loader = HierarchicalConfigLoader::new().context("Failed to locate configuration")?;
    let config = match path {
        Some(path) => loader.load_from(path),
        None => loader.load(),
    };
    config.context("Failed to load installer configuration")
}

/// Load the configuration with an optional bundle directory override
pub(crate) fn load_config_for(
    path: Option<&Utf8Path>,
    bundle_dir: Option<&Path>,
) -> Result<InstallerConfig> {
    let mut config = load_config(path)?;
    if let Some(dir) = bundle_dir {
        config.bundle.root = Some(dir.to_path_buf());
    }
    Ok(config)
}

/// Resolve the bundle layout from configuration
pub(crate) fn resolve_layout(config: &InstallerConfig) -> Result<BundleLayout> {
    config
        .layout()
        .ok_or_else(|| anyhow!("Could not determine a bundle directory; pass --bundle-dir"))
}
