//! Hierarchical configuration loader with precedence
//!
//! Loads installer configuration from multiple sources with the following
//! precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. User config (~/.keystone/installer.yaml, or an explicit file)
//! 3. Environment variables (KEYSTONE_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::{InstallerConfig, TrustPolicy};
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// File name of the user-level installer configuration
const USER_CONFIG_FILE: &str = "installer.yaml";

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a loader rooted at the standard config directory (~/.keystone)
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    fn get_config_dir() -> Result<Utf8PathBuf> {
        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| Error::invalid_config("Could not determine home directory"))?;

        Ok(Utf8PathBuf::from(home).join(".keystone"))
    }

    /// Load installer configuration with hierarchical precedence
    pub fn load(&self) -> Result<InstallerConfig> {
        let user_config = self.config_dir.join(USER_CONFIG_FILE);
        let overlay = if user_config.exists() {
            Some(self.load_yaml_file::<InstallerConfig>(&user_config)?)
        } else {
            None
        };

        self.resolve(overlay)
    }

    /// Load installer configuration using an explicit file instead of the
    /// user config. The file must exist.
    pub fn load_from(&self, path: &Utf8Path) -> Result<InstallerConfig> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }

        let overlay = self.load_yaml_file::<InstallerConfig>(path)?;
        self.resolve(Some(overlay))
    }

    fn resolve(&self, overlay: Option<InstallerConfig>) -> Result<InstallerConfig> {
        let mut config = Self::load_embedded_config::<InstallerConfig>("installer-defaults.yaml")?;

        if let Some(overlay) = overlay {
            config = Self::merge_installer_config(config, overlay);
        }

        self.apply_env_overrides(config)
    }

    /// Load an embedded configuration file
    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        debug!("Loading installer config from {}", path);
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Merge two installer configs (base is overridden by overlay)
    fn merge_installer_config(base: InstallerConfig, overlay: InstallerConfig) -> InstallerConfig {
        let mut bundle = overlay.bundle;
        if bundle.root.is_none() {
            bundle.root = base.bundle.root;
        }

        InstallerConfig {
            release: overlay.release,
            network: overlay.network,
            bundle,
        }
    }

    /// Apply environment variable overrides to installer config
    fn apply_env_overrides(&self, mut config: InstallerConfig) -> Result<InstallerConfig> {
        if let Ok(val) = env::var("KEYSTONE_BUNDLE_ROOT") {
            config.bundle.root = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var("KEYSTONE_RELEASE_BASE_URL") {
            config.release.base_url = val;
        }

        if let Ok(val) = env::var("KEYSTONE_USER_AGENT") {
            config.network.user_agent = val;
        }

        if let Ok(val) = env::var("KEYSTONE_DOWNLOAD_TIMEOUT_SECS") {
            config.network.download_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("KEYSTONE_DOWNLOAD_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("KEYSTONE_TLS") {
            config.network.tls = val.parse::<TrustPolicy>().map_err(Error::invalid_config)?;
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
