//! Installer configuration types
//!
//! These types control where the bundle is downloaded from, how the HTTP
//! client behaves, and where the bundle lives on disk. The bundle version
//! itself is baked into the installer and is deliberately absent here.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::BundleLayout;

/// Complete installer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallerConfig {
    /// Release download settings
    #[serde(default)]
    pub release: ReleaseConfig,

    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Bundle location and naming
    #[serde(default)]
    pub bundle: LayoutConfig,
}

impl InstallerConfig {
    /// Resolve the bundle layout, falling back to the platform data directory
    pub fn layout(&self) -> Option<BundleLayout> {
        let root = match &self.bundle.root {
            Some(root) => root.clone(),
            None => default_bundle_root()?,
        };
        Some(BundleLayout::with_names(root, &self.bundle))
    }
}

/// Default bundle root: `<platform data dir>/core`
pub fn default_bundle_root() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "keystone").map(|dirs| dirs.data_dir().join("core"))
}

/// Where release archives are published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseConfig {
    /// Base URL; the version and asset name are appended as path segments
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Archive file name within a release
    #[serde(default = "default_asset_name")]
    pub asset_name: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            asset_name: default_asset_name(),
        }
    }
}

impl ReleaseConfig {
    /// Download URL of the archive for `version`
    pub fn download_url(&self, version: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            version,
            self.asset_name
        )
    }
}

fn default_base_url() -> String {
    "https://github.com/keystone-project/keystone-core/releases/download".to_string()
}
fn default_asset_name() -> String {
    "keystone-core.tar.gz".to_string()
}

/// Certificate validation policy for release downloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrustPolicy {
    /// Validate server certificates against the platform roots
    #[default]
    Strict,

    /// Skip certificate validation entirely
    AcceptInvalidCerts,
}

impl std::str::FromStr for TrustPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "accept-invalid-certs" => Ok(Self::AcceptInvalidCerts),
            other => Err(format!(
                "unknown TLS policy '{}' (expected 'strict' or 'accept-invalid-certs')",
                other
            )),
        }
    }
}

/// Network and HTTP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whole-download timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Certificate validation policy
    #[serde(default)]
    pub tls: TrustPolicy,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            download_timeout_secs: default_download_timeout(),
            tls: TrustPolicy::default(),
        }
    }
}

fn default_user_agent() -> String {
    "Keystone Desktop".to_string()
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    1800 // 30 minutes
}

/// Bundle root and the names of its parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LayoutConfig {
    /// Bundle root; `None` selects the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    #[serde(default = "default_clients_dir")]
    pub clients_dir: String,

    #[serde(default = "default_torrents_dir")]
    pub torrents_dir: String,

    /// Archived torrents directory, relative to the torrents directory
    #[serde(default = "default_archived_dir")]
    pub archived_dir: String,

    #[serde(default = "default_config_file")]
    pub config_file: String,

    #[serde(default = "default_version_file")]
    pub version_file: String,

    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,

    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,

    #[serde(default = "default_descriptor_extension")]
    pub descriptor_extension: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            root: None,
            clients_dir: default_clients_dir(),
            torrents_dir: default_torrents_dir(),
            archived_dir: default_archived_dir(),
            config_file: default_config_file(),
            version_file: default_version_file(),
            temp_dir: default_temp_dir(),
            artifact_extension: default_artifact_extension(),
            descriptor_extension: default_descriptor_extension(),
        }
    }
}

fn default_clients_dir() -> String {
    "clients".to_string()
}
fn default_torrents_dir() -> String {
    "torrents".to_string()
}
fn default_archived_dir() -> String {
    "archived".to_string()
}
fn default_config_file() -> String {
    "config.json".to_string()
}
fn default_version_file() -> String {
    ".core-version".to_string()
}
fn default_temp_dir() -> String {
    "update-tmp".to_string()
}
fn default_artifact_extension() -> String {
    "jar".to_string()
}
fn default_descriptor_extension() -> String {
    "client".to_string()
}
