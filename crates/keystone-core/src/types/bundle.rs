//! On-disk bundle layout and derived bundle state

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::LayoutConfig;

/// Every path that makes up an installed bundle.
///
/// A layout is pure naming: constructing one never touches the filesystem.
/// Only the install finalizer creates or replaces the paths it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    /// Bundle root directory
    pub root: PathBuf,

    /// Directory holding client descriptor files
    pub clients_dir: PathBuf,

    /// Torrent working directory
    pub torrents_dir: PathBuf,

    /// Archived torrents, nested inside the torrent directory
    pub archived_torrents_dir: PathBuf,

    /// User configuration document
    pub config_file: PathBuf,

    /// Version marker file
    pub version_file: PathBuf,

    /// Scratch directory used while an update is in progress
    pub temp_dir: PathBuf,

    /// File extension of executable artifacts (without the dot)
    pub artifact_extension: String,

    /// File extension of client descriptors (without the dot)
    pub descriptor_extension: String,
}

impl BundleLayout {
    /// Create a layout rooted at `root` with the default naming
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_names(root, &LayoutConfig::default())
    }

    /// Create a layout rooted at `root` using the configured names
    pub fn with_names(root: impl Into<PathBuf>, names: &LayoutConfig) -> Self {
        let root = root.into();
        let torrents_dir = root.join(&names.torrents_dir);

        Self {
            clients_dir: root.join(&names.clients_dir),
            archived_torrents_dir: torrents_dir.join(&names.archived_dir),
            torrents_dir,
            config_file: root.join(&names.config_file),
            version_file: root.join(&names.version_file),
            temp_dir: root.join(&names.temp_dir),
            artifact_extension: names.artifact_extension.clone(),
            descriptor_extension: names.descriptor_extension.clone(),
            root,
        }
    }

    /// Client directory as extracted into the temp workspace
    pub fn staged_clients_dir(&self) -> PathBuf {
        self.staged(&self.clients_dir)
    }

    /// Configuration document as extracted into the temp workspace
    pub fn staged_config_file(&self) -> PathBuf {
        self.staged(&self.config_file)
    }

    /// Whether `path` carries the executable artifact extension
    pub fn is_artifact(&self, path: &Path) -> bool {
        has_extension(path, &self.artifact_extension)
    }

    /// Whether `path` carries the client descriptor extension
    pub fn is_descriptor(&self, path: &Path) -> bool {
        has_extension(path, &self.descriptor_extension)
    }

    fn staged(&self, live: &Path) -> PathBuf {
        match live.strip_prefix(&self.root) {
            Ok(relative) => self.temp_dir.join(relative),
            Err(_) => self.temp_dir.join(live.file_name().unwrap_or_default()),
        }
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == extension)
}

/// A required part of an installed bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundlePart {
    RootDir,
    Artifact,
    ClientDescriptors,
    TorrentsDir,
    ConfigFile,
    VersionMarker,
}

impl fmt::Display for BundlePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RootDir => "bundle directory",
            Self::Artifact => "executable artifact",
            Self::ClientDescriptors => "client descriptors",
            Self::TorrentsDir => "torrents directory",
            Self::ConfigFile => "configuration file",
            Self::VersionMarker => "version marker",
        };
        f.write_str(name)
    }
}

/// State of a bundle as observed on disk.
///
/// Always derived from the filesystem by the probe, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BundleState {
    /// The bundle root does not exist
    Absent,

    /// The root exists but a required part is missing
    Incomplete { missing: BundlePart },

    /// Everything is present but the marker names another version
    Stale { installed: String },

    /// Everything is present and the marker matches the expected version
    Current,
}

impl BundleState {
    /// Whether the bundle is installed at the expected version
    pub fn is_current(&self) -> bool {
        matches!(self, Self::Current)
    }
}

impl fmt::Display for BundleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("not installed"),
            Self::Incomplete { missing } => write!(f, "incomplete (missing {})", missing),
            Self::Stale { installed } => write!(f, "outdated (installed version {})", installed),
            Self::Current => f.write_str("installed"),
        }
    }
}
