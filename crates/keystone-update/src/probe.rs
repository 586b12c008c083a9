//! Read-only inspection of an installed bundle
//!
//! The probe never caches and never writes. Checks short-circuit on the
//! first missing part, with plain existence checks ahead of directory
//! listings and the marker read.

use keystone_core::{BundleLayout, BundlePart, BundleState};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Whether the bundle is fully installed at `expected_version`
pub fn is_installed(layout: &BundleLayout, expected_version: &str) -> bool {
    inspect(layout, expected_version).is_current()
}

/// Derive the bundle state from the filesystem
pub fn inspect(layout: &BundleLayout, expected_version: &str) -> BundleState {
    let state = derive_state(layout, expected_version);
    debug!(root = %layout.root.display(), %state, "probed bundle");
    state
}

fn derive_state(layout: &BundleLayout, expected_version: &str) -> BundleState {
    if !layout.root.is_dir() {
        return BundleState::Absent;
    }

    let missing = |part| BundleState::Incomplete { missing: part };

    if !layout.config_file.is_file() {
        return missing(BundlePart::ConfigFile);
    }
    if !layout.torrents_dir.is_dir() {
        return missing(BundlePart::TorrentsDir);
    }
    if !layout.version_file.is_file() {
        return missing(BundlePart::VersionMarker);
    }
    if !contains_file(&layout.root, |p| layout.is_artifact(p)) {
        return missing(BundlePart::Artifact);
    }
    if !contains_file(&layout.clients_dir, |p| layout.is_descriptor(p)) {
        return missing(BundlePart::ClientDescriptors);
    }

    match fs::read_to_string(&layout.version_file) {
        Ok(installed) if installed == expected_version => BundleState::Current,
        Ok(installed) => BundleState::Stale { installed },
        Err(_) => missing(BundlePart::VersionMarker),
    }
}

fn contains_file(dir: &Path, accept: impl Fn(&Path) -> bool) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .any(|path| path.is_file() && accept(&path))
}
