//! Removal of stale bundle artifacts ahead of a fresh install
//!
//! Everything except the user configuration and the torrent directories is
//! removed: executable artifacts in the root, the client directory, the
//! version marker, and any leftover temp workspace. Removals run
//! concurrently and the batch completes before the caller continues.

use futures::future::join_all;
use keystone_core::BundleLayout;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{CleanError, RemovalFailure};
use crate::fsutil::{list_files, remove_path};

/// Remove stale artifacts. Safe to call on an absent or already-clean bundle.
pub async fn clean(layout: &BundleLayout) -> Result<(), CleanError> {
    let mut failures = Vec::new();

    let mut targets: Vec<PathBuf> = vec![
        layout.temp_dir.clone(),
        layout.clients_dir.clone(),
        layout.version_file.clone(),
    ];

    match list_files(&layout.root, |p| layout.is_artifact(p)).await {
        Ok(artifacts) => targets.extend(artifacts),
        Err(source) => failures.push(RemovalFailure {
            path: layout.root.clone(),
            source,
        }),
    }

    debug!("Removing {} stale path(s) under {:?}", targets.len(), layout.root);

    let results = join_all(targets.into_iter().map(|path| async move {
        let result = remove_path(&path).await;
        (path, result)
    }))
    .await;

    failures.extend(
        results
            .into_iter()
            .filter_map(|(path, result)| result.err().map(|source| RemovalFailure { path, source })),
    );

    if failures.is_empty() {
        info!("Bundle directory cleaned: {:?}", layout.root);
        Ok(())
    } else {
        Err(CleanError { failures })
    }
}
