//! Promotion of an extracted bundle into the live bundle directory
//!
//! Steps run strictly in order and the first failure aborts the rest:
//! 1. Replace the live client directory with the extracted one
//! 2. Merge the previous configuration into the shipped one and persist it
//! 3. Copy executable artifacts into the bundle root
//! 4. Remove the temp workspace
//! 5. Ensure the torrent and archived torrent directories exist
//! 6. Write the version marker
//! 7. Re-probe and fail if the bundle does not validate
//!
//! The version marker is written last and atomically, so a failure at any
//! earlier step leaves no marker behind for the probe to trust.

use futures::future::try_join_all;
use keystone_core::BundleLayout;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::FinalizeError;
use crate::fsutil::{copy_dir_recursive, list_files, remove_path, write_atomic};
use crate::{merge, probe};

/// Promote the temp workspace of `layout` and mark it as `version`
pub async fn finalize(
    layout: &BundleLayout,
    version: &str,
    cancel: &CancellationToken,
) -> Result<(), FinalizeError> {
    let checkpoint = || {
        if cancel.is_cancelled() {
            Err(FinalizeError::Cancelled)
        } else {
            Ok(())
        }
    };

    checkpoint()?;
    replace_clients(layout).await?;

    checkpoint()?;
    let merged = merge::merge(&layout.config_file, &layout.staged_config_file()).await?;
    merge::write_config(&layout.config_file, &merged).await?;
    debug!("Configuration written to {:?}", layout.config_file);

    checkpoint()?;
    promote_artifacts(layout).await?;

    checkpoint()?;
    remove_path(&layout.temp_dir)
        .await
        .map_err(|e| FinalizeError::io("failed to remove", &layout.temp_dir, e))?;

    checkpoint()?;
    for dir in [&layout.torrents_dir, &layout.archived_torrents_dir] {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| FinalizeError::io("failed to create", dir, e))?;
    }

    checkpoint()?;
    write_atomic(&layout.version_file, version.as_bytes())
        .await
        .map_err(|e| FinalizeError::io("failed to write", &layout.version_file, e))?;

    let state = probe::inspect(layout, version);
    if !state.is_current() {
        return Err(FinalizeError::ValidationFailed { state });
    }

    info!("Bundle {} deployed to {:?}", version, layout.root);
    Ok(())
}

/// Remove-then-copy: the live client directory ends up identical to the
/// extracted one, with no stale descriptors carried over
async fn replace_clients(layout: &BundleLayout) -> Result<(), FinalizeError> {
    let staged = layout.staged_clients_dir();
    if !fs::metadata(&staged).await.is_ok_and(|m| m.is_dir()) {
        return Err(FinalizeError::MissingStaged { path: staged });
    }

    remove_path(&layout.clients_dir)
        .await
        .map_err(|e| FinalizeError::io("failed to remove", &layout.clients_dir, e))?;

    let copied = copy_dir_recursive(&staged, &layout.clients_dir)
        .await
        .map_err(|e| FinalizeError::io("failed to copy", &staged, e))?;

    debug!("Copied {} client file(s) to {:?}", copied, layout.clients_dir);
    Ok(())
}

async fn promote_artifacts(layout: &BundleLayout) -> Result<(), FinalizeError> {
    let artifacts = list_files(&layout.temp_dir, |p| layout.is_artifact(p))
        .await
        .map_err(|e| FinalizeError::io("failed to list", &layout.temp_dir, e))?;

    try_join_all(artifacts.iter().map(|artifact| async move {
        let file_name = artifact.file_name().unwrap_or_default();
        let target = layout.root.join(file_name);
        fs::copy(artifact, &target)
            .await
            .map_err(|e| FinalizeError::io("failed to copy", artifact, e))
    }))
    .await?;

    debug!("Promoted {} artifact(s) into {:?}", artifacts.len(), layout.root);
    Ok(())
}
