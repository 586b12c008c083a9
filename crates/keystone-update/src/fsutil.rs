//! Filesystem primitives shared by the cleaner and the finalizer

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Remove a file or directory tree. A missing path is not an error.
pub(crate) async fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Files directly inside `dir` accepted by `filter`. Symlinks count when
/// they resolve to a regular file. A missing directory yields an empty list.
pub(crate) async fn list_files<F>(dir: &Path, filter: F) -> io::Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if fs::metadata(&path).await.is_ok_and(|m| m.is_file()) && filter(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Replace `path` with `contents` via a sibling file and a rename, so
/// readers see either the old contents or the new ones
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut partial_name = std::ffi::OsString::from(".");
    partial_name.push(file_name);
    partial_name.push(".partial");
    let partial = path.with_file_name(partial_name);

    fs::write(&partial, contents).await?;
    if let Err(e) = fs::rename(&partial, path).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e);
    }
    Ok(())
}

/// Recursively copy `source` to `dest`, creating `dest` and any parents
pub(crate) async fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<u64> {
    let source = source.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || copy_tree(&source, &dest))
        .await
        .map_err(io::Error::other)?
}

fn copy_tree(source: &Path, dest: &Path) -> io::Result<u64> {
    std::fs::create_dir_all(dest)?;
    let mut copied = 0;

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}
