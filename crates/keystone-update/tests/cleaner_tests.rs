//! Workspace cleaner against realistic bundle trees

mod common;

use common::*;
use keystone_update::cleaner;
use std::fs;

#[tokio::test]
async fn test_clean_installed_bundle() {
    let fixture = BundleFixture::installed(PREVIOUS_VERSION).with_staged_release();
    let layout = &fixture.layout;
    fs::write(layout.torrents_dir.join("debian.torrent"), b"d8:").unwrap();

    cleaner::clean(layout).await.unwrap();

    assert_rolled_back(layout);
    assert!(!layout.root.join("core-1.0.2.jar").exists());
    assert_eq!(fs::read_to_string(&layout.config_file).unwrap(), USER_CONFIG);
    assert!(layout.torrents_dir.join("debian.torrent").exists());
    assert!(layout.archived_torrents_dir.is_dir());
}

#[tokio::test]
async fn test_clean_twice_has_same_end_state() {
    let fixture = BundleFixture::installed(PREVIOUS_VERSION);

    cleaner::clean(&fixture.layout).await.unwrap();
    cleaner::clean(&fixture.layout).await.unwrap();

    assert_rolled_back(&fixture.layout);
}

#[tokio::test]
async fn test_clean_fresh_machine() {
    let fixture = BundleFixture::fresh();
    cleaner::clean(&fixture.layout).await.unwrap();
    assert!(!fixture.root().exists());
}

#[tokio::test]
async fn test_clean_leaves_non_artifact_files() {
    let fixture = BundleFixture::installed(PREVIOUS_VERSION);
    let notes = fixture.root().join("notes.txt");
    fs::write(&notes, b"mine").unwrap();

    cleaner::clean(&fixture.layout).await.unwrap();

    assert!(notes.exists());
}
