//! Builders for release archives and bundle directories

use flate2::write::GzEncoder;
use flate2::Compression;
use keystone_core::BundleLayout;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use super::constants::*;

/// Builder for gzip-compressed tar archives
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    files: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An archive with the layout of a real release
    pub fn release() -> Self {
        Self::new()
            .file(ARTIFACT_NAME, ARTIFACT_CONTENT)
            .file(format!("clients/{DESCRIPTOR_NAME}"), DESCRIPTOR_CONTENT)
            .file("config.json", SHIPPED_CONFIG.as_bytes())
    }

    pub fn file(mut self, name: impl Into<String>, content: impl AsRef<[u8]>) -> Self {
        self.files.push((name.into(), content.as_ref().to_vec()));
        self
    }

    /// Drop a previously added file
    pub fn without(mut self, name: &str) -> Self {
        self.files.retain(|(existing, _)| existing != name);
        self
    }

    /// Add an incompressible file of `len` bytes, useful to exercise
    /// progress reporting
    pub fn padding(self, name: &str, len: usize) -> Self {
        self.file(name, noise(len))
    }

    pub fn build(self) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
        for (name, content) in &self.files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_slice())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }
}

/// Deterministic pseudo-random bytes
pub fn noise(len: usize) -> Vec<u8> {
    let mut seed = 0x9e37_79b9_u32;
    (0..len)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed as u8
        })
        .collect()
}

/// A bundle rooted in a fresh temp directory
pub struct BundleFixture {
    pub temp: TempDir,
    pub layout: BundleLayout,
}

impl BundleFixture {
    /// A layout whose root does not exist yet
    pub fn fresh() -> Self {
        let temp = TempDir::new().unwrap();
        let layout = BundleLayout::new(temp.path().join("core"));
        Self { temp, layout }
    }

    /// A complete bundle at `version`
    pub fn installed(version: &str) -> Self {
        let fixture = Self::fresh();
        let layout = &fixture.layout;
        fs::create_dir_all(&layout.clients_dir).unwrap();
        fs::create_dir_all(&layout.archived_torrents_dir).unwrap();
        fs::write(layout.root.join(format!("core-{version}.jar")), b"old-jar").unwrap();
        fs::write(layout.clients_dir.join("transmission.client"), b"{}").unwrap();
        fs::write(&layout.config_file, USER_CONFIG).unwrap();
        fs::write(&layout.version_file, version).unwrap();
        fixture
    }

    /// Stage an extracted release in the temp workspace
    pub fn with_staged_release(self) -> Self {
        let layout = &self.layout;
        fs::create_dir_all(layout.staged_clients_dir()).unwrap();
        fs::write(layout.temp_dir.join(ARTIFACT_NAME), ARTIFACT_CONTENT).unwrap();
        fs::write(
            layout.staged_clients_dir().join(DESCRIPTOR_NAME),
            DESCRIPTOR_CONTENT,
        )
        .unwrap();
        fs::write(layout.staged_config_file(), SHIPPED_CONFIG).unwrap();
        self
    }

    pub fn root(&self) -> &Path {
        &self.layout.root
    }
}
