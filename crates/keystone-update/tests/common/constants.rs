//! Shared test constants

/// Version the fixtures are built for
pub const TEST_VERSION: &str = "1.0.3";

/// A version that differs from [`TEST_VERSION`]
pub const PREVIOUS_VERSION: &str = "1.0.2";

/// Path the mock server serves the archive on
pub const ARCHIVE_PATH: &str = "/releases/1.0.3/keystone-core.tar.gz";

/// Artifact shipped in the release archive
pub const ARTIFACT_NAME: &str = "core-1.0.3.jar";
pub const ARTIFACT_CONTENT: &[u8] = b"PK\x03\x04 keystone core runtime";

/// Client descriptor shipped in the release archive
pub const DESCRIPTOR_NAME: &str = "qbittorrent.client";
pub const DESCRIPTOR_CONTENT: &[u8] = br#"{"name":"qBittorrent","versions":["4.x"]}"#;

/// Configuration shipped in the release archive
pub const SHIPPED_CONFIG: &str = r#"{"port":49152,"uiEnabled":true,"ratio":2.0}"#;

/// Configuration left behind by a previous install
pub const USER_CONFIG: &str = r#"{"port":6881,"legacyFlag":"keep"}"#;
