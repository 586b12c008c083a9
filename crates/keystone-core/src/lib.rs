//! # keystone-core
//!
//! Core library for Keystone providing:
//! - The on-disk layout of an installed runtime bundle
//! - Derived bundle state as reported by the probe
//! - Installer configuration with hierarchical loading

pub mod config;
pub mod error;
pub mod types;

pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
pub use types::{BundleLayout, BundlePart, BundleState, InstallerConfig, TrustPolicy};
