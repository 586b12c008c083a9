//! Type definitions for the installed bundle and installer configuration

mod bundle;
mod installer_config;

pub use bundle::*;
pub use installer_config::*;
