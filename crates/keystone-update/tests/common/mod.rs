//! Common test infrastructure for keystone-update tests
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Versions, archive paths and file contents
//! - `builders`: Release archive and bundle directory builders
//! - `mock_server`: Wiremock setup helpers for archive downloads
//! - `assertions`: Event collection and bundle state assertions

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod assertions;
pub mod builders;
pub mod constants;
pub mod mock_server;

pub use assertions::*;
pub use builders::*;
pub use constants::*;
pub use mock_server::*;
