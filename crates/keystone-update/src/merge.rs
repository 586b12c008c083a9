//! Reconciliation of the user's configuration with the shipped defaults
//!
//! The merge is a shallow key union: keys from the previous document win,
//! keys only in the new document are added, and keys only in the previous
//! document survive even when the new schema dropped them.

use serde_json::{Map, Value};
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::MergeError;

/// A configuration document: a JSON object with insertion order preserved
pub type ConfigDocument = Map<String, Value>;

/// Load the newly shipped configuration. It defines the schema of a fresh
/// install, so it must exist and be a JSON object.
pub async fn load_incoming(path: &Path) -> Result<ConfigDocument, MergeError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(MergeError::IncomingMissing {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(MergeError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(MergeError::IncomingInvalid {
            path: path.to_path_buf(),
            message: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
        Err(e) => Err(MergeError::IncomingInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

/// Load the user's previous configuration, if any.
///
/// A missing, unreadable or corrupt file is treated as no previous
/// configuration so a broken legacy file never blocks an update.
pub async fn load_previous(path: &Path) -> Option<ConfigDocument> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Ignoring unreadable previous configuration {:?}: {}", path, e);
            return None;
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(document)) => Some(document),
        Ok(other) => {
            warn!(
                "Ignoring previous configuration {:?}: expected a JSON object, found {}",
                path,
                json_kind(&other)
            );
            None
        }
        Err(e) => {
            warn!("Ignoring corrupt previous configuration {:?}: {}", path, e);
            None
        }
    }
}

/// Merge `previous` over `incoming`
pub fn merge_documents(previous: Option<ConfigDocument>, incoming: ConfigDocument) -> ConfigDocument {
    let mut merged = incoming;
    if let Some(previous) = previous {
        for (key, value) in previous {
            merged.insert(key, value);
        }
    }
    merged
}

/// Load both documents and merge them
pub async fn merge(previous_path: &Path, incoming_path: &Path) -> Result<ConfigDocument, MergeError> {
    let incoming = load_incoming(incoming_path).await?;
    let previous = load_previous(previous_path).await;
    debug!(
        "Merging configuration: {} incoming key(s), {} previous key(s)",
        incoming.len(),
        previous.as_ref().map_or(0, Map::len)
    );
    Ok(merge_documents(previous, incoming))
}

/// Write a document as two-space indented JSON, replacing `path` atomically
pub async fn write_config(path: &Path, document: &ConfigDocument) -> Result<(), MergeError> {
    let content = serde_json::to_string_pretty(document)?;
    crate::fsutil::write_atomic(path, content.as_bytes())
        .await
        .map_err(|source| MergeError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
