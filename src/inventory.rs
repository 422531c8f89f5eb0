//! Inventory file loading.
//!
//! Inventories are produced by an external collector. This module only validates the
//! schema version and turns records into [`UrlEntry`] values; collection completeness
//! is the collector's contract.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::models::{InputDigest, UrlEntry};

/// Inventory schema version this build understands.
pub const INVENTORY_SCHEMA_VERSION: u32 = 1;

/// Errors raised while loading an inventory file.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("cannot read inventory {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse inventory {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "inventory {} has schema version {found}, expected {}",
        .path.display(),
        INVENTORY_SCHEMA_VERSION
    )]
    UnsupportedSchema { path: PathBuf, found: u32 },
}

/// A list of URLs known to one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<DateTime<Utc>>,
    pub entries: Vec<UrlEntry>,
}

impl Inventory {
    pub fn literal_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_template()).count()
    }

    pub fn template_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_template()).count()
    }
}

/// An inventory together with the digest of the bytes it was parsed from.
#[derive(Debug, Clone)]
pub struct LoadedInventory {
    pub inventory: Inventory,
    pub digest: InputDigest,
}

/// File name of an inventory, so reports do not depend on how the path was spelled.
fn path_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse inventory bytes. `path` is used for error messages and provenance only.
pub fn parse_inventory(bytes: &[u8], path: &Path) -> Result<LoadedInventory, InventoryError> {
    let inventory: Inventory =
        serde_json::from_slice(bytes).map_err(|source| InventoryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if inventory.schema_version != INVENTORY_SCHEMA_VERSION {
        return Err(InventoryError::UnsupportedSchema {
            path: path.to_path_buf(),
            found: inventory.schema_version,
        });
    }

    let digest = InputDigest {
        path: path_label(path),
        sha256: hex::encode(Sha256::digest(bytes)),
        entries: inventory.entries.len(),
    };

    Ok(LoadedInventory { inventory, digest })
}

/// Read and parse an inventory file.
pub fn load_inventory(path: &Path) -> Result<LoadedInventory, InventoryError> {
    let bytes = fs::read(path).map_err(|source| InventoryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = parse_inventory(&bytes, path)?;

    info!(
        "Loaded inventory {} ({} literals, {} templates)",
        path.display(),
        loaded.inventory.literal_count(),
        loaded.inventory.template_count()
    );

    Ok(loaded)
}
