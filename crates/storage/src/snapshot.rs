// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for the trace store.
//!
//! A snapshot is the full set of collections serialized to JSON and
//! zstd-compressed. Saves write to a temp file next to the target and
//! rename into place, so a crashed save never corrupts the last good
//! snapshot.

use crate::error::StoreError;
use crate::store::TraceStore;
use std::fs;
use std::path::Path;

const ZSTD_LEVEL: i32 = 3;

/// Save the store to `path`, atomically.
pub fn save(store: &TraceStore, path: &Path) -> Result<(), StoreError> {
    let json = store.with_collections(serde_json::to_vec)?;
    let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &compressed)?;
    fs::rename(&tmp_path, path)?;

    tracing::debug!(
        path = %path.display(),
        bytes = compressed.len(),
        "snapshot saved"
    );
    Ok(())
}

/// Load a store from a snapshot file. A missing file yields an empty
/// store; a present but unreadable file is an error.
pub fn load(path: &Path) -> Result<TraceStore, StoreError> {
    if !path.exists() {
        return Ok(TraceStore::new());
    }
    let compressed = fs::read(path)?;
    let json = zstd::decode_all(compressed.as_slice())
        .map_err(|e| StoreError::CorruptSnapshot(format!("{}: {e}", path.display())))?;
    let collections = serde_json::from_slice(&json)?;

    tracing::info!(path = %path.display(), "snapshot loaded");
    Ok(TraceStore::from_collections(collections))
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
