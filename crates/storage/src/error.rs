// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error types

use thiserror::Error;

/// Errors from the trace store and snapshot persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate execution: {0}")]
    DuplicateExecution(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}
