// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation abstractions

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates unique execution identifiers.
///
/// Execution ids are opaque 24-character lowercase hex strings at every
/// layer above the store; nothing parses them.
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// UUID-backed generator for production use.
///
/// Takes the first 24 hex digits of a v4 UUID's simple form.
#[derive(Clone, Default)]
pub struct HexIdGen;

impl IdGen for HexIdGen {
    fn next(&self) -> String {
        let mut buf = uuid::Uuid::encode_buffer();
        let simple = uuid::Uuid::new_v4().simple().encode_lower(&mut buf);
        simple[..24].to_string()
    }
}

/// Deterministic generator for testing.
///
/// Emits zero-padded 24-hex counters so generated ids still satisfy the
/// boundary id-format validation.
#[derive(Clone)]
pub struct SequentialIdGen {
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{n:024x}")
    }
}

/// Check that a string is a valid 24-character lowercase hex id.
pub fn is_valid_execution_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
