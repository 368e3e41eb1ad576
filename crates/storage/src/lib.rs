// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rig-storage: Durable document collections for the Rig engine.
//!
//! The store keeps typed collections (traces, step results, state
//! history, queue rows, metrics, health checks, alerts, processed
//! results) behind a single `RwLock`. Writes that must be atomic with
//! respect to each other (the status compare-and-set, the queue lease)
//! take the write lock for the whole read-modify-write.
//! Durability comes from zstd-compressed JSON snapshots.

pub mod error;
pub mod query;
pub mod snapshot;
pub mod store;

pub use error::StoreError;
pub use query::{Page, SortDirection, SortField, TraceQuery};
pub use store::TraceStore;
