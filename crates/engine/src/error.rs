// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Layers translate errors once: runners surface per-step failures
//! inside `StepResult.error_details`, the orchestrator surfaces fatal
//! errors as terminal trace states, the service layer maps these
//! variants to HTTP codes. The queue layer never raises; it resolves
//! failures into `CompletionOutcome` values.

use rig_core::ExecutionStatus;
use thiserror::Error;

/// Errors raised by the engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input failed schema or value rules. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Trace or queue item absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Illegal source → target transition. Never retried.
    #[error("invalid state transition for {execution_id}: {from} -> {to}")]
    StateTransition {
        execution_id: String,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    /// Optimistic concurrency: a compare-and-set modified nothing.
    /// The caller may retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Generic orchestration failure: loader missing, runner
    /// validation failure, unsupported execution type.
    #[error("execution error: {0}")]
    Execution(String),

    /// Run-level deadline exceeded.
    #[error("execution {execution_id} timed out after {timeout_ms}ms")]
    Timeout {
        execution_id: String,
        timeout_ms: u64,
    },

    /// Queue full, paused, or otherwise unable to accept work.
    #[error("resource allocation failed for {resource}: {reason}")]
    ResourceAllocation { resource: String, reason: String },

    #[error("storage error: {0}")]
    Store(#[from] rig_storage::StoreError),
}

impl From<rig_core::LoadError> for EngineError {
    fn from(err: rig_core::LoadError) -> Self {
        EngineError::Execution(err.to_string())
    }
}
