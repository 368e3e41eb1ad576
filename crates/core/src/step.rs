// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-step result records.

use crate::status::StepStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Structured error attached to a failed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepErrorDetails {
    pub error_type: String,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub retry_attempted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_suggestion: Option<String>,
}

impl StepErrorDetails {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            error_message: message.into(),
            error_code: None,
            stack_trace: None,
            context: HashMap::new(),
            retry_attempted: false,
            recovery_suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestion = Some(suggestion.into());
        self
    }
}

/// Result of one step, stored embedded in the trace or in the
/// normalized step-results collection for partitioned executions.
///
/// Invariants: `FAILED` implies `error_details` is present; a settled
/// status implies `completed_at` is set and `completed_at >= started_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub step_name: String,
    pub step_order: u32,
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub input_data: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expected_result: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_result: Option<HashMap<String, serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<StepErrorDetails>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_environment: Option<String>,
}

impl StepResult {
    /// Create a step record in the Running state, stamped with its start time.
    pub fn started(
        step_id: impl Into<String>,
        step_name: impl Into<String>,
        step_order: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            step_name: step_name.into(),
            step_order,
            status: StepStatus::Running,
            started_at: Some(now),
            completed_at: None,
            duration_ms: None,
            input_data: HashMap::new(),
            output_data: None,
            expected_result: HashMap::new(),
            actual_result: None,
            error_details: None,
            warnings: Vec::new(),
            retry_count: 0,
            max_retries: 0,
            metadata: HashMap::new(),
            step_type: None,
            execution_environment: None,
        }
    }

    /// Settle the step: set status, completion time, and derived duration.
    pub fn finish(&mut self, status: StepStatus, now: DateTime<Utc>) {
        self.status = status;
        self.completed_at = Some(now);
        if let Some(started) = self.started_at {
            let elapsed = (now - started).num_milliseconds().max(0) as u64;
            self.duration_ms = Some(elapsed);
        }
    }

    /// Settle as failed with error details attached.
    pub fn fail(&mut self, error: StepErrorDetails, now: DateTime<Utc>) {
        self.error_details = Some(error);
        self.finish(StepStatus::Failed, now);
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
