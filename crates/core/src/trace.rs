// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution trace: the root entity of the engine.

use crate::context::{ExecutionConfig, ExecutionContext, SuiteConfig};
use crate::stats::ExecutionStatistics;
use crate::status::{ExecutionStatus, ExecutionType};
use crate::step::StepResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How many transitions are kept inline on the trace for quick
/// inspection. The separate history collection is the system of record.
pub const INLINE_HISTORY_LIMIT: usize = 10;

/// Default step count above which steps move to the normalized
/// step-results collection.
pub const DEFAULT_STEP_COUNT_THRESHOLD: u32 = 50;

/// One recorded state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateHistoryEntry {
    pub execution_id: String,
    pub old_status: ExecutionStatus,
    pub new_status: ExecutionStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Inputs for creating a new trace.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    pub execution_id: String,
    pub execution_type: ExecutionType,
    pub test_case_id: Option<String>,
    pub test_suite_id: Option<String>,
    pub parent_execution_id: Option<String>,
    pub triggered_by: String,
    pub execution_context: ExecutionContext,
    pub execution_config: ExecutionConfig,
    pub suite_config: Option<SuiteConfig>,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    /// 1 is the highest trace priority, 10 the lowest.
    pub priority: u8,
    pub estimated_step_count: u32,
}

/// Durable record of one attempt to run a test case or suite.
///
/// The trace owns its embedded steps; partitioned runs reference their
/// steps through the normalized collection instead. The two storage
/// forms are mutually exclusive: `is_partitioned` holds exactly when
/// `estimated_step_count >= step_count_threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub execution_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_execution_id: Option<String>,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    pub execution_type: ExecutionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_suite_id: Option<String>,

    pub status: ExecutionStatus,
    pub triggered_by: String,
    pub triggered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub last_state_change: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,

    #[serde(default)]
    pub is_partitioned: bool,
    #[serde(default = "default_step_count_threshold")]
    pub step_count_threshold: u32,
    #[serde(default)]
    pub estimated_step_count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedded_steps: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_results_collection: Option<String>,

    pub execution_context: ExecutionContext,
    pub execution_config: ExecutionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_config: Option<SuiteConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default = "default_priority")]
    pub priority: u8,

    #[serde(default)]
    pub statistics: ExecutionStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,

    /// Tail of recent transitions; capped at [`INLINE_HISTORY_LIMIT`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_history: Vec<StateHistoryEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution_log: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub debug_data: HashMap<String, serde_json::Value>,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_step_count_threshold() -> u32 {
    DEFAULT_STEP_COUNT_THRESHOLD
}

fn default_priority() -> u8 {
    5
}

/// Name of the normalized step-results collection.
pub const STEP_RESULTS_COLLECTION: &str = "execution_step_results";

impl ExecutionTrace {
    /// Create a new PENDING trace.
    ///
    /// The partitioning decision is made here, from the estimated step
    /// count, and never changes afterwards.
    pub fn new(config: TraceConfig, now: DateTime<Utc>) -> Self {
        let is_partitioned = config.estimated_step_count >= DEFAULT_STEP_COUNT_THRESHOLD;
        Self {
            execution_id: config.execution_id,
            parent_execution_id: config.parent_execution_id,
            schema_version: default_schema_version(),
            execution_type: config.execution_type,
            test_case_id: config.test_case_id,
            test_suite_id: config.test_suite_id,
            status: ExecutionStatus::Pending,
            triggered_by: config.triggered_by,
            triggered_at: now,
            started_at: None,
            completed_at: None,
            last_state_change: now,
            updated_at: None,
            current_step: None,
            is_partitioned,
            step_count_threshold: DEFAULT_STEP_COUNT_THRESHOLD,
            estimated_step_count: config.estimated_step_count,
            embedded_steps: Vec::new(),
            step_results_collection: is_partitioned
                .then(|| STEP_RESULTS_COLLECTION.to_string()),
            execution_context: config.execution_context,
            execution_config: config.execution_config,
            suite_config: config.suite_config,
            tags: config.tags,
            metadata: config.metadata,
            priority: config.priority,
            statistics: ExecutionStatistics::default(),
            overall_result: None,
            total_duration_ms: None,
            state_history: Vec::new(),
            execution_log: Vec::new(),
            debug_data: HashMap::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether steps for this run live in the normalized collection.
    pub fn should_partition(&self) -> bool {
        self.estimated_step_count >= self.step_count_threshold
    }

    /// Append a transition to the inline tail, dropping the oldest entry
    /// beyond [`INLINE_HISTORY_LIMIT`].
    pub fn record_transition(&mut self, entry: StateHistoryEntry) {
        self.state_history.push(entry);
        if self.state_history.len() > INLINE_HISTORY_LIMIT {
            let excess = self.state_history.len() - INLINE_HISTORY_LIMIT;
            self.state_history.drain(..excess);
        }
    }

    /// Verify the partitioning invariant: embedded and normalized storage
    /// are mutually exclusive.
    pub fn check_partitioning(&self) -> Result<(), String> {
        if self.is_partitioned {
            if !self.embedded_steps.is_empty() {
                return Err(format!(
                    "partitioned trace {} carries {} embedded steps",
                    self.execution_id,
                    self.embedded_steps.len()
                ));
            }
            if self.step_results_collection.is_none() {
                return Err(format!(
                    "partitioned trace {} has no step_results_collection",
                    self.execution_id
                ));
            }
        } else if self.step_results_collection.is_some() {
            return Err(format!(
                "embedded trace {} names a step_results_collection",
                self.execution_id
            ));
        }
        Ok(())
    }

    /// Derived total duration at a terminal state.
    pub fn derive_total_duration(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
