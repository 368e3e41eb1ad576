// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution statistics.

use crate::status::StepStatus;
use crate::step::StepResult;
use serde::{Deserialize, Serialize};

/// Optional resource usage attached to statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_io_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_io_mb: Option<f64>,
}

/// Aggregated progress and outcome counters for an execution.
///
/// `completed_steps` is non-decreasing for the lifetime of a run; at a
/// terminal state `completed_steps == passed + failed + skipped`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionStatistics {
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub completed_steps: u32,
    #[serde(default)]
    pub passed_steps: u32,
    #[serde(default)]
    pub failed_steps: u32,
    #[serde(default)]
    pub skipped_steps: u32,

    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_remaining_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_step_duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,

    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub error_rate: f64,
    #[serde(default)]
    pub retry_rate: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_usage: Option<ResourceUsage>,
}

impl ExecutionStatistics {
    /// Initialise counters for a run of `total_steps` steps.
    pub fn for_total(total_steps: u32, estimated_remaining_ms: Option<u64>) -> Self {
        Self {
            total_steps,
            estimated_remaining_ms,
            ..Self::default()
        }
    }

    /// Derive the rates and progress from the raw counters.
    ///
    /// Progress is `completed / total`; success rate is `passed / completed`
    /// so a half-finished all-green run reads 1.0, not 0.5.
    pub fn recompute_rates(&mut self) {
        if self.total_steps > 0 {
            self.progress_percentage =
                (self.completed_steps as f64 / self.total_steps as f64) * 100.0;
        }
        if self.completed_steps > 0 {
            self.success_rate = self.passed_steps as f64 / self.completed_steps as f64;
            self.error_rate = self.failed_steps as f64 / self.completed_steps as f64;
        }
    }

    /// Recompute authoritatively from a full set of step results.
    ///
    /// `total_steps` stays at the planned count when it exceeds the number
    /// of recorded results (fail-fast leaves planned steps unexecuted).
    pub fn from_steps(planned_total: u32, steps: &[StepResult]) -> Self {
        let mut stats = Self::for_total(planned_total.max(steps.len() as u32), None);
        let mut retried = 0u32;
        let mut durations: Vec<u64> = Vec::new();

        for step in steps {
            match step.status {
                StepStatus::Passed | StepStatus::Warning => stats.passed_steps += 1,
                StepStatus::Failed | StepStatus::Blocked => stats.failed_steps += 1,
                StepStatus::Skipped => stats.skipped_steps += 1,
                StepStatus::Pending | StepStatus::Running => continue,
            }
            stats.completed_steps += 1;
            if step.retry_count > 0 {
                retried += 1;
            }
            if let Some(d) = step.duration_ms {
                durations.push(d);
            }
        }

        if !durations.is_empty() {
            let total: u64 = durations.iter().sum();
            stats.total_duration_ms = Some(total);
            stats.average_step_duration_ms = Some(total as f64 / durations.len() as f64);
        }
        if stats.completed_steps > 0 {
            stats.retry_rate = retried as f64 / stats.completed_steps as f64;
        }
        stats.recompute_rates();
        stats
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
