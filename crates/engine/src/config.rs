// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! All thresholds that drive scheduling, insights, and alerting live
//! here rather than as constants, so deployments can tune them.

use serde::Deserialize;

/// Queue scheduling configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Concurrent orchestration tasks per process.
    pub max_concurrent_executions: usize,
    /// Worker poll cadence between sweeps.
    pub poll_interval_ms: u64,
    /// Lease duration before an in-flight item is reclaimed.
    pub processing_timeout_minutes: i64,
    /// Items dispatched per poll iteration.
    pub dispatch_batch_size: usize,
    /// Queue-level retry budget for new items.
    pub default_max_retries: u32,
    /// Linear back-off base: attempt n reschedules after `n * base`.
    pub retry_backoff_base_minutes: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: 10,
            poll_interval_ms: 5_000,
            processing_timeout_minutes: 30,
            dispatch_batch_size: 5,
            default_max_retries: 3,
            retry_backoff_base_minutes: 2,
        }
    }
}

/// Monitoring loop thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub health_check_interval_secs: u64,
    pub metrics_retention_days: i64,
    /// Queue depth above which queue health degrades to WARNING.
    pub queue_depth_warning: usize,
    /// Hourly failure rate above which performance health degrades.
    pub failure_rate_warning: f64,
    /// Hourly average duration above which performance health degrades.
    pub average_duration_warning_ms: f64,
    /// Store probe latency above which store health degrades.
    pub store_response_warning_ms: u64,
    /// A RUNNING execution older than this is considered stuck.
    pub stuck_run_hours: i64,
    /// Minimum completed executions per hour before the failure-rate
    /// alert may fire.
    pub failure_rate_min_samples: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            health_check_interval_secs: 60,
            metrics_retention_days: 30,
            queue_depth_warning: 100,
            failure_rate_warning: 0.2,
            average_duration_warning_ms: 300_000.0,
            store_response_warning_ms: 5_000,
            stuck_run_hours: 2,
            failure_rate_min_samples: 10,
        }
    }
}

/// Result-processor recommendation thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    /// A step slower than this triggers the slow-step recommendation.
    pub slow_step_ms: u64,
    /// Failure rate above this triggers the stability recommendation.
    pub high_failure_rate: f64,
    /// Duration spread above this is reported as a variance issue.
    pub variance_warning_ms: u64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            slow_step_ms: 30_000,
            high_failure_rate: 0.2,
            variance_warning_ms: 10_000,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub queue: QueueConfig,
    pub monitor: MonitorConfig,
    pub insights: InsightThresholds,
}
