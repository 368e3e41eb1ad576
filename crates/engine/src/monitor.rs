// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitoring service.
//!
//! Runs alongside the queue worker: samples component health, records
//! metrics, raises threshold alerts, and prunes time-series rows past
//! retention. Only reads shared execution state.

use crate::config::MonitorConfig;
use chrono::{DateTime, Duration, Utc};
use rig_core::{
    Alert, AlertSeverity, Clock, ExecutionStatus, ExecutionType, HealthCheck, HealthStatus,
    Metric,
};
use rig_storage::TraceStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

/// Full system health report.
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthReport {
    pub overall_status: HealthStatus,
    pub components: Vec<HealthCheck>,
    pub summary: HealthSummary,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    pub down: usize,
}

/// Aggregates over a recent window of completed executions.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub window_hours: u32,
    pub total_executions: usize,
    pub passed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub aborted: usize,
    pub failure_rate: f64,
    pub average_duration_ms: f64,
    pub executions_per_hour: f64,
    pub by_type: HashMap<String, usize>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub average_duration_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub window_days: u32,
    pub points: Vec<TrendPoint>,
    pub generated_at: DateTime<Utc>,
}

/// Engine-wide summary counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub total_executions: usize,
    pub by_status: HashMap<String, usize>,
    pub active_executions: usize,
    pub queue_depth: usize,
    pub dead_letter_count: usize,
    pub open_alerts: usize,
    pub generated_at: DateTime<Utc>,
}

pub struct MonitoringService<C: Clock> {
    store: Arc<TraceStore>,
    config: MonitorConfig,
    clock: C,
}

impl<C: Clock> MonitoringService<C> {
    pub fn new(store: Arc<TraceStore>, config: MonitorConfig, clock: C) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Monitoring loop: one tick per interval until shutdown.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        tracing::info!(
            interval_secs = self.config.health_check_interval_secs,
            "monitoring loop started"
        );
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = tokio::time::sleep(std::time::Duration::from_secs(
                    self.config.health_check_interval_secs,
                )) => {
                    self.tick();
                }
            }
        }
        tracing::info!("monitoring loop stopped");
    }

    /// One monitoring pass: health checks, alerts, gauges, retention.
    pub fn tick(&self) {
        let checks = self.run_health_checks();
        self.check_alert_conditions(&checks);
        self.store.record_health_checks(checks);
        self.record_gauges();
        self.prune();
    }

    /// Probe every component and return the verdicts.
    pub fn run_health_checks(&self) -> Vec<HealthCheck> {
        vec![
            self.check_store(),
            self.check_engine(),
            self.check_queue(),
            self.check_performance(),
        ]
    }

    /// Full health report: worst component status wins.
    pub fn system_health(&self) -> SystemHealthReport {
        let components = self.run_health_checks();
        let overall_status = components
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);
        let summary = HealthSummary {
            healthy: count_status(&components, HealthStatus::Healthy),
            warning: count_status(&components, HealthStatus::Warning),
            critical: count_status(&components, HealthStatus::Critical),
            down: count_status(&components, HealthStatus::Down),
        };
        SystemHealthReport {
            overall_status,
            components,
            summary,
            checked_at: self.clock.now(),
        }
    }

    /// Liveness verdict for the unauthenticated probe.
    pub fn liveness(&self) -> HealthStatus {
        self.system_health().overall_status
    }

    pub fn performance_analytics(&self, window_hours: u32) -> AnalyticsReport {
        let now = self.clock.now();
        let since = now - Duration::hours(window_hours as i64);
        let completed = self.store.completed_since(since);

        let total = completed.len();
        let passed = completed
            .iter()
            .filter(|t| t.status == ExecutionStatus::Passed)
            .count();
        let failed = completed
            .iter()
            .filter(|t| t.status == ExecutionStatus::Failed)
            .count();
        let cancelled = completed
            .iter()
            .filter(|t| t.status == ExecutionStatus::Cancelled)
            .count();
        let aborted = completed
            .iter()
            .filter(|t| t.status == ExecutionStatus::Aborted)
            .count();

        let durations: Vec<u64> = completed
            .iter()
            .filter_map(|t| t.total_duration_ms)
            .collect();
        let average_duration_ms = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<u64>() as f64 / durations.len() as f64
        };

        let mut by_type: HashMap<String, usize> = HashMap::new();
        for trace in &completed {
            *by_type.entry(trace.execution_type.to_string()).or_insert(0) += 1;
        }

        AnalyticsReport {
            window_hours,
            total_executions: total,
            passed,
            failed,
            cancelled,
            aborted,
            failure_rate: if total > 0 {
                failed as f64 / total as f64
            } else {
                0.0
            },
            average_duration_ms,
            executions_per_hour: total as f64 / window_hours.max(1) as f64,
            by_type,
            generated_at: now,
        }
    }

    pub fn trends(&self, window_days: u32) -> TrendReport {
        let now = self.clock.now();
        let since = now - Duration::days(window_days as i64);
        let completed = self.store.completed_since(since);

        let mut buckets: HashMap<String, Vec<&rig_core::ExecutionTrace>> = HashMap::new();
        for trace in &completed {
            if let Some(at) = trace.completed_at {
                buckets
                    .entry(at.format("%Y-%m-%d").to_string())
                    .or_default()
                    .push(trace);
            }
        }

        let mut points: Vec<TrendPoint> = buckets
            .into_iter()
            .map(|(date, traces)| {
                let durations: Vec<u64> =
                    traces.iter().filter_map(|t| t.total_duration_ms).collect();
                TrendPoint {
                    date,
                    total: traces.len(),
                    passed: traces
                        .iter()
                        .filter(|t| t.status == ExecutionStatus::Passed)
                        .count(),
                    failed: traces
                        .iter()
                        .filter(|t| t.status == ExecutionStatus::Failed)
                        .count(),
                    average_duration_ms: if durations.is_empty() {
                        0.0
                    } else {
                        durations.iter().sum::<u64>() as f64 / durations.len() as f64
                    },
                }
            })
            .collect();
        points.sort_by(|a, b| a.date.cmp(&b.date));

        TrendReport {
            window_days,
            points,
            generated_at: now,
        }
    }

    pub fn summary_statistics(&self) -> StatisticsReport {
        let by_status = self
            .store
            .status_counts()
            .into_iter()
            .map(|(status, count)| (status.to_string(), count))
            .collect();
        StatisticsReport {
            total_executions: self.store.trace_count(),
            by_status,
            active_executions: self.store.active_traces().len(),
            queue_depth: self.store.queue_depth(),
            dead_letter_count: self.store.dead_letter_count(),
            open_alerts: self.store.alerts(true).len(),
            generated_at: self.clock.now(),
        }
    }

    /// Drop metrics and health rows past retention.
    pub fn prune(&self) -> (usize, usize) {
        let cutoff = self.clock.now() - Duration::days(self.config.metrics_retention_days);
        let metrics = self.store.prune_metrics(cutoff);
        let health = self.store.prune_health_checks(cutoff);
        if metrics > 0 || health > 0 {
            tracing::info!(metrics, health, "pruned expired monitoring rows");
        }
        (metrics, health)
    }

    fn check_store(&self) -> HealthCheck {
        let started = std::time::Instant::now();
        let baseline = self.store.ping();
        let response_time_ms = started.elapsed().as_millis() as u64;

        let (status, message) = if response_time_ms > self.config.store_response_warning_ms {
            (
                HealthStatus::Warning,
                format!("store responding slowly ({response_time_ms}ms)"),
            )
        } else {
            (HealthStatus::Healthy, "store responsive".to_string())
        };

        let mut details = HashMap::new();
        details.insert("trace_count".to_string(), serde_json::json!(baseline));
        HealthCheck {
            component: "store".to_string(),
            status,
            message,
            details,
            response_time_ms,
            checked_at: self.clock.now(),
        }
    }

    fn check_engine(&self) -> HealthCheck {
        let now = self.clock.now();
        let stuck_cutoff = now - Duration::hours(self.config.stuck_run_hours);
        let stuck = self.store.running_started_before(stuck_cutoff);
        let recent = self.store.completed_since(now - Duration::hours(1));

        let mut details = HashMap::new();
        details.insert("stuck_executions".to_string(), serde_json::json!(stuck.len()));
        details.insert(
            "completed_last_hour".to_string(),
            serde_json::json!(recent.len()),
        );

        let (status, message) = if stuck.is_empty() {
            (HealthStatus::Healthy, "engine processing normally".to_string())
        } else {
            (
                HealthStatus::Warning,
                format!(
                    "{} execution(s) running longer than {}h",
                    stuck.len(),
                    self.config.stuck_run_hours
                ),
            )
        };
        HealthCheck {
            component: "engine".to_string(),
            status,
            message,
            details,
            response_time_ms: 0,
            checked_at: now,
        }
    }

    fn check_queue(&self) -> HealthCheck {
        let depth = self.store.queue_depth();
        let mut details = HashMap::new();
        details.insert("queue_depth".to_string(), serde_json::json!(depth));
        details.insert(
            "dead_letter_count".to_string(),
            serde_json::json!(self.store.dead_letter_count()),
        );

        let (status, message) = if depth > self.config.queue_depth_warning {
            (
                HealthStatus::Warning,
                format!(
                    "queue depth {depth} exceeds threshold {}",
                    self.config.queue_depth_warning
                ),
            )
        } else {
            (HealthStatus::Healthy, format!("queue depth {depth}"))
        };
        HealthCheck {
            component: "queue".to_string(),
            status,
            message,
            details,
            response_time_ms: 0,
            checked_at: self.clock.now(),
        }
    }

    fn check_performance(&self) -> HealthCheck {
        let now = self.clock.now();
        let completed = self.store.completed_since(now - Duration::hours(1));
        let total = completed.len();

        let mut details = HashMap::new();
        details.insert("completed_last_hour".to_string(), serde_json::json!(total));

        if total == 0 {
            return HealthCheck {
                component: "performance".to_string(),
                status: HealthStatus::Healthy,
                message: "no completed executions in the last hour".to_string(),
                details,
                response_time_ms: 0,
                checked_at: now,
            };
        }

        let failed = completed
            .iter()
            .filter(|t| t.status == ExecutionStatus::Failed)
            .count();
        let failure_rate = failed as f64 / total as f64;
        let durations: Vec<u64> = completed
            .iter()
            .filter_map(|t| t.total_duration_ms)
            .collect();
        let average_ms = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<u64>() as f64 / durations.len() as f64
        };
        details.insert("failure_rate".to_string(), serde_json::json!(failure_rate));
        details.insert(
            "average_duration_ms".to_string(),
            serde_json::json!(average_ms),
        );

        let mut status = HealthStatus::Healthy;
        let mut problems = Vec::new();
        if average_ms > self.config.average_duration_warning_ms {
            status = HealthStatus::Warning;
            problems.push(format!("average duration {average_ms:.0}ms"));
        }
        if failure_rate > self.config.failure_rate_warning {
            status = HealthStatus::Warning;
            problems.push(format!("failure rate {:.0}%", failure_rate * 100.0));
        }
        HealthCheck {
            component: "performance".to_string(),
            status,
            message: if problems.is_empty() {
                "performance within thresholds".to_string()
            } else {
                problems.join(", ")
            },
            details,
            response_time_ms: 0,
            checked_at: now,
        }
    }

    /// Raise alerts for breached thresholds. The failure-rate alert
    /// requires enough samples to be meaningful and deduplicates
    /// against open (unacknowledged) alerts.
    fn check_alert_conditions(&self, _checks: &[HealthCheck]) {
        let now = self.clock.now();
        let completed = self.store.completed_since(now - Duration::hours(1));
        let total = completed.len();

        if total >= self.config.failure_rate_min_samples {
            let failed = completed
                .iter()
                .filter(|t| t.status == ExecutionStatus::Failed)
                .count();
            let failure_rate = failed as f64 / total as f64;
            if failure_rate > self.config.failure_rate_warning {
                self.raise_alert(
                    AlertSeverity::Warning,
                    "High execution failure rate",
                    format!(
                        "{failed}/{total} executions failed in the last hour ({:.0}%)",
                        failure_rate * 100.0
                    ),
                );
            }
        }

        let depth = self.store.queue_depth();
        if depth > self.config.queue_depth_warning {
            self.raise_alert(
                AlertSeverity::Warning,
                "Queue depth threshold exceeded",
                format!(
                    "queue depth {depth} exceeds threshold {}",
                    self.config.queue_depth_warning
                ),
            );
        }
    }

    fn raise_alert(&self, severity: AlertSeverity, title: &str, message: String) {
        if self.store.has_open_alert(title) {
            return;
        }
        tracing::warn!(title, %severity, "raising alert");
        self.store.insert_alert(Alert {
            alert_id: uuid::Uuid::new_v4().to_string(),
            severity,
            title: title.to_string(),
            message,
            details: HashMap::new(),
            generated_at: self.clock.now(),
            acknowledged: false,
        });
    }

    fn record_gauges(&self) {
        let now = self.clock.now();
        let active = self.store.active_traces();
        self.store
            .record_metric(Metric::gauge("active_executions", active.len() as f64, now));
        for kind in [
            ExecutionType::TestCase,
            ExecutionType::TestSuite,
            ExecutionType::Manual,
        ] {
            let count = active
                .iter()
                .filter(|t| t.execution_type == kind)
                .count();
            self.store.record_metric(
                Metric::gauge("active_executions_by_type", count as f64, now)
                    .tag("execution_type", kind.to_string()),
            );
        }
        self.store.record_metric(Metric::gauge(
            "queue_depth",
            self.store.queue_depth() as f64,
            now,
        ));
    }
}

fn count_status(checks: &[HealthCheck], status: HealthStatus) -> usize {
    checks.iter().filter(|c| c.status == status).count()
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
