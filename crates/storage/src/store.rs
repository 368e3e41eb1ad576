// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The trace store: typed collections with atomic primitives.

use crate::error::StoreError;
use crate::query::{Page, SortDirection, SortField, TraceQuery};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rig_core::{
    Alert, DeadLetter, ExecutionStatistics, ExecutionStatus, ExecutionTrace, ExecutionType,
    HealthCheck, Metric, ProcessedResult, QueueItem, QueuePriority, StateHistoryEntry, StepResult,
    SuiteSummary,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// All persisted collections. Serialized wholesale by snapshots.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Collections {
    pub traces: HashMap<String, ExecutionTrace>,
    /// Normalized step results for partitioned executions, keyed by
    /// execution id and kept in `step_order`.
    #[serde(default)]
    pub step_results: HashMap<String, Vec<StepResult>>,
    /// Append-only transition log; the system of record for audit.
    #[serde(default)]
    pub state_history: HashMap<String, Vec<StateHistoryEntry>>,
    #[serde(default)]
    pub queue: HashMap<String, QueueItem>,
    #[serde(default)]
    pub dead_letters: Vec<DeadLetter>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub health_checks: Vec<HealthCheck>,
    #[serde(default)]
    pub alerts: HashMap<String, Alert>,
    #[serde(default)]
    pub results: HashMap<String, ProcessedResult>,
    #[serde(default)]
    pub suite_summaries: HashMap<String, SuiteSummary>,
}

/// Shared document store.
///
/// Field ownership is partitioned by caller: the state service writes
/// `status`/`state_history`, the orchestrator writes `statistics` and
/// step results, the queue service writes queue rows. The store only
/// guarantees that each individual operation is atomic.
#[derive(Default)]
pub struct TraceStore {
    inner: RwLock<Collections>,
}

impl TraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_collections(collections: Collections) -> Self {
        Self {
            inner: RwLock::new(collections),
        }
    }

    pub(crate) fn with_collections<T>(&self, f: impl FnOnce(&Collections) -> T) -> T {
        f(&self.inner.read())
    }

    // === Traces ===

    pub fn insert_trace(&self, trace: ExecutionTrace) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.traces.contains_key(&trace.execution_id) {
            return Err(StoreError::DuplicateExecution(trace.execution_id));
        }
        inner.traces.insert(trace.execution_id.clone(), trace);
        Ok(())
    }

    pub fn get_trace(&self, execution_id: &str) -> Option<ExecutionTrace> {
        self.inner.read().traces.get(execution_id).cloned()
    }

    pub fn trace_status(&self, execution_id: &str) -> Option<ExecutionStatus> {
        self.inner.read().traces.get(execution_id).map(|t| t.status)
    }

    /// Conditional status update, the engine's only write path for
    /// `status`. Returns false when the current status no longer matches
    /// `from` (a concurrent writer raced) or the trace is missing; in
    /// both cases nothing is modified.
    pub fn cas_status(
        &self,
        execution_id: &str,
        from: ExecutionStatus,
        to: ExecutionStatus,
        now: DateTime<Utc>,
    ) -> bool {
        let mut inner = self.inner.write();
        let Some(trace) = inner.traces.get_mut(execution_id) else {
            return false;
        };
        if trace.status != from {
            return false;
        }
        trace.status = to;
        trace.last_state_change = now;
        trace.updated_at = Some(now);
        if to == ExecutionStatus::Running && trace.started_at.is_none() {
            trace.started_at = Some(now);
        }
        if to.is_terminal() {
            trace.completed_at = Some(now);
            trace.total_duration_ms = trace.derive_total_duration();
        }
        true
    }

    /// Append to the inline transition tail on the trace document.
    pub fn record_inline_transition(&self, execution_id: &str, entry: StateHistoryEntry) {
        let mut inner = self.inner.write();
        if let Some(trace) = inner.traces.get_mut(execution_id) {
            trace.record_transition(entry);
        }
    }

    pub fn set_statistics(
        &self,
        execution_id: &str,
        statistics: ExecutionStatistics,
        current_step: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let mut inner = self.inner.write();
        let Some(trace) = inner.traces.get_mut(execution_id) else {
            return false;
        };
        trace.statistics = statistics;
        trace.updated_at = Some(now);
        if current_step.is_some() {
            trace.current_step = current_step;
        }
        true
    }

    pub fn set_overall_result(&self, execution_id: &str, summary: String, now: DateTime<Utc>) {
        let mut inner = self.inner.write();
        if let Some(trace) = inner.traces.get_mut(execution_id) {
            trace.overall_result = Some(summary);
            trace.updated_at = Some(now);
        }
    }

    pub fn append_log(&self, execution_id: &str, line: String) {
        let mut inner = self.inner.write();
        if let Some(trace) = inner.traces.get_mut(execution_id) {
            trace.execution_log.push(line);
        }
    }

    pub fn merge_debug_data(
        &self,
        execution_id: &str,
        entries: HashMap<String, serde_json::Value>,
    ) {
        let mut inner = self.inner.write();
        if let Some(trace) = inner.traces.get_mut(execution_id) {
            trace.debug_data.extend(entries);
        }
    }

    /// Repair pass for `recover_state`: stamp a missing completion time
    /// on a terminal trace. Returns true when a repair was applied.
    pub fn repair_completed_at(&self, execution_id: &str, now: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write();
        let Some(trace) = inner.traces.get_mut(execution_id) else {
            return false;
        };
        if trace.status.is_terminal() && trace.completed_at.is_none() {
            trace.completed_at = Some(now);
            trace.total_duration_ms = trace.derive_total_duration();
            return true;
        }
        false
    }

    // === Step results ===

    /// Record a step on an embedded (non-partitioned) trace.
    pub fn push_embedded_step(&self, execution_id: &str, step: StepResult, now: DateTime<Utc>) {
        let mut inner = self.inner.write();
        if let Some(trace) = inner.traces.get_mut(execution_id) {
            trace.embedded_steps.push(step);
            trace.updated_at = Some(now);
        }
    }

    /// Record a step in the normalized collection for a partitioned trace.
    pub fn append_partitioned_step(&self, execution_id: &str, step: StepResult) {
        let mut inner = self.inner.write();
        inner
            .step_results
            .entry(execution_id.to_string())
            .or_default()
            .push(step);
    }

    /// Reset recorded steps at the start of a run. Retried executions
    /// re-execute from the top; stale step records from the previous
    /// attempt would otherwise double-count.
    pub fn clear_steps(&self, execution_id: &str) {
        let mut inner = self.inner.write();
        inner.step_results.remove(execution_id);
        if let Some(trace) = inner.traces.get_mut(execution_id) {
            trace.embedded_steps.clear();
        }
    }

    /// Steps for an execution regardless of storage form, in step order.
    pub fn steps_for(&self, execution_id: &str) -> Vec<StepResult> {
        let inner = self.inner.read();
        let Some(trace) = inner.traces.get(execution_id) else {
            return Vec::new();
        };
        let mut steps = if trace.is_partitioned {
            inner
                .step_results
                .get(execution_id)
                .cloned()
                .unwrap_or_default()
        } else {
            trace.embedded_steps.clone()
        };
        steps.sort_by_key(|s| s.step_order);
        steps
    }

    // === Trace queries ===

    pub fn list_traces(
        &self,
        query: &TraceQuery,
        sort: SortField,
        direction: SortDirection,
        page: Page,
    ) -> (Vec<ExecutionTrace>, usize) {
        let inner = self.inner.read();
        let mut matched: Vec<&ExecutionTrace> =
            inner.traces.values().filter(|t| query.matches(t)).collect();
        matched.sort_by(|a, b| {
            let ordering = sort.compare(a, b);
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            // Stable tiebreak so pagination never straddles duplicates.
            if ordering == Ordering::Equal {
                a.execution_id.cmp(&b.execution_id)
            } else {
                ordering
            }
        });
        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(page.offset())
            .take(page.page_size as usize)
            .cloned()
            .collect();
        (items, total)
    }

    pub fn active_traces(&self) -> Vec<ExecutionTrace> {
        self.inner
            .read()
            .traces
            .values()
            .filter(|t| t.status.is_active())
            .cloned()
            .collect()
    }

    pub fn running_started_before(&self, cutoff: DateTime<Utc>) -> Vec<ExecutionTrace> {
        self.inner
            .read()
            .traces
            .values()
            .filter(|t| {
                t.status == ExecutionStatus::Running
                    && t.started_at.is_some_and(|at| at < cutoff)
            })
            .cloned()
            .collect()
    }

    pub fn completed_since(&self, since: DateTime<Utc>) -> Vec<ExecutionTrace> {
        self.inner
            .read()
            .traces
            .values()
            .filter(|t| t.status.is_terminal() && t.completed_at.is_some_and(|at| at >= since))
            .cloned()
            .collect()
    }

    pub fn trace_count(&self) -> usize {
        self.inner.read().traces.len()
    }

    pub fn status_counts(&self) -> HashMap<ExecutionStatus, usize> {
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for trace in inner.traces.values() {
            *counts.entry(trace.status).or_insert(0) += 1;
        }
        counts
    }

    // === State history ===

    pub fn append_history(&self, entry: StateHistoryEntry) {
        let mut inner = self.inner.write();
        inner
            .state_history
            .entry(entry.execution_id.clone())
            .or_default()
            .push(entry);
    }

    /// Most recent transitions first.
    pub fn history_for(&self, execution_id: &str, limit: usize) -> Vec<StateHistoryEntry> {
        let inner = self.inner.read();
        let Some(entries) = inner.state_history.get(execution_id) else {
            return Vec::new();
        };
        entries.iter().rev().take(limit).cloned().collect()
    }

    // === Queue ===

    pub fn enqueue_item(&self, item: QueueItem) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.queue.contains_key(&item.execution_id) {
            return Err(StoreError::DuplicateExecution(item.execution_id));
        }
        inner.queue.insert(item.execution_id.clone(), item);
        Ok(())
    }

    /// Atomically take the next ready item: the read and the lease write
    /// happen under one write lock, so concurrent workers can never
    /// lease the same row.
    pub fn lease_next_ready(&self, now: DateTime<Utc>) -> Option<QueueItem> {
        let mut inner = self.inner.write();
        let next_id = inner
            .queue
            .values()
            .filter(|item| item.is_ready(now))
            .min_by(|a, b| {
                a.dequeue_key()
                    .cmp(&b.dequeue_key())
                    .then_with(|| a.execution_id.cmp(&b.execution_id))
            })
            .map(|item| item.execution_id.clone())?;
        let item = inner.queue.get_mut(&next_id)?;
        item.processing_started_at = Some(now);
        Some(item.clone())
    }

    pub fn get_queue_item(&self, execution_id: &str) -> Option<QueueItem> {
        self.inner.read().queue.get(execution_id).cloned()
    }

    pub fn remove_queue_item(&self, execution_id: &str) -> Option<QueueItem> {
        self.inner.write().queue.remove(execution_id)
    }

    pub fn update_queue_item(
        &self,
        execution_id: &str,
        f: impl FnOnce(&mut QueueItem),
    ) -> bool {
        let mut inner = self.inner.write();
        match inner.queue.get_mut(execution_id) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    /// Execution ids whose lease started before the cutoff.
    pub fn expired_leases(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        self.inner
            .read()
            .queue
            .values()
            .filter(|item| item.processing_started_at.is_some_and(|at| at < cutoff))
            .map(|item| item.execution_id.clone())
            .collect()
    }

    pub fn queue_depth(&self) -> usize {
        self.inner.read().queue.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner
            .read()
            .queue
            .values()
            .filter(|item| item.processing_started_at.is_some())
            .count()
    }

    pub fn priority_counts(&self) -> Vec<(QueuePriority, usize)> {
        let inner = self.inner.read();
        QueuePriority::ALL
            .iter()
            .map(|&priority| {
                let count = inner
                    .queue
                    .values()
                    .filter(|item| item.priority == priority)
                    .count();
                (priority, count)
            })
            .collect()
    }

    pub fn oldest_queued_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().queue.values().map(|i| i.queued_at).min()
    }

    pub fn clear_queue(&self, execution_type: Option<ExecutionType>) -> usize {
        let mut inner = self.inner.write();
        let before = inner.queue.len();
        match execution_type {
            Some(kind) => inner.queue.retain(|_, item| item.execution_type != kind),
            None => inner.queue.clear(),
        }
        before - inner.queue.len()
    }

    // === Dead letters ===

    pub fn push_dead_letter(&self, dead_letter: DeadLetter) {
        self.inner.write().dead_letters.push(dead_letter);
    }

    pub fn dead_letter_count(&self) -> usize {
        self.inner.read().dead_letters.len()
    }

    pub fn dead_letter_for(&self, execution_id: &str) -> Option<DeadLetter> {
        self.inner
            .read()
            .dead_letters
            .iter()
            .find(|d| d.item.execution_id == execution_id)
            .cloned()
    }

    // === Metrics / health / alerts ===

    pub fn record_metric(&self, metric: Metric) {
        self.inner.write().metrics.push(metric);
    }

    pub fn metrics_since(&self, since: DateTime<Utc>) -> Vec<Metric> {
        self.inner
            .read()
            .metrics
            .iter()
            .filter(|m| m.timestamp >= since)
            .cloned()
            .collect()
    }

    pub fn prune_metrics(&self, cutoff: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write();
        let before = inner.metrics.len();
        inner.metrics.retain(|m| m.timestamp >= cutoff);
        before - inner.metrics.len()
    }

    pub fn record_health_checks(&self, checks: Vec<HealthCheck>) {
        self.inner.write().health_checks.extend(checks);
    }

    pub fn prune_health_checks(&self, cutoff: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write();
        let before = inner.health_checks.len();
        inner.health_checks.retain(|c| c.checked_at >= cutoff);
        before - inner.health_checks.len()
    }

    pub fn insert_alert(&self, alert: Alert) {
        self.inner
            .write()
            .alerts
            .insert(alert.alert_id.clone(), alert);
    }

    pub fn alerts(&self, unacknowledged_only: bool) -> Vec<Alert> {
        let inner = self.inner.read();
        let mut alerts: Vec<Alert> = inner
            .alerts
            .values()
            .filter(|a| !unacknowledged_only || !a.acknowledged)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        alerts
    }

    pub fn acknowledge_alert(&self, alert_id: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.alerts.get_mut(alert_id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// Whether an unacknowledged alert with this title already exists.
    /// Used to suppress duplicate threshold alerts.
    pub fn has_open_alert(&self, title: &str) -> bool {
        self.inner
            .read()
            .alerts
            .values()
            .any(|a| !a.acknowledged && a.title == title)
    }

    // === Processed results ===

    pub fn insert_result(&self, result: ProcessedResult) {
        self.inner
            .write()
            .results
            .insert(result.execution_id.clone(), result);
    }

    pub fn result_for(&self, execution_id: &str) -> Option<ProcessedResult> {
        self.inner.read().results.get(execution_id).cloned()
    }

    pub fn insert_suite_summary(&self, summary: SuiteSummary) {
        self.inner
            .write()
            .suite_summaries
            .insert(summary.suite_execution_id.clone(), summary);
    }

    pub fn suite_summary_for(&self, execution_id: &str) -> Option<SuiteSummary> {
        self.inner
            .read()
            .suite_summaries
            .get(execution_id)
            .cloned()
    }

    /// Cheap liveness probe: baseline trace count.
    pub fn ping(&self) -> usize {
        self.inner.read().traces.len()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
