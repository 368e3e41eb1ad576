// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority queue service with retry, back-off, and dead-letter
//! handling.
//!
//! Failures are resolved into [`CompletionOutcome`] values; `complete`
//! and `retry` never propagate errors to the caller. The queue's
//! processing state (active/paused) is process-local and not persisted
//! across restarts.

use crate::config::QueueConfig;
use crate::error::EngineError;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rig_core::{
    Clock, DeadLetter, ExecutionType, Metric, QueueItem, QueuePriority, QueueState, WorkOrder,
};
use rig_storage::TraceStore;
use serde::Serialize;
use std::sync::Arc;

/// Reason recorded when the retry budget is exhausted.
pub const RETRY_LIMIT_REASON: &str = "Retry limit exceeded";

/// Reason recorded when a lease expires.
pub const LEASE_TIMEOUT_REASON: &str = "Execution timed out";

/// How a completion or failure was resolved by the queue layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// Item removed from the queue after success.
    Completed,
    /// Item rescheduled with back-off.
    Retried {
        attempt: u32,
        next_attempt_at: DateTime<Utc>,
    },
    /// Item moved to the dead-letter queue; scheduling is over.
    DeadLettered { reason: String },
    /// No queue row for this execution.
    Missing,
}

/// Point-in-time queue metrics.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatusReport {
    pub queue_state: QueueState,
    pub total_queued: usize,
    pub pending: usize,
    pub processing: usize,
    pub priority_distribution: Vec<PriorityCount>,
    pub oldest_queued_at: Option<DateTime<Utc>>,
    pub dead_letter_count: usize,
    pub max_concurrent_executions: usize,
    pub processing_timeout_minutes: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriorityCount {
    pub priority: String,
    pub count: usize,
}

pub struct QueueService<C: Clock> {
    store: Arc<TraceStore>,
    clock: C,
    config: QueueConfig,
    state: Mutex<QueueState>,
}

impl<C: Clock> QueueService<C> {
    pub fn new(store: Arc<TraceStore>, config: QueueConfig, clock: C) -> Self {
        Self {
            store,
            clock,
            config,
            state: Mutex::new(QueueState::Active),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn queue_state(&self) -> QueueState {
        *self.state.lock()
    }

    /// Insert a queue item for an execution.
    pub fn enqueue(
        &self,
        execution_id: &str,
        execution_type: ExecutionType,
        payload: WorkOrder,
        priority: QueuePriority,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError> {
        if self.queue_state() == QueueState::Stopped {
            return Err(EngineError::ResourceAllocation {
                resource: "queue".to_string(),
                reason: "queue is stopped".to_string(),
            });
        }

        let now = self.clock.now();
        let item = QueueItem::new(
            execution_id,
            execution_type,
            priority,
            payload,
            now,
            scheduled_at,
            self.config.default_max_retries,
        );
        self.store
            .enqueue_item(item)
            .map_err(|e| EngineError::Conflict(e.to_string()))?;

        self.record_counter("enqueued", execution_type, Some(priority));
        tracing::info!(execution_id, %priority, "execution enqueued");
        Ok(())
    }

    /// Take the next ready item and lease it. Returns `None` when the
    /// queue is paused or nothing is due.
    pub fn dequeue(&self) -> Option<QueueItem> {
        if self.queue_state() != QueueState::Active {
            return None;
        }
        let item = self.store.lease_next_ready(self.clock.now())?;
        tracing::debug!(execution_id = %item.execution_id, "execution dequeued");
        Some(item)
    }

    /// Resolve an execution's queue row after its run finished.
    ///
    /// Success deletes the row; the only other removal path is the
    /// dead-letter move. Failure routes through retry or dead-letter.
    pub fn complete(
        &self,
        execution_id: &str,
        success: bool,
        error: Option<String>,
    ) -> CompletionOutcome {
        if success {
            match self.store.remove_queue_item(execution_id) {
                Some(item) => {
                    self.record_counter("completed", item.execution_type, None);
                    CompletionOutcome::Completed
                }
                None => {
                    tracing::warn!(execution_id, "queue item not found for completion");
                    CompletionOutcome::Missing
                }
            }
        } else {
            self.retry(execution_id, error)
        }
    }

    /// Reschedule a failed execution if its retry budget allows,
    /// otherwise move it to the dead-letter queue.
    pub fn retry(&self, execution_id: &str, error: Option<String>) -> CompletionOutcome {
        let Some(item) = self.store.get_queue_item(execution_id) else {
            tracing::warn!(execution_id, "queue item not found for retry");
            return CompletionOutcome::Missing;
        };

        if item.retry_count >= item.max_retries {
            return self.move_to_dead_letter(item, RETRY_LIMIT_REASON.to_string());
        }

        let now = self.clock.now();
        let attempt = item.retry_count + 1;
        let next_attempt_at = now + self.backoff(attempt);
        self.store.update_queue_item(execution_id, |row| {
            row.retry_count = attempt;
            row.processing_started_at = None;
            row.scheduled_at = next_attempt_at;
            row.last_error = error;
        });

        self.record_counter("retried", item.execution_type, None);
        tracing::info!(
            execution_id,
            attempt,
            next_attempt_at = %next_attempt_at,
            "execution scheduled for retry"
        );
        CompletionOutcome::Retried {
            attempt,
            next_attempt_at,
        }
    }

    /// Reclaim items whose lease expired and route each through retry.
    pub fn sweep_expired_leases(&self) -> Vec<(String, CompletionOutcome)> {
        let cutoff = self.clock.now()
            - Duration::minutes(self.config.processing_timeout_minutes);
        self.store
            .expired_leases(cutoff)
            .into_iter()
            .map(|execution_id| {
                tracing::warn!(execution_id, "queue lease expired");
                let outcome = self.retry(&execution_id, Some(LEASE_TIMEOUT_REASON.to_string()));
                (execution_id, outcome)
            })
            .collect()
    }

    pub fn status_report(&self) -> QueueStatusReport {
        let total_queued = self.store.queue_depth();
        let processing = self.store.in_flight_count();
        QueueStatusReport {
            queue_state: self.queue_state(),
            total_queued,
            pending: total_queued - processing,
            processing,
            priority_distribution: self
                .store
                .priority_counts()
                .into_iter()
                .map(|(priority, count)| PriorityCount {
                    priority: priority.name().to_string(),
                    count,
                })
                .collect(),
            oldest_queued_at: self.store.oldest_queued_at(),
            dead_letter_count: self.store.dead_letter_count(),
            max_concurrent_executions: self.config.max_concurrent_executions,
            processing_timeout_minutes: self.config.processing_timeout_minutes,
            timestamp: self.clock.now(),
        }
    }

    pub fn pause(&self) {
        tracing::info!("queue paused");
        *self.state.lock() = QueueState::Paused;
    }

    pub fn resume(&self) {
        tracing::info!("queue resumed");
        *self.state.lock() = QueueState::Active;
    }

    /// Remove queue items, optionally only one execution type.
    /// Maintenance operation; dead letters are untouched.
    pub fn clear(&self, execution_type: Option<ExecutionType>) -> usize {
        let cleared = self.store.clear_queue(execution_type);
        tracing::info!(cleared, "queue cleared");
        cleared
    }

    /// Linear back-off: attempt n waits `n * base`.
    fn backoff(&self, attempt: u32) -> Duration {
        Duration::minutes(attempt as i64 * self.config.retry_backoff_base_minutes)
    }

    fn move_to_dead_letter(&self, item: QueueItem, reason: String) -> CompletionOutcome {
        let execution_id = item.execution_id.clone();
        let execution_type = item.execution_type;
        tracing::warn!(
            execution_id = %execution_id,
            reason = %reason,
            "moving execution to dead-letter queue"
        );

        self.store.remove_queue_item(&execution_id);
        self.store.push_dead_letter(DeadLetter {
            item,
            moved_at: self.clock.now(),
            failure_reason: reason.clone(),
        });
        self.record_counter("dead_lettered", execution_type, None);
        CompletionOutcome::DeadLettered { reason }
    }

    fn record_counter(
        &self,
        operation: &str,
        execution_type: ExecutionType,
        priority: Option<QueuePriority>,
    ) {
        let mut metric = Metric::counter(format!("queue.{operation}"), self.clock.now())
            .tag("execution_type", execution_type.to_string());
        if let Some(priority) = priority {
            metric = metric.tag("priority", priority.name());
        }
        self.store.record_metric(metric);
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
