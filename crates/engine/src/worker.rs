// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue worker loop.
//!
//! One loop per process: reclaims expired leases, dispatches ready
//! items to orchestration tasks up to the concurrency budget, and
//! mirrors queue outcomes (retry, dead-letter) onto the trace's state
//! machine.

use crate::orchestrator::Orchestrator;
use crate::queue::{CompletionOutcome, QueueService};
use crate::state::StateService;
use rig_core::{Clock, ExecutionStatus, QueueItem};
use rig_storage::TraceStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct QueueWorker<C: Clock> {
    store: Arc<TraceStore>,
    queue: Arc<QueueService<C>>,
    orchestrator: Orchestrator<C>,
    state: StateService<C>,
    in_flight: Arc<AtomicUsize>,
}

impl<C: Clock> QueueWorker<C> {
    pub fn new(
        store: Arc<TraceStore>,
        queue: Arc<QueueService<C>>,
        orchestrator: Orchestrator<C>,
        state: StateService<C>,
    ) -> Self {
        Self {
            store,
            queue,
            orchestrator,
            state,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Executions currently being orchestrated by this process.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Background loop: sweep, dispatch, sleep. Runs until shutdown.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        tracing::info!(
            max_concurrent = self.queue.config().max_concurrent_executions,
            "queue worker started"
        );
        loop {
            let poll = std::time::Duration::from_millis(self.queue.config().poll_interval_ms);
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = tokio::time::sleep(poll) => {
                    self.sweep_leases();
                    self.dispatch_ready();
                }
            }
        }
        tracing::info!("queue worker stopped");
    }

    /// Reclaim items whose lease expired and mirror the outcome onto
    /// their traces.
    pub fn sweep_leases(&self) {
        for (execution_id, outcome) in self.queue.sweep_expired_leases() {
            self.mirror_outcome(&execution_id, &outcome);
        }
    }

    /// Fill free orchestration slots from the queue, bounded by the
    /// per-iteration batch cap.
    pub fn dispatch_ready(&self) {
        let config = self.queue.config();
        let active = self.in_flight.load(Ordering::SeqCst);
        let free = config.max_concurrent_executions.saturating_sub(active);
        let budget = free.min(config.dispatch_batch_size);

        for _ in 0..budget {
            let Some(item) = self.queue.dequeue() else {
                break;
            };
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            let worker = self.clone();
            tokio::spawn(async move {
                worker.run_item(item).await;
                worker.in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
    }

    /// Orchestrate one leased item and resolve its queue row.
    pub async fn run_item(&self, item: QueueItem) {
        let execution_id = item.execution_id.clone();
        let result = self
            .orchestrator
            .orchestrate(
                &execution_id,
                &item.payload.execution_context,
                &item.payload.execution_config,
            )
            .await;

        let (success, error) = match &result {
            Ok(progress) => match progress.status {
                ExecutionStatus::Passed | ExecutionStatus::Cancelled => (true, None),
                other => (false, Some(format!("execution ended {other}"))),
            },
            Err(error) => (false, Some(error.to_string())),
        };

        let outcome = self.queue.complete(&execution_id, success, error);
        self.mirror_outcome(&execution_id, &outcome);
    }

    /// Mirror a queue-layer outcome onto the trace's state machine.
    ///
    /// Retry: FAILED/TIMEOUT → RETRYING → QUEUED. Dead-letter leaves a
    /// FAILED trace terminal for forensics, but a transient TIMEOUT
    /// must still settle, so it is driven to ABORTED.
    fn mirror_outcome(&self, execution_id: &str, outcome: &CompletionOutcome) {
        match outcome {
            CompletionOutcome::Retried {
                attempt,
                next_attempt_at,
            } => {
                let mut metadata = HashMap::new();
                metadata.insert("retry_attempt".to_string(), serde_json::json!(attempt));
                metadata.insert(
                    "next_attempt_at".to_string(),
                    serde_json::json!(next_attempt_at),
                );
                if let Err(error) = self.state.transition(
                    execution_id,
                    ExecutionStatus::Retrying,
                    None,
                    Some(metadata),
                ) {
                    tracing::warn!(execution_id, %error, "could not mark execution retrying");
                    return;
                }
                if let Err(error) =
                    self.state
                        .transition(execution_id, ExecutionStatus::Queued, None, None)
                {
                    tracing::warn!(execution_id, %error, "could not requeue execution");
                }
            }
            CompletionOutcome::DeadLettered { reason } => {
                if self.store.trace_status(execution_id) == Some(ExecutionStatus::Timeout) {
                    let mut metadata = HashMap::new();
                    metadata.insert("failure_reason".to_string(), serde_json::json!(reason));
                    let _ = self.state.transition(
                        execution_id,
                        ExecutionStatus::Retrying,
                        None,
                        None,
                    );
                    let _ = self.state.transition(
                        execution_id,
                        ExecutionStatus::Aborted,
                        None,
                        Some(metadata),
                    );
                }
            }
            CompletionOutcome::Completed | CompletionOutcome::Missing => {}
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
