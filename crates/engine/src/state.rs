// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution state service.
//!
//! The only writer of `status` and `state_history`. Transitions are a
//! compare-and-set against the current status: a zero-modified update
//! means a concurrent writer raced, and no history entry or event is
//! produced for the losing writer.

use crate::bus::{EventBus, EventStream};
use crate::error::EngineError;
use rig_core::{
    Clock, EventType, ExecutionStatistics, ExecutionTrace, StateChangeEvent, StateHistoryEntry,
};
use rig_storage::TraceStore;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct StateService<C: Clock> {
    store: Arc<TraceStore>,
    bus: Arc<EventBus>,
    clock: C,
}

impl<C: Clock> StateService<C> {
    pub fn new(store: Arc<TraceStore>, bus: Arc<EventBus>, clock: C) -> Self {
        Self { store, bus, clock }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Transition an execution to `to_status`.
    ///
    /// Returns `Ok(false)` when the compare-and-set lost a race with a
    /// concurrent writer (the trace is unchanged). An illegal
    /// transition per the state table is an error, distinguishable from
    /// a missing trace.
    pub fn transition(
        &self,
        execution_id: &str,
        to_status: rig_core::ExecutionStatus,
        user_id: Option<&str>,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<bool, EngineError> {
        let trace = self
            .store
            .get_trace(execution_id)
            .ok_or_else(|| EngineError::NotFound(format!("execution {execution_id}")))?;
        let from_status = trace.status;

        if !from_status.can_transition_to(to_status) {
            return Err(EngineError::StateTransition {
                execution_id: execution_id.to_string(),
                from: from_status,
                to: to_status,
            });
        }

        let now = self.clock.now();
        if !self.store.cas_status(execution_id, from_status, to_status, now) {
            tracing::warn!(
                execution_id,
                from = %from_status,
                to = %to_status,
                "state update conflict, concurrent writer won"
            );
            return Ok(false);
        }

        let entry = StateHistoryEntry {
            execution_id: execution_id.to_string(),
            old_status: from_status,
            new_status: to_status,
            timestamp: now,
            user_id: user_id.map(str::to_string),
            metadata: metadata.clone().unwrap_or_default(),
        };
        self.store.append_history(entry.clone());
        self.store.record_inline_transition(execution_id, entry);

        let event = StateChangeEvent::new(
            EventType::for_status(to_status),
            execution_id,
            now,
            serde_json::json!({
                "old_status": from_status,
                "new_status": to_status,
                "metadata": metadata.unwrap_or_default(),
            }),
            user_id.map(str::to_string),
        );
        self.bus.publish(&event);

        tracing::info!(
            execution_id,
            from = %from_status,
            to = %to_status,
            "state transition"
        );
        Ok(true)
    }

    /// Write progress statistics and notify subscribers. Never changes
    /// status.
    pub fn update_progress(
        &self,
        execution_id: &str,
        statistics: ExecutionStatistics,
        current_step: Option<String>,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        if !self.store.set_statistics(
            execution_id,
            statistics.clone(),
            current_step.clone(),
            now,
        ) {
            return Err(EngineError::NotFound(format!("execution {execution_id}")));
        }

        let event = StateChangeEvent::new(
            EventType::ProgressUpdate,
            execution_id,
            now,
            serde_json::json!({
                "statistics": statistics,
                "current_step": current_step,
            }),
            None,
        );
        self.bus.publish(&event);
        Ok(())
    }

    pub fn subscribe(&self, execution_id: &str) -> EventStream {
        self.bus.subscribe(execution_id)
    }

    pub fn subscribe_all(&self) -> EventStream {
        self.bus.subscribe_all()
    }

    /// State-change audit trail, most recent first.
    pub fn state_history(
        &self,
        execution_id: &str,
        limit: usize,
    ) -> Vec<StateHistoryEntry> {
        self.store.history_for(execution_id, limit)
    }

    pub fn active_executions(&self) -> Vec<ExecutionTrace> {
        self.store.active_traces()
    }

    /// Reload a trace and repair inconsistencies.
    ///
    /// A terminal trace without a completion timestamp gets one; a
    /// statistics anomaly (`completed > total`) is logged but the
    /// counters are never rewritten.
    pub fn recover_state(&self, execution_id: &str) -> Result<ExecutionTrace, EngineError> {
        let now = self.clock.now();
        if self.store.repair_completed_at(execution_id, now) {
            tracing::warn!(
                execution_id,
                "terminal execution was missing completed_at, repaired"
            );
        }

        let trace = self
            .store
            .get_trace(execution_id)
            .ok_or_else(|| EngineError::NotFound(format!("execution {execution_id}")))?;

        if trace.statistics.completed_steps > trace.statistics.total_steps {
            tracing::warn!(
                execution_id,
                completed = trace.statistics.completed_steps,
                total = trace.statistics.total_steps,
                "statistics anomaly: completed exceeds total"
            );
        }
        Ok(trace)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
