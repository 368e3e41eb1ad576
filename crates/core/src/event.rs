// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-change events broadcast by the state service.

use crate::status::ExecutionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vocabulary of state-change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ExecutionStarted,
    ExecutionCompleted,
    ExecutionFailed,
    ExecutionCancelled,
    StepStarted,
    StepCompleted,
    StepFailed,
    ProgressUpdate,
    ErrorOccurred,
}

impl EventType {
    /// Event emitted for a transition into the given status.
    pub fn for_status(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Running => EventType::ExecutionStarted,
            ExecutionStatus::Passed => EventType::ExecutionCompleted,
            ExecutionStatus::Failed | ExecutionStatus::Timeout | ExecutionStatus::Aborted => {
                EventType::ExecutionFailed
            }
            ExecutionStatus::Cancelled => EventType::ExecutionCancelled,
            _ => EventType::ProgressUpdate,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventType::ExecutionStarted => "execution_started",
            EventType::ExecutionCompleted => "execution_completed",
            EventType::ExecutionFailed => "execution_failed",
            EventType::ExecutionCancelled => "execution_cancelled",
            EventType::StepStarted => "step_started",
            EventType::StepCompleted => "step_completed",
            EventType::StepFailed => "step_failed",
            EventType::ProgressUpdate => "progress_update",
            EventType::ErrorOccurred => "error_occurred",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One message on the event bus.
///
/// `event_id` is the composite `execution_id · timestamp · event_type`,
/// unique per (execution, instant, kind).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    pub event_id: String,
    pub event_type: EventType,
    pub execution_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl StateChangeEvent {
    pub fn new(
        event_type: EventType,
        execution_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        data: serde_json::Value,
        user_id: Option<String>,
    ) -> Self {
        let execution_id = execution_id.into();
        let event_id = format!(
            "{}_{}_{}",
            execution_id,
            timestamp.timestamp_millis(),
            event_type.name()
        );
        Self {
            event_id,
            event_type,
            execution_id,
            timestamp,
            data,
            user_id,
        }
    }

    /// Synthetic keep-alive event for idle subscriptions.
    pub fn heartbeat(execution_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::new(
            EventType::ProgressUpdate,
            execution_id,
            now,
            serde_json::json!({ "heartbeat": true }),
            None,
        )
    }

    pub fn is_heartbeat(&self) -> bool {
        self.data
            .get("heartbeat")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
