// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue items, priorities, and dead letters.

use crate::context::{ExecutionConfig, ExecutionContext, SuiteConfig};
use crate::status::ExecutionType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduling priority bands. Lower value dequeues first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueuePriority {
    Critical,
    High,
    Normal,
    Low,
    Background,
}

impl QueuePriority {
    pub const ALL: [QueuePriority; 5] = [
        QueuePriority::Critical,
        QueuePriority::High,
        QueuePriority::Normal,
        QueuePriority::Low,
        QueuePriority::Background,
    ];

    pub fn as_u8(self) -> u8 {
        match self {
            QueuePriority::Critical => 1,
            QueuePriority::High => 2,
            QueuePriority::Normal => 3,
            QueuePriority::Low => 4,
            QueuePriority::Background => 5,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(QueuePriority::Critical),
            2 => Some(QueuePriority::High),
            3 => Some(QueuePriority::Normal),
            4 => Some(QueuePriority::Low),
            5 => Some(QueuePriority::Background),
            _ => None,
        }
    }

    /// Map a trace priority (1..=10, 1 highest) onto a queue band.
    pub fn from_trace_priority(priority: u8) -> Self {
        match priority {
            0..=2 => QueuePriority::Critical,
            3..=4 => QueuePriority::High,
            5..=6 => QueuePriority::Normal,
            7..=8 => QueuePriority::Low,
            _ => QueuePriority::Background,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            QueuePriority::Critical => "CRITICAL",
            QueuePriority::High => "HIGH",
            QueuePriority::Normal => "NORMAL",
            QueuePriority::Low => "LOW",
            QueuePriority::Background => "BACKGROUND",
        }
    }
}

impl fmt::Display for QueuePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// Stored and transmitted as the numeric band.
impl Serialize for QueuePriority {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for QueuePriority {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        QueuePriority::from_u8(value).ok_or_else(|| {
            serde::de::Error::custom(format!("queue priority must be within 1..=5, got {value}"))
        })
    }
}

/// Process-local queue processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Active,
    Paused,
    Draining,
    Stopped,
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueState::Active => write!(f, "active"),
            QueueState::Paused => write!(f, "paused"),
            QueueState::Draining => write!(f, "draining"),
            QueueState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Typed payload carried by a queue item.
///
/// Everything a worker needs to orchestrate the execution, under a
/// schema-version tag so stored items survive format evolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    #[serde(default = "default_work_order_schema")]
    pub schema_version: String,
    pub execution_context: ExecutionContext,
    pub execution_config: ExecutionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_config: Option<SuiteConfig>,
}

fn default_work_order_schema() -> String {
    "1.0".to_string()
}

impl WorkOrder {
    pub fn new(
        execution_context: ExecutionContext,
        execution_config: ExecutionConfig,
        suite_config: Option<SuiteConfig>,
    ) -> Self {
        Self {
            schema_version: default_work_order_schema(),
            execution_context,
            execution_config,
            suite_config,
        }
    }
}

/// One scheduling row. The queue item and the trace are peers keyed on
/// `execution_id`: the trace records outcome, the queue item records
/// scheduling. `processing_started_at` doubles as the lease token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub execution_id: String,
    pub execution_type: ExecutionType,
    pub priority: QueuePriority,
    pub payload: WorkOrder,
    pub queued_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

fn default_max_retries() -> u32 {
    3
}

impl QueueItem {
    pub fn new(
        execution_id: impl Into<String>,
        execution_type: ExecutionType,
        priority: QueuePriority,
        payload: WorkOrder,
        now: DateTime<Utc>,
        scheduled_at: Option<DateTime<Utc>>,
        max_retries: u32,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            execution_type,
            priority,
            payload,
            queued_at: now,
            scheduled_at: scheduled_at.unwrap_or(now),
            retry_count: 0,
            max_retries,
            processing_started_at: None,
            last_error: None,
        }
    }

    /// Ready = unleased and due.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.processing_started_at.is_none() && self.scheduled_at <= now
    }

    /// Sort key for dequeue order: `(priority ASC, scheduled_at ASC)`.
    pub fn dequeue_key(&self) -> (u8, DateTime<Utc>) {
        (self.priority.as_u8(), self.scheduled_at)
    }
}

/// A queue item removed from scheduling after exhausting retries,
/// preserved for forensics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    #[serde(flatten)]
    pub item: QueueItem,
    pub moved_at: DateTime<Utc>,
    pub failure_reason: String,
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
