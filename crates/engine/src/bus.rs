// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus for state-change notifications.
//!
//! Delivery is best-effort and non-blocking: every subscriber owns a
//! bounded channel, and a subscriber whose buffer is full is dropped
//! rather than ever blocking the publisher or its peers.

use chrono::Utc;
use parking_lot::Mutex;
use rig_core::StateChangeEvent;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// Buffered events per subscriber before the slow-consumer policy
/// kicks in.
pub const SUBSCRIBER_BUFFER: usize = 64;

/// Idle time after which a subscription yields a synthetic heartbeat.
pub const HEARTBEAT_IDLE: Duration = Duration::from_secs(30);

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<StateChangeEvent>,
}

#[derive(Default)]
struct BusInner {
    per_execution: HashMap<String, Vec<Subscriber>>,
    global: Vec<Subscriber>,
    next_id: u64,
}

/// Fan-out hub: per-execution subscriber sets plus a global set.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events for one execution.
    pub fn subscribe(&self, execution_id: &str) -> EventStream {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .per_execution
            .entry(execution_id.to_string())
            .or_default()
            .push(Subscriber { id, tx });
        tracing::debug!(execution_id, subscriber = id, "subscribed");
        EventStream {
            execution_id: execution_id.to_string(),
            rx,
        }
    }

    /// Subscribe to events for all executions.
    pub fn subscribe_all(&self) -> EventStream {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.global.push(Subscriber { id, tx });
        EventStream {
            execution_id: "global".to_string(),
            rx,
        }
    }

    /// Deliver an event to the execution's subscribers and the global
    /// set. Subscribers with full or closed channels are removed.
    pub fn publish(&self, event: &StateChangeEvent) {
        let mut inner = self.inner.lock();
        if let Some(subscribers) = inner.per_execution.get_mut(&event.execution_id) {
            deliver(subscribers, event);
            if subscribers.is_empty() {
                inner.per_execution.remove(&event.execution_id);
            }
        }
        deliver(&mut inner.global, event);
    }

    /// Live subscriber count for an execution (diagnostics).
    pub fn subscriber_count(&self, execution_id: &str) -> usize {
        self.inner
            .lock()
            .per_execution
            .get(execution_id)
            .map_or(0, Vec::len)
    }

    pub fn global_subscriber_count(&self) -> usize {
        self.inner.lock().global.len()
    }
}

fn deliver(subscribers: &mut Vec<Subscriber>, event: &StateChangeEvent) {
    subscribers.retain(|sub| match sub.tx.try_send(event.clone()) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(
                execution_id = %event.execution_id,
                subscriber = sub.id,
                "subscriber buffer full, dropping subscriber"
            );
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    });
}

/// A lazy, cancellable stream of state-change events.
///
/// Dropping the stream unsubscribes: the bus prunes the closed channel
/// on its next publish.
pub struct EventStream {
    execution_id: String,
    rx: mpsc::Receiver<StateChangeEvent>,
}

impl EventStream {
    /// Next event. After [`HEARTBEAT_IDLE`] without traffic a synthetic
    /// `PROGRESS_UPDATE { heartbeat: true }` is yielded so clients can
    /// detect dead links. Returns `None` once the bus has dropped this
    /// subscriber and the buffer is drained.
    pub async fn recv(&mut self) -> Option<StateChangeEvent> {
        match tokio::time::timeout(HEARTBEAT_IDLE, self.rx.recv()).await {
            Ok(event) => event,
            Err(_) => Some(StateChangeEvent::heartbeat(
                self.execution_id.as_str(),
                Utc::now(),
            )),
        }
    }

    /// Non-blocking receive for polling consumers and tests.
    pub fn try_recv(&mut self) -> Option<StateChangeEvent> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
