// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rig-engine: Execution control plane for the Rig test engine.
//!
//! Services and their field ownership:
//! - [`state::StateService`]: the only writer of `status` and
//!   `state_history`; fans events out through [`bus::EventBus`].
//! - [`queue::QueueService`]: the only writer of queue rows; resolves
//!   failures into retry/dead-letter outcomes.
//! - [`orchestrator::Orchestrator`]: the only writer of `statistics`
//!   and step results; drives runs through the runners.
//! - [`worker::QueueWorker`]: the per-process dispatch loop.
//! - [`monitor::MonitoringService`]: read-only sampling, metrics,
//!   alerts, retention.

pub mod bus;
pub mod config;
pub mod error;
pub mod execution;
pub mod monitor;
pub mod orchestrator;
pub mod queue;
pub mod results;
pub mod runner;
pub mod state;
pub mod worker;

pub use bus::{EventBus, EventStream};
pub use config::{EngineConfig, InsightThresholds, MonitorConfig, QueueConfig};
pub use error::EngineError;
pub use execution::{ExecutionPage, ExecutionService, StartTestCase, StartTestSuite};
pub use monitor::{
    AnalyticsReport, MonitoringService, StatisticsReport, SystemHealthReport, TrendReport,
};
pub use orchestrator::{ExecutionProgress, Orchestrator};
pub use queue::{CompletionOutcome, QueueService, QueueStatusReport};
pub use results::{Report, ResultProcessor};
pub use runner::{RunnerRegistry, TestRunner, ValidationReport};
pub use state::StateService;
pub use worker::QueueWorker;
