// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Multi-agent orchestration engine: the Registry, Worker Supervisor,
//! Resource Monitor, Message Bus, Coordinator, and Consolidator that
//! together implement the orchestrator's runtime.

pub mod config;
pub mod consolidator;
pub mod coordinator;
pub mod delivery;
pub mod event_bus;
pub mod message_bus;
pub mod registry;
pub mod resource_monitor;
pub mod supervisor;

pub use config::OrchestratorConfig;
pub use consolidator::{Consolidator, Participant};
pub use coordinator::Coordinator;
pub use delivery::SupervisorDelivery;
pub use event_bus::EventBus;
pub use message_bus::{MessageBus, QueueStats};
pub use registry::{Registry, WorkerPatch};
pub use resource_monitor::{ResourceMonitor, WorkerStats};
pub use supervisor::{LogLine, LogStream, WorkerSupervisor};
