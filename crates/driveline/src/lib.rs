// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Driveline - deterministic in-process module runtime
//!
//! A runtime for composing a fixed set of application modules that
//! communicate through typed data elements and operations, executed by a
//! deterministic periodic scheduler. It targets vehicle and embedded
//! workloads where a single executable hosts several loosely coupled
//! modules; transport is either in-process shared memory or a middleware
//! participant carrying length-prefixed structured payloads.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use driveline::{
//!     DataElement, ExecutableController, Module, ModuleBase, Result, RuntimeConfig,
//! };
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Sensor {
//!     base: ModuleBase,
//!     element: Arc<DataElement<u64>>,
//! }
//!
//! impl Module for Sensor {
//!     fn base(&self) -> &ModuleBase {
//!         &self.base
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let mut controller = ExecutableController::new(RuntimeConfig::default())?;
//!     let element = Arc::new(DataElement::<u64>::new("reading"));
//!     controller.register_endpoint(element.clone());
//!
//!     let sensor = Arc::new(Mutex::new(Sensor {
//!         base: ModuleBase::new("Sensor", Vec::new(), controller.handle(), controller.executor()),
//!         element: element.clone(),
//!     }));
//!     {
//!         let sensor = sensor.clone();
//!         let guard = sensor.lock();
//!         let endpoint = guard.element.clone();
//!         guard.base().executor().run_periodic(Duration::from_millis(10), move || {
//!             endpoint.set(7);
//!         })?;
//!     }
//!     controller.register_module(sensor)?;
//!     controller.run(true)
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        Application Modules                         |
//! |     Module trait + ModuleBase (lifecycle, scheduler facade)        |
//! +--------------------------------------------------------------------+
//! |   ExecutableController (phases, state map, error routing)          |
//! |   Executor (global tick, topological task order, budgets)          |
//! +--------------------------------------------------------------------+
//! |   Communication fabric                                             |
//! |   in-process: DataElement / Operation                              |
//! |   middleware: bus::DataElement{Provider,Consumer},                 |
//! |               bus::Operation{Client,Server} over a Participant     |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ExecutableController`] | Process-wide orchestrator, owns the executor |
//! | [`Module`] / [`ModuleBase`] | Lifecycle contract and per-module services |
//! | [`Executor`] | Tick-driven scheduler with dependency-ordered tasks |
//! | [`DataElement`] | Typed latest-value pub/sub endpoint (in-process) |
//! | [`Operation`] | Typed request/response endpoint (in-process) |
//! | [`bus::MemoryBus`] | In-process reference middleware participant |

/// Middleware participant backend (pub/sub topics, RPC, payload codec).
pub mod bus;
/// In-process communication fabric (data elements and operations).
pub mod com;
/// Runtime configuration.
pub mod config;
/// Process-wide lifecycle orchestration.
pub mod controller;
/// Error domain (`Error`, `ErrorCode`, `Result`).
pub mod error;
/// Tick-driven periodic task execution.
pub mod exec;
/// One-shot completion handles (`Promise`/`Future`).
pub mod future;
/// Process-wide logging registry with leveled output sinks.
pub mod logging;
/// Module lifecycle contract.
pub mod module;

mod data_ptr;

pub use com::{DataElement, EventHandlerControl, Operation};
pub use config::RuntimeConfig;
pub use controller::{ControllerHandle, DefaultUserController, ExecutableController, UserController};
pub use data_ptr::{ConstDataPtr, DataPtr};
pub use error::{Error, ErrorCode, Result};
pub use exec::{Executor, ModuleExecutor, TaskHandle};
pub use future::{oneshot, Future, Promise};
pub use module::{Module, ModuleBase, ModuleState};

/// Driveline version string.
pub const VERSION: &str = "0.2.0";
