// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide logging registry with leveled output sinks.
//!
//! The runtime logs through the standard `log` facade
//! (`log::debug!/info!/warn!/error!`). [`init_logger`] installs the global
//! registry as the facade's backend and selects the output sink; before
//! initialization every log call is a silent no-op.
//!
//! ```ignore
//! use driveline::logging::{init_logger, ConsoleOutput, LogLevel};
//! use std::sync::Arc;
//!
//! init_logger(Arc::new(ConsoleOutput::new(LogLevel::Debug)), LogLevel::Debug);
//! log::info!("runtime up");
//! ```

mod logger;
mod output;

pub use logger::{flush_logger, init_logger};
pub use output::{ConsoleOutput, FileOutput, LogLevel, Output};
