// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global logger registry and `log` facade bridge.
//!
//! The registry owns the active [`Output`] sink and the global level filter.
//! It is installed once via [`init_logger`]; later calls are ignored. The
//! registry implements [`log::Log`], so all runtime code logs through the
//! standard `log` macros.

use super::output::{LogLevel, Output};
use std::io;
use std::sync::{Arc, Mutex, OnceLock};

static LOGGER: OnceLock<Arc<Mutex<GlobalLogger>>> = OnceLock::new();
static FACADE: FacadeLogger = FacadeLogger;

/// Global logger state: active output and level filter.
struct GlobalLogger {
    output: Arc<dyn Output>,
    level_filter: LogLevel,
}

impl GlobalLogger {
    fn log(&self, level: LogLevel, message: &str) -> io::Result<()> {
        if level < self.level_filter {
            return Ok(());
        }
        self.output.write(level, message)
    }

    fn flush(&self) -> io::Result<()> {
        self.output.flush()
    }
}

/// Initialize the global logger with the given output and level.
///
/// Only the first call takes effect. Also installs the registry as the
/// backend of the `log` facade so the standard macros reach the sink.
pub fn init_logger(output: Arc<dyn Output>, level: LogLevel) {
    let _ = LOGGER.get_or_init(|| {
        Arc::new(Mutex::new(GlobalLogger {
            output,
            level_filter: level,
        }))
    });
    if log::set_logger(&FACADE).is_ok() {
        log::set_max_level(to_level_filter(level));
    }
}

/// Flush the global logger's output. No-op when uninitialized.
pub fn flush_logger() -> io::Result<()> {
    match LOGGER.get() {
        Some(logger) => logger
            .lock()
            .map_err(|_| io::Error::other("global logger mutex poisoned"))?
            .flush(),
        None => Ok(()),
    }
}

fn log_message(level: LogLevel, message: &str) -> io::Result<()> {
    match LOGGER.get() {
        Some(logger) => logger
            .lock()
            .map_err(|_| io::Error::other("global logger mutex poisoned"))?
            .log(level, message),
        None => Ok(()),
    }
}

fn to_level_filter(level: LogLevel) -> log::LevelFilter {
    match level {
        LogLevel::Debug => log::LevelFilter::Debug,
        LogLevel::Info => log::LevelFilter::Info,
        LogLevel::Warning => log::LevelFilter::Warn,
        LogLevel::Error => log::LevelFilter::Error,
    }
}

fn from_facade_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Trace | log::Level::Debug => LogLevel::Debug,
        log::Level::Info => LogLevel::Info,
        log::Level::Warn => LogLevel::Warning,
        log::Level::Error => LogLevel::Error,
    }
}

/// Adapter routing the `log` facade into the registry.
struct FacadeLogger;

impl log::Log for FacadeLogger {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        LOGGER.get().is_some()
    }

    fn log(&self, record: &log::Record<'_>) {
        let level = from_facade_level(record.level());
        let _ = log_message(level, &format!("{}", record.args()));
    }

    fn flush(&self) {
        let _ = flush_logger();
    }
}
