// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_tick_period_ms() -> u64 {
    10
}

fn default_executor_thread_name() -> String {
    "driveline-executor".to_string()
}

/// Configuration of the executable runtime.
///
/// The tick period is the global time base; every task period must be a
/// positive exact multiple of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Global tick period in milliseconds.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    /// Name of the executor worker thread.
    #[serde(default = "default_executor_thread_name")]
    pub executor_thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            executor_thread_name: default_executor_thread_name(),
        }
    }
}

impl RuntimeConfig {
    /// Tick period as a [`Duration`].
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::not_ok(format!("Cannot read config {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::not_ok(format!("Cannot parse config {}: {}", path.display(), e)))
    }
}
