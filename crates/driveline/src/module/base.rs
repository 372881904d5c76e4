// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Base services shared by every module.

use crate::controller::ControllerHandle;
use crate::error::{Error, Result};
use crate::exec::{Executor, ModuleExecutor};
use std::sync::Arc;
use std::time::Duration;

/// Name, dependencies, controller link and scheduler facade of a module.
///
/// The base holds only a handle into the controller's shared state; the
/// controller owns both the modules and the executor, so neither owns the
/// other.
pub struct ModuleBase {
    name: String,
    dependencies: Vec<String>,
    controller: ControllerHandle,
    executor: ModuleExecutor,
}

impl ModuleBase {
    /// Create the base for module `name` with its upstream dependency names.
    pub fn new(
        name: impl Into<String>,
        dependencies: Vec<String>,
        controller: ControllerHandle,
        executor: Arc<Executor>,
    ) -> Self {
        let name = name.into();
        let module_executor = ModuleExecutor::new(executor, name.clone(), dependencies.clone());
        Self {
            name,
            dependencies,
            controller,
            executor: module_executor,
        }
    }

    /// The module's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the modules this module depends on.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// The module-scoped scheduler facade.
    pub fn executor(&self) -> &ModuleExecutor {
        &self.executor
    }

    /// Register an unnamed periodic task (pass-through to the facade).
    pub fn run_periodic(
        &self,
        period: Duration,
        effect: impl Fn() + Send + Sync + 'static,
    ) -> Result<()> {
        self.executor.run_periodic(period, effect)
    }

    /// Register a named periodic task (pass-through to the facade).
    pub fn run_periodic_named(
        &self,
        name: &str,
        period: Duration,
        effect: impl Fn() + Send + Sync + 'static,
        upstream_tasks: &[String],
        offset: u64,
        budget: Option<Duration>,
    ) -> Result<()> {
        self.executor
            .run_periodic_named(name, period, effect, upstream_tasks, offset, budget)
    }

    /// Transition this module from Starting to Operational.
    pub fn report_operational(&self) {
        self.controller.report_operational_of_module(&self.name);
    }

    /// Skip the starting phase. Permitted only for modules that registered
    /// no periodic tasks; such a module becomes operational directly.
    pub fn skip_starting(&self) -> Result<()> {
        if self.executor.has_tasks() {
            return Err(Error::not_ok(format!(
                "Module '{}' cannot skip starting: it has periodic tasks",
                self.name
            )));
        }
        self.controller.skip_starting_of_module(&self.name);
        Ok(())
    }

    /// Report an error to the controller. Critical errors shut the module
    /// down and initiate process shutdown.
    pub fn report_error(&self, error: Error, critical: bool) {
        log::warn!(
            "[{}] reported error (critical={}): {}",
            self.name,
            critical,
            error.message()
        );
        self.controller
            .report_error_of_module(error, &self.name, critical);
    }
}
