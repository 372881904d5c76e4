// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-module registration facade over the global [`Executor`].
//!
//! Every registration is tagged with the owning module's name and its
//! cross-module dependency list, so the executor can keep the global order
//! topological without the module spelling its dependencies out per task.

use super::executor::Executor;
use super::task::TaskHandle;
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Module-scoped view of the executor.
pub struct ModuleExecutor {
    executor: Arc<Executor>,
    name: String,
    dependencies: Vec<String>,
    handles: Mutex<Vec<Arc<TaskHandle>>>,
    started: AtomicBool,
}

impl ModuleExecutor {
    /// Create the facade for module `name` with its upstream module names.
    pub fn new(executor: Arc<Executor>, name: String, dependencies: Vec<String>) -> Self {
        Self {
            executor,
            name,
            dependencies,
            handles: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Register an unnamed periodic task with default offset and no budget.
    pub fn run_periodic(
        &self,
        period: Duration,
        effect: impl Fn() + Send + Sync + 'static,
    ) -> Result<()> {
        self.register(None, period, effect, &[], 0, None)
    }

    /// Register a named periodic task.
    ///
    /// `upstream_tasks` orders this task after other tasks of the same
    /// module within a tick.
    pub fn run_periodic_named(
        &self,
        name: &str,
        period: Duration,
        effect: impl Fn() + Send + Sync + 'static,
        upstream_tasks: &[String],
        offset: u64,
        budget: Option<Duration>,
    ) -> Result<()> {
        self.register(Some(name), period, effect, upstream_tasks, offset, budget)
    }

    fn register(
        &self,
        name: Option<&str>,
        period: Duration,
        effect: impl Fn() + Send + Sync + 'static,
        upstream_tasks: &[String],
        offset: u64,
        budget: Option<Duration>,
    ) -> Result<()> {
        let handle = self.executor.run_periodic(
            name,
            period,
            effect,
            &self.name,
            &self.dependencies,
            upstream_tasks,
            offset,
            budget,
        )?;
        if self.started.load(Ordering::Acquire) {
            handle.start();
        }
        self.handles.lock().push(handle);
        Ok(())
    }

    /// Activate all of this module's task handles.
    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
        for handle in self.handles.lock().iter() {
            handle.start();
        }
    }

    /// Deactivate all of this module's task handles.
    pub fn stop(&self) {
        self.started.store(false, Ordering::Release);
        for handle in self.handles.lock().iter() {
            handle.stop();
        }
    }

    /// Whether any task has been registered through this facade.
    pub fn has_tasks(&self) -> bool {
        !self.handles.lock().is_empty()
    }

    /// The owning module's name.
    pub fn module_name(&self) -> &str {
        &self.name
    }

    /// The owning module's upstream module names.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facade(deps: Vec<String>) -> (Arc<Executor>, ModuleExecutor) {
        let executor = Arc::new(Executor::new(Duration::from_millis(10)).unwrap());
        let facade = ModuleExecutor::new(Arc::clone(&executor), "M".to_string(), deps);
        (executor, facade)
    }

    #[test]
    fn registrations_carry_owner_and_dependencies() {
        let (executor, me) = facade(vec!["Up".to_string()]);
        me.run_periodic_named("t", Duration::from_millis(10), || {}, &[], 0, None)
            .unwrap();
        assert_eq!(executor.task_order(), vec![("M".to_string(), "t".to_string())]);
        assert!(me.has_tasks());
    }

    #[test]
    fn start_activates_existing_and_future_handles() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let executor = Arc::new(Executor::new(Duration::from_millis(2)).unwrap());
        let me = ModuleExecutor::new(Arc::clone(&executor), "M".to_string(), Vec::new());
        let early = Arc::new(AtomicUsize::new(0));
        let late = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&early);
        me.run_periodic(Duration::from_millis(2), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        me.start();
        // Registered after start(): must be activated immediately.
        let counter = Arc::clone(&late);
        me.run_periodic(Duration::from_millis(2), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

        executor.start();
        std::thread::sleep(Duration::from_millis(30));
        executor.stop();

        assert!(early.load(Ordering::Relaxed) > 0);
        assert!(late.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn empty_facade_reports_no_tasks() {
        let (_executor, me) = facade(Vec::new());
        assert!(!me.has_tasks());
    }
}
