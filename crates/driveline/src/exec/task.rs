// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Task handles: one periodic unit of work plus its scheduling metadata.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub(crate) type TaskEffect = Box<dyn Fn() + Send + Sync>;

/// A periodic task registered with the executor.
///
/// The handle stays valid for the executor's lifetime. The `active` flag is
/// independent of the handle's position: a deactivated task is skipped but
/// keeps its slot in the execution order.
pub struct TaskHandle {
    name: String,
    owner: String,
    period_ticks: u64,
    offset: u64,
    budget: Option<Duration>,
    upstream_modules: Vec<String>,
    upstream_tasks: Vec<String>,
    active: AtomicBool,
    effect: TaskEffect,
}

impl TaskHandle {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        owner: String,
        period_ticks: u64,
        offset: u64,
        budget: Option<Duration>,
        upstream_modules: Vec<String>,
        upstream_tasks: Vec<String>,
        effect: TaskEffect,
    ) -> Self {
        Self {
            name,
            owner,
            period_ticks,
            offset: offset % period_ticks,
            budget,
            upstream_modules,
            upstream_tasks,
            active: AtomicBool::new(false),
            effect,
        }
    }

    /// Task name; empty for unnamed tasks.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning module.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Period in ticks (>= 1).
    pub fn period_ticks(&self) -> u64 {
        self.period_ticks
    }

    /// Offset within the period, already reduced modulo the period.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Advisory execution time budget.
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Modules whose tasks must run before this one within a tick.
    pub fn upstream_modules(&self) -> &[String] {
        &self.upstream_modules
    }

    /// Same-owner tasks that must run before this one within a tick.
    pub fn upstream_tasks(&self) -> &[String] {
        &self.upstream_tasks
    }

    /// Whether the task is eligible for execution.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark the task eligible for execution.
    pub fn start(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Mark the task skipped; it retains its position.
    pub fn stop(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Whether the task is due at the given tick.
    pub(crate) fn is_due(&self, tick: u64) -> bool {
        tick % self.period_ticks == self.offset
    }

    pub(crate) fn execute(&self) {
        (self.effect)();
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("period_ticks", &self.period_ticks)
            .field("offset", &self.offset)
            .field("budget", &self.budget)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
