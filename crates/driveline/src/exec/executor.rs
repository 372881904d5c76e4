// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The global tick-driven executor.
//!
//! A dedicated worker thread waits for each tick boundary, increments the
//! monotonic tick counter and walks the task sequence in order, running every
//! task that is active and due. Budgets are advisory: an overrun is logged,
//! never preempted. A panicking effect is caught and forwarded as a critical
//! module error event for its owner; the remaining tasks of the tick still
//! run.

use super::task::{TaskEffect, TaskHandle};
use crate::error::{Error, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Error signal produced when a task effect panics.
#[derive(Debug, Clone)]
pub struct ModuleErrorEvent {
    /// Name of the module owning the failed task.
    pub module: String,
    /// The converted error.
    pub error: Error,
    /// Always `true` for panics.
    pub critical: bool,
}

/// Global periodic task scheduler.
///
/// Task registration happens before [`start`](Executor::start) (or under the
/// internal configuration lock); the worker takes a snapshot of the sequence
/// each tick.
pub struct Executor {
    tick_period: Duration,
    thread_name: String,
    tasks: Arc<Mutex<Vec<Arc<TaskHandle>>>>,
    tick: Arc<AtomicU64>,
    stop_flag: Arc<AtomicBool>,
    started: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    error_tx: Sender<ModuleErrorEvent>,
    error_rx: Receiver<ModuleErrorEvent>,
}

impl Executor {
    /// Create an executor with the given tick period and default thread name.
    pub fn new(tick_period: Duration) -> Result<Self> {
        Self::with_thread_name(tick_period, "driveline-executor")
    }

    /// Create an executor with an explicit worker thread name.
    pub fn with_thread_name(tick_period: Duration, thread_name: &str) -> Result<Self> {
        if tick_period.is_zero() {
            return Err(Error::not_ok("Executor tick period must be positive"));
        }
        let (error_tx, error_rx) = unbounded();
        Ok(Self {
            tick_period,
            thread_name: thread_name.to_string(),
            tasks: Arc::new(Mutex::new(Vec::new())),
            tick: Arc::new(AtomicU64::new(0)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
            worker: Mutex::new(None),
            error_tx,
            error_rx,
        })
    }

    /// The global tick period.
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Current tick count (0 before the first tick).
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Receiver for module error events (panicking task effects).
    pub fn error_events(&self) -> Receiver<ModuleErrorEvent> {
        self.error_rx.clone()
    }

    /// Register a periodic task.
    ///
    /// `period` is wall-clock and must be a positive exact multiple of the
    /// tick period. The handle is inserted at the earliest position that
    /// keeps every upstream handle (owner in `upstream_modules`, or same
    /// owner and name in `upstream_tasks`) strictly before it.
    #[allow(clippy::too_many_arguments)]
    pub fn run_periodic(
        &self,
        name: Option<&str>,
        period: Duration,
        effect: impl Fn() + Send + Sync + 'static,
        owner: &str,
        upstream_modules: &[String],
        upstream_tasks: &[String],
        offset: u64,
        budget: Option<Duration>,
    ) -> Result<Arc<TaskHandle>> {
        let period_ticks = self.period_in_ticks(period, owner)?;
        let name = name.unwrap_or_default();

        let mut tasks = self.tasks.lock();
        if !name.is_empty()
            && tasks
                .iter()
                .any(|t| t.owner() == owner && t.name() == name)
        {
            return Err(Error::not_ok(format!(
                "Duplicate task name '{}' in module '{}'",
                name, owner
            )));
        }

        let handle = Arc::new(TaskHandle::new(
            name.to_string(),
            owner.to_string(),
            period_ticks,
            offset,
            budget,
            upstream_modules.to_vec(),
            upstream_tasks.to_vec(),
            Box::new(effect) as TaskEffect,
        ));

        let position = insertion_point(&tasks, owner, upstream_modules, upstream_tasks);
        tasks.insert(position, Arc::clone(&handle));
        log::debug!(
            "[executor] registered task '{}' of '{}' at position {} (period={} ticks, offset={})",
            handle.name(),
            owner,
            position,
            handle.period_ticks(),
            handle.offset()
        );
        Ok(handle)
    }

    /// Start the worker thread. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_flag.store(false, Ordering::Release);

        let tick_period = self.tick_period;
        let tasks = Arc::clone(&self.tasks);
        let tick = Arc::clone(&self.tick);
        let stop_flag = Arc::clone(&self.stop_flag);
        let error_tx = self.error_tx.clone();

        #[allow(clippy::expect_used)] // thread spawn failure is unrecoverable
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || worker_loop(tick_period, &tasks, &tick, &stop_flag, &error_tx))
            .expect("failed to spawn executor thread");
        *self.worker.lock() = Some(handle);
    }

    /// Stop the worker at the next tick boundary and join it.
    ///
    /// In-flight task effects run to completion.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        self.started.store(false, Ordering::SeqCst);
    }

    /// (De)activate every task handle owned by `module`.
    pub fn set_module_tasks_active(&self, module: &str, active: bool) {
        for task in self.tasks.lock().iter() {
            if task.owner() == module {
                if active {
                    task.start();
                } else {
                    task.stop();
                }
            }
        }
    }

    /// Execution order as `(owner, name)` pairs, for diagnostics.
    pub fn task_order(&self) -> Vec<(String, String)> {
        self.tasks
            .lock()
            .iter()
            .map(|t| (t.owner().to_string(), t.name().to_string()))
            .collect()
    }

    fn period_in_ticks(&self, period: Duration, owner: &str) -> Result<u64> {
        let period_ns = period.as_nanos();
        let tick_ns = self.tick_period.as_nanos();
        if period_ns == 0 || period_ns % tick_ns != 0 {
            return Err(Error::not_ok(format!(
                "Task period {:?} of module '{}' is not a positive multiple of the tick period {:?}",
                period, owner, self.tick_period
            )));
        }
        Ok((period_ns / tick_ns) as u64)
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Earliest position that keeps every upstream handle strictly before it.
fn insertion_point(
    tasks: &[Arc<TaskHandle>],
    owner: &str,
    upstream_modules: &[String],
    upstream_tasks: &[String],
) -> usize {
    let mut position = 0;
    for (index, existing) in tasks.iter().enumerate() {
        let module_upstream = upstream_modules.iter().any(|m| existing.owner() == m);
        let task_upstream =
            existing.owner() == owner && upstream_tasks.iter().any(|t| existing.name() == t);
        if module_upstream || task_upstream {
            position = index + 1;
        }
    }
    position
}

fn worker_loop(
    tick_period: Duration,
    tasks: &Mutex<Vec<Arc<TaskHandle>>>,
    tick: &AtomicU64,
    stop_flag: &AtomicBool,
    error_tx: &Sender<ModuleErrorEvent>,
) {
    log::debug!("[executor] worker started (tick period {:?})", tick_period);
    let mut next_tick = Instant::now() + tick_period;

    while !stop_flag.load(Ordering::Acquire) {
        let now = Instant::now();
        if now < next_tick {
            thread::sleep(next_tick - now);
        }
        next_tick += tick_period;
        if stop_flag.load(Ordering::Acquire) {
            break;
        }

        let current = tick.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot: Vec<Arc<TaskHandle>> = tasks.lock().clone();
        for task in &snapshot {
            if task.is_active() && task.is_due(current) {
                execute_task(task, error_tx);
            }
        }
    }
    log::debug!("[executor] worker stopped");
}

fn execute_task(task: &TaskHandle, error_tx: &Sender<ModuleErrorEvent>) {
    let begin = Instant::now();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| task.execute()));

    if let Err(payload) = outcome {
        let reason = panic_reason(payload.as_ref());
        log::error!(
            "[executor] task '{}' of module '{}' panicked: {}",
            task.name(),
            task.owner(),
            reason
        );
        let _ = error_tx.send(ModuleErrorEvent {
            module: task.owner().to_string(),
            error: Error::not_ok(format!(
                "Task '{}' panicked: {}",
                task.name(),
                reason
            )),
            critical: true,
        });
    }

    if let Some(budget) = task.budget() {
        let elapsed = begin.elapsed();
        if elapsed > budget {
            log::warn!(
                "[executor] task '{}' of module '{}' exceeded budget: {:?} > {:?}",
                task.name(),
                task.owner(),
                elapsed,
                budget
            );
        }
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn executor(tick_ms: u64) -> Executor {
        Executor::new(Duration::from_millis(tick_ms)).unwrap()
    }

    fn names(executor: &Executor) -> Vec<String> {
        executor
            .task_order()
            .into_iter()
            .map(|(owner, name)| format!("{}/{}", owner, name))
            .collect()
    }

    #[test]
    fn zero_tick_is_rejected() {
        assert!(Executor::new(Duration::ZERO).is_err());
    }

    #[test]
    fn period_must_be_exact_multiple_of_tick() {
        let ex = executor(10);
        let err = ex
            .run_periodic(None, Duration::from_millis(25), || {}, "m", &[], &[], 0, None)
            .unwrap_err();
        assert!(err.user_message().contains("not a positive multiple"));
        assert!(ex
            .run_periodic(None, Duration::from_millis(20), || {}, "m", &[], &[], 0, None)
            .is_ok());
    }

    #[test]
    fn zero_period_is_rejected() {
        let ex = executor(10);
        assert!(ex
            .run_periodic(None, Duration::ZERO, || {}, "m", &[], &[], 0, None)
            .is_err());
    }

    #[test]
    fn duplicate_task_name_within_owner_is_rejected() {
        let ex = executor(10);
        ex.run_periodic(Some("t"), Duration::from_millis(10), || {}, "m", &[], &[], 0, None)
            .unwrap();
        assert!(ex
            .run_periodic(Some("t"), Duration::from_millis(10), || {}, "m", &[], &[], 0, None)
            .is_err());
        // Same name in another module is fine.
        assert!(ex
            .run_periodic(Some("t"), Duration::from_millis(10), || {}, "n", &[], &[], 0, None)
            .is_ok());
    }

    #[test]
    fn insertion_respects_module_dependencies() {
        let ex = executor(10);
        let period = Duration::from_millis(10);
        // C registers before its upstream B exists; B then lands right after
        // its own upstream A, which restores the full pairwise order.
        ex.run_periodic(Some("a"), period, || {}, "A", &[], &[], 0, None)
            .unwrap();
        ex.run_periodic(Some("c"), period, || {}, "C", &["A".into(), "B".into()], &[], 0, None)
            .unwrap();
        ex.run_periodic(Some("b"), period, || {}, "B", &["A".into()], &[], 0, None)
            .unwrap();
        assert_eq!(names(&ex), vec!["A/a", "B/b", "C/c"]);
    }

    #[test]
    fn insertion_in_dependency_registration_order_is_topological() {
        let ex = executor(10);
        let period = Duration::from_millis(10);
        ex.run_periodic(Some("a"), period, || {}, "A", &[], &[], 0, None)
            .unwrap();
        ex.run_periodic(Some("b"), period, || {}, "B", &["A".into()], &[], 0, None)
            .unwrap();
        ex.run_periodic(Some("c"), period, || {}, "C", &["B".into()], &[], 0, None)
            .unwrap();
        assert_eq!(names(&ex), vec!["A/a", "B/b", "C/c"]);
    }

    #[test]
    fn insertion_respects_intra_module_task_order() {
        let ex = executor(10);
        let period = Duration::from_millis(10);
        ex.run_periodic(Some("t1"), period, || {}, "M", &[], &[], 0, None)
            .unwrap();
        ex.run_periodic(Some("t3"), period, || {}, "M", &[], &[], 0, None)
            .unwrap();
        ex.run_periodic(Some("t2"), period, || {}, "M", &[], &["t1".into()], 0, None)
            .unwrap();
        let order = names(&ex);
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("M/t1") < pos("M/t2"));
    }

    #[test]
    fn worker_runs_due_tasks_in_order() {
        let ex = executor(2);
        let trace: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let period = Duration::from_millis(2);

        let t = Arc::clone(&trace);
        ex.run_periodic(Some("a"), period, move || t.lock().push("a"), "A", &[], &[], 0, None)
            .unwrap()
            .start();
        let t = Arc::clone(&trace);
        ex.run_periodic(
            Some("b"),
            period,
            move || t.lock().push("b"),
            "B",
            &["A".into()],
            &[],
            0,
            None,
        )
        .unwrap()
        .start();

        ex.start();
        thread::sleep(Duration::from_millis(40));
        ex.stop();

        let trace = trace.lock();
        assert!(trace.len() >= 4, "expected several executions, got {}", trace.len());
        for pair in trace.chunks(2) {
            if pair.len() == 2 {
                assert_eq!(pair, ["a", "b"]);
            }
        }
    }

    #[test]
    fn offset_delays_first_execution() {
        let ex = executor(2);
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        // Period 4 ticks, offset 1: due at ticks 1, 5, 9, ...
        ex.run_periodic(
            Some("t"),
            Duration::from_millis(8),
            move || {
                c.fetch_add(1, Ordering::Relaxed);
            },
            "M",
            &[],
            &[],
            1,
            None,
        )
        .unwrap()
        .start();

        ex.start();
        thread::sleep(Duration::from_millis(30));
        ex.stop();
        let ticks = ex.tick();
        let expected = (ticks + 3) / 4; // due at 1, 5, 9, ...
        let got = counter.load(Ordering::Relaxed) as u64;
        assert!(
            got >= expected.saturating_sub(1) && got <= expected + 1,
            "ticks={} expected~{} got={}",
            ticks,
            expected,
            got
        );
    }

    #[test]
    fn inactive_tasks_are_skipped() {
        let ex = executor(2);
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let handle = ex
            .run_periodic(
                Some("t"),
                Duration::from_millis(2),
                move || {
                    c.fetch_add(1, Ordering::Relaxed);
                },
                "M",
                &[],
                &[],
                0,
                None,
            )
            .unwrap();
        ex.start();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::Relaxed), 0);

        handle.start();
        thread::sleep(Duration::from_millis(20));
        ex.stop();
        assert!(counter.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn panicking_task_reports_critical_module_error_and_tick_continues() {
        let ex = executor(2);
        let events = ex.error_events();
        let after = Arc::new(AtomicUsize::new(0));

        ex.run_periodic(
            Some("boom"),
            Duration::from_millis(2),
            || panic!("task exploded"),
            "Faulty",
            &[],
            &[],
            0,
            None,
        )
        .unwrap()
        .start();
        let a = Arc::clone(&after);
        ex.run_periodic(
            Some("after"),
            Duration::from_millis(2),
            move || {
                a.fetch_add(1, Ordering::Relaxed);
            },
            "Healthy",
            &["Faulty".into()],
            &[],
            0,
            None,
        )
        .unwrap()
        .start();

        ex.start();
        let event = events.recv_timeout(Duration::from_millis(500)).unwrap();
        thread::sleep(Duration::from_millis(10));
        ex.stop();

        assert_eq!(event.module, "Faulty");
        assert!(event.critical);
        assert!(event.error.user_message().contains("task exploded"));
        // The downstream task in the same tick still executed.
        assert!(after.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn start_is_idempotent_and_stop_joins() {
        let ex = executor(2);
        ex.start();
        ex.start();
        ex.stop();
        ex.stop();
    }

    #[test]
    fn set_module_tasks_active_toggles_all_handles() {
        let ex = executor(10);
        let period = Duration::from_millis(10);
        let h1 = ex
            .run_periodic(Some("t1"), period, || {}, "M", &[], &[], 0, None)
            .unwrap();
        let h2 = ex
            .run_periodic(Some("t2"), period, || {}, "M", &[], &[], 0, None)
            .unwrap();
        ex.set_module_tasks_active("M", true);
        assert!(h1.is_active() && h2.is_active());
        ex.set_module_tasks_active("M", false);
        assert!(!h1.is_active() && !h2.is_active());
    }
}
