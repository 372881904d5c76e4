// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The process-wide executable controller.

use super::handle::{ControllerHandle, ControllerShared};
use super::user::UserController;
use crate::com::EventHandlerControl;
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::exec::Executor;
use crate::logging::flush_logger;
use crate::module::{Module, ModuleState};
use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Type-erased access to a registered module behind its lock.
trait ModuleCell: Send + Sync {
    fn init(&self) -> Result<()>;
    fn start(&self);
    fn stop(&self);
    fn deinit(&self);
    fn on_error(&self, error: &Error);
    fn start_tasks(&self);
    fn stop_tasks(&self);
}

impl<M: Module + 'static> ModuleCell for Mutex<M> {
    fn init(&self) -> Result<()> {
        self.lock().init()
    }

    fn start(&self) {
        self.lock().start();
    }

    fn stop(&self) {
        self.lock().stop();
    }

    fn deinit(&self) {
        self.lock().deinit();
    }

    fn on_error(&self, error: &Error) {
        self.lock().on_error(error);
    }

    fn start_tasks(&self) {
        self.lock().base().executor().start();
    }

    fn stop_tasks(&self) {
        self.lock().base().executor().stop();
    }
}

struct RegisteredModule {
    name: String,
    dependencies: Vec<String>,
    cell: Arc<dyn ModuleCell>,
}

struct Monitor {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Orchestrates the static module graph of one executable.
///
/// Owns the [`Executor`], instantiates nothing itself: the application wires
/// endpoints and modules (using [`handle`](ExecutableController::handle) and
/// [`executor`](ExecutableController::executor)) and registers them before
/// calling [`run`](ExecutableController::run).
pub struct ExecutableController {
    config: RuntimeConfig,
    executor: Arc<Executor>,
    shared: Arc<ControllerShared>,
    modules: Vec<RegisteredModule>,
    endpoints: Vec<Arc<dyn EventHandlerControl>>,
    monitor: Option<Monitor>,
    started: bool,
    shut_down: bool,
}

impl ExecutableController {
    /// Create a controller with the given runtime configuration.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let executor = Arc::new(Executor::with_thread_name(
            config.tick_period(),
            &config.executor_thread_name,
        )?);
        let shared = Arc::new(ControllerShared::new(Arc::clone(&executor)));
        Ok(Self {
            config,
            executor,
            shared,
            modules: Vec::new(),
            endpoints: Vec::new(),
            monitor: None,
            started: false,
            shut_down: false,
        })
    }

    /// Install the user controller hooks.
    pub fn set_user_controller(&mut self, user: Box<dyn UserController>) {
        self.shared.set_user(user);
    }

    /// Handle for constructing [`crate::module::ModuleBase`]s and for
    /// requesting shutdown from outside.
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle::new(Arc::clone(&self.shared))
    }

    /// The shared executor.
    pub fn executor(&self) -> Arc<Executor> {
        Arc::clone(&self.executor)
    }

    /// Register a module. Names must be unique.
    pub fn register_module<M: Module + 'static>(&mut self, module: Arc<Mutex<M>>) -> Result<()> {
        let (name, dependencies) = {
            let guard = module.lock();
            (
                guard.base().name().to_string(),
                guard.base().dependencies().to_vec(),
            )
        };
        if name.is_empty() {
            return Err(Error::not_ok("Module name must not be empty"));
        }
        if !self.shared.insert_module(&name) {
            return Err(Error::not_ok(format!("Duplicate module name '{}'", name)));
        }
        log::debug!(
            "[controller] registered module '{}' (dependencies: {:?})",
            name,
            dependencies
        );
        self.modules.push(RegisteredModule {
            name,
            dependencies,
            cell: module,
        });
        Ok(())
    }

    /// Register an endpoint for the subscriber activation protocol.
    pub fn register_endpoint(&mut self, endpoint: Arc<dyn EventHandlerControl>) {
        self.endpoints.push(endpoint);
    }

    /// Current lifecycle state of a module.
    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.shared.state_of(name)
    }

    /// Initialize and start the runtime.
    ///
    /// With `wait_for_signal` the call parks until shutdown is requested
    /// (critical module error, or [`ControllerHandle::request_shutdown`]
    /// wired to a signal handler by the binary) and then shuts down.
    /// Without it the call returns with the runtime live; the application
    /// shuts down explicitly or on drop.
    pub fn run(&mut self, wait_for_signal: bool) -> Result<()> {
        self.do_initialize()?;
        if let Err(error) = self.do_start() {
            self.do_shutdown();
            return Err(error);
        }
        if wait_for_signal {
            self.wait_for_shutdown();
            self.do_shutdown();
        }
        Ok(())
    }

    /// Park until shutdown is requested.
    pub fn wait_for_shutdown(&self) {
        while !self.shared.shutdown_requested() {
            thread::sleep(self.config.tick_period());
        }
    }

    /// Stop the executor and shut every module down. Idempotent.
    pub fn shutdown(&mut self) {
        self.shared.request_shutdown();
        self.do_shutdown();
    }

    /// Errors recorded so far as `(module, error, critical)` tuples.
    pub fn recorded_errors(&self) -> Vec<(String, Error, bool)> {
        self.shared
            .recorded_errors()
            .into_iter()
            .map(|r| (r.module, r.error, r.critical))
            .collect()
    }

    fn do_initialize(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::not_ok("Controller already started"));
        }
        self.shared.with_user(|user| user.pre_initialize());

        for module in &self.modules {
            for dependency in &module.dependencies {
                if dependency == &module.name {
                    return Err(Error::not_ok(format!(
                        "Module '{}' depends on itself",
                        module.name
                    )));
                }
                if !self.modules.iter().any(|m| &m.name == dependency) {
                    return Err(Error::not_ok(format!(
                        "Module '{}' depends on unknown module '{}'",
                        module.name, dependency
                    )));
                }
            }
        }
        // Fail fast on cycles before anything is started.
        self.dependency_order()?;

        self.shared.with_user(|user| user.post_initialize());
        Ok(())
    }

    fn do_start(&mut self) -> Result<()> {
        self.shared.with_user(|user| user.pre_start());
        self.started = true;
        self.executor.start();
        self.monitor = Some(self.spawn_monitor());

        for index in self.dependency_order()? {
            self.start_module(index)?;
        }

        self.shared.with_user(|user| user.post_start());
        log::info!("[controller] all modules operational");
        Ok(())
    }

    fn start_module(&self, index: usize) -> Result<()> {
        let module = &self.modules[index];
        let name = module.name.as_str();
        log::info!("[controller] starting module '{}'", name);

        if let Err(error) = module.cell.init() {
            self.shared.report_error(error.clone(), name, true);
            return Err(error);
        }
        self.shared.set_state(name, ModuleState::NotOperational);
        self.shared.set_state(name, ModuleState::Starting);

        module.cell.start_tasks();
        module.cell.start();

        // Cooperative wait for the operational handshake.
        loop {
            match self.shared.state_of(name) {
                Some(ModuleState::Operational) => break,
                Some(ModuleState::Shutdown) => {
                    return Err(Error::not_ok(format!(
                        "Module '{}' shut down during start",
                        name
                    )));
                }
                _ => {
                    if self.shared.shutdown_requested() {
                        return Err(Error::not_ok(format!(
                            "Shutdown requested while starting module '{}'",
                            name
                        )));
                    }
                    thread::sleep(self.config.tick_period());
                }
            }
        }

        for endpoint in &self.endpoints {
            endpoint.start_event_handler_for_module(name);
        }
        log::info!("[controller] module '{}' operational", name);
        Ok(())
    }

    fn do_shutdown(&mut self) {
        if self.shut_down || !self.started {
            self.shut_down = true;
            return;
        }
        self.shut_down = true;
        self.shared.with_user(|user| user.pre_shutdown());
        log::info!("[controller] shutting down");

        self.executor.stop();
        if let Some(monitor) = self.monitor.take() {
            monitor.stop.store(true, Ordering::Release);
            let _ = monitor.thread.join();
        }

        let order = self
            .dependency_order()
            .unwrap_or_else(|_| (0..self.modules.len()).collect());
        for &index in order.iter().rev() {
            let module = &self.modules[index];
            let name = module.name.as_str();
            log::info!("[controller] stopping module '{}'", name);
            module.cell.stop();
            module.cell.stop_tasks();
            for endpoint in &self.endpoints {
                endpoint.stop_event_handler_for_module(name);
            }
            module.cell.deinit();
            self.shared.set_state(name, ModuleState::Shutdown);
        }

        self.shared.with_user(|user| user.post_shutdown());
        let _ = flush_logger();
    }

    /// Stable topological order of the registered modules.
    fn dependency_order(&self) -> Result<Vec<usize>> {
        let mut order = Vec::with_capacity(self.modules.len());
        let mut placed = vec![false; self.modules.len()];

        while order.len() < self.modules.len() {
            let mut progressed = false;
            for (index, module) in self.modules.iter().enumerate() {
                if placed[index] {
                    continue;
                }
                let ready = module.dependencies.iter().all(|dependency| {
                    self.modules
                        .iter()
                        .position(|m| &m.name == dependency)
                        .map(|i| placed[i])
                        .unwrap_or(true)
                });
                if ready {
                    placed[index] = true;
                    order.push(index);
                    progressed = true;
                }
            }
            if !progressed {
                return Err(Error::not_ok("Dependency cycle in module graph"));
            }
        }
        Ok(order)
    }

    fn spawn_monitor(&self) -> Monitor {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let events = self.executor.error_events();
        let shared = Arc::clone(&self.shared);
        let tick = self.config.tick_period();
        let cells: HashMap<String, Arc<dyn ModuleCell>> = self
            .modules
            .iter()
            .map(|m| (m.name.clone(), Arc::clone(&m.cell)))
            .collect();

        #[allow(clippy::expect_used)] // thread spawn failure is unrecoverable
        let thread = thread::Builder::new()
            .name("driveline-monitor".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Acquire) {
                    match events.recv_timeout(tick) {
                        Ok(event) => match cells.get(&event.module) {
                            Some(cell) => cell.on_error(&event.error),
                            None => shared.report_error(event.error, &event.module, event.critical),
                        },
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .expect("failed to spawn monitor thread");

        Monitor { stop, thread }
    }
}

impl Drop for ExecutableController {
    fn drop(&mut self) {
        self.do_shutdown();
    }
}
