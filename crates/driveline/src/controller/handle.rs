// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared controller state and the handle modules hold into it.

use super::user::{DefaultUserController, UserController};
use crate::error::Error;
use crate::exec::Executor;
use crate::module::ModuleState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One recorded module error.
#[derive(Debug, Clone)]
pub(crate) struct ErrorRecord {
    pub module: String,
    pub error: Error,
    pub critical: bool,
}

/// State shared between the controller, its modules and worker threads.
///
/// The controller is the single writer of module states; the map is guarded
/// so reports arriving from the executor worker are safe.
pub(crate) struct ControllerShared {
    states: Mutex<HashMap<String, ModuleState>>,
    errors: Mutex<Vec<ErrorRecord>>,
    shutdown_requested: AtomicBool,
    executor: Arc<Executor>,
    user: Mutex<Box<dyn UserController>>,
}

impl ControllerShared {
    pub(crate) fn new(executor: Arc<Executor>) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            errors: Mutex::new(Vec::new()),
            shutdown_requested: AtomicBool::new(false),
            executor,
            user: Mutex::new(Box::new(DefaultUserController)),
        }
    }

    pub(crate) fn set_user(&self, user: Box<dyn UserController>) {
        *self.user.lock() = user;
    }

    pub(crate) fn with_user(&self, f: impl FnOnce(&mut dyn UserController)) {
        f(self.user.lock().as_mut());
    }

    pub(crate) fn insert_module(&self, name: &str) -> bool {
        self.states
            .lock()
            .insert(name.to_string(), ModuleState::Uninitialized)
            .is_none()
    }

    pub(crate) fn state_of(&self, name: &str) -> Option<ModuleState> {
        self.states.lock().get(name).copied()
    }

    pub(crate) fn set_state(&self, name: &str, next: ModuleState) {
        let mut states = self.states.lock();
        match states.get_mut(name) {
            Some(current) if *current == next => {}
            Some(current) if current.can_transition_to(next) => {
                log::debug!("[controller] module '{}': {} -> {}", name, current, next);
                *current = next;
            }
            Some(current) => {
                log::warn!(
                    "[controller] ignoring illegal transition of '{}': {} -> {}",
                    name,
                    current,
                    next
                );
            }
            None => log::warn!("[controller] state report for unknown module '{}'", name),
        }
    }

    pub(crate) fn report_operational(&self, name: &str) {
        log::info!("[controller] module '{}' reports operational", name);
        self.set_state(name, ModuleState::Operational);
    }

    pub(crate) fn skip_starting(&self, name: &str) {
        log::info!("[controller] module '{}' skips starting", name);
        self.set_state(name, ModuleState::Operational);
    }

    pub(crate) fn report_error(&self, error: Error, name: &str, critical: bool) {
        if critical {
            log::error!(
                "[controller] critical error in module '{}': {}",
                name,
                error.message()
            );
        } else {
            log::warn!(
                "[controller] error in module '{}': {}",
                name,
                error.message()
            );
        }
        self.errors.lock().push(ErrorRecord {
            module: name.to_string(),
            error: error.clone(),
            critical,
        });
        if critical {
            self.set_state(name, ModuleState::Shutdown);
            self.executor.set_module_tasks_active(name, false);
            self.with_user(|user| user.on_error(name, &error, true));
            self.request_shutdown();
        } else {
            self.with_user(|user| user.on_error(name, &error, false));
        }
    }

    pub(crate) fn recorded_errors(&self) -> Vec<ErrorRecord> {
        self.errors.lock().clone()
    }

    pub(crate) fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
    }

    pub(crate) fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }
}

/// Cloneable handle into the controller's shared state.
///
/// Held by every [`crate::module::ModuleBase`]; also usable from a signal
/// handler or supervisor thread to request process shutdown.
#[derive(Clone)]
pub struct ControllerHandle {
    shared: Arc<ControllerShared>,
}

impl ControllerHandle {
    pub(crate) fn new(shared: Arc<ControllerShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn report_operational_of_module(&self, name: &str) {
        self.shared.report_operational(name);
    }

    pub(crate) fn skip_starting_of_module(&self, name: &str) {
        self.shared.skip_starting(name);
    }

    pub(crate) fn report_error_of_module(&self, error: Error, name: &str, critical: bool) {
        self.shared.report_error(error, name, critical);
    }

    /// Current lifecycle state of a module.
    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.shared.state_of(name)
    }

    /// Request process shutdown at the next opportunity.
    pub fn request_shutdown(&self) {
        self.shared.request_shutdown();
    }

    /// Whether shutdown has been requested.
    pub fn shutdown_requested(&self) -> bool {
        self.shared.shutdown_requested()
    }
}
