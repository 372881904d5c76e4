// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! User-facing controller hooks.

use crate::error::Error;

/// Hooks invoked around the controller's phases and on module errors.
///
/// All methods default to no-ops; applications override what they need.
/// `on_error` runs on whatever thread reported the error (the executor
/// worker for panicking tasks) and must not block.
pub trait UserController: Send {
    /// Called before modules are wired and validated.
    fn pre_initialize(&mut self) {}
    /// Called after successful initialization.
    fn post_initialize(&mut self) {}
    /// Called before modules are started.
    fn pre_start(&mut self) {}
    /// Called after every module reported operational.
    fn post_start(&mut self) {}
    /// Called before shutdown begins.
    fn pre_shutdown(&mut self) {}
    /// Called after every module was stopped and deinitialized.
    fn post_shutdown(&mut self) {}

    /// Called for every reported module error.
    fn on_error(&mut self, module: &str, error: &Error, critical: bool) {
        let _ = (module, error, critical);
    }
}

/// No-op hook implementation used when the application installs none.
pub struct DefaultUserController;

impl UserController for DefaultUserController {}
