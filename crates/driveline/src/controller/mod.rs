// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide lifecycle orchestration.
//!
//! The [`ExecutableController`] owns the executor and the static module
//! graph. It drives the three phases — initialize, start (dependency
//! order), shutdown (reverse order) — and is the single writer of module
//! states. Modules talk back through a cloneable [`ControllerHandle`].

mod executable_controller;
mod handle;
mod user;

pub use executable_controller::ExecutableController;
pub use handle::ControllerHandle;
pub use user::{DefaultUserController, UserController};
