// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscriber handler records and the per-endpoint subscriber set.

use crate::data_ptr::ConstDataPtr;

pub(crate) type SampleHandler<T> = Box<dyn Fn(ConstDataPtr<T>) + Send>;

/// One registered subscriber: owning module, handler and activation flag.
struct ReceiverHandler<T> {
    owner: String,
    handler: SampleHandler<T>,
    active: bool,
}

/// Subscriber list plus the set of currently active module names.
///
/// A handler registered by an already-active owner becomes active
/// immediately; otherwise it activates when the controller marks its owner
/// live. Removal fully erases the record.
pub(crate) struct SubscriberSet<T> {
    handlers: Vec<ReceiverHandler<T>>,
    active_modules: Vec<String>,
}

impl<T> SubscriberSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: Vec::new(),
            active_modules: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, owner: String, handler: SampleHandler<T>) {
        let active = self.active_modules.iter().any(|m| *m == owner);
        self.handlers.push(ReceiverHandler {
            owner,
            handler,
            active,
        });
    }

    pub(crate) fn set_module_active(&mut self, module: &str, active: bool) {
        for handler in &mut self.handlers {
            if handler.owner == module {
                handler.active = active;
            }
        }
        if active {
            if !self.active_modules.iter().any(|m| m == module) {
                self.active_modules.push(module.to_string());
            }
        } else {
            self.active_modules.retain(|m| m != module);
        }
    }

    pub(crate) fn remove_module(&mut self, module: &str) {
        self.handlers.retain(|h| h.owner != module);
    }

    /// Invoke every active handler with a clone of the sample, in
    /// registration order.
    pub(crate) fn dispatch(&self, sample: &ConstDataPtr<T>) {
        for handler in &self.handlers {
            if handler.active {
                (handler.handler)(sample.clone());
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }
}
