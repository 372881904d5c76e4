// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process typed latest-value pub/sub endpoint.

use super::receiver::SubscriberSet;
use super::EventHandlerControl;
use crate::data_ptr::{ConstDataPtr, DataPtr};
use crate::error::{Error, Result};
use parking_lot::Mutex;

/// A typed data-element endpoint binding one provider to its consumers.
///
/// The cached sample and the subscriber list are guarded by separate locks so
/// that a handler may read the cache while fan-out is in progress. Publishing
/// from within a handler of the same endpoint is forbidden.
pub struct DataElement<T> {
    name: String,
    sample: Mutex<Option<ConstDataPtr<T>>>,
    subscribers: Mutex<SubscriberSet<T>>,
}

impl<T: Send + Sync + 'static> DataElement<T> {
    /// Create an endpoint for the data element `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sample: Mutex::new(None),
            subscribers: Mutex::new(SubscriberSet::new()),
        }
    }

    /// The data-element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provider: obtain a freshly owned, default-constructed writable handle.
    pub fn allocate(&self) -> DataPtr<T>
    where
        T: Default,
    {
        DataPtr::default()
    }

    /// Provider: promote the handle to the cached immutable sample and fan
    /// out to every active subscriber handler.
    pub fn set_allocated(&self, data: DataPtr<T>) {
        self.publish(ConstDataPtr::from(data));
    }

    /// Provider: publish a value (allocate + fill + promote in one step).
    pub fn set(&self, value: T) {
        self.publish(ConstDataPtr::new(value));
    }

    fn publish(&self, sample: ConstDataPtr<T>) {
        *self.sample.lock() = Some(sample.clone());
        self.subscribers.lock().dispatch(&sample);
    }

    /// Consumer: current cached sample, or `NotOk` before the first publish.
    pub fn get_allocated(&self) -> Result<ConstDataPtr<T>> {
        self.sample
            .lock()
            .clone()
            .ok_or_else(|| Error::not_ok("No sample available"))
    }

    /// Consumer: copy of the cached sample, or the default value if absent.
    pub fn get(&self) -> T
    where
        T: Clone + Default,
    {
        self.sample
            .lock()
            .as_ref()
            .map(|sample| (**sample).clone())
            .unwrap_or_default()
    }

    /// Consumer: append a subscriber handler owned by `owner`.
    ///
    /// If the owner is already active the handler is active immediately;
    /// otherwise it activates when the controller marks the owner live.
    pub fn register_handler(
        &self,
        owner: impl Into<String>,
        handler: impl Fn(ConstDataPtr<T>) + Send + 'static,
    ) {
        self.subscribers
            .lock()
            .register(owner.into(), Box::new(handler));
    }

    /// Fully erase every handler owned by `module`.
    pub fn remove_handlers_for_module(&self, module: &str) {
        self.subscribers.lock().remove_module(module);
    }
}

impl<T: Send + Sync + 'static> EventHandlerControl for DataElement<T> {
    fn start_event_handler_for_module(&self, module: &str) {
        self.subscribers.lock().set_module_active(module, true);
    }

    fn stop_event_handler_for_module(&self, module: &str) {
        self.subscribers.lock().set_module_active(module, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn get_returns_default_before_first_publish() {
        let element = DataElement::<u64>::new("element");
        assert_eq!(element.get(), 0);
        assert!(element.get_allocated().is_err());
        let err = element.get_allocated().unwrap_err();
        assert_eq!(err.user_message(), "No sample available");
    }

    #[test]
    fn set_then_get_returns_the_value() {
        let element = DataElement::<u64>::new("element");
        element.set(42);
        assert_eq!(element.get(), 42);
        assert_eq!(*element.get_allocated().unwrap(), 42);
    }

    #[test]
    fn allocate_set_allocated_promotes_the_sample() {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Reading {
            timestamp: u64,
            value: i32,
        }

        let element = DataElement::<Reading>::new("reading");
        let mut ptr = element.allocate();
        ptr.timestamp = 1;
        ptr.value = 7;
        element.set_allocated(ptr);

        let first = element.get_allocated().unwrap();
        assert_eq!(
            *first,
            Reading {
                timestamp: 1,
                value: 7
            }
        );

        // A second publish must not mutate the first sample.
        element.set(Reading {
            timestamp: 2,
            value: 9,
        });
        assert_eq!(first.timestamp, 1);
        assert_eq!(first.value, 7);
        assert_eq!(element.get().timestamp, 2);
    }

    #[test]
    fn fan_out_reaches_only_active_subscribers() {
        let element = DataElement::<u64>::new("element");
        let active_hits = Arc::new(AtomicUsize::new(0));
        let inactive_hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&active_hits);
        element.register_handler("Live", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let counter = Arc::clone(&inactive_hits);
        element.register_handler("Dormant", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        element.start_event_handler_for_module("Live");

        element.set(1);
        element.set(2);

        assert_eq!(active_hits.load(Ordering::Relaxed), 2);
        assert_eq!(inactive_hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn handler_observes_publishes_in_order() {
        let element = DataElement::<u64>::new("element");
        let seen: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        element.register_handler("M", move |sample| sink.lock().push(*sample));
        element.start_event_handler_for_module("M");

        for value in 1..=5 {
            element.set(value);
        }
        assert_eq!(*seen.lock(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn register_then_remove_yields_no_invocations() {
        let element = DataElement::<u64>::new("element");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        element.register_handler("M", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        element.remove_handlers_for_module("M");
        element.start_event_handler_for_module("M");
        element.set(1);
        assert_eq!(hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn handler_may_read_the_cache_during_fan_out() {
        let element = Arc::new(DataElement::<u64>::new("element"));
        let observed = Arc::new(AtomicUsize::new(0));
        let endpoint = Arc::clone(&element);
        let sink = Arc::clone(&observed);
        element.register_handler("M", move |sample| {
            // The cache already holds the sample being fanned out.
            assert_eq!(endpoint.get(), *sample);
            sink.fetch_add(1, Ordering::Relaxed);
        });
        element.start_event_handler_for_module("M");
        element.set(11);
        assert_eq!(observed.load(Ordering::Relaxed), 1);
    }
}
