// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data-element endpoints over the middleware participant.

use super::participant::{Participant, PubSubSpec, TopicPublisher};
use super::transformer::Wire;
use crate::com::{EventHandlerControl, SubscriberSet};
use crate::data_ptr::{ConstDataPtr, DataPtr};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Provider side of one data element bound to a bus topic.
///
/// Serializes on publish and keeps the local cached sample, so the providing
/// module's own `get`/`get_allocated` observe its latest publish without a
/// bus round trip.
pub struct DataElementProvider<T> {
    element: String,
    publisher: Arc<dyn TopicPublisher>,
    sample: Mutex<Option<ConstDataPtr<T>>>,
}

impl<T: Wire + Send + Sync + 'static> DataElementProvider<T> {
    /// Create the provider endpoint for `interface`/`element`.
    pub fn new(
        participant: &dyn Participant,
        interface: &str,
        element: &str,
        media_type: &str,
    ) -> Result<Self> {
        let spec = PubSubSpec::for_interface(interface, element, media_type);
        let publisher = participant.create_publisher(&spec)?;
        Ok(Self {
            element: spec.topic,
            publisher,
            sample: Mutex::new(None),
        })
    }

    /// The wire topic name.
    pub fn topic(&self) -> &str {
        &self.element
    }

    /// Obtain a freshly owned, default-constructed writable handle.
    pub fn allocate(&self) -> DataPtr<T>
    where
        T: Default,
    {
        DataPtr::default()
    }

    /// Promote the handle to the cached sample and publish it.
    pub fn set_allocated(&self, data: DataPtr<T>) -> Result<()> {
        self.publish(ConstDataPtr::from(data))
    }

    /// Publish a value.
    pub fn set(&self, value: T) -> Result<()> {
        self.publish(ConstDataPtr::new(value))
    }

    /// Latest published sample, or `NotOk` before the first publish.
    pub fn get_allocated(&self) -> Result<ConstDataPtr<T>> {
        self.sample
            .lock()
            .clone()
            .ok_or_else(|| Error::not_ok("No sample available"))
    }

    /// Copy of the latest published sample, or the default value.
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

    fn publish(&self, sample: ConstDataPtr<T>) -> Result<()> {
        let payload = sample.to_wire()?;
        *self.sample.lock() = Some(sample);
        self.publisher.publish(&payload)
    }
}

struct ConsumerInner<T> {
    sample: Mutex<Option<ConstDataPtr<T>>>,
    subscribers: Mutex<SubscriberSet<T>>,
}

/// Consumer side of one data element bound to a bus topic.
///
/// The reception callback runs on the participant's I/O thread: it
/// deserializes the payload, replaces the cached sample under the endpoint
/// lock and fans out to the active subscriber handlers. No sample is present
/// until the first reception.
pub struct DataElementConsumer<T> {
    element: String,
    inner: Arc<ConsumerInner<T>>,
}

impl<T: Wire + Send + Sync + 'static> DataElementConsumer<T> {
    /// Create the consumer endpoint for `interface`/`element` and subscribe.
    pub fn new(
        participant: &dyn Participant,
        interface: &str,
        element: &str,
        media_type: &str,
    ) -> Result<Arc<Self>> {
        let spec = PubSubSpec::for_interface(interface, element, media_type);
        let inner = Arc::new(ConsumerInner {
            sample: Mutex::new(None),
            subscribers: Mutex::new(SubscriberSet::new()),
        });

        let reception = Arc::clone(&inner);
        let topic = spec.topic.clone();
        participant.create_subscriber(
            &spec,
            Box::new(move |payload| match T::from_wire(payload) {
                Ok(value) => {
                    let sample = ConstDataPtr::new(value);
                    *reception.sample.lock() = Some(sample.clone());
                    reception.subscribers.lock().dispatch(&sample);
                }
                Err(error) => {
                    log::warn!(
                        "[bus] dropping undecodable sample on '{}': {}",
                        topic,
                        error.message()
                    );
                }
            }),
        )?;

        Ok(Arc::new(Self {
            element: spec.topic,
            inner,
        }))
    }

    /// The wire topic name.
    pub fn topic(&self) -> &str {
        &self.element
    }

    /// Current cached sample, or `NotOk` before the first reception.
    pub fn get_allocated(&self) -> Result<ConstDataPtr<T>> {
        self.inner
            .sample
            .lock()
            .clone()
            .ok_or_else(|| Error::not_ok("No sample available"))
    }

    /// Copy of the cached sample, or the default value if absent.
    pub fn get(&self) -> T
    where
        T: Clone + Default,
    {
        self.inner
            .sample
            .lock()
            .as_ref()
            .map(|sample| (**sample).clone())
            .unwrap_or_default()
    }

    /// Append a subscriber handler owned by `owner`.
    pub fn register_handler(
        &self,
        owner: impl Into<String>,
        handler: impl Fn(ConstDataPtr<T>) + Send + 'static,
    ) {
        self.inner
            .subscribers
            .lock()
            .register(owner.into(), Box::new(handler));
    }

    /// Fully erase every handler owned by `module`.
    pub fn remove_handlers_for_module(&self, module: &str) {
        self.inner.subscribers.lock().remove_module(module);
    }
}

impl<T: Wire + Send + Sync + 'static> EventHandlerControl for DataElementConsumer<T> {
    fn start_event_handler_for_module(&self, module: &str) {
        self.inner.subscribers.lock().set_module_active(module, true);
    }

    fn stop_event_handler_for_module(&self, module: &str) {
        self.inner
            .subscribers
            .lock()
            .set_module_active(module, false);
    }
}
