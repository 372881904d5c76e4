// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Operation endpoints over the middleware participant.

use super::participant::{CallStatus, Participant, RpcClient, RpcServer, RpcSpec};
use super::transformer::Wire;
use crate::error::{Error, Result};
use crate::future::{oneshot, Future, Promise};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Consumer side of one operation bound to a bus RPC method.
///
/// Each call serializes its inputs, parks the promise in the pending map
/// keyed by a correlation id and issues the RPC. The reply callback (running
/// on the participant's I/O thread) completes the promise with the decoded
/// output or a transport error. Returned futures are generally not ready at
/// return time; callers poll readiness across ticks.
pub struct OperationClient<I, O> {
    operation: String,
    client: Arc<dyn RpcClient>,
    pending: Arc<DashMap<u64, Promise<O>>>,
    next_call: AtomicU64,
    _input: std::marker::PhantomData<fn(&I)>,
}

impl<I: Wire, O: Wire + Send + 'static> OperationClient<I, O> {
    /// Create the client endpoint for `interface`/`operation`.
    pub fn new(
        participant: &dyn Participant,
        interface: &str,
        operation: &str,
        media_type: &str,
    ) -> Result<Self> {
        let spec = RpcSpec::for_interface(interface, operation, media_type);
        let pending: Arc<DashMap<u64, Promise<O>>> = Arc::new(DashMap::new());

        let completions = Arc::clone(&pending);
        let method = spec.method.clone();
        let client = participant.create_rpc_client(
            &spec,
            Box::new(move |event| {
                let Some((_, promise)) = completions.remove(&event.context) else {
                    log::debug!("[bus] stray reply on '{}' (context {})", method, event.context);
                    return;
                };
                match event.status {
                    CallStatus::Success => match O::from_wire(&event.payload) {
                        Ok(output) => promise.set_value(output),
                        Err(error) => promise.set_error(Error::not_ok(format!(
                            "Cannot decode reply on '{}': {}",
                            method,
                            error.user_message()
                        ))),
                    },
                    CallStatus::TransportFailure => {
                        promise.set_error(Error::not_ok("Rpc call failed"));
                    }
                }
            }),
        )?;

        Ok(Self {
            operation: spec.method,
            client,
            pending,
            next_call: AtomicU64::new(1),
            _input: std::marker::PhantomData,
        })
    }

    /// The wire method name.
    pub fn method(&self) -> &str {
        &self.operation
    }

    /// Invoke the operation. The future completes asynchronously; poll
    /// [`Future::is_ready`] instead of blocking inside a task.
    pub fn call(&self, input: &I) -> Future<O> {
        let (promise, future) = oneshot();
        let payload = match input.to_wire() {
            Ok(payload) => payload,
            Err(error) => {
                promise.set_error(error);
                return future;
            }
        };

        let context = self.next_call.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(context, promise);
        if let Err(error) = self.client.call(payload, context) {
            if let Some((_, promise)) = self.pending.remove(&context) {
                promise.set_error(error);
            }
        }
        future
    }
}

type ServerHandler<I, O> = Box<dyn Fn(I) -> O + Send>;

/// Provider side of one operation bound to a bus RPC method.
///
/// The participant invokes the endpoint on its I/O thread for every call:
/// the registered handler runs and its output is serialized back. A vacant
/// handler answers with a failure.
pub struct OperationServer<I, O> {
    operation: String,
    handler: Arc<Mutex<Option<ServerHandler<I, O>>>>,
}

impl<I: Wire + Send + 'static, O: Wire + Send + 'static> OperationServer<I, O> {
    /// Create the server endpoint for `interface`/`operation`.
    pub fn new(
        participant: &dyn Participant,
        interface: &str,
        operation: &str,
        media_type: &str,
    ) -> Result<Arc<Self>> {
        let spec = RpcSpec::for_interface(interface, operation, media_type);
        let handler: Arc<Mutex<Option<ServerHandler<I, O>>>> = Arc::new(Mutex::new(None));

        let dispatch = Arc::clone(&handler);
        let method = spec.method.clone();
        participant.create_rpc_server(
            &spec,
            Box::new(move |server: &dyn RpcServer, event| {
                let guard = dispatch.lock();
                let Some(callback) = guard.as_ref() else {
                    log::warn!("[bus] no operation handler registered for '{}'", method);
                    server.submit_error(event.call_id);
                    return;
                };
                let input = match I::from_wire(&event.payload) {
                    Ok(input) => input,
                    Err(error) => {
                        log::warn!(
                            "[bus] cannot decode call on '{}': {}",
                            method,
                            error.user_message()
                        );
                        server.submit_error(event.call_id);
                        return;
                    }
                };
                let output = callback(input);
                match output.to_wire() {
                    Ok(payload) => server.submit_result(event.call_id, payload),
                    Err(error) => {
                        log::error!(
                            "[bus] cannot encode reply on '{}': {}",
                            method,
                            error.user_message()
                        );
                        server.submit_error(event.call_id);
                    }
                }
            }),
        )?;

        Ok(Arc::new(Self {
            operation: spec.method,
            handler,
        }))
    }

    /// The wire method name.
    pub fn method(&self) -> &str {
        &self.operation
    }

    /// Store the handler. A second registration is a configuration error.
    pub fn register_handler(&self, handler: impl Fn(I) -> O + Send + 'static) -> Result<()> {
        let mut slot = self.handler.lock();
        if slot.is_some() {
            return Err(Error::not_ok(format!(
                "Operation handler already registered for {}.",
                self.operation
            )));
        }
        *slot = Some(Box::new(handler));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::memory::MemoryBus;
    use crate::bus::transformer::FRAME_MEDIA_TYPE;
    use std::thread;
    use std::time::Duration;

    fn poll<T>(future: &Future<T>) {
        for _ in 0..200 {
            if future.is_ready() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("future did not become ready");
    }

    #[test]
    fn call_round_trip_with_tuple_input() {
        let bus = MemoryBus::new();
        let provider = bus.create_participant("provider");
        let consumer = bus.create_participant("consumer");

        let server = OperationServer::<(u64, u64), u64>::new(
            provider.as_ref(),
            "Calc",
            "Add",
            FRAME_MEDIA_TYPE,
        )
        .unwrap();
        server.register_handler(|(a, b)| a + b).unwrap();

        let client =
            OperationClient::<(u64, u64), u64>::new(consumer.as_ref(), "Calc", "Add", FRAME_MEDIA_TYPE)
                .unwrap();
        assert_eq!(client.method(), "Calc_Add");

        let future = client.call(&(20, 22));
        poll(&future);
        assert_eq!(future.get_result().unwrap(), 42);
    }

    #[test]
    fn vacant_handler_answers_with_failure() {
        let bus = MemoryBus::new();
        let participant = bus.create_participant("p");

        let _server =
            OperationServer::<u64, ()>::new(participant.as_ref(), "If", "Op", FRAME_MEDIA_TYPE)
                .unwrap();
        let client =
            OperationClient::<u64, ()>::new(participant.as_ref(), "If", "Op", FRAME_MEDIA_TYPE)
                .unwrap();

        let future = client.call(&1);
        poll(&future);
        let err = future.get_result().unwrap_err();
        assert_eq!(err.user_message(), "Rpc call failed");
    }

    #[test]
    fn missing_server_fails_with_transport_error() {
        let bus = MemoryBus::new();
        let participant = bus.create_participant("p");
        let client =
            OperationClient::<u64, u64>::new(participant.as_ref(), "If", "Ghost", FRAME_MEDIA_TYPE)
                .unwrap();
        let future = client.call(&9);
        poll(&future);
        assert_eq!(
            future.get_result().unwrap_err().user_message(),
            "Rpc call failed"
        );
    }

    #[test]
    fn duplicate_handler_registration_is_rejected() {
        let bus = MemoryBus::new();
        let participant = bus.create_participant("p");
        let server =
            OperationServer::<(), ()>::new(participant.as_ref(), "If", "Once", FRAME_MEDIA_TYPE)
                .unwrap();
        server.register_handler(|()| ()).unwrap();
        assert!(server.register_handler(|()| ()).is_err());
    }

    #[test]
    fn void_operation_completes() {
        let bus = MemoryBus::new();
        let participant = bus.create_participant("p");
        let server =
            OperationServer::<u64, ()>::new(participant.as_ref(), "If", "SetMsgId", FRAME_MEDIA_TYPE)
                .unwrap();
        server.register_handler(|_| ()).unwrap();
        let client =
            OperationClient::<u64, ()>::new(participant.as_ref(), "If", "SetMsgId", FRAME_MEDIA_TYPE)
                .unwrap();
        let future = client.call(&3);
        poll(&future);
        future.get_result().unwrap();
    }
}
