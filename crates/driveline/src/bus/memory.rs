// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process reference participant.
//!
//! The [`MemoryBus`] is a broker matching endpoints of all participants it
//! created, with deliveries (topic data, RPC calls, RPC returns) dispatched
//! on the bus's own I/O thread. It implements the full [`Participant`]
//! contract and is used for testing and single-host deployments.
//!
//! The bus must outlive its participants; endpoints created after the bus
//! was dropped enqueue into a dead queue and are never delivered.

use super::participant::{
    labels_match, CallEvent, CallHandler, CallReturnEvent, CallStatus, DataHandler, Participant,
    PubSubSpec, ReplyHandler, RpcClient, RpcServer, RpcSpec, TopicPublisher,
};
use crate::error::{Error, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

enum DispatchItem {
    Data {
        subscriber_id: u64,
        payload: Vec<u8>,
    },
    Call {
        server_id: u64,
        event: CallEvent,
    },
    Return {
        client_id: u64,
        event: CallReturnEvent,
    },
    Shutdown,
}

struct SubscriberEntry {
    id: u64,
    spec: PubSubSpec,
    handler: Arc<dyn Fn(&[u8]) + Send + Sync>,
}

struct ServerEntry {
    id: u64,
    spec: RpcSpec,
    handler: Arc<dyn Fn(&dyn RpcServer, CallEvent) + Send + Sync>,
    endpoint: Arc<MemoryRpcServer>,
}

struct ClientEntry {
    id: u64,
    on_return: Arc<dyn Fn(CallReturnEvent) + Send + Sync>,
}

#[derive(Default)]
struct BusState {
    subscribers: Vec<SubscriberEntry>,
    servers: Vec<ServerEntry>,
    clients: Vec<ClientEntry>,
    // call id -> (client id, caller context)
    pending_calls: HashMap<u64, (u64, u64)>,
}

struct BusShared {
    state: Mutex<BusState>,
    tx: Sender<DispatchItem>,
    next_id: AtomicU64,
}

impl BusShared {
    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// In-process broker implementing the middleware contract.
pub struct MemoryBus {
    shared: Arc<BusShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryBus {
    /// Create a bus and spawn its I/O dispatch thread.
    pub fn new() -> Arc<Self> {
        let (tx, rx) = unbounded();
        let shared = Arc::new(BusShared {
            state: Mutex::new(BusState::default()),
            tx,
            next_id: AtomicU64::new(1),
        });

        let worker_shared = Arc::clone(&shared);
        #[allow(clippy::expect_used)] // thread spawn failure is unrecoverable
        let worker = thread::Builder::new()
            .name("driveline-bus".into())
            .spawn(move || dispatch_loop(&worker_shared, &rx))
            .expect("failed to spawn bus dispatch thread");

        Arc::new(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Create a participant on this bus.
    pub fn create_participant(self: &Arc<Self>, name: &str) -> Arc<MemoryParticipant> {
        log::debug!("[bus] participant '{}' created", name);
        Arc::new(MemoryParticipant {
            name: name.to_string(),
            shared: Arc::clone(&self.shared),
        })
    }
}

impl Drop for MemoryBus {
    fn drop(&mut self) {
        let _ = self.shared.tx.send(DispatchItem::Shutdown);
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

fn dispatch_loop(shared: &Arc<BusShared>, rx: &Receiver<DispatchItem>) {
    log::debug!("[bus] dispatch thread started");
    while let Ok(item) = rx.recv() {
        match item {
            DispatchItem::Data {
                subscriber_id,
                payload,
            } => {
                let handler = shared
                    .state
                    .lock()
                    .subscribers
                    .iter()
                    .find(|s| s.id == subscriber_id)
                    .map(|s| Arc::clone(&s.handler));
                if let Some(handler) = handler {
                    handler(&payload);
                }
            }
            DispatchItem::Call { server_id, event } => {
                let entry = shared
                    .state
                    .lock()
                    .servers
                    .iter()
                    .find(|s| s.id == server_id)
                    .map(|s| (Arc::clone(&s.handler), Arc::clone(&s.endpoint)));
                match entry {
                    Some((handler, endpoint)) => handler(endpoint.as_ref(), event),
                    None => complete_call(shared, event.call_id, CallStatus::TransportFailure, Vec::new()),
                }
            }
            DispatchItem::Return { client_id, event } => {
                let on_return = shared
                    .state
                    .lock()
                    .clients
                    .iter()
                    .find(|c| c.id == client_id)
                    .map(|c| Arc::clone(&c.on_return));
                if let Some(on_return) = on_return {
                    on_return(event);
                }
            }
            DispatchItem::Shutdown => break,
        }
    }
    log::debug!("[bus] dispatch thread stopped");
}

/// Resolve a pending call and enqueue its return to the owning client.
fn complete_call(shared: &Arc<BusShared>, call_id: u64, status: CallStatus, payload: Vec<u8>) {
    let target = shared.state.lock().pending_calls.remove(&call_id);
    if let Some((client_id, context)) = target {
        let _ = shared.tx.send(DispatchItem::Return {
            client_id,
            event: CallReturnEvent {
                context,
                status,
                payload,
            },
        });
    }
}

/// A participant created by [`MemoryBus::create_participant`].
pub struct MemoryParticipant {
    name: String,
    shared: Arc<BusShared>,
}

impl Participant for MemoryParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_publisher(&self, spec: &PubSubSpec) -> Result<Arc<dyn TopicPublisher>> {
        Ok(Arc::new(MemoryPublisher {
            spec: spec.clone(),
            shared: Arc::clone(&self.shared),
        }))
    }

    fn create_subscriber(&self, spec: &PubSubSpec, handler: DataHandler) -> Result<()> {
        let id = self.shared.allocate_id();
        self.shared.state.lock().subscribers.push(SubscriberEntry {
            id,
            spec: spec.clone(),
            handler: Arc::from(handler),
        });
        log::debug!(
            "[bus] '{}' subscribed to topic '{}'",
            self.name,
            spec.topic
        );
        Ok(())
    }

    fn create_rpc_server(&self, spec: &RpcSpec, handler: CallHandler) -> Result<Arc<dyn RpcServer>> {
        let mut state = self.shared.state.lock();
        if state
            .servers
            .iter()
            .any(|s| s.spec.method == spec.method && labels_match(&s.spec.labels, &spec.labels))
        {
            return Err(Error::not_ok(format!(
                "Rpc server already registered for method '{}'",
                spec.method
            )));
        }
        let id = self.shared.allocate_id();
        let endpoint = Arc::new(MemoryRpcServer {
            shared: Arc::clone(&self.shared),
        });
        state.servers.push(ServerEntry {
            id,
            spec: spec.clone(),
            handler: Arc::from(handler),
            endpoint: Arc::clone(&endpoint),
        });
        log::debug!("[bus] '{}' serves method '{}'", self.name, spec.method);
        Ok(endpoint)
    }

    fn create_rpc_client(
        &self,
        spec: &RpcSpec,
        on_return: ReplyHandler,
    ) -> Result<Arc<dyn RpcClient>> {
        let id = self.shared.allocate_id();
        self.shared.state.lock().clients.push(ClientEntry {
            id,
            on_return: Arc::from(on_return),
        });
        Ok(Arc::new(MemoryRpcClient {
            client_id: id,
            spec: spec.clone(),
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MemoryPublisher {
    spec: PubSubSpec,
    shared: Arc<BusShared>,
}

impl TopicPublisher for MemoryPublisher {
    fn publish(&self, payload: &[u8]) -> Result<()> {
        let state = self.shared.state.lock();
        for subscriber in state.subscribers.iter().filter(|s| {
            s.spec.topic == self.spec.topic
                && s.spec.media_type == self.spec.media_type
                && labels_match(&s.spec.labels, &self.spec.labels)
        }) {
            let _ = self.shared.tx.send(DispatchItem::Data {
                subscriber_id: subscriber.id,
                payload: payload.to_vec(),
            });
        }
        Ok(())
    }
}

struct MemoryRpcServer {
    shared: Arc<BusShared>,
}

impl RpcServer for MemoryRpcServer {
    fn submit_result(&self, call_id: u64, payload: Vec<u8>) {
        complete_call(&self.shared, call_id, CallStatus::Success, payload);
    }

    fn submit_error(&self, call_id: u64) {
        complete_call(&self.shared, call_id, CallStatus::TransportFailure, Vec::new());
    }
}

struct MemoryRpcClient {
    client_id: u64,
    spec: RpcSpec,
    shared: Arc<BusShared>,
}

impl RpcClient for MemoryRpcClient {
    fn call(&self, payload: Vec<u8>, context: u64) -> Result<()> {
        let call_id = self.shared.allocate_id();
        let mut state = self.shared.state.lock();
        let server_id = state
            .servers
            .iter()
            .find(|s| {
                s.spec.method == self.spec.method
                    && s.spec.media_type == self.spec.media_type
                    && labels_match(&s.spec.labels, &self.spec.labels)
            })
            .map(|s| s.id);

        state.pending_calls.insert(call_id, (self.client_id, context));
        drop(state);

        match server_id {
            Some(server_id) => {
                let _ = self.shared.tx.send(DispatchItem::Call {
                    server_id,
                    event: CallEvent { call_id, payload },
                });
            }
            None => {
                log::warn!("[bus] no server for method '{}'", self.spec.method);
                complete_call(&self.shared, call_id, CallStatus::TransportFailure, Vec::new());
            }
        }
        Ok(())
    }
}
