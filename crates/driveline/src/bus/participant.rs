// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Participant contract towards the middleware.
//!
//! A participant is this process's identity on the bus. It manufactures
//! topic publishers/subscribers and RPC clients/servers from endpoint
//! specs. Matching between remote endpoints requires equal topic and media
//! type, plus agreement on every mandatory label.

use crate::error::Result;
use std::sync::Arc;

/// One matching label attached to an endpoint spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingLabel {
    /// Label key.
    pub key: String,
    /// Label value.
    pub value: String,
    /// Mandatory labels must agree on both sides for a match.
    pub mandatory: bool,
}

/// Spec of a pub/sub topic endpoint.
#[derive(Debug, Clone)]
pub struct PubSubSpec {
    /// Topic name.
    pub topic: String,
    /// Media type identifying the payload codec.
    pub media_type: String,
    /// Matching labels.
    pub labels: Vec<MatchingLabel>,
}

impl PubSubSpec {
    /// Create a spec with a raw topic name.
    pub fn new(topic: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            media_type: media_type.into(),
            labels: Vec::new(),
        }
    }

    /// Create the spec for data element `element` of `interface`:
    /// topic `"<interface>_<element>"` with the mandatory
    /// `Instance = <interface>` label.
    pub fn for_interface(interface: &str, element: &str, media_type: &str) -> Self {
        let mut spec = Self::new(format!("{}_{}", interface, element), media_type);
        spec.add_label("Instance", interface, true);
        spec
    }

    /// Attach a matching label.
    pub fn add_label(&mut self, key: impl Into<String>, value: impl Into<String>, mandatory: bool) {
        self.labels.push(MatchingLabel {
            key: key.into(),
            value: value.into(),
            mandatory,
        });
    }
}

/// Spec of an RPC endpoint; same naming and matching rules as pub/sub.
#[derive(Debug, Clone)]
pub struct RpcSpec {
    /// RPC method name.
    pub method: String,
    /// Media type identifying the payload codec.
    pub media_type: String,
    /// Matching labels.
    pub labels: Vec<MatchingLabel>,
}

impl RpcSpec {
    /// Create a spec with a raw method name.
    pub fn new(method: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            media_type: media_type.into(),
            labels: Vec::new(),
        }
    }

    /// Create the spec for operation `operation` of `interface`:
    /// method `"<interface>_<operation>"` with the mandatory
    /// `Instance = <interface>` label.
    pub fn for_interface(interface: &str, operation: &str, media_type: &str) -> Self {
        let mut spec = Self::new(format!("{}_{}", interface, operation), media_type);
        spec.add_label("Instance", interface, true);
        spec
    }

    /// Attach a matching label.
    pub fn add_label(&mut self, key: impl Into<String>, value: impl Into<String>, mandatory: bool) {
        self.labels.push(MatchingLabel {
            key: key.into(),
            value: value.into(),
            mandatory,
        });
    }
}

/// Whether two label sets agree on every mandatory label.
pub(crate) fn labels_match(a: &[MatchingLabel], b: &[MatchingLabel]) -> bool {
    let satisfied = |required: &MatchingLabel, others: &[MatchingLabel]| {
        !required.mandatory
            || others
                .iter()
                .any(|l| l.key == required.key && l.value == required.value)
    };
    a.iter().all(|l| satisfied(l, b)) && b.iter().all(|l| satisfied(l, a))
}

/// Outcome of an RPC call as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// The server answered.
    Success,
    /// No server reachable, or the server failed to answer.
    TransportFailure,
}

/// An incoming RPC call on the server side.
#[derive(Debug, Clone)]
pub struct CallEvent {
    /// Bus-assigned correlation of this call.
    pub call_id: u64,
    /// Serialized call arguments.
    pub payload: Vec<u8>,
}

/// A returned RPC call on the client side.
#[derive(Debug, Clone)]
pub struct CallReturnEvent {
    /// Caller-supplied context passed to [`RpcClient::call`].
    pub context: u64,
    /// Call outcome.
    pub status: CallStatus,
    /// Serialized result; empty unless `status` is `Success`.
    pub payload: Vec<u8>,
}

/// Handler invoked with every received topic payload.
pub type DataHandler = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Handler invoked with every incoming RPC call.
pub type CallHandler = Box<dyn Fn(&dyn RpcServer, CallEvent) + Send + Sync>;

/// Handler invoked with every RPC call return.
pub type ReplyHandler = Box<dyn Fn(CallReturnEvent) + Send + Sync>;

/// Publishing side of one topic.
pub trait TopicPublisher: Send + Sync {
    /// Publish one serialized payload.
    fn publish(&self, payload: &[u8]) -> Result<()>;
}

/// Server side of one RPC method.
pub trait RpcServer: Send + Sync {
    /// Answer a call successfully.
    fn submit_result(&self, call_id: u64, payload: Vec<u8>);

    /// Answer a call with a failure (e.g. no handler registered).
    fn submit_error(&self, call_id: u64);
}

/// Client side of one RPC method.
pub trait RpcClient: Send + Sync {
    /// Issue a call. `context` is an opaque caller value echoed back in the
    /// [`CallReturnEvent`]; the reply handler runs on the participant's I/O
    /// thread.
    fn call(&self, payload: Vec<u8>, context: u64) -> Result<()>;
}

/// A middleware-level identity representing this process on the bus.
pub trait Participant: Send + Sync {
    /// Participant name.
    fn name(&self) -> &str;

    /// Create a publisher for a topic.
    fn create_publisher(&self, spec: &PubSubSpec) -> Result<Arc<dyn TopicPublisher>>;

    /// Create a subscriber; `handler` runs on the participant's I/O thread.
    fn create_subscriber(&self, spec: &PubSubSpec, handler: DataHandler) -> Result<()>;

    /// Create an RPC server; `handler` runs on the participant's I/O thread.
    fn create_rpc_server(&self, spec: &RpcSpec, handler: CallHandler) -> Result<Arc<dyn RpcServer>>;

    /// Create an RPC client; `on_return` runs on the participant's I/O
    /// thread.
    fn create_rpc_client(&self, spec: &RpcSpec, on_return: ReplyHandler)
        -> Result<Arc<dyn RpcClient>>;
}
