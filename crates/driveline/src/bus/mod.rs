// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Middleware participant backend.
//!
//! Exposes the same endpoint contracts as [`crate::com`] over a
//! participant that provides topic pub/sub and RPC with length-prefixed
//! structured payloads. Wire identifiers are `"<Interface>_<member>"` with a
//! mandatory `Instance = <Interface>` matching label; the payload media type
//! identifies the codec.
//!
//! The [`Participant`] contract abstracts the vendor middleware;
//! [`MemoryBus`] is the in-process reference participant used for testing
//! and single-host deployments. Endpoint adapters:
//!
//! - [`DataElementProvider`] / [`DataElementConsumer`] — latest-value
//!   pub/sub with per-subscriber activation, samples deserialized on the
//!   participant's I/O thread.
//! - [`OperationClient`] / [`OperationServer`] — request/response with a
//!   pending-promise correlation map; returned futures are completed from
//!   the I/O thread and polled by the caller.

mod memory;
mod participant;
mod pubsub;
mod rpc;
mod transformer;

pub use memory::MemoryBus;
pub use participant::{
    CallEvent, CallReturnEvent, CallStatus, MatchingLabel, Participant, PubSubSpec, RpcClient,
    RpcServer, RpcSpec, TopicPublisher,
};
pub use pubsub::{DataElementConsumer, DataElementProvider};
pub use rpc::{OperationClient, OperationServer};
pub use transformer::{read_frame, write_frame, Wire, FRAME_MEDIA_TYPE};
