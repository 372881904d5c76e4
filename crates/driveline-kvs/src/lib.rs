// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Persistent key-value storage for driveline executables.
//!
//! The [`KeyValueStore`] trait is the collaborator surface the runtime wires
//! into modules: typed getters and setters per primitive type plus string
//! values. [`LogStore`] implements it on an append-only on-disk record log
//! with an in-memory index and a pluggable value [`Codec`]; user-declared
//! aggregate types go through the generic [`LogStore::get`]/[`LogStore::set`]
//! (serde-bound, so they stay off the object-safe trait).
//!
//! # Example
//!
//! ```ignore
//! use driveline_kvs::{KeyValueStore, LogStore};
//!
//! let store = LogStore::new();
//! store.open(std::path::Path::new("./state.db"), true)?;
//! if store.get_u8("MsgId").is_err() {
//!     store.set_u8("MsgId", 1)?;
//! }
//! ```

mod codec;
mod store;

pub use codec::{Codec, CodecError, JsonCodec};
pub use store::LogStore;

use driveline::Result;
use std::path::Path;

macro_rules! typed_pair {
    ($get:ident, $set:ident, $ty:ty) => {
        /// Typed read of the value stored under `key`.
        fn $get(&self, key: &str) -> Result<$ty>;
        /// Typed write of `value` under `key`.
        fn $set(&self, key: &str, value: $ty) -> Result<()>;
    };
}

/// Persistent key-value collaborator interface.
///
/// Round-trip equality is required: any value written by a setter is
/// returned bit-identically by the matching getter, across process restarts.
pub trait KeyValueStore: Send + Sync {
    /// Open the backing file. Must be called before any access; with
    /// `sync_on_write` every write is flushed to disk before returning.
    fn open(&self, path: &Path, sync_on_write: bool) -> Result<()>;

    typed_pair!(get_u8, set_u8, u8);
    typed_pair!(get_u16, set_u16, u16);
    typed_pair!(get_u32, set_u32, u32);
    typed_pair!(get_u64, set_u64, u64);
    typed_pair!(get_i8, set_i8, i8);
    typed_pair!(get_i16, set_i16, i16);
    typed_pair!(get_i32, set_i32, i32);
    typed_pair!(get_i64, set_i64, i64);
    typed_pair!(get_bool, set_bool, bool);
    typed_pair!(get_f32, set_f32, f32);
    typed_pair!(get_f64, set_f64, f64);

    /// Read the string stored under `key`.
    fn get_string(&self, key: &str) -> Result<String>;
    /// Store a string under `key`.
    fn set_string(&self, key: &str, value: &str) -> Result<()>;
}
