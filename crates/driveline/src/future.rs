// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One-shot completion handles.
//!
//! A [`Promise`]/[`Future`] pair is a single-use channel between the party
//! producing an operation result and the party consuming it. In-process
//! operations complete the promise before the future is even returned;
//! middleware-backed operations complete it from the participant's I/O
//! thread, and callers poll [`Future::is_ready`] instead of blocking inside
//! a periodic task.

use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

const DROPPED_MESSAGE: &str = "Promise dropped without completion";

/// Create a connected promise/future pair.
pub fn oneshot<T>() -> (Promise<T>, Future<T>) {
    let (tx, rx) = bounded(1);
    (
        Promise { tx },
        Future {
            rx,
            done: Mutex::new(None),
        },
    )
}

/// Write side of a one-shot completion handle.
///
/// Exactly one of [`set_value`](Promise::set_value),
/// [`set_error`](Promise::set_error) or drop happens; dropping without
/// setting surfaces a `NotOk` error to the reader.
pub struct Promise<T> {
    tx: Sender<Result<T>>,
}

impl<T> Promise<T> {
    /// Complete the future with a value. Consumes the promise.
    pub fn set_value(self, value: T) {
        // Receiver may already be gone; nothing to do then.
        let _ = self.tx.send(Ok(value));
    }

    /// Complete the future with an error. Consumes the promise.
    pub fn set_error(self, error: Error) {
        let _ = self.tx.send(Err(error));
    }
}

/// Read side of a one-shot completion handle.
pub struct Future<T> {
    rx: Receiver<Result<T>>,
    done: Mutex<Option<Result<T>>>,
}

impl<T> Future<T> {
    /// Non-blocking readiness peek.
    ///
    /// Returns `true` once a value, an error, or the promise's disappearance
    /// has been observed; [`get_result`](Future::get_result) will not block
    /// afterwards.
    pub fn is_ready(&self) -> bool {
        let mut done = self.done.lock();
        if done.is_some() {
            return true;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                *done = Some(result);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                *done = Some(Err(Error::not_ok(DROPPED_MESSAGE)));
                true
            }
        }
    }

    /// Take the result, blocking until the promise is completed or dropped.
    pub fn get_result(self) -> Result<T> {
        if let Some(result) = self.done.into_inner() {
            return result;
        }
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(Error::not_ok(DROPPED_MESSAGE)),
        }
    }
}
