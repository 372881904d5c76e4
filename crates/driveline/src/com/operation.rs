// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process typed request/response endpoint.

use crate::error::{Error, Result};
use crate::future::{oneshot, Future};
use parking_lot::Mutex;

type OperationHandler<I, O> = Box<dyn Fn(I) -> O + Send>;

/// A named operation with at most one registered handler.
///
/// Calls run the handler inline on the caller's thread; the returned future
/// is always ready. Multi-argument operations take a tuple input; void
/// outputs use `()`.
pub struct Operation<I, O> {
    name: String,
    handler: Mutex<Option<OperationHandler<I, O>>>,
}

impl<I, O> Operation<I, O> {
    /// Create an operation endpoint named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: Mutex::new(None),
        }
    }

    /// The operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provider: store the handler. A second registration is a
    /// configuration error.
    pub fn register_handler(&self, handler: impl Fn(I) -> O + Send + 'static) -> Result<()> {
        let mut slot = self.handler.lock();
        if slot.is_some() {
            return Err(Error::not_ok(format!(
                "Operation handler already registered for {}.",
                self.name
            )));
        }
        *slot = Some(Box::new(handler));
        Ok(())
    }

    /// Consumer: invoke the operation. The returned future is ready on
    /// return; a vacant handler yields a `NotOk` error result.
    pub fn call(&self, input: I) -> Future<O> {
        let (promise, future) = oneshot();
        let slot = self.handler.lock();
        match slot.as_ref() {
            Some(handler) => promise.set_value(handler(input)),
            None => promise.set_error(Error::not_ok(format!(
                "No operation handler registered for {}.",
                self.name
            ))),
        }
        future
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn call_returns_ready_future_with_handler_result() {
        let operation = Operation::<(u64, u64), u64>::new("Add");
        operation.register_handler(|(a, b)| a + b).unwrap();
        let future = operation.call((2, 3));
        assert!(future.is_ready());
        assert_eq!(future.get_result().unwrap(), 5);
    }

    #[test]
    fn missing_handler_yields_not_ok_with_operation_name() {
        let operation = Operation::<u64, ()>::new("MyVoidOperation");
        let future = operation.call(3);
        assert!(future.is_ready());
        let err = future.get_result().unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotOk);
        assert_eq!(
            err.user_message(),
            "No operation handler registered for MyVoidOperation."
        );
    }

    #[test]
    fn second_registration_is_rejected() {
        let operation = Operation::<(), ()>::new("Once");
        operation.register_handler(|()| ()).unwrap();
        let err = operation.register_handler(|()| ()).unwrap_err();
        assert!(err.user_message().contains("already registered"));
    }

    #[test]
    fn getter_setter_pair() {
        let field = Arc::new(AtomicU64::new(42));
        let getter = Operation::<(), u64>::new("MyGetter");
        let setter = Operation::<u64, ()>::new("MySetter");

        let value = Arc::clone(&field);
        getter
            .register_handler(move |()| value.load(Ordering::Relaxed))
            .unwrap();
        let value = Arc::clone(&field);
        setter
            .register_handler(move |v| value.store(v, Ordering::Relaxed))
            .unwrap();

        assert_eq!(getter.call(()).get_result().unwrap(), 42);
        setter.call(100).get_result().unwrap();
        assert_eq!(getter.call(()).get_result().unwrap(), 100);
    }
}
