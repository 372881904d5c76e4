// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error domain for the runtime.
//!
//! Recoverable failures travel as [`Error`] values through [`Result`] and
//! [`crate::future::Future`]. Configuration mistakes (duplicate module names,
//! bad task periods, double handler registration) are reported at
//! construction/registration time and are expected to abort startup.

use std::fmt;

/// Coarse error classification carried by every [`Error`].
///
/// The numeric discriminants are part of the rendered message format
/// (`"<code>: <text>"`) and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No error. Present for completeness; APIs return `Ok(..)` instead.
    Ok = 1,
    /// Generic failure (missing sample, vacant handler, transport fault).
    NotOk = 2,
    /// Failure of unknown origin.
    Unknown = 3,
}

impl ErrorCode {
    /// Returns the symbolic name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::NotOk => "NotOk",
            Self::Unknown => "Unknown",
        }
    }
}

/// An error code paired with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    code: ErrorCode,
    message: String,
}

impl Error {
    /// Create an error from a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a `NotOk` error.
    pub fn not_ok(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotOk, message)
    }

    /// Shorthand for an `Unknown` error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, message)
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Full message in the `"<code>: <text>"` format.
    pub fn message(&self) -> String {
        format!("{}: {}", self.code as i32, self.message)
    }

    /// Message text without the code prefix.
    pub fn user_message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for Error {}

/// Convenient alias for API results using the runtime [`Error`] type.
///
/// The usual carrier combinators map onto the native API: `has_value` is
/// [`Result::is_ok`], `inspect_error` is [`Result::inspect_err`], `and_then`
/// is [`Result::and_then`].
pub type Result<T> = core::result::Result<T, Error>;
