//! Error types for the mediator HTTP helper.
//!
//! # Design
//! Request outcomes never surface as `Err`: success, transport failure and
//! abort are all published as events. `HelperError` only covers the
//! synchronous side of the helper, starting the worker and joining it.
//! `TransportError` is the payload of an `httpError` event rather than
//! something returned to the caller.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::client::RequestId;

/// Errors returned synchronously by `HttpHelper` and `RequestHandle`.
#[derive(Debug, Error)]
pub enum HelperError {
    /// The worker thread for a request could not be started.
    #[error("failed to spawn request worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The worker thread panicked before reporting an outcome.
    #[error("request {0} worker panicked")]
    WorkerPanicked(RequestId),
}

/// Errors from decoding a serialized parameter string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("invalid percent-encoding in {0:?}")]
    InvalidEncoding(String),
}

/// Broad classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Host lookup or connection establishment failed.
    Connection,
    Timeout,
    InvalidUrl,
    /// Reading or writing the stream failed mid-request.
    Io,
    /// The transport finished without reporting a terminal event.
    Incomplete,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Connection => "connection",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::InvalidUrl => "invalid_url",
            TransportErrorKind::Io => "io",
            TransportErrorKind::Incomplete => "incomplete",
            TransportErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw error event published on `httpError`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} transport error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        let kind = match &err {
            ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
            ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
                TransportErrorKind::Connection
            }
            ureq::Error::BadUri(_) => TransportErrorKind::InvalidUrl,
            ureq::Error::Io(io) if is_connect_failure(io) => TransportErrorKind::Connection,
            ureq::Error::Io(_) => TransportErrorKind::Io,
            _ => TransportErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::new(TransportErrorKind::Io, err.to_string())
    }
}

fn is_connect_failure(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::AddrNotAvailable
    )
}
