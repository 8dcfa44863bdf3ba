//! The transport that actually moves bytes.
//!
//! # Design
//! A `Transport` receives a fully built `HttpRequest` and reports what
//! happens to it as a stream of `TransportEvent`s: zero or more progress
//! notifications followed by one terminal event. It never publishes
//! anything itself; mapping events to topics is the lifecycle's job.
//!
//! `UreqTransport` talks to real servers. `ScriptedTransport` replays a
//! fixed event list and records the requests it was given, which is how the
//! lifecycle is exercised without a network.

mod agent;
mod scripted;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use agent::{TransportConfig, UreqTransport};
pub use scripted::ScriptedTransport;

use crate::event::TransportEvent;
use crate::http::HttpRequest;

/// Executes requests and reports their lifecycle through `events`.
///
/// Implementations must check `abort` at every point where they can stop
/// early and report `TransportEvent::Abort` when it is set.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: &HttpRequest,
        abort: &AbortSignal,
        events: &mut dyn FnMut(TransportEvent),
    );
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(
        &self,
        request: &HttpRequest,
        abort: &AbortSignal,
        events: &mut dyn FnMut(TransportEvent),
    ) {
        (**self).send(request, abort, events)
    }
}

/// Shared cancellation flag for one request.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
