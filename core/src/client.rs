//! Fire-and-forget HTTP helper that reports through a mediator.
//!
//! # Design
//! `HttpHelper` holds only a mediator and a transport. Every call builds a
//! fresh `HttpRequest` and a fresh `Lifecycle` and runs them on a dedicated
//! worker thread, so concurrent requests never share listener state or a
//! correlation key. The caller gets a `RequestHandle` back immediately;
//! progress and the terminal outcome arrive as published events, and the
//! handle can abort the request or wait for its `Outcome`.
//!
//! Subscribe on the mediator before sending: events published before a
//! subscription exists are not replayed.

use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

use uuid::Uuid;

use crate::builder::build_request;
use crate::error::HelperError;
use crate::event::{HttpEvent, Outcome};
use crate::http::{HttpMethod, HttpRequest};
use crate::lifecycle::{Lifecycle, Publication};
use crate::mediator::Mediator;
use crate::options::RequestOptions;
use crate::transport::{AbortSignal, Transport, UreqTransport};

/// Unique identifier for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// HTTP helper publishing lifecycle events to `M`.
#[derive(Debug)]
pub struct HttpHelper<M, T = UreqTransport> {
    mediator: Arc<M>,
    transport: Arc<T>,
}

impl<M, T> Clone for HttpHelper<M, T> {
    fn clone(&self) -> Self {
        Self {
            mediator: Arc::clone(&self.mediator),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<M> HttpHelper<M, UreqTransport>
where
    M: Mediator<HttpEvent> + 'static,
{
    /// Helper using a default `UreqTransport`.
    pub fn with_mediator(mediator: M) -> Self {
        Self::new(mediator, UreqTransport::default())
    }
}

impl<M, T> HttpHelper<M, T>
where
    M: Mediator<HttpEvent> + 'static,
    T: Transport + 'static,
{
    pub fn new(mediator: M, transport: T) -> Self {
        Self::from_shared(Arc::new(mediator), Arc::new(transport))
    }

    /// Helper over a mediator and transport that are shared elsewhere.
    pub fn from_shared(mediator: Arc<M>, transport: Arc<T>) -> Self {
        Self {
            mediator,
            transport,
        }
    }

    pub fn mediator(&self) -> &Arc<M> {
        &self.mediator
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// View of this helper that publishes under `<key>-` topics.
    pub fn with_key<'a>(&'a self, key: &'a str) -> Correlated<'a, M, T> {
        Correlated { helper: self, key }
    }

    pub fn get(&self, url: &str, options: RequestOptions) -> Result<RequestHandle, HelperError> {
        self.send(HttpMethod::Get, url, options, None)
    }

    pub fn post(&self, url: &str, options: RequestOptions) -> Result<RequestHandle, HelperError> {
        self.send(HttpMethod::Post, url, options, None)
    }

    pub fn put(&self, url: &str, options: RequestOptions) -> Result<RequestHandle, HelperError> {
        self.send(HttpMethod::Put, url, options, None)
    }

    pub fn patch(&self, url: &str, options: RequestOptions) -> Result<RequestHandle, HelperError> {
        self.send(HttpMethod::Patch, url, options, None)
    }

    pub fn delete(&self, url: &str, options: RequestOptions) -> Result<RequestHandle, HelperError> {
        self.send(HttpMethod::Delete, url, options, None)
    }

    /// Start a request on its own worker thread and return at once.
    ///
    /// Only failing to start the worker is an `Err`; every request outcome,
    /// including transport failures, is published on the mediator.
    pub fn send(
        &self,
        method: HttpMethod,
        url: &str,
        options: RequestOptions,
        key: Option<&str>,
    ) -> Result<RequestHandle, HelperError> {
        let id = RequestId::new();
        let request = build_request(method, url, &options);
        let abort = AbortSignal::new();
        let key = key.map(str::to_string);

        tracing::debug!(
            target: "mediator_http::client",
            %id,
            %method,
            url = %request.url,
            key = key.as_deref(),
            "dispatching request"
        );

        let mediator = Arc::clone(&self.mediator);
        let transport = Arc::clone(&self.transport);
        let worker_abort = abort.clone();
        let worker = std::thread::Builder::new()
            .name(format!("mediator-http-{id}"))
            .spawn(move || {
                run_lifecycle(
                    id,
                    &*transport,
                    &*mediator,
                    &request,
                    key.as_deref(),
                    &worker_abort,
                )
            })?;

        Ok(RequestHandle { id, abort, worker })
    }

    /// Run a request on the calling thread, publishing the same events as
    /// `send`, and return its outcome.
    pub fn send_blocking(
        &self,
        method: HttpMethod,
        url: &str,
        options: RequestOptions,
        key: Option<&str>,
    ) -> Outcome {
        let id = RequestId::new();
        let request = build_request(method, url, &options);
        run_lifecycle(
            id,
            &*self.transport,
            &*self.mediator,
            &request,
            key,
            &AbortSignal::new(),
        )
    }
}

/// An `HttpHelper` bound to a correlation key.
#[derive(Debug)]
pub struct Correlated<'a, M, T> {
    helper: &'a HttpHelper<M, T>,
    key: &'a str,
}

impl<M, T> Correlated<'_, M, T>
where
    M: Mediator<HttpEvent> + 'static,
    T: Transport + 'static,
{
    pub fn key(&self) -> &str {
        self.key
    }

    pub fn get(&self, url: &str, options: RequestOptions) -> Result<RequestHandle, HelperError> {
        self.helper.send(HttpMethod::Get, url, options, Some(self.key))
    }

    pub fn post(&self, url: &str, options: RequestOptions) -> Result<RequestHandle, HelperError> {
        self.helper.send(HttpMethod::Post, url, options, Some(self.key))
    }

    pub fn put(&self, url: &str, options: RequestOptions) -> Result<RequestHandle, HelperError> {
        self.helper.send(HttpMethod::Put, url, options, Some(self.key))
    }

    pub fn patch(&self, url: &str, options: RequestOptions) -> Result<RequestHandle, HelperError> {
        self.helper.send(HttpMethod::Patch, url, options, Some(self.key))
    }

    pub fn delete(&self, url: &str, options: RequestOptions) -> Result<RequestHandle, HelperError> {
        self.helper.send(HttpMethod::Delete, url, options, Some(self.key))
    }
}

/// Handle to an in-flight request.
#[derive(Debug)]
pub struct RequestHandle {
    id: RequestId,
    abort: AbortSignal,
    worker: JoinHandle<Outcome>,
}

impl RequestHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Ask the transport to stop. Has no effect once a terminal event has
    /// been published.
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the request's terminal event has been published.
    pub fn wait(self) -> Result<Outcome, HelperError> {
        self.worker
            .join()
            .map_err(|_| HelperError::WorkerPanicked(self.id))
    }
}

fn run_lifecycle<T, M>(
    id: RequestId,
    transport: &T,
    mediator: &M,
    request: &HttpRequest,
    key: Option<&str>,
    abort: &AbortSignal,
) -> Outcome
where
    T: Transport + ?Sized,
    M: Mediator<HttpEvent> + ?Sized,
{
    let span = tracing::debug_span!(
        target: "mediator_http::client",
        "request",
        %id,
        method = %request.method,
        url = %request.url
    );
    let _entered = span.enter();

    let mut lifecycle = Lifecycle::new(key);
    transport.send(request, abort, &mut |event| {
        if let Some(publication) = lifecycle.observe(event) {
            publish(mediator, publication);
        }
    });

    let (outcome, missing_terminal) = lifecycle.finish();
    if let Some(publication) = missing_terminal {
        tracing::warn!(target: "mediator_http::client", "transport reported no terminal event");
        publish(mediator, publication);
    }

    match &outcome {
        Outcome::Success(envelope) => {
            tracing::debug!(target: "mediator_http::client", status = envelope.status, "request loaded")
        }
        Outcome::Error(err) => {
            tracing::debug!(target: "mediator_http::client", %err, "request failed")
        }
        Outcome::Aborted(_) => tracing::debug!(target: "mediator_http::client", "request aborted"),
    }
    outcome
}

fn publish<M: Mediator<HttpEvent> + ?Sized>(mediator: &M, publication: Publication) {
    mediator.publish(&publication.topic, publication.event);
}
