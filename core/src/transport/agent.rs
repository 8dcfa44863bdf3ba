//! Blocking transport backed by a `ureq` agent.

use std::io::Read;
use std::time::Duration;

use ureq::http::header::CONTENT_LENGTH;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::RequestBuilder;

use super::{AbortSignal, Transport};
use crate::error::TransportError;
use crate::event::{AbortEvent, TransportEvent};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Configuration for `UreqTransport`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Read size for the response body; one progress event per chunk.
    pub chunk_size: usize,
    /// Sent with every request unless the request sets the same header.
    pub default_headers: Vec<(String, String)>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            chunk_size: 8 * 1024,
            default_headers: vec![(
                "user-agent".to_string(),
                format!("mediator-http/{}", env!("CARGO_PKG_VERSION")),
            )],
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.default_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.default_headers.push((name, value.into()));
        self
    }
}

/// Runs requests on a shared `ureq::Agent`.
///
/// HTTP error statuses are delivered as loads, never as transport errors.
/// Abort is honoured before connecting and between body chunks; a request
/// blocked on connect or on the first response byte finishes that step
/// first.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    config: TransportConfig,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl UreqTransport {
    pub fn new(config: TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .build()
            .new_agent();
        Self { agent, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn execute(
        &self,
        request: &HttpRequest,
        abort: &AbortSignal,
        events: &mut dyn FnMut(TransportEvent),
    ) -> Result<(), TransportError> {
        let mut response = self.call(request)?;

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let total = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        let mut reader = response.body_mut().as_reader();
        let mut body = Vec::new();
        let mut chunk = vec![0u8; self.config.chunk_size.max(1)];
        loop {
            if abort.is_aborted() {
                events(TransportEvent::Abort(AbortEvent {
                    loaded: body.len() as u64,
                    total,
                }));
                return Ok(());
            }
            let read = reader.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
            events(TransportEvent::Progress {
                loaded: body.len() as u64,
                total,
            });
        }

        events(TransportEvent::Load(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        }));
        Ok(())
    }

    fn call(
        &self,
        request: &HttpRequest,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let url = request.url.as_str();
        match request.method {
            HttpMethod::Get => self.without_body(self.agent.get(url), request),
            HttpMethod::Delete => self.without_body(self.agent.delete(url), request),
            HttpMethod::Post => self.with_body(self.agent.post(url), request),
            HttpMethod::Put => self.with_body(self.agent.put(url), request),
            HttpMethod::Patch => self.with_body(self.agent.patch(url), request),
        }
    }

    fn without_body(
        &self,
        builder: RequestBuilder<WithoutBody>,
        request: &HttpRequest,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let builder = self.apply_headers(builder, request);
        if request.body.is_empty() {
            builder.call()
        } else {
            builder.force_send_body().send(request.body.as_bytes())
        }
    }

    fn with_body(
        &self,
        builder: RequestBuilder<WithBody>,
        request: &HttpRequest,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        self.apply_headers(builder, request)
            .send(request.body.as_bytes())
    }

    fn apply_headers<B>(
        &self,
        mut builder: RequestBuilder<B>,
        request: &HttpRequest,
    ) -> RequestBuilder<B> {
        let defaults = self
            .config
            .default_headers
            .iter()
            .filter(|(name, _)| request.header(name).is_none());
        for (name, value) in defaults.chain(request.headers.iter()) {
            builder = builder.header(name, value);
        }
        if let Some(authorization) = request.authorization() {
            builder = builder.header("authorization", authorization);
        }
        builder
    }
}

impl Transport for UreqTransport {
    fn send(
        &self,
        request: &HttpRequest,
        abort: &AbortSignal,
        events: &mut dyn FnMut(TransportEvent),
    ) {
        if abort.is_aborted() {
            events(TransportEvent::Abort(AbortEvent::default()));
            return;
        }
        if let Err(err) = self.execute(request, abort, events) {
            tracing::debug!(target: "mediator_http::transport", %err, url = %request.url, "transport failed");
            events(TransportEvent::Error(err));
        }
    }
}
