//! Lifecycle payloads.
//!
//! `TransportEvent` is what a transport reports while running a request;
//! `HttpEvent` is what gets published on the mediator. The two are kept
//! apart so a transport never has to know about topics or envelopes.

use serde::Serialize;

use crate::error::TransportError;
use crate::http::HttpResponse;
use crate::topic::Topic;

/// Progress snapshot at the moment a request was aborted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AbortEvent {
    pub loaded: u64,
    pub total: Option<u64>,
}

/// Events reported by a `Transport` for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Bytes received so far and, when known, the full body length.
    Progress { loaded: u64, total: Option<u64> },
    Load(HttpResponse),
    Error(TransportError),
    Abort(AbortEvent),
}

impl TransportEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportEvent::Progress { .. })
    }
}

/// The payload delivered to a successful request's subscribers.
///
/// `data` is present only when the body parsed as a non-null JSON value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub raw: HttpResponse,
}

impl ResponseEnvelope {
    pub fn from_response(raw: HttpResponse) -> Self {
        let data = match serde_json::from_str::<serde_json::Value>(&raw.body) {
            Ok(serde_json::Value::Null) | Err(_) => None,
            Ok(value) => Some(value),
        };
        Self {
            status: raw.status,
            status_text: raw.status_text.clone(),
            data,
            raw,
        }
    }
}

/// Payloads published on the lifecycle topics.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpEvent {
    /// Percent complete, 0 to 100.
    Update(u8),
    Success(ResponseEnvelope),
    Error(TransportError),
    Abort(AbortEvent),
}

impl HttpEvent {
    pub fn topic(&self) -> Topic {
        match self {
            HttpEvent::Update(_) => Topic::Update,
            HttpEvent::Success(_) => Topic::Success,
            HttpEvent::Error(_) => Topic::Error,
            HttpEvent::Abort(_) => Topic::Abort,
        }
    }
}

/// The terminal result of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(ResponseEnvelope),
    Error(TransportError),
    Aborted(AbortEvent),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn envelope(&self) -> Option<&ResponseEnvelope> {
        match self {
            Outcome::Success(envelope) => Some(envelope),
            _ => None,
        }
    }
}

impl From<Outcome> for HttpEvent {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success(envelope) => HttpEvent::Success(envelope),
            Outcome::Error(err) => HttpEvent::Error(err),
            Outcome::Aborted(abort) => HttpEvent::Abort(abort),
        }
    }
}

/// Whole percent complete, or `None` when the total is unknown or zero.
pub fn percent_complete(loaded: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|total| *total > 0)?;
    let percent = (loaded as f64 / total as f64 * 100.0).round();
    Some(percent.min(100.0) as u8)
}
