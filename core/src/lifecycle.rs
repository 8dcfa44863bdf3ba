//! The per-request event state machine.
//!
//! A `Lifecycle` turns the `TransportEvent`s of one request into topic and
//! payload pairs. Progress may be published any number of times; the first
//! terminal event (load, error or abort) is published once and everything
//! after it is dropped.

use crate::error::{TransportError, TransportErrorKind};
use crate::event::{percent_complete, HttpEvent, Outcome, ResponseEnvelope, TransportEvent};

/// A topic and the payload to publish on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub topic: String,
    pub event: HttpEvent,
}

#[derive(Debug)]
pub struct Lifecycle {
    key: Option<String>,
    outcome: Option<Outcome>,
}

impl Lifecycle {
    pub fn new(key: Option<&str>) -> Self {
        Self {
            key: key.map(str::to_string),
            outcome: None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Map one transport event to the publication it causes, if any.
    ///
    /// Progress without a known length publishes nothing.
    pub fn observe(&mut self, event: TransportEvent) -> Option<Publication> {
        if self.is_finished() {
            tracing::debug!(
                target: "mediator_http::lifecycle",
                ?event,
                "ignoring event after terminal"
            );
            return None;
        }

        let outcome = match event {
            TransportEvent::Progress { loaded, total } => {
                let percent = percent_complete(loaded, total)?;
                return Some(self.publication(HttpEvent::Update(percent)));
            }
            TransportEvent::Load(response) => {
                Outcome::Success(ResponseEnvelope::from_response(response))
            }
            TransportEvent::Error(err) => Outcome::Error(err),
            TransportEvent::Abort(abort) => Outcome::Aborted(abort),
        };
        self.outcome = Some(outcome.clone());
        Some(self.publication(outcome.into()))
    }

    /// Close the lifecycle, returning the outcome and, when the transport
    /// never reported a terminal event, the error publication that stands in
    /// for it.
    pub fn finish(mut self) -> (Outcome, Option<Publication>) {
        match self.outcome.take() {
            Some(outcome) => (outcome, None),
            None => {
                let err = TransportError::new(
                    TransportErrorKind::Incomplete,
                    "transport finished without a terminal event",
                );
                let publication = self.publication(HttpEvent::Error(err.clone()));
                (Outcome::Error(err), Some(publication))
            }
        }
    }

    fn publication(&self, event: HttpEvent) -> Publication {
        Publication {
            topic: event.topic().qualified(self.key()),
            event,
        }
    }
}
