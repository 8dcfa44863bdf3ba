//! A transport that replays a fixed script.

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use super::{AbortSignal, Transport};
use crate::event::{AbortEvent, TransportEvent};
use crate::http::HttpRequest;

/// Replays the same event list for every request and records each request
/// it receives.
///
/// If the abort signal is set before an event would be replayed, the rest of
/// the script is replaced by a single abort carrying the last reported
/// progress. A gate makes the transport wait for one message before it
/// starts replaying, so a test can act while the request is in flight.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Vec<TransportEvent>,
    gate: Option<Receiver<()>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = TransportEvent>) -> Self {
        Self {
            script: script.into_iter().collect(),
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Block each send until a message arrives on `gate` (or its sender is
    /// dropped).
    pub fn gated(mut self, gate: Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Requests sent so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        request: &HttpRequest,
        abort: &AbortSignal,
        events: &mut dyn FnMut(TransportEvent),
    ) {
        self.requests.lock().push(request.clone());
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }

        let mut progress = AbortEvent::default();
        for event in &self.script {
            if abort.is_aborted() {
                events(TransportEvent::Abort(progress));
                return;
            }
            if let TransportEvent::Progress { loaded, total } = event {
                progress = AbortEvent {
                    loaded: *loaded,
                    total: *total,
                };
            }
            events(event.clone());
        }
    }
}
