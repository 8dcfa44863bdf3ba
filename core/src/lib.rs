//! HTTP request helper that reports through a publish/subscribe mediator.
//!
//! # Overview
//! `HttpHelper` serializes query and body parameters, runs the request on a
//! `Transport`, and publishes the lifecycle (`httpUpdate`, `httpSuccess`,
//! `httpError`, `httpAbort`) on a `Mediator` instead of returning the
//! response. An optional correlation key namespaces the topics as
//! `<key>-httpSuccess` and so on.
//!
//! # Design
//! - Request building (`builder`) and event mapping (`lifecycle`) are pure;
//!   only the transport does I/O, so both are testable with
//!   `ScriptedTransport`.
//! - Every request gets its own lifecycle and worker thread; the returned
//!   `RequestHandle` can abort it or wait for the tagged `Outcome`.
//! - Exactly one terminal event is published per request. An HTTP error
//!   status is still a success event; callers inspect `status`.

pub mod builder;
pub mod client;
pub mod error;
pub mod event;
pub mod http;
pub mod lifecycle;
pub mod mediator;
pub mod options;
pub mod params;
pub mod topic;
pub mod transport;

pub use client::{Correlated, HttpHelper, RequestHandle, RequestId};
pub use error::{HelperError, ParamsError, TransportError, TransportErrorKind};
pub use event::{AbortEvent, HttpEvent, Outcome, ResponseEnvelope, TransportEvent};
pub use http::{Credentials, HttpMethod, HttpRequest, HttpResponse};
pub use mediator::{Bus, Mediator, Published, SubscriptionId};
pub use options::RequestOptions;
pub use topic::Topic;
pub use transport::{AbortSignal, ScriptedTransport, Transport, TransportConfig, UreqTransport};
