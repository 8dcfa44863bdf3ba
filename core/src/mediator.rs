//! Publish/subscribe delivery of lifecycle events.
//!
//! # Design
//! The helper is a pure producer: it only ever calls `Mediator::publish`.
//! `Bus` is the in-process implementation with topic subscriptions. A
//! `crossbeam_channel::Sender<Published<P>>` is also a mediator, for callers
//! that would rather drain a typed channel than register callbacks.
//!
//! Subscriptions must be in place before a request is sent; events
//! published to a topic with no subscribers are dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Anything that accepts published payloads by topic name.
pub trait Mediator<P>: Send + Sync {
    fn publish(&self, topic: &str, payload: P);
}

impl<P, M> Mediator<P> for Arc<M>
where
    M: Mediator<P> + ?Sized,
{
    fn publish(&self, topic: &str, payload: P) {
        (**self).publish(topic, payload)
    }
}

impl<P, M> Mediator<P> for &M
where
    M: Mediator<P> + ?Sized,
{
    fn publish(&self, topic: &str, payload: P) {
        (**self).publish(topic, payload)
    }
}

/// A topic and payload as delivered through a channel mediator.
#[derive(Debug, Clone, PartialEq)]
pub struct Published<P> {
    pub topic: String,
    pub payload: P,
}

impl<P: Send> Mediator<P> for crossbeam_channel::Sender<Published<P>> {
    fn publish(&self, topic: &str, payload: P) {
        let message = Published {
            topic: topic.to_string(),
            payload,
        };
        if self.send(message).is_err() {
            tracing::debug!(target: "mediator_http::mediator", topic, "receiver dropped, event discarded");
        }
    }
}

/// Identifies one subscription on a `Bus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<P> = Arc<dyn Fn(&str, &P) + Send + Sync>;

/// In-process topic bus.
///
/// Handlers run synchronously on the publishing thread, in the order they
/// subscribed. The handler list is copied before dispatch, so a handler may
/// subscribe or unsubscribe without deadlocking; such changes apply from the
/// next publish on.
pub struct Bus<P> {
    topics: RwLock<HashMap<String, Vec<(SubscriptionId, Handler<P>)>>>,
    next_id: AtomicU64,
}

impl<P> Default for Bus<P> {
    fn default() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<P> fmt::Debug for Bus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self.topics.read();
        f.debug_struct("Bus")
            .field("topics", &topics.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<P> Bus<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`. The handler receives the topic name
    /// and a reference to each published payload.
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &P) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.topics
            .write()
            .entry(topic.into())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut topics = self.topics.write();
        let mut removed = false;
        topics.retain(|_, handlers| {
            let before = handlers.len();
            handlers.retain(|(existing, _)| *existing != id);
            removed |= handlers.len() != before;
            !handlers.is_empty()
        });
        removed
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }
}

impl<P> Mediator<P> for Bus<P> {
    fn publish(&self, topic: &str, payload: P) {
        let handlers: Vec<Handler<P>> = match self.topics.read().get(topic) {
            Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => {
                tracing::trace!(target: "mediator_http::mediator", topic, "no subscribers");
                return;
            }
        };
        for handler in handlers {
            handler(topic, &payload);
        }
    }
}
