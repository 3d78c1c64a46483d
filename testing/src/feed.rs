//! Scripted notification source.
//!
//! [`ScriptedFeed`] implements the engine's [`EventFeed`] seam without
//! any network. Tests emit events and flip health on cue, which makes
//! interleavings reproducible that a live channel would only produce by
//! luck.

use frontdesk_channel::ChannelHealth;
use frontdesk_core::{AppointmentId, DateTime, EventKind, LedgerEvent, Utc};
use frontdesk_sync::EventFeed;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

const EVENT_BUFFER: usize = 64;

/// A feed driven entirely by the test.
#[derive(Clone)]
pub struct ScriptedFeed {
    events: broadcast::Sender<LedgerEvent>,
    health: Arc<watch::Sender<ChannelHealth>>,
    reconnects: Arc<AtomicUsize>,
}

impl ScriptedFeed {
    /// A feed that reports healthy from the start.
    #[must_use]
    pub fn healthy() -> Self {
        Self::with_health(ChannelHealth::Healthy)
    }

    /// A feed with a chosen starting health.
    #[must_use]
    pub fn with_health(health: ChannelHealth) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (health_tx, _) = watch::channel(health);
        Self {
            events,
            health: Arc::new(health_tx),
            reconnects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delivers an event to every subscriber.
    pub fn emit(&self, event: LedgerEvent) {
        let _ = self.events.send(event);
    }

    /// Shorthand for emitting a kind plus record id.
    pub fn emit_for(&self, kind: EventKind, id: &AppointmentId) {
        self.emit(LedgerEvent::new(kind, Some(id.clone())));
    }

    /// Shorthand for emitting a kind, record id, and scheduled instant.
    pub fn emit_scheduled(&self, kind: EventKind, id: &AppointmentId, at: DateTime<Utc>) {
        self.emit(LedgerEvent {
            kind,
            appointment_id: Some(id.clone()),
            scheduled_at: Some(at),
        });
    }

    /// Publishes a health transition.
    pub fn set_health(&self, health: ChannelHealth) {
        let _ = self.health.send(health);
    }

    /// How many manual reconnects the engine has asked for.
    #[must_use]
    pub fn reconnect_requests(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }
}

impl EventFeed for ScriptedFeed {
    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    fn watch_health(&self) -> watch::Receiver<ChannelHealth> {
        self.health.subscribe()
    }

    fn health(&self) -> ChannelHealth {
        self.health.borrow().clone()
    }

    fn reconnect_now(&self) {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitted_events_reach_subscribers_in_order() {
        let feed = ScriptedFeed::healthy();
        let mut events = EventFeed::subscribe(&feed);

        feed.emit_for(EventKind::AppointmentCreated, &AppointmentId::new("apt-1"));
        feed.emit_for(EventKind::AppointmentCancelled, &AppointmentId::new("apt-1"));

        assert_eq!(
            events.recv().await.unwrap().kind,
            EventKind::AppointmentCreated
        );
        assert_eq!(
            events.recv().await.unwrap().kind,
            EventKind::AppointmentCancelled
        );
    }

    #[test]
    fn health_transitions_are_observable() {
        let feed = ScriptedFeed::healthy();
        assert!(EventFeed::health(&feed).is_healthy());

        feed.set_health(ChannelHealth::Down {
            reason: "scripted".to_string(),
        });
        assert!(EventFeed::health(&feed).is_down());
    }
}
