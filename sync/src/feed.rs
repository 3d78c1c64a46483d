//! The seam between the engine and its notification source.
//!
//! Production hands the engine an [`EventChannel`]; tests hand it a
//! scripted double that emits events and health transitions on cue.
//! The engine only ever consumes the receivers, so the two are
//! interchangeable.

use frontdesk_channel::{ChannelHealth, EventChannel};
use frontdesk_core::LedgerEvent;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::{broadcast, watch};

/// Source of lifecycle notifications and connection health.
pub trait EventFeed: Send + Sync + 'static {
    /// A fresh subscription to the normalized event stream.
    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent>;

    /// A watch over connection health.
    fn watch_health(&self) -> watch::Receiver<ChannelHealth>;

    /// Current health snapshot.
    fn health(&self) -> ChannelHealth;

    /// Asks a downed feed to try connecting again right away.
    fn reconnect_now(&self);

    /// Stops the feed and waits for its work to finish.
    fn shutdown(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

impl EventFeed for EventChannel {
    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        EventChannel::subscribe(self)
    }

    fn watch_health(&self) -> watch::Receiver<ChannelHealth> {
        EventChannel::watch_health(self)
    }

    fn health(&self) -> ChannelHealth {
        EventChannel::health(self)
    }

    fn reconnect_now(&self) {
        EventChannel::reconnect_now(self);
    }

    fn shutdown(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(EventChannel::shutdown(*self))
    }
}
