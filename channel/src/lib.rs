//! # Frontdesk Channel
//!
//! Real-time event delivery from the salon backend's push feed.
//!
//! The feed is newline-delimited JSON, sometimes wrapped in SSE `data:`
//! framing, carrying appointment lifecycle notifications and keep-alive
//! heartbeats. This crate owns the connection: it supervises reconnects
//! with jittered backoff, recycles connections that go silent, and hands
//! decoded [`LedgerEvent`](frontdesk_core::LedgerEvent)s to subscribers
//! over a broadcast channel.
//!
//! Events are notifications, not state. Subscribers treat each one as a
//! hint to refetch from the backend, so a dropped malformed frame or a
//! missed broadcast costs freshness, never correctness.
//!
//! ## Example
//!
//! ```no_run
//! use frontdesk_channel::{ChannelConfig, EventChannel};
//! use frontdesk_core::SalonId;
//!
//! # async fn run() {
//! let config = ChannelConfig::new("https://api.example.com/events", SalonId::new("salon-1"));
//! let channel = EventChannel::spawn(config);
//! let mut events = channel.subscribe();
//! while let Ok(event) = events.recv().await {
//!     println!("{}: {:?}", event.kind, event.appointment_id);
//! }
//! # }
//! ```

pub mod backoff;
pub mod channel;
pub mod health;
pub mod wire;

pub use backoff::ReconnectPolicy;
pub use channel::{ChannelConfig, EventChannel};
pub use health::{ChannelHealth, ChannelState};
pub use wire::{decode_frame, Frame, WireError, HEARTBEAT_SENTINELS};
