//! State synchronization between the backend and the front desk UI.
//!
//! The engine keeps one authoritative record cache (the ledger) and a
//! set of derived list views over it, and holds both in step with the
//! backend using the event channel as a change signal. Events carry no
//! record data. Every byte in the ledger was fetched from the backend,
//! so a missed or malformed event can delay an update but never corrupt
//! state.
//!
//! A single reconciler task owns all mutable sync state. UI code holds a
//! [`SyncHandle`]: reads come from a cheap snapshot watch, view commands
//! and mutations go through channels, and outcomes come back as
//! [`Notice`] values rather than return-path state edits.
//!
//! ```no_run
//! use frontdesk_channel::{ChannelConfig, EventChannel};
//! use frontdesk_client::{Actor, ActorRole, BackendClient};
//! use frontdesk_core::{SalonId, ViewId};
//! use frontdesk_sync::SyncEngine;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let salon = SalonId::from("salon-1");
//! let backend = BackendClient::new("https://backend.example", salon.clone());
//! let channel = EventChannel::spawn(ChannelConfig::new(
//!     "https://backend.example/feed",
//!     salon,
//! ));
//! let engine = SyncEngine::new(
//!     Arc::new(backend),
//!     channel,
//!     Actor::new("reception-1", ActorRole::Receptionist),
//! );
//! let handle = engine.spawn();
//!
//! handle.open_view(ViewId::Today).await?;
//! let mut watch = handle.watch();
//! watch.changed().await?;
//! let snapshot = watch.borrow().clone();
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod notice;
mod reconcile;
pub mod stats;
pub mod views;

pub use commands::CommandError;
pub use config::{Config, ConfigError};
pub use engine::{EngineOptions, SyncEngine, SyncHandle};
pub use error::SyncError;
pub use feed::EventFeed;
pub use ledger::AppointmentLedger;
pub use notice::{CommandKind, Notice};
pub use stats::AggregateStatistics;
pub use views::{SyncSnapshot, ViewPage};
