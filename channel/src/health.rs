//! Connection state and health reporting.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    /// No connection and none being attempted.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The feed is open and lines are being consumed.
    Connected,
}

/// Operator-facing health, coarser than [`ChannelState`].
///
/// `Degraded` means the channel is still trying on its own; `Down` means
/// the attempt budget is spent and only [`reconnect_now`] (or a process
/// restart) will bring it back.
///
/// [`reconnect_now`]: crate::EventChannel::reconnect_now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChannelHealth {
    /// Connected and consuming.
    Healthy,
    /// Disconnected, retrying automatically.
    Degraded {
        /// Human-readable cause of the last disconnect.
        reason: String,
    },
    /// Retry budget exhausted; waiting for manual intervention.
    Down {
        /// Human-readable cause of the final failure.
        reason: String,
    },
}

impl ChannelHealth {
    /// True when the feed is live.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// True when automatic recovery has been abandoned.
    #[must_use]
    pub const fn is_down(&self) -> bool {
        matches!(self, Self::Down { .. })
    }
}
