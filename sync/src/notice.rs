//! Transient user-facing notifications.

use frontdesk_channel::ChannelHealth;
use frontdesk_core::{AppointmentId, ErrorKind, ViewId};
use serde::Serialize;
use std::fmt;

/// Which mutation a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    /// Create a new appointment.
    Book,
    /// Cancel a booked appointment.
    Cancel,
    /// Confirm an open payment.
    ConfirmPayment,
    /// Mark a session finished.
    CompleteSession,
}

impl CommandKind {
    /// Stable lowercase name, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Cancel => "cancel",
            Self::ConfirmPayment => "confirm-payment",
            Self::CompleteSession => "complete-session",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transient, user-facing notification.
///
/// Notices report what happened, never what the ledger should now say;
/// record truth arrives separately through events and refetches.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// The backend accepted a mutation.
    CommandAccepted {
        /// Which mutation ran.
        command: CommandKind,
        /// The record it targeted, when known.
        appointment: Option<AppointmentId>,
        /// Confirmation text from the backend, when any.
        message: Option<String>,
    },
    /// A mutation was rejected, locally or by the backend.
    CommandFailed {
        /// Which mutation failed.
        command: CommandKind,
        /// The record it targeted, when known.
        appointment: Option<AppointmentId>,
        /// Failure classification, driving the recovery hint.
        kind: ErrorKind,
        /// Human-readable cause.
        message: String,
    },
    /// The push feed's health changed.
    ConnectionChanged {
        /// The new health.
        health: ChannelHealth,
    },
    /// A view refetch failed; its last page stays on screen, marked stale.
    RefreshFailed {
        /// The view that could not refresh.
        view: ViewId,
        /// Failure classification.
        kind: ErrorKind,
        /// Human-readable cause.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_kind_names_are_stable() {
        assert_eq!(CommandKind::Book.as_str(), "book");
        assert_eq!(CommandKind::ConfirmPayment.to_string(), "confirm-payment");
    }
}
