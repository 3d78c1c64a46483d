//! Lifecycle events pushed by the collaborator.
//!
//! Events are notifications, not state: the ledger is only ever updated
//! from refetched records, so an event carries just enough to decide
//! which views to refresh and which record to fetch.

use chrono::{DateTime, Utc};

use crate::ids::AppointmentId;

/// The event vocabulary the channel understands.
///
/// Unknown wire values are not errors; they are logged and dropped by the
/// channel so the vocabulary can grow server-side first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A new appointment entered the ledger.
    AppointmentCreated,
    /// An existing appointment changed.
    AppointmentUpdated,
    /// An appointment was called off.
    AppointmentCancelled,
    /// A payment arrived and awaits confirmation.
    PaymentReceived,
    /// A payment was confirmed by the front desk.
    PaymentConfirmed,
    /// A session finished.
    SessionCompleted,
}

impl EventKind {
    /// Every kind, in a stable order.
    pub const ALL: [Self; 6] = [
        Self::AppointmentCreated,
        Self::AppointmentUpdated,
        Self::AppointmentCancelled,
        Self::PaymentReceived,
        Self::PaymentConfirmed,
        Self::SessionCompleted,
    ];

    /// Canonical wire name.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::AppointmentCreated => "APPOINTMENT_CREATED",
            Self::AppointmentUpdated => "APPOINTMENT_UPDATED",
            Self::AppointmentCancelled => "APPOINTMENT_CANCELLED",
            Self::PaymentReceived => "PAYMENT_RECEIVED",
            Self::PaymentConfirmed => "PAYMENT_CONFIRMED",
            Self::SessionCompleted => "SESSION_COMPLETED",
        }
    }

    /// Parses a wire name, tolerating case and surrounding whitespace.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "APPOINTMENT_CREATED" => Some(Self::AppointmentCreated),
            "APPOINTMENT_UPDATED" => Some(Self::AppointmentUpdated),
            "APPOINTMENT_CANCELLED" | "APPOINTMENT_CANCELED" => Some(Self::AppointmentCancelled),
            "PAYMENT_RECEIVED" => Some(Self::PaymentReceived),
            "PAYMENT_CONFIRMED" => Some(Self::PaymentConfirmed),
            "SESSION_COMPLETED" => Some(Self::SessionCompleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// A normalized lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEvent {
    /// What happened.
    pub kind: EventKind,
    /// Which record it happened to, when the payload identified one.
    ///
    /// An event without an id still refreshes views; it just cannot drive
    /// a targeted record fetch.
    pub appointment_id: Option<AppointmentId>,
    /// The record's scheduled start, when the payload carried one.
    /// Decides whether the today view is affected by a creation.
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl LedgerEvent {
    /// Builds an event with just a kind and record id.
    #[must_use]
    pub const fn new(kind: EventKind, appointment_id: Option<AppointmentId>) -> Self {
        Self {
            kind,
            appointment_id,
            scheduled_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire(kind.wire_name()), Some(kind));
        }
    }

    #[test]
    fn parsing_tolerates_case_whitespace_and_spelling() {
        assert_eq!(
            EventKind::from_wire(" payment_confirmed "),
            Some(EventKind::PaymentConfirmed)
        );
        assert_eq!(
            EventKind::from_wire("APPOINTMENT_CANCELED"),
            Some(EventKind::AppointmentCancelled)
        );
        assert_eq!(EventKind::from_wire("TOTALLY_NEW_THING"), None);
    }
}
