//! Derived view identities and the event-to-views refresh table.
//!
//! Which event refreshes which view is data, not control flow scattered
//! over handlers: [`views_invalidated_by`] is the single table and is
//! testable without any I/O.

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::event::EventKind;

/// The derived views the engine maintains.
///
/// Views are not mutually exclusive; one record may appear in several.
/// Each is paginated and refreshed independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewId {
    /// Appointments scheduled for the salon-local current day.
    Today,
    /// Appointments whose settlement is still open.
    PendingPayments,
    /// The full, unfiltered appointment listing.
    AllAppointments,
    /// The aggregate counters panel.
    Statistics,
}

impl ViewId {
    /// Every view, in a stable order.
    pub const ALL: [Self; 4] = [
        Self::Today,
        Self::PendingPayments,
        Self::AllAppointments,
        Self::Statistics,
    ];

    /// Stable name used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::PendingPayments => "pending-payments",
            Self::AllAppointments => "all-appointments",
            Self::Statistics => "statistics",
        }
    }
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A view's position in its paginated listing.
///
/// The cursor belongs to the UI layer; background refreshes re-request
/// the page the cursor points at rather than resetting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    /// Zero-based page index.
    pub page: u32,
    /// Records per page.
    pub size: u32,
}

impl PageCursor {
    /// The first page at a given size.
    #[must_use]
    pub const fn first(size: u32) -> Self {
        Self { page: 0, size }
    }

    /// The same size, pointed at another page.
    #[must_use]
    pub const fn at(self, page: u32) -> Self {
        Self { page, ..self }
    }
}

/// Maps a lifecycle event to the views it makes stale.
///
/// `event_is_today` reports whether the event's record is scheduled on
/// the salon-local current day; only creations consult it, because a
/// creation for another day cannot change what today's list shows. Later
/// lifecycle changes always refresh the today view: the record may have
/// been moved onto or off today's list by the very change the event
/// reports.
#[must_use]
pub fn views_invalidated_by(kind: EventKind, event_is_today: bool) -> SmallVec<[ViewId; 4]> {
    match kind {
        EventKind::AppointmentCreated => {
            if event_is_today {
                smallvec![ViewId::AllAppointments, ViewId::Today, ViewId::Statistics]
            } else {
                smallvec![ViewId::AllAppointments, ViewId::Statistics]
            }
        }
        EventKind::AppointmentUpdated | EventKind::AppointmentCancelled => smallvec![
            ViewId::AllAppointments,
            ViewId::Today,
            ViewId::PendingPayments,
            ViewId::Statistics,
        ],
        EventKind::PaymentReceived | EventKind::PaymentConfirmed => smallvec![
            ViewId::PendingPayments,
            ViewId::AllAppointments,
            ViewId::Today,
            ViewId::Statistics,
        ],
        EventKind::SessionCompleted => smallvec![
            ViewId::Today,
            ViewId::AllAppointments,
            ViewId::Statistics,
        ],
    }
}
