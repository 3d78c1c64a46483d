//! # Frontdesk Core
//!
//! Domain model and pure logic for the Frontdesk synchronization engine.
//!
//! This crate holds everything that can be computed without I/O: the
//! appointment records and their lifecycle machine, the slot calculator,
//! the lifecycle-event vocabulary, the derived-view identities with the
//! event-to-views refresh table, and the shared failure taxonomy.
//!
//! ## Core Concepts
//!
//! - **Appointment**: the ledger record, never deleted, moved only along
//!   its status machine
//! - **Slot**: a fixed-width cell of the daily booking grid
//! - **LedgerEvent**: a pushed notification that something changed; it
//!   names a record, it never carries authoritative state
//! - **ViewId**: one of the independently refreshed derived views
//! - **ErrorKind**: the classification every failure collapses into
//!
//! ## Example
//!
//! ```
//! use frontdesk_core::slots::{available_slots, SlotGrid, SlotTarget};
//! use chrono::NaiveDate;
//!
//! let grid = SlotGrid::standard();
//! let date = NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date");
//! let slots = available_slots(&grid, date, &SlotTarget::Unassigned, 60, &[])
//!     .expect("duration is positive");
//! assert_eq!(slots.first().map(|s| s.label.as_str()), Some("9:00 AM"));
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use smallvec::SmallVec;

pub mod appointment;
pub mod clock;
pub mod error;
pub mod event;
pub mod ids;
pub mod money;
pub mod slots;
pub mod view;

pub use appointment::{
    Appointment, AppointmentStatus, PaymentStatus, ServiceItem, TransitionError,
    validate_transition,
};
pub use clock::{Clock, SystemClock, local_date};
pub use error::ErrorKind;
pub use event::{EventKind, LedgerEvent};
pub use ids::{AppointmentId, BranchId, ResourceId, SalonId};
pub use money::{Money, MoneyError};
pub use slots::{
    BookingWindow, SlotError, SlotGrid, SlotTarget, TimeSlot, available_slots, format_label,
};
pub use view::{PageCursor, ViewId, views_invalidated_by};
