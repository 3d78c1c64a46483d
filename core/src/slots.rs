//! Availability over the daily booking grid.
//!
//! The grid is a fixed row of equal cells (09:00 to 18:00 in 30-minute
//! steps by default). A requested duration occupies `ceil(duration /
//! cell)` consecutive cells; a start cell is offered when that whole run
//! fits inside the grid and, for a concrete resource, touches no cell
//! covered by a non-cancelled booking of that resource on that date.
//!
//! Everything here is pure and deterministic: callers project ledger
//! records into [`BookingWindow`]s and get back the offerable
//! [`TimeSlot`]s in grid order.

use chrono::{Duration, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::appointment::{Appointment, AppointmentStatus};
use crate::ids::ResourceId;

/// Slot calculation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    /// The requested duration was zero.
    #[error("requested duration must be positive")]
    InvalidDuration,
    /// The grid bounds cannot produce any cell.
    #[error("grid bounds {open_minute}..{close_minute} with {slot_minutes}-minute cells are unusable")]
    InvalidGrid {
        /// Minute of day the grid opens.
        open_minute: u32,
        /// Minute of day the grid closes.
        close_minute: u32,
        /// Cell width in minutes.
        slot_minutes: u32,
    },
}

impl SlotError {
    /// Canonical code for this failure.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidDuration => "INVALID_DURATION",
            Self::InvalidGrid { .. } => "INVALID_GRID",
        }
    }
}

/// The daily booking grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGrid {
    open_minute: u32,
    close_minute: u32,
    slot_minutes: u32,
}

impl SlotGrid {
    /// The standard salon day: 09:00 to 18:00 in 30-minute cells.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            open_minute: 9 * 60,
            close_minute: 18 * 60,
            slot_minutes: 30,
        }
    }

    /// Builds a grid from minute-of-day bounds and a cell width.
    ///
    /// # Errors
    ///
    /// [`SlotError::InvalidGrid`] when the cell width is zero, the bounds
    /// are inverted, or no whole cell fits between them.
    pub const fn new(
        open_minute: u32,
        close_minute: u32,
        slot_minutes: u32,
    ) -> Result<Self, SlotError> {
        if slot_minutes == 0
            || open_minute >= close_minute
            || close_minute - open_minute < slot_minutes
        {
            return Err(SlotError::InvalidGrid {
                open_minute,
                close_minute,
                slot_minutes,
            });
        }
        Ok(Self {
            open_minute,
            close_minute,
            slot_minutes,
        })
    }

    /// Number of whole cells in the day.
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        ((self.close_minute - self.open_minute) / self.slot_minutes) as usize
    }

    /// Cell width in minutes.
    #[must_use]
    pub const fn slot_minutes(&self) -> u32 {
        self.slot_minutes
    }

    /// Minute of day at which cell `index` starts.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn minute_of(&self, index: usize) -> u32 {
        self.open_minute + self.slot_minutes * index as u32
    }

    /// Cells a duration occupies, rounded up to whole cells.
    const fn cells_needed(&self, duration_minutes: u32) -> usize {
        duration_minutes.div_ceil(self.slot_minutes) as usize
    }

    /// Whether cell `index` overlaps the half-open minute span.
    const fn cell_overlaps(&self, index: usize, start_minute: u32, end_minute: u32) -> bool {
        let cell_start = self.minute_of(index);
        let cell_end = cell_start + self.slot_minutes;
        cell_start < end_minute && start_minute < cell_end
    }
}

/// Whose calendar availability is computed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotTarget {
    /// No resource chosen yet: only grid capacity constrains the answer.
    Unassigned,
    /// A concrete resource whose bookings block cells.
    Resource(ResourceId),
}

/// A ledger record projected onto one salon-local day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingWindow {
    /// Resource the booking occupies, if assigned.
    pub resource: Option<ResourceId>,
    /// Salon-local day of the booking.
    pub date: NaiveDate,
    /// Salon-local minute of day the booking starts.
    pub start_minute: u32,
    /// Minutes the booking runs for.
    pub duration_minutes: u32,
    /// Cancelled bookings never block cells.
    pub cancelled: bool,
}

impl BookingWindow {
    /// Projects an appointment onto the salon's wall clock.
    #[must_use]
    pub fn from_appointment(appointment: &Appointment, utc_offset_minutes: i32) -> Self {
        let local = appointment.scheduled_at + Duration::minutes(i64::from(utc_offset_minutes));
        Self {
            resource: appointment.resource.clone(),
            date: local.date_naive(),
            start_minute: local.time().hour() * 60 + local.time().minute(),
            duration_minutes: appointment.duration_minutes(),
            cancelled: appointment.status == AppointmentStatus::Cancelled,
        }
    }

    fn blocks(&self, date: NaiveDate, resource: &ResourceId) -> bool {
        !self.cancelled
            && self.date == date
            && self.duration_minutes > 0
            && self.resource.as_ref() == Some(resource)
    }
}

/// One offerable start position on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Ordinal position on the grid.
    pub index: usize,
    /// Minute of day the slot starts.
    pub start_minute: u32,
    /// 12-hour clock label, e.g. `"9:00 AM"`.
    pub label: String,
}

/// Formats a minute of day on the 12-hour clock.
#[must_use]
pub fn format_label(minute_of_day: u32) -> String {
    let hour24 = (minute_of_day / 60) % 24;
    let minute = minute_of_day % 60;
    let (hour12, meridiem) = match hour24 {
        0 => (12, "AM"),
        1..=11 => (hour24, "AM"),
        12 => (12, "PM"),
        _ => (hour24 - 12, "PM"),
    };
    format!("{hour12}:{minute:02} {meridiem}")
}

/// Computes the offerable start slots for a requested duration.
///
/// Bookings for other dates, other resources, or with cancelled status
/// never block a cell. With [`SlotTarget::Unassigned`] no booking blocks
/// anything and only grid capacity limits the answer. Results come back
/// in grid order without duplicates.
///
/// # Errors
///
/// [`SlotError::InvalidDuration`] when `requested_minutes` is zero.
pub fn available_slots(
    grid: &SlotGrid,
    date: NaiveDate,
    target: &SlotTarget,
    requested_minutes: u32,
    existing: &[BookingWindow],
) -> Result<Vec<TimeSlot>, SlotError> {
    if requested_minutes == 0 {
        return Err(SlotError::InvalidDuration);
    }

    let cell_count = grid.slot_count();
    let mut occupied = vec![false; cell_count];
    if let SlotTarget::Resource(resource) = target {
        for window in existing.iter().filter(|w| w.blocks(date, resource)) {
            let end_minute = window.start_minute.saturating_add(window.duration_minutes);
            for (index, cell) in occupied.iter_mut().enumerate() {
                if grid.cell_overlaps(index, window.start_minute, end_minute) {
                    *cell = true;
                }
            }
        }
    }

    let needed = grid.cells_needed(requested_minutes);
    let mut slots = Vec::new();
    for start in 0..cell_count {
        let Some(end) = start.checked_add(needed) else {
            break;
        };
        if end > cell_count {
            break;
        }
        if occupied[start..end].iter().any(|cell| *cell) {
            continue;
        }
        let start_minute = grid.minute_of(start);
        slots.push(TimeSlot {
            index: start,
            start_minute,
            label: format_label(start_minute),
        });
    }
    Ok(slots)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn window(resource: &str, start_minute: u32, duration_minutes: u32) -> BookingWindow {
        BookingWindow {
            resource: Some(ResourceId::new(resource)),
            date: day(),
            start_minute,
            duration_minutes,
            cancelled: false,
        }
    }

    fn starts(slots: &[TimeSlot]) -> Vec<u32> {
        slots.iter().map(|slot| slot.start_minute).collect()
    }

    #[test]
    fn zero_duration_is_rejected() {
        let result = available_slots(
            &SlotGrid::standard(),
            day(),
            &SlotTarget::Unassigned,
            0,
            &[],
        );
        assert_eq!(result, Err(SlotError::InvalidDuration));
        assert_eq!(SlotError::InvalidDuration.code(), "INVALID_DURATION");
    }

    #[test]
    fn empty_calendar_offers_every_fitting_start() {
        let grid = SlotGrid::standard();
        let slots = available_slots(
            &grid,
            day(),
            &SlotTarget::Resource(ResourceId::new("B1")),
            60,
            &[],
        )
        .unwrap();
        // 18 cells, a 60-minute request needs 2, so the last start is 17:00.
        assert_eq!(slots.len(), 17);
        assert_eq!(slots[0].label, "9:00 AM");
        assert_eq!(slots.last().unwrap().label, "5:00 PM");
    }

    #[test]
    fn sixty_minutes_around_a_half_hour_booking() {
        let grid = SlotGrid::standard();
        let existing = [window("B1", 10 * 60, 30)];
        let slots = available_slots(
            &grid,
            day(),
            &SlotTarget::Resource(ResourceId::new("B1")),
            60,
            &existing,
        )
        .unwrap();
        let minutes = starts(&slots);
        assert!(minutes.contains(&(9 * 60)), "9:00 start must be offered");
        assert!(
            minutes.contains(&(10 * 60 + 30)),
            "10:30 start must be offered"
        );
        assert!(
            !minutes.contains(&(9 * 60 + 30)),
            "9:30 start would overlap 10:00"
        );
        assert!(!minutes.contains(&(10 * 60)), "10:00 start is taken");
    }

    #[test]
    fn unassigned_requests_ignore_every_booking() {
        let grid = SlotGrid::standard();
        let existing = [window("B1", 9 * 60, 540)];
        let slots =
            available_slots(&grid, day(), &SlotTarget::Unassigned, 30, &existing).unwrap();
        assert_eq!(slots.len(), grid.slot_count());
    }

    #[test]
    fn other_dates_resources_and_cancellations_do_not_block() {
        let grid = SlotGrid::standard();
        let mut other_day = window("B1", 10 * 60, 60);
        other_day.date = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let other_resource = window("B2", 10 * 60, 60);
        let mut cancelled = window("B1", 10 * 60, 60);
        cancelled.cancelled = true;
        let unassigned = BookingWindow {
            resource: None,
            ..window("B1", 10 * 60, 60)
        };

        let slots = available_slots(
            &grid,
            day(),
            &SlotTarget::Resource(ResourceId::new("B1")),
            30,
            &[other_day, other_resource, cancelled, unassigned],
        )
        .unwrap();
        assert_eq!(slots.len(), grid.slot_count());
    }

    #[test]
    fn mid_cell_booking_blocks_every_cell_it_touches() {
        let grid = SlotGrid::standard();
        let existing = [window("B1", 10 * 60 + 15, 30)]; // 10:15..10:45
        let slots = available_slots(
            &grid,
            day(),
            &SlotTarget::Resource(ResourceId::new("B1")),
            30,
            &existing,
        )
        .unwrap();
        let minutes = starts(&slots);
        assert!(!minutes.contains(&(10 * 60)));
        assert!(!minutes.contains(&(10 * 60 + 30)));
        assert!(minutes.contains(&(11 * 60)));
    }

    #[test]
    fn odd_durations_round_up_to_whole_cells() {
        let grid = SlotGrid::standard();
        let existing = [window("B1", 10 * 60, 30)];
        let slots = available_slots(
            &grid,
            day(),
            &SlotTarget::Resource(ResourceId::new("B1")),
            45,
            &existing,
        )
        .unwrap();
        // 45 minutes occupies two cells, so 9:30 collides with 10:00.
        assert!(!starts(&slots).contains(&(9 * 60 + 30)));
        assert!(starts(&slots).contains(&(9 * 60)));
    }

    #[test]
    fn booking_window_projects_the_salon_wall_clock() {
        use crate::appointment::{Appointment, AppointmentStatus, PaymentStatus, ServiceItem};
        use crate::ids::AppointmentId;
        use crate::money::Money;
        use chrono::{TimeZone, Utc};

        let appointment = Appointment {
            id: AppointmentId::new("apt-1"),
            customer_name: "Dana".to_string(),
            customer_phone: None,
            resource: Some(ResourceId::new("B1")),
            services: vec![ServiceItem {
                id: None,
                name: None,
                duration_minutes: 60,
                price: Money::from_cents(4000),
                discount_price: None,
            }],
            scheduled_at: Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap(),
            status: AppointmentStatus::Booked,
            payment_status: PaymentStatus::Pending,
            total_amount: None,
            discount_amount: None,
            final_amount: None,
            tip: None,
        };

        let shifted = BookingWindow::from_appointment(&appointment, 90);
        assert_eq!(shifted.start_minute, 10 * 60);
        assert_eq!(shifted.date, day());
        assert!(!shifted.cancelled);
    }

    #[test]
    fn grid_construction_rejects_unusable_bounds() {
        assert!(SlotGrid::new(540, 1080, 30).is_ok());
        assert!(matches!(
            SlotGrid::new(540, 540, 30),
            Err(SlotError::InvalidGrid { .. })
        ));
        assert!(matches!(
            SlotGrid::new(540, 1080, 0),
            Err(SlotError::InvalidGrid { .. })
        ));
        assert!(matches!(
            SlotGrid::new(1080, 540, 30),
            Err(SlotError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn labels_cover_the_clock() {
        assert_eq!(format_label(0), "12:00 AM");
        assert_eq!(format_label(9 * 60), "9:00 AM");
        assert_eq!(format_label(12 * 60), "12:00 PM");
        assert_eq!(format_label(17 * 60 + 30), "5:30 PM");
    }
}
