//! Property tests for the slot calculator.
//!
//! The availability answer is checked against an independent cell-overlap
//! model rather than the calculator's own helpers, so the two can only
//! agree when the grid math is actually right.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::NaiveDate;
use frontdesk_core::slots::{available_slots, BookingWindow, SlotGrid, SlotTarget, TimeSlot};
use frontdesk_core::ResourceId;
use proptest::prelude::*;

const OPEN: u32 = 9 * 60;
const CLOSE: u32 = 18 * 60;
const CELL: u32 = 30;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

fn booking_strategy() -> impl Strategy<Value = BookingWindow> {
    let resource = prop_oneof![
        Just(Some(ResourceId::new("B1"))),
        Just(Some(ResourceId::new("B2"))),
        Just(None),
    ];
    let date = prop_oneof![
        Just(day()),
        Just(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()),
    ];
    (resource, date, 8 * 60..19 * 60_u32, 15..=180_u32, any::<bool>()).prop_map(
        |(resource, date, start_minute, duration_minutes, cancelled)| BookingWindow {
            resource,
            date,
            start_minute,
            duration_minutes,
            cancelled,
        },
    )
}

fn calendar_strategy() -> impl Strategy<Value = Vec<BookingWindow>> {
    prop::collection::vec(booking_strategy(), 0..8)
}

/// Cell span a booking blocks: whole cells, snapped outward to boundaries.
fn blocked_span(window: &BookingWindow) -> Option<(u32, u32)> {
    let start = window.start_minute.max(OPEN);
    let end = (window.start_minute + window.duration_minutes).min(CLOSE);
    if start >= end {
        return None;
    }
    let snapped_start = OPEN + ((start - OPEN) / CELL) * CELL;
    let snapped_end = OPEN + (end - OPEN).div_ceil(CELL) * CELL;
    Some((snapped_start, snapped_end))
}

fn blocks_target(window: &BookingWindow, resource: &ResourceId) -> bool {
    !window.cancelled
        && window.date == day()
        && window.duration_minutes > 0
        && window.resource.as_ref() == Some(resource)
}

fn slot_starts(slots: &[TimeSlot]) -> Vec<u32> {
    slots.iter().map(|slot| slot.start_minute).collect()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn offered_slots_stay_inside_the_grid(
        calendar in calendar_strategy(),
        duration in 1..=300_u32,
    ) {
        let grid = SlotGrid::standard();
        let target = SlotTarget::Resource(ResourceId::new("B1"));
        let slots = available_slots(&grid, day(), &target, duration, &calendar).unwrap();
        let cells = duration.div_ceil(CELL);
        for slot in &slots {
            prop_assert!(slot.start_minute >= OPEN);
            prop_assert!(slot.start_minute + cells * CELL <= CLOSE);
        }
    }

    #[test]
    fn offered_slots_never_touch_a_blocked_cell(
        calendar in calendar_strategy(),
        duration in 1..=180_u32,
    ) {
        let grid = SlotGrid::standard();
        let resource = ResourceId::new("B1");
        let target = SlotTarget::Resource(resource.clone());
        let slots = available_slots(&grid, day(), &target, duration, &calendar).unwrap();
        let cells = duration.div_ceil(CELL);
        for slot in &slots {
            let slot_end = slot.start_minute + cells * CELL;
            for window in calendar.iter().filter(|w| blocks_target(w, &resource)) {
                if let Some((blocked_start, blocked_end)) = blocked_span(window) {
                    prop_assert!(
                        slot_end <= blocked_start || blocked_end <= slot.start_minute,
                        "slot {} overlaps booking at {}..{}",
                        slot.label,
                        blocked_start,
                        blocked_end,
                    );
                }
            }
        }
    }

    #[test]
    fn longer_requests_offer_a_subset_of_shorter_ones(
        calendar in calendar_strategy(),
        shorter in 1..=120_u32,
        extra in 0..=120_u32,
    ) {
        let grid = SlotGrid::standard();
        let target = SlotTarget::Resource(ResourceId::new("B1"));
        let short_starts =
            slot_starts(&available_slots(&grid, day(), &target, shorter, &calendar).unwrap());
        let long_starts = slot_starts(
            &available_slots(&grid, day(), &target, shorter + extra, &calendar).unwrap(),
        );
        for start in &long_starts {
            prop_assert!(
                short_starts.contains(start),
                "start {start} offered for the longer request only",
            );
        }
    }

    #[test]
    fn results_come_back_in_grid_order_without_duplicates(
        calendar in calendar_strategy(),
        duration in 1..=180_u32,
    ) {
        let grid = SlotGrid::standard();
        let target = SlotTarget::Resource(ResourceId::new("B1"));
        let slots = available_slots(&grid, day(), &target, duration, &calendar).unwrap();
        for pair in slots.windows(2) {
            prop_assert!(pair[0].index < pair[1].index);
        }
    }

    #[test]
    fn unassigned_answers_depend_only_on_the_duration(
        calendar in calendar_strategy(),
        duration in 1..=540_u32,
    ) {
        let grid = SlotGrid::standard();
        let with_calendar =
            available_slots(&grid, day(), &SlotTarget::Unassigned, duration, &calendar).unwrap();
        let without =
            available_slots(&grid, day(), &SlotTarget::Unassigned, duration, &[]).unwrap();
        prop_assert_eq!(with_calendar, without);
    }
}
