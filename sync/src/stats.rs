//! Aggregate dashboard counters.

use chrono::NaiveDate;
use frontdesk_core::{Appointment, AppointmentStatus, Money, PaymentStatus};
use serde::Serialize;
use std::collections::HashSet;

/// Dashboard-wide counters computed from the full appointment set.
///
/// These numbers come from the statistics sweep (every page of the
/// unfiltered listing), never from a single page, so they are correct
/// regardless of how the list views are paginated.
///
/// Two pending-payment figures are kept deliberately distinct:
/// [`pending_payments`](Self::pending_payments) counts every record whose
/// settlement is open (the pending-payments list view's definition),
/// while [`actual_pending_payments`](Self::actual_pending_payments)
/// counts only finished sessions still awaiting money, which is the
/// number the front desk chases at closing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateStatistics {
    /// Every appointment the backend knows about.
    pub total_appointments: u64,
    /// Distinct customers, keyed by phone where present, name otherwise.
    pub unique_customers: u64,
    /// Appointments on the salon-local current day, cancellations excluded.
    pub today_count: u64,
    /// Records with settlement still open, regardless of lifecycle status.
    pub pending_payments: u64,
    /// Completed sessions still awaiting payment.
    pub actual_pending_payments: u64,
    /// Takings settled for appointments on the current day.
    pub daily_income: Money,
    /// The salon-local day the counters describe.
    pub computed_for: NaiveDate,
}

impl AggregateStatistics {
    /// Folds the full record set into dashboard counters.
    #[must_use]
    pub fn compute(records: &[Appointment], today: NaiveDate, utc_offset_minutes: i32) -> Self {
        let mut customers: HashSet<String> = HashSet::new();
        let mut today_count = 0;
        let mut pending_payments = 0;
        let mut actual_pending_payments = 0;
        let mut daily_income = Money::from_cents(0);

        for record in records {
            customers.insert(customer_key(record));

            let is_today = record.scheduled_date(utc_offset_minutes) == today;
            if is_today && record.status != AppointmentStatus::Cancelled {
                today_count += 1;
            }
            if record.payment_status == PaymentStatus::Pending {
                pending_payments += 1;
                if record.status == AppointmentStatus::Completed {
                    actual_pending_payments += 1;
                }
            }
            if is_today && record.payment_status == PaymentStatus::Completed {
                if let Some(due) = record.amount_due() {
                    daily_income = daily_income.checked_add(due).unwrap_or(daily_income);
                }
            }
        }

        Self {
            total_appointments: records.len() as u64,
            unique_customers: customers.len() as u64,
            today_count,
            pending_payments,
            actual_pending_payments,
            daily_income,
            computed_for: today,
        }
    }
}

/// Stable customer identity: phone where present, display name otherwise.
fn customer_key(record: &Appointment) -> String {
    record
        .customer_phone
        .as_deref()
        .map(str::trim)
        .filter(|phone| !phone.is_empty())
        .map_or_else(
            || record.customer_name.trim().to_string(),
            ToString::to_string,
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use frontdesk_core::AppointmentId;

    fn record(
        id: &str,
        name: &str,
        phone: Option<&str>,
        day: u32,
        status: AppointmentStatus,
        payment: PaymentStatus,
        final_cents: Option<u64>,
    ) -> Appointment {
        Appointment {
            id: AppointmentId::new(id),
            customer_name: name.to_string(),
            customer_phone: phone.map(ToString::to_string),
            resource: None,
            services: Vec::new(),
            scheduled_at: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
            status,
            payment_status: payment,
            total_amount: None,
            discount_amount: None,
            final_amount: final_cents.map(Money::from_cents),
            tip: None,
        }
    }

    fn fixture() -> Vec<Appointment> {
        vec![
            // Today, paid: counts toward today and income.
            record(
                "apt-1",
                "Dana",
                Some("050-111"),
                10,
                AppointmentStatus::Paid,
                PaymentStatus::Completed,
                Some(4550),
            ),
            // Today, completed but unpaid: pending in both senses.
            record(
                "apt-2",
                "Noa",
                Some("050-222"),
                10,
                AppointmentStatus::Completed,
                PaymentStatus::Pending,
                Some(3000),
            ),
            // Today, cancelled: excluded from today_count, settlement still open.
            record(
                "apt-3",
                "Dana",
                Some("050-111"),
                10,
                AppointmentStatus::Cancelled,
                PaymentStatus::Pending,
                None,
            ),
            // Another day, booked: counts only toward totals.
            record(
                "apt-4",
                "Omer",
                None,
                12,
                AppointmentStatus::Booked,
                PaymentStatus::Pending,
                None,
            ),
            // Another day, settled: no income contribution today.
            record(
                "apt-5",
                "Omer",
                None,
                9,
                AppointmentStatus::Paid,
                PaymentStatus::Completed,
                Some(9900),
            ),
        ]
    }

    #[test]
    fn counters_bucket_the_full_record_set() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let stats = AggregateStatistics::compute(&fixture(), today, 0);

        assert_eq!(stats.total_appointments, 5);
        // Dana appears twice under one phone; the two Omers share a name.
        assert_eq!(stats.unique_customers, 3);
        assert_eq!(stats.today_count, 2);
        assert_eq!(stats.pending_payments, 3);
        assert_eq!(stats.actual_pending_payments, 1);
        assert_eq!(stats.daily_income, Money::from_cents(4550));
        assert_eq!(stats.computed_for, today);
    }

    #[test]
    fn actual_pending_is_independent_of_record_order() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let mut reversed = fixture();
        reversed.reverse();

        let forward = AggregateStatistics::compute(&fixture(), today, 0);
        let backward = AggregateStatistics::compute(&reversed, today, 0);
        assert_eq!(forward, backward);
    }

    #[test]
    fn utc_offset_shifts_the_local_day() {
        // 10:00 UTC on the 10th is already the 11th at +15 hours.
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let records = vec![record(
            "apt-1",
            "Dana",
            None,
            10,
            AppointmentStatus::Booked,
            PaymentStatus::Pending,
            None,
        )];
        let stats = AggregateStatistics::compute(&records, today, 15 * 60);
        assert_eq!(stats.today_count, 1);
    }

    #[test]
    fn blank_phone_falls_back_to_the_name() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let records = vec![
            record(
                "apt-1",
                "Dana",
                Some("  "),
                10,
                AppointmentStatus::Booked,
                PaymentStatus::Pending,
                None,
            ),
            record(
                "apt-2",
                "Dana",
                None,
                10,
                AppointmentStatus::Booked,
                PaymentStatus::Pending,
                None,
            ),
        ];
        let stats = AggregateStatistics::compute(&records, today, 0);
        assert_eq!(stats.unique_customers, 1);
    }
}
