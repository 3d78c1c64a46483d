//! Appointment fixtures.
//!
//! The builder defaults line up with [`test_clock`]: a fresh fixture is
//! booked for 2024-03-10 at 10:00 UTC, which that clock considers today.
//!
//! [`test_clock`]: crate::test_clock

#![allow(clippy::unwrap_used)] // Fixture values are hardcoded and always valid
#![allow(clippy::missing_panics_doc)]

use chrono::{NaiveDate, TimeZone, Utc};
use frontdesk_client::{Actor, ActorRole};
use frontdesk_core::{
    Appointment, AppointmentId, AppointmentStatus, DateTime, Money, PaymentStatus, ResourceId,
    ServiceItem,
};

/// Starts a builder for an appointment with the given id.
#[must_use]
pub fn appointment(id: impl Into<String>) -> AppointmentBuilder {
    AppointmentBuilder {
        record: Appointment {
            id: AppointmentId::new(id),
            customer_name: "Dana Levi".to_string(),
            customer_phone: None,
            resource: None,
            services: vec![ServiceItem {
                id: None,
                name: Some("Cut".to_string()),
                duration_minutes: 30,
                price: Money::from_cents(3000),
                discount_price: None,
            }],
            scheduled_at: instant(2024, 3, 10, 10, 0),
            status: AppointmentStatus::Booked,
            payment_status: PaymentStatus::Pending,
            total_amount: None,
            discount_amount: None,
            final_amount: None,
            tip: None,
        },
    }
}

/// A unique id for records whose identity does not matter to the test.
#[must_use]
pub fn fresh_id() -> AppointmentId {
    AppointmentId::new(uuid::Uuid::new_v4().to_string())
}

/// The default test operator.
#[must_use]
pub fn receptionist() -> Actor {
    Actor::new("Test Desk", ActorRole::Receptionist)
}

/// A calendar day.
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A UTC instant.
#[must_use]
pub fn instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

/// Fluent construction of [`Appointment`] records.
#[derive(Debug, Clone)]
pub struct AppointmentBuilder {
    record: Appointment,
}

impl AppointmentBuilder {
    /// Sets the customer name.
    #[must_use]
    pub fn customer(mut self, name: impl Into<String>) -> Self {
        self.record.customer_name = name.into();
        self
    }

    /// Sets the customer phone.
    #[must_use]
    pub fn phone(mut self, number: impl Into<String>) -> Self {
        self.record.customer_phone = Some(number.into());
        self
    }

    /// Schedules the appointment at a UTC wall-clock position.
    #[must_use]
    pub fn on(self, year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        self.at(instant(year, month, day, hour, minute))
    }

    /// Schedules the appointment at an instant.
    #[must_use]
    pub fn at(mut self, when: DateTime<Utc>) -> Self {
        self.record.scheduled_at = when;
        self
    }

    /// Sets the lifecycle status.
    #[must_use]
    pub fn status(mut self, status: AppointmentStatus) -> Self {
        self.record.status = status;
        self
    }

    /// Sets the settlement status.
    #[must_use]
    pub fn payment(mut self, payment: PaymentStatus) -> Self {
        self.record.payment_status = payment;
        self
    }

    /// Assigns a resource.
    #[must_use]
    pub fn resource(mut self, id: impl Into<String>) -> Self {
        self.record.resource = Some(ResourceId::new(id));
        self
    }

    /// Replaces the service lines with a single line.
    #[must_use]
    pub fn service(mut self, minutes: u32, cents: u64) -> Self {
        self.record.services = vec![ServiceItem {
            id: None,
            name: None,
            duration_minutes: minutes,
            price: Money::from_cents(cents),
            discount_price: None,
        }];
        self
    }

    /// Appends a service line.
    #[must_use]
    pub fn add_service(mut self, minutes: u32, cents: u64) -> Self {
        self.record.services.push(ServiceItem {
            id: None,
            name: None,
            duration_minutes: minutes,
            price: Money::from_cents(cents),
            discount_price: None,
        });
        self
    }

    /// Sets the collaborator-reported amount owed.
    #[must_use]
    pub fn amount_due(mut self, cents: u64) -> Self {
        self.record.final_amount = Some(Money::from_cents(cents));
        self
    }

    /// Finishes the record.
    #[must_use]
    pub fn build(self) -> Appointment {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_booked_today_with_an_open_settlement() {
        let record = appointment("apt-1").build();
        assert_eq!(record.status, AppointmentStatus::Booked);
        assert_eq!(record.payment_status, PaymentStatus::Pending);
        assert_eq!(record.scheduled_date(0), date(2024, 3, 10));
        assert_eq!(record.duration_minutes(), 30);
    }

    #[test]
    fn builder_overrides_compose() {
        let record = appointment("apt-2")
            .customer("Omer")
            .phone("555-0101")
            .on(2024, 3, 11, 14, 30)
            .status(AppointmentStatus::Completed)
            .payment(PaymentStatus::Completed)
            .resource("B2")
            .service(60, 5500)
            .amount_due(5000)
            .build();
        assert_eq!(record.customer_phone.as_deref(), Some("555-0101"));
        assert_eq!(record.scheduled_date(0), date(2024, 3, 11));
        assert_eq!(record.amount_due(), Some(Money::from_cents(5000)));
        assert_eq!(record.duration_minutes(), 60);
    }
}
