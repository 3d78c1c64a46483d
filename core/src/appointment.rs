//! Appointment records and their lifecycle state machine.
//!
//! An appointment is never deleted: cancellation and no-show are terminal
//! statuses, not removals. Every transition here is a pure check; the
//! collaborator remains the authority and the cache only reflects states
//! it has confirmed through a refetch.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::local_date;
use crate::error::ErrorKind;
use crate::ids::{AppointmentId, ResourceId};
use crate::money::Money;

// ============================================================================
// Statuses
// ============================================================================

/// Lifecycle status of an appointment.
///
/// Wire form is SCREAMING_SNAKE_CASE; lowercase and camelCase spellings
/// from older collaborator builds are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    /// Reserved on the calendar, not yet started.
    #[serde(alias = "booked")]
    Booked,
    /// The customer is in the chair.
    #[serde(alias = "in_progress", alias = "inProgress")]
    InProgress,
    /// Service delivered; settlement may still be open.
    #[serde(alias = "completed")]
    Completed,
    /// Service delivered and awaiting payment.
    #[serde(alias = "payment_pending", alias = "paymentPending")]
    PaymentPending,
    /// Settled in full.
    #[serde(alias = "paid")]
    Paid,
    /// Called off before it started. Terminal.
    #[serde(alias = "cancelled", alias = "canceled", alias = "CANCELED")]
    Cancelled,
    /// The customer never arrived. Terminal.
    #[serde(alias = "no_show", alias = "noShow")]
    NoShow,
}

impl AppointmentStatus {
    /// Whether any further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled | Self::NoShow)
    }

    /// Valid transition targets from this status.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Booked,
                Self::InProgress | Self::Cancelled | Self::NoShow
            ) | (Self::Booked | Self::InProgress, Self::Completed)
                | (Self::Completed, Self::PaymentPending | Self::Paid)
                | (Self::PaymentPending, Self::Paid)
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Booked => "BOOKED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::PaymentPending => "PAYMENT_PENDING",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
            Self::NoShow => "NO_SHOW",
        };
        write!(f, "{name}")
    }
}

/// Settlement status, tracked separately from the lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// No payment recorded yet.
    #[default]
    #[serde(alias = "pending")]
    Pending,
    /// Payment received and confirmed.
    #[serde(alias = "completed", alias = "paid", alias = "PAID")]
    Completed,
    /// Payment returned to the customer.
    #[serde(alias = "refunded")]
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Refunded => "REFUNDED",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Records
// ============================================================================

/// One service line within an appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceItem {
    /// Catalog identifier, when the collaborator includes one.
    #[serde(default, alias = "serviceId", alias = "service_id")]
    pub id: Option<String>,
    /// Human-readable service name.
    #[serde(default, alias = "serviceName", alias = "service_name")]
    pub name: Option<String>,
    /// Duration this service occupies on the grid.
    #[serde(alias = "durationMinutes", alias = "duration")]
    pub duration_minutes: u32,
    /// List price.
    pub price: Money,
    /// Promotional price; when present it replaces `price` in totals.
    #[serde(default, alias = "discountPrice")]
    pub discount_price: Option<Money>,
}

impl ServiceItem {
    /// Price after any discount.
    #[must_use]
    pub fn effective_price(&self) -> Money {
        self.discount_price.unwrap_or(self.price)
    }
}

/// An appointment as held in the ledger.
///
/// Field names accept both casings the collaborator has been observed to
/// emit; unknown extra fields are ignored on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// Record identity.
    pub id: AppointmentId,
    /// Customer display name.
    #[serde(alias = "customerName")]
    pub customer_name: String,
    /// Customer phone; the stable customer key when present.
    #[serde(default, alias = "customerPhone")]
    pub customer_phone: Option<String>,
    /// Assigned resource; `None` means unassigned.
    #[serde(
        default,
        alias = "resourceId",
        alias = "resource_id",
        alias = "staffId",
        alias = "staff_id"
    )]
    pub resource: Option<ResourceId>,
    /// Ordered service lines.
    #[serde(default)]
    pub services: Vec<ServiceItem>,
    /// Scheduled start instant.
    #[serde(
        alias = "scheduledAt",
        alias = "scheduled_for",
        alias = "scheduledFor",
        alias = "startTime",
        alias = "start_time"
    )]
    pub scheduled_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: AppointmentStatus,
    /// Settlement status.
    #[serde(default, alias = "paymentStatus")]
    pub payment_status: PaymentStatus,
    /// Sum of list prices, as reported by the collaborator.
    #[serde(default, alias = "totalAmount")]
    pub total_amount: Option<Money>,
    /// Total discount applied.
    #[serde(default, alias = "discountAmount")]
    pub discount_amount: Option<Money>,
    /// Amount actually owed after discounts.
    #[serde(default, alias = "finalAmount")]
    pub final_amount: Option<Money>,
    /// Gratuity recorded at settlement.
    #[serde(default, alias = "tipAmount", alias = "tip_amount")]
    pub tip: Option<Money>,
}

impl Appointment {
    /// Total grid time the appointment occupies.
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.services
            .iter()
            .fold(0, |total, item| total.saturating_add(item.duration_minutes))
    }

    /// Scheduled end instant.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.scheduled_at + chrono::Duration::minutes(i64::from(self.duration_minutes()))
    }

    /// Sum of list prices computed from the service lines.
    #[must_use]
    pub fn service_total(&self) -> Option<Money> {
        Money::checked_total(self.services.iter().map(|item| item.price))
    }

    /// Amount owed, preferring the collaborator's figure over the local sum.
    #[must_use]
    pub fn amount_due(&self) -> Option<Money> {
        self.final_amount
            .or_else(|| Money::checked_total(self.services.iter().map(ServiceItem::effective_price)))
    }

    /// The salon-local calendar day this appointment occupies.
    #[must_use]
    pub fn scheduled_date(&self, utc_offset_minutes: i32) -> NaiveDate {
        local_date(self.scheduled_at, utc_offset_minutes)
    }

    /// Precondition hint for cancellation. The collaborator re-validates.
    ///
    /// # Errors
    ///
    /// [`TransitionError::InvalidTransition`] unless the appointment is
    /// still `Booked`.
    pub fn check_cancellable(&self) -> Result<(), TransitionError> {
        if self.status == AppointmentStatus::Booked {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: AppointmentStatus::Cancelled,
            })
        }
    }

    /// Precondition hint for completing the session.
    ///
    /// # Errors
    ///
    /// [`TransitionError::InvalidTransition`] when the status does not
    /// admit completion, [`TransitionError::NotScheduledToday`] when the
    /// appointment belongs to another calendar day.
    pub fn check_completable(&self, today: NaiveDate, utc_offset_minutes: i32) -> Result<(), TransitionError> {
        if !matches!(
            self.status,
            AppointmentStatus::Booked | AppointmentStatus::InProgress
        ) {
            return Err(TransitionError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: AppointmentStatus::Completed,
            });
        }
        if self.scheduled_date(utc_offset_minutes) != today {
            return Err(TransitionError::NotScheduledToday {
                id: self.id.clone(),
                scheduled: self.scheduled_date(utc_offset_minutes),
            });
        }
        Ok(())
    }

    /// Precondition hint for confirming payment.
    ///
    /// # Errors
    ///
    /// [`TransitionError::PaymentNotPending`] when settlement has already
    /// happened or the money was returned.
    pub fn check_payment_confirmable(&self) -> Result<(), TransitionError> {
        if self.payment_status == PaymentStatus::Pending {
            Ok(())
        } else {
            Err(TransitionError::PaymentNotPending {
                id: self.id.clone(),
                payment_status: self.payment_status,
            })
        }
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The status machine does not admit the move.
    #[error("appointment {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Record identity.
        id: AppointmentId,
        /// Status the record currently holds.
        from: AppointmentStatus,
        /// Status the operation would produce.
        to: AppointmentStatus,
    },
    /// Sessions complete only on their scheduled day.
    #[error("appointment {id} is scheduled for {scheduled} and cannot be completed today")]
    NotScheduledToday {
        /// Record identity.
        id: AppointmentId,
        /// The day the appointment belongs to.
        scheduled: NaiveDate,
    },
    /// Payment confirmation requires an open settlement.
    #[error("payment for appointment {id} is already {payment_status}")]
    PaymentNotPending {
        /// Record identity.
        id: AppointmentId,
        /// Settlement status the record currently holds.
        payment_status: PaymentStatus,
    },
}

impl TransitionError {
    /// Classification of this rejection.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTransition { .. } | Self::PaymentNotPending { .. } => {
                ErrorKind::InvalidStatus
            }
            Self::NotScheduledToday { .. } => ErrorKind::BusinessRuleViolation,
        }
    }
}

/// Validates a status move against the lifecycle machine.
///
/// # Errors
///
/// [`TransitionError::InvalidTransition`] when `from` does not admit `to`.
pub fn validate_transition(
    id: &AppointmentId,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), TransitionError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition {
            id: id.clone(),
            from,
            to,
        })
    }
}
