//! The collaborator interface the engine is written against.
//!
//! The sync engine takes `Arc<dyn Backend>`, so tests run against the
//! in-memory double from `frontdesk-testing` while production wires in
//! [`crate::BackendClient`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use frontdesk_core::{Appointment, AppointmentId, ResourceId};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::page::{Page, PageQuery};

/// Role under which a front-desk operator acts.
///
/// The collaborator enforces role policy; the role travels with every
/// mutation so its decision (and its message) can be role-specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    /// Salon owner.
    Owner,
    /// Branch manager.
    Manager,
    /// Front-desk receptionist.
    Receptionist,
    /// Stylist acting on their own calendar.
    Stylist,
}

/// The operator performing a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Display name recorded in the collaborator's audit trail.
    #[serde(alias = "displayName")]
    pub display_name: String,
    /// Acting role.
    pub role: ActorRole,
}

impl Actor {
    /// Creates an actor.
    pub fn new(display_name: impl Into<String>, role: ActorRole) -> Self {
        Self {
            display_name: display_name.into(),
            role,
        }
    }
}

/// One service line requested in a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedService {
    /// Catalog identifier, when the caller knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-readable service name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Minutes the service occupies on the grid.
    pub duration_minutes: u32,
}

/// A booking command, sent when the front desk confirms a chosen slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Customer display name.
    pub customer_name: String,
    /// Customer phone, the stable customer key when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    /// Chosen resource; `None` books unassigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceId>,
    /// Requested service lines, in order.
    pub services: Vec<RequestedService>,
    /// Start instant of the chosen slot.
    pub scheduled_at: DateTime<Utc>,
}

/// Acknowledgement of an accepted mutation.
///
/// A receipt only confirms the collaborator accepted the command; the
/// resulting state change arrives through the event channel and the
/// refetch path, never from this value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandReceipt {
    /// Human-readable confirmation, when the collaborator sends one.
    #[serde(default, alias = "detail")]
    pub message: Option<String>,
    /// Identity of the affected record, when reported.
    #[serde(
        default,
        alias = "appointmentId",
        alias = "appointment_id",
        alias = "id"
    )]
    pub appointment_id: Option<AppointmentId>,
}

/// Read and mutation surface of the salon collaborator.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Lists the full appointment ledger, newest first by default.
    ///
    /// # Errors
    ///
    /// [`ClientError`] on transport failure or a rejected request.
    async fn list_appointments(&self, query: &PageQuery) -> Result<Page<Appointment>, ClientError>;

    /// Lists appointments scheduled for the salon-local current day.
    ///
    /// # Errors
    ///
    /// [`ClientError`] on transport failure or a rejected request.
    async fn list_today_appointments(
        &self,
        query: &PageQuery,
    ) -> Result<Page<Appointment>, ClientError>;

    /// Lists appointments whose settlement is still open.
    ///
    /// # Errors
    ///
    /// [`ClientError`] on transport failure or a rejected request.
    async fn list_pending_payments(
        &self,
        query: &PageQuery,
    ) -> Result<Page<Appointment>, ClientError>;

    /// Fetches one record; `Ok(None)` when the collaborator has no such id.
    ///
    /// # Errors
    ///
    /// [`ClientError`] on transport failure or a rejected request.
    async fn fetch_appointment(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<Appointment>, ClientError>;

    /// Books a new appointment.
    ///
    /// # Errors
    ///
    /// [`ClientError`] when the collaborator rejects the booking.
    async fn book_appointment(
        &self,
        request: &BookingRequest,
        actor: &Actor,
    ) -> Result<CommandReceipt, ClientError>;

    /// Confirms payment for a completed session.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidStatus`] when settlement is no longer open,
    /// [`ClientError::PermissionDenied`] when the role may not settle.
    async fn confirm_payment(
        &self,
        id: &AppointmentId,
        actor: &Actor,
    ) -> Result<CommandReceipt, ClientError>;

    /// Marks a session as completed.
    ///
    /// # Errors
    ///
    /// [`ClientError::BusinessRule`] when the appointment is not scheduled
    /// today, [`ClientError::InvalidStatus`] when its lifecycle state does
    /// not admit completion.
    async fn complete_session(
        &self,
        id: &AppointmentId,
        actor: &Actor,
    ) -> Result<CommandReceipt, ClientError>;

    /// Cancels a booked appointment.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidStatus`] when the appointment already left
    /// the booked state (including a second cancel of the same record).
    async fn cancel_appointment(
        &self,
        id: &AppointmentId,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<CommandReceipt, ClientError>;
}
