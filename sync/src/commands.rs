//! Fire-and-confirm mutation commands.
//!
//! Commands call the backend and report the outcome as a [`Notice`];
//! they never write to the ledger. The matching lifecycle event (or the
//! refetch it triggers) is what makes a mutation visible, so a user sees
//! exactly what the backend confirmed and nothing speculative.

use frontdesk_client::{Actor, Backend, BookingRequest, ClientError, CommandReceipt};
use frontdesk_core::{local_date, AppointmentId, Clock, ErrorKind, TransitionError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::ledger::AppointmentLedger;
use crate::notice::{CommandKind, Notice};

/// A mutation that did not go through.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The cached record already fails the transition's precondition.
    /// The backend was not called.
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    /// The backend refused or could not be reached.
    #[error(transparent)]
    Backend(#[from] ClientError),
}

impl CommandError {
    /// Classification of this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected(rejection) => rejection.kind(),
            Self::Backend(error) => error.kind(),
        }
    }
}

/// Executes mutations against the backend on behalf of one actor.
pub(crate) struct CommandRunner {
    backend: Arc<dyn Backend>,
    ledger: Arc<AppointmentLedger>,
    notices: broadcast::Sender<Notice>,
    actor: Actor,
    clock: Arc<dyn Clock>,
    utc_offset_minutes: i32,
}

impl CommandRunner {
    pub fn new(
        backend: Arc<dyn Backend>,
        ledger: Arc<AppointmentLedger>,
        notices: broadcast::Sender<Notice>,
        actor: Actor,
        clock: Arc<dyn Clock>,
        utc_offset_minutes: i32,
    ) -> Self {
        Self {
            backend,
            ledger,
            notices,
            actor,
            clock,
            utc_offset_minutes,
        }
    }

    pub async fn book(&self, request: &BookingRequest) -> Result<CommandReceipt, CommandError> {
        let outcome = self.backend.book_appointment(request, &self.actor).await;
        self.settle(CommandKind::Book, None, outcome)
    }

    pub async fn cancel(
        &self,
        id: &AppointmentId,
        reason: Option<&str>,
    ) -> Result<CommandReceipt, CommandError> {
        if let Some(record) = self.ledger.get(id).await {
            if let Err(rejection) = record.check_cancellable() {
                return Err(self.reject(CommandKind::Cancel, id, rejection));
            }
        }
        let outcome = self.backend.cancel_appointment(id, &self.actor, reason).await;
        self.settle(CommandKind::Cancel, Some(id), outcome)
    }

    pub async fn confirm_payment(&self, id: &AppointmentId) -> Result<CommandReceipt, CommandError> {
        if let Some(record) = self.ledger.get(id).await {
            if let Err(rejection) = record.check_payment_confirmable() {
                return Err(self.reject(CommandKind::ConfirmPayment, id, rejection));
            }
        }
        let outcome = self.backend.confirm_payment(id, &self.actor).await;
        self.settle(CommandKind::ConfirmPayment, Some(id), outcome)
    }

    pub async fn complete_session(&self, id: &AppointmentId) -> Result<CommandReceipt, CommandError> {
        if let Some(record) = self.ledger.get(id).await {
            let today = local_date(self.clock.now(), self.utc_offset_minutes);
            if let Err(rejection) = record.check_completable(today, self.utc_offset_minutes) {
                return Err(self.reject(CommandKind::CompleteSession, id, rejection));
            }
        }
        let outcome = self.backend.complete_session(id, &self.actor).await;
        self.settle(CommandKind::CompleteSession, Some(id), outcome)
    }

    /// Local precondition rejection: the backend was never called.
    fn reject(
        &self,
        command: CommandKind,
        id: &AppointmentId,
        rejection: TransitionError,
    ) -> CommandError {
        metrics::counter!("sync.commands", "command" => command.as_str(), "outcome" => "rejected")
            .increment(1);
        tracing::info!(command = %command, appointment = %id, rejection = %rejection, "command rejected locally");
        let _ = self.notices.send(Notice::CommandFailed {
            command,
            appointment: Some(id.clone()),
            kind: rejection.kind(),
            message: rejection.to_string(),
        });
        CommandError::Rejected(rejection)
    }

    fn settle(
        &self,
        command: CommandKind,
        id: Option<&AppointmentId>,
        outcome: Result<CommandReceipt, ClientError>,
    ) -> Result<CommandReceipt, CommandError> {
        match outcome {
            Ok(receipt) => {
                metrics::counter!("sync.commands", "command" => command.as_str(), "outcome" => "accepted")
                    .increment(1);
                let appointment = receipt.appointment_id.clone().or_else(|| id.cloned());
                tracing::info!(command = %command, appointment = ?appointment, "command accepted");
                let _ = self.notices.send(Notice::CommandAccepted {
                    command,
                    appointment,
                    message: receipt.message.clone(),
                });
                Ok(receipt)
            }
            Err(error) => {
                metrics::counter!("sync.commands", "command" => command.as_str(), "outcome" => "failed")
                    .increment(1);
                tracing::warn!(command = %command, appointment = ?id, error = %error, "command failed");
                let _ = self.notices.send(Notice::CommandFailed {
                    command,
                    appointment: id.cloned(),
                    kind: error.kind(),
                    message: error.to_string(),
                });
                Err(CommandError::Backend(error))
            }
        }
    }
}
