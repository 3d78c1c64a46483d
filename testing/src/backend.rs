//! In-memory collaborator double.
//!
//! [`InMemoryBackend`] implements [`Backend`] over a plain `Vec`, with
//! real pagination, the same lifecycle rules the collaborator enforces,
//! and a few test-only controls: per-endpoint call counters, scripted
//! one-shot failures, and a gate that holds list responses open so a
//! test can arrange events to land while a refetch is in flight.

#![allow(clippy::unwrap_used)] // A poisoned lock means a test already panicked
#![allow(clippy::missing_panics_doc)]

use async_trait::async_trait;
use chrono::NaiveDate;
use frontdesk_client::{
    Actor, Backend, BookingRequest, ClientError, CommandReceipt, Page, PageQuery, SortDirection,
};
use frontdesk_core::{
    local_date, Appointment, AppointmentId, AppointmentStatus, Money, PaymentStatus, ServiceItem,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;

#[derive(Debug, Default)]
struct CallCounters {
    all_lists: AtomicUsize,
    today_lists: AtomicUsize,
    pending_lists: AtomicUsize,
    record_fetches: AtomicUsize,
    commands: AtomicUsize,
}

struct Inner {
    records: RwLock<Vec<Appointment>>,
    today: NaiveDate,
    utc_offset_minutes: AtomicI32,
    counters: CallCounters,
    next_id: AtomicU64,
    list_failures: Mutex<VecDeque<ClientError>>,
    record_failures: Mutex<VecDeque<ClientError>>,
    command_failures: Mutex<VecDeque<ClientError>>,
    gate_tx: watch::Sender<bool>,
    gate_rx: watch::Receiver<bool>,
}

/// In-memory stand-in for the salon collaborator.
///
/// Clones share state, so a test can keep one handle for seeding and
/// assertions while the engine holds another.
#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

impl InMemoryBackend {
    /// An empty backend whose "today" endpoints are pinned to `today`.
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        let (gate_tx, gate_rx) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                records: RwLock::new(Vec::new()),
                today,
                utc_offset_minutes: AtomicI32::new(0),
                counters: CallCounters::default(),
                next_id: AtomicU64::new(1),
                list_failures: Mutex::new(VecDeque::new()),
                record_failures: Mutex::new(VecDeque::new()),
                command_failures: Mutex::new(VecDeque::new()),
                gate_tx,
                gate_rx,
            }),
        }
    }

    /// Sets the offset used when deciding which records are "today".
    pub fn set_utc_offset(&self, minutes: i32) {
        self.inner
            .utc_offset_minutes
            .store(minutes, Ordering::SeqCst);
    }

    // ===== Seeding and inspection =====

    /// Inserts a record, replacing any existing record with the same id.
    pub fn seed(&self, appointment: Appointment) {
        let mut records = self.inner.records.write().unwrap();
        if let Some(existing) = records.iter_mut().find(|r| r.id == appointment.id) {
            *existing = appointment;
        } else {
            records.push(appointment);
        }
    }

    /// Inserts every record in order.
    pub fn seed_all(&self, appointments: impl IntoIterator<Item = Appointment>) {
        for appointment in appointments {
            self.seed(appointment);
        }
    }

    /// Hard-deletes a record, as a collaborator-side admin action would.
    pub fn remove(&self, id: &AppointmentId) -> Option<Appointment> {
        let mut records = self.inner.records.write().unwrap();
        let index = records.iter().position(|r| &r.id == id)?;
        Some(records.remove(index))
    }

    /// The current copy of one record.
    #[must_use]
    pub fn record(&self, id: &AppointmentId) -> Option<Appointment> {
        self.inner
            .records
            .read()
            .unwrap()
            .iter()
            .find(|r| &r.id == id)
            .cloned()
    }

    /// Every record, in insertion order.
    #[must_use]
    pub fn records(&self) -> Vec<Appointment> {
        self.inner.records.read().unwrap().clone()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.records.read().unwrap().len()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.records.read().unwrap().is_empty()
    }

    // ===== Call counters =====

    /// Calls made to the unfiltered listing.
    #[must_use]
    pub fn all_list_calls(&self) -> usize {
        self.inner.counters.all_lists.load(Ordering::SeqCst)
    }

    /// Calls made to the today listing.
    #[must_use]
    pub fn today_list_calls(&self) -> usize {
        self.inner.counters.today_lists.load(Ordering::SeqCst)
    }

    /// Calls made to the pending-payments listing.
    #[must_use]
    pub fn pending_list_calls(&self) -> usize {
        self.inner.counters.pending_lists.load(Ordering::SeqCst)
    }

    /// Calls made to the single-record endpoint.
    #[must_use]
    pub fn record_fetch_calls(&self) -> usize {
        self.inner.counters.record_fetches.load(Ordering::SeqCst)
    }

    /// Mutation commands received, accepted or not.
    #[must_use]
    pub fn command_calls(&self) -> usize {
        self.inner.counters.commands.load(Ordering::SeqCst)
    }

    // ===== Scripted failures and the list gate =====

    /// Queues an error for the next list call, any listing.
    pub fn fail_next_list(&self, error: ClientError) {
        self.inner.list_failures.lock().unwrap().push_back(error);
    }

    /// Queues an error for the next single-record fetch.
    pub fn fail_next_record(&self, error: ClientError) {
        self.inner.record_failures.lock().unwrap().push_back(error);
    }

    /// Queues an error for the next mutation command.
    pub fn fail_next_command(&self, error: ClientError) {
        self.inner.command_failures.lock().unwrap().push_back(error);
    }

    /// Holds every list response open until [`Self::release_lists`].
    ///
    /// Calls are still counted while held, so a test can assert that a
    /// coalesced invalidation did not spawn a second request.
    pub fn hold_lists(&self) {
        let _ = self.inner.gate_tx.send(true);
    }

    /// Lets held list responses finish.
    pub fn release_lists(&self) {
        let _ = self.inner.gate_tx.send(false);
    }

    async fn gate(&self) {
        let mut held = self.inner.gate_rx.clone();
        while *held.borrow_and_update() {
            if held.changed().await.is_err() {
                break;
            }
        }
    }

    fn utc_offset(&self) -> i32 {
        self.inner.utc_offset_minutes.load(Ordering::SeqCst)
    }

    async fn respond_list(
        &self,
        mut records: Vec<Appointment>,
        query: &PageQuery,
    ) -> Result<Page<Appointment>, ClientError> {
        self.gate().await;
        if let Some(error) = self.inner.list_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        if let Some(sort) = &query.sort {
            if sort.field == "scheduledAt" {
                records.sort_by_key(|r| r.scheduled_at);
                if sort.direction == SortDirection::Descending {
                    records.reverse();
                }
            }
        }
        Ok(page_of(records, query))
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn list_appointments(&self, query: &PageQuery) -> Result<Page<Appointment>, ClientError> {
        self.inner.counters.all_lists.fetch_add(1, Ordering::SeqCst);
        let records = self.records();
        self.respond_list(records, query).await
    }

    async fn list_today_appointments(
        &self,
        query: &PageQuery,
    ) -> Result<Page<Appointment>, ClientError> {
        self.inner
            .counters
            .today_lists
            .fetch_add(1, Ordering::SeqCst);
        let offset = self.utc_offset();
        let today = self.inner.today;
        let records = self
            .records()
            .into_iter()
            .filter(|r| r.scheduled_date(offset) == today)
            .collect();
        self.respond_list(records, query).await
    }

    async fn list_pending_payments(
        &self,
        query: &PageQuery,
    ) -> Result<Page<Appointment>, ClientError> {
        self.inner
            .counters
            .pending_lists
            .fetch_add(1, Ordering::SeqCst);
        let records = self
            .records()
            .into_iter()
            .filter(|r| r.payment_status == PaymentStatus::Pending)
            .collect();
        self.respond_list(records, query).await
    }

    async fn fetch_appointment(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<Appointment>, ClientError> {
        self.inner
            .counters
            .record_fetches
            .fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.inner.record_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.record(id))
    }

    async fn book_appointment(
        &self,
        request: &BookingRequest,
        _actor: &Actor,
    ) -> Result<CommandReceipt, ClientError> {
        self.inner.counters.commands.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.inner.command_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let number = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let id = AppointmentId::new(format!("apt-{number}"));
        let appointment = Appointment {
            id: id.clone(),
            customer_name: request.customer_name.clone(),
            customer_phone: request.customer_phone.clone(),
            resource: request.resource.clone(),
            services: request
                .services
                .iter()
                .map(|service| ServiceItem {
                    id: service.id.clone(),
                    name: service.name.clone(),
                    duration_minutes: service.duration_minutes,
                    price: Money::default(),
                    discount_price: None,
                })
                .collect(),
            scheduled_at: request.scheduled_at,
            status: AppointmentStatus::Booked,
            payment_status: PaymentStatus::Pending,
            total_amount: None,
            discount_amount: None,
            final_amount: None,
            tip: None,
        };
        self.seed(appointment);
        Ok(CommandReceipt {
            message: Some("booked".to_string()),
            appointment_id: Some(id),
        })
    }

    async fn confirm_payment(
        &self,
        id: &AppointmentId,
        _actor: &Actor,
    ) -> Result<CommandReceipt, ClientError> {
        self.inner.counters.commands.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.inner.command_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let mut records = self.inner.records.write().unwrap();
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| not_found(id))?;
        if record.payment_status != PaymentStatus::Pending {
            return Err(ClientError::InvalidStatus {
                message: format!("payment for {id} is already {}", record.payment_status),
            });
        }
        record.payment_status = PaymentStatus::Completed;
        if record.status.can_transition_to(AppointmentStatus::Paid) {
            record.status = AppointmentStatus::Paid;
        }
        Ok(receipt("payment confirmed", id))
    }

    async fn complete_session(
        &self,
        id: &AppointmentId,
        _actor: &Actor,
    ) -> Result<CommandReceipt, ClientError> {
        self.inner.counters.commands.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.inner.command_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let offset = self.utc_offset();
        let today = self.inner.today;
        let mut records = self.inner.records.write().unwrap();
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| not_found(id))?;
        if !matches!(
            record.status,
            AppointmentStatus::Booked | AppointmentStatus::InProgress
        ) {
            return Err(ClientError::InvalidStatus {
                message: format!("appointment {id} is {}", record.status),
            });
        }
        if local_date(record.scheduled_at, offset) != today {
            return Err(ClientError::BusinessRule {
                message: format!("appointment {id} is not scheduled today"),
            });
        }
        record.status = AppointmentStatus::Completed;
        Ok(receipt("session completed", id))
    }

    async fn cancel_appointment(
        &self,
        id: &AppointmentId,
        _actor: &Actor,
        _reason: Option<&str>,
    ) -> Result<CommandReceipt, ClientError> {
        self.inner.counters.commands.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.inner.command_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let mut records = self.inner.records.write().unwrap();
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| not_found(id))?;
        if record.status != AppointmentStatus::Booked {
            return Err(ClientError::InvalidStatus {
                message: format!("appointment {id} is {}", record.status),
            });
        }
        record.status = AppointmentStatus::Cancelled;
        Ok(receipt("cancelled", id))
    }
}

fn not_found(id: &AppointmentId) -> ClientError {
    ClientError::ApiError {
        status: 404,
        message: format!("appointment {id} not found"),
    }
}

fn receipt(message: &str, id: &AppointmentId) -> CommandReceipt {
    CommandReceipt {
        message: Some(message.to_string()),
        appointment_id: Some(id.clone()),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn page_of(records: Vec<Appointment>, query: &PageQuery) -> Page<Appointment> {
    let size = query.size.max(1) as usize;
    let total_elements = records.len() as u64;
    let total_pages = records.len().div_ceil(size) as u32;
    let start = (query.page as usize).saturating_mul(size);
    let content: Vec<_> = records.into_iter().skip(start).take(size).collect();
    Page {
        content,
        total_elements,
        total_pages,
        page: Some(query.page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{appointment, receptionist};

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())
    }

    #[tokio::test]
    async fn pagination_splits_and_reports_totals() {
        let backend = backend();
        for n in 0..5 {
            backend.seed(appointment(format!("apt-{n}")).build());
        }
        let page = backend
            .list_appointments(&PageQuery {
                page: 1,
                size: 2,
                sort: None,
            })
            .await
            .unwrap();
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page.page, Some(1));
    }

    #[tokio::test]
    async fn today_listing_filters_by_scheduled_date() {
        let backend = backend();
        backend.seed(appointment("apt-1").on(2024, 3, 10, 10, 0).build());
        backend.seed(appointment("apt-2").on(2024, 3, 11, 10, 0).build());
        let page = backend
            .list_today_appointments(&PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.content[0].id, AppointmentId::new("apt-1"));
        assert_eq!(backend.today_list_calls(), 1);
    }

    #[tokio::test]
    async fn second_cancel_is_rejected_with_invalid_status() {
        let backend = backend();
        backend.seed(appointment("apt-1").build());
        let actor = receptionist();
        let id = AppointmentId::new("apt-1");

        backend.cancel_appointment(&id, &actor, None).await.unwrap();
        let error = backend
            .cancel_appointment(&id, &actor, None)
            .await
            .unwrap_err();
        assert!(matches!(error, ClientError::InvalidStatus { .. }));
        assert_eq!(
            backend.record(&id).unwrap().status,
            AppointmentStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn scripted_failure_hits_exactly_one_call() {
        let backend = backend();
        backend.fail_next_list(ClientError::TimedOut("scripted".to_string()));
        assert!(backend
            .list_appointments(&PageQuery::default())
            .await
            .is_err());
        assert!(backend
            .list_appointments(&PageQuery::default())
            .await
            .is_ok());
        assert_eq!(backend.all_list_calls(), 2);
    }
}
