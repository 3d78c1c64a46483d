//! Engine assembly and the public handle.
//!
//! [`SyncEngine`] wires the backend client, the event channel, and the
//! reconciler task together; [`SyncHandle`] is the only surface the rest
//! of the application talks to. The handle never touches sync state
//! directly. Reads go through the snapshot watch, writes go through the
//! control channel, and mutations go through the command runner, so the
//! single-writer rule holds no matter how many handles clone the
//! snapshot receiver.

use frontdesk_channel::ChannelHealth;
use frontdesk_client::{Actor, Backend, BookingRequest, CommandReceipt};
use frontdesk_core::{
    available_slots, local_date, Appointment, AppointmentId, BookingWindow, Clock, NaiveDate,
    SlotError, SlotGrid, SlotTarget, SystemClock, TimeSlot, ViewId,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::commands::{CommandError, CommandRunner};
use crate::feed::EventFeed;
use crate::ledger::AppointmentLedger;
use crate::notice::Notice;
use crate::reconcile::{Reconciler, ViewCommand};
use crate::views::{SyncSnapshot, ViewRegistry};
use crate::SyncError;

const NOTICE_BUFFER: usize = 64;
const CONTROL_BUFFER: usize = 32;
const COMPLETION_BUFFER: usize = 64;

/// Tuning knobs for the engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Rows per page for the derived list views.
    pub view_page_size: u32,
    /// Rows per request while the statistics sweep walks the listing.
    pub sweep_page_size: u32,
    /// How long shutdown waits for the reconciler to drain before
    /// aborting it.
    pub drain_timeout: Duration,
    /// Opening-hours grid used for availability lookups.
    pub grid: SlotGrid,
    /// Offset applied when deciding which civil date an instant falls on.
    pub utc_offset_minutes: i32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            view_page_size: 20,
            sweep_page_size: 200,
            drain_timeout: Duration::from_secs(5),
            grid: SlotGrid::standard(),
            utc_offset_minutes: 0,
        }
    }
}

/// Builder for a running synchronization engine.
pub struct SyncEngine {
    backend: Arc<dyn Backend>,
    feed: Box<dyn EventFeed>,
    actor: Actor,
    options: EngineOptions,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    /// Prepares an engine over a backend and an already-running feed,
    /// usually an [`EventChannel`].
    ///
    /// [`EventChannel`]: frontdesk_channel::EventChannel
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, feed: impl EventFeed, actor: Actor) -> Self {
        Self {
            backend,
            feed: Box::new(feed),
            actor,
            options: EngineOptions::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Overrides the default tuning.
    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Substitutes the time source. Tests pin this to a fixed instant.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Starts the reconciler task and returns the application handle.
    #[must_use]
    pub fn spawn(self) -> SyncHandle {
        let ledger = Arc::new(AppointmentLedger::default());
        let (notices_tx, _) = broadcast::channel(NOTICE_BUFFER);
        let (controls_tx, controls_rx) = mpsc::channel(CONTROL_BUFFER);
        let (completions_tx, completions_rx) = mpsc::channel(COMPLETION_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let initial = SyncSnapshot::initial(self.clock.now(), self.feed.health());
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let reconciler = Reconciler {
            backend: Arc::clone(&self.backend),
            ledger: Arc::clone(&ledger),
            registry: ViewRegistry::new(self.options.view_page_size),
            statistics: None,
            clock: Arc::clone(&self.clock),
            options: self.options,
            events: self.feed.subscribe(),
            health: self.feed.watch_health(),
            controls: controls_rx,
            completions_tx,
            completions_rx,
            snapshot_tx,
            notices: notices_tx.clone(),
            shutdown: shutdown_rx,
            record_fetches: HashSet::new(),
            record_rerun: HashSet::new(),
            health_now: self.feed.health(),
            was_healthy: false,
            feed_open: true,
            health_open: true,
        };
        let task = tokio::spawn(reconciler.run());

        let commands = CommandRunner::new(
            Arc::clone(&self.backend),
            Arc::clone(&ledger),
            notices_tx.clone(),
            self.actor,
            Arc::clone(&self.clock),
            self.options.utc_offset_minutes,
        );

        SyncHandle {
            ledger,
            snapshot_rx,
            notices_tx,
            controls_tx,
            shutdown_tx,
            task,
            feed: self.feed,
            commands,
            clock: self.clock,
            grid: self.options.grid,
            utc_offset_minutes: self.options.utc_offset_minutes,
            drain_timeout: self.options.drain_timeout,
        }
    }
}

/// Live handle to a running engine.
pub struct SyncHandle {
    ledger: Arc<AppointmentLedger>,
    snapshot_rx: watch::Receiver<SyncSnapshot>,
    notices_tx: broadcast::Sender<Notice>,
    controls_tx: mpsc::Sender<ViewCommand>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    feed: Box<dyn EventFeed>,
    commands: CommandRunner,
    clock: Arc<dyn Clock>,
    grid: SlotGrid,
    utc_offset_minutes: i32,
    drain_timeout: Duration,
}

impl SyncHandle {
    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SyncSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// A watch that yields every newly published snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SyncSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Subscribes to command outcomes, refresh failures, and health
    /// transitions.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices_tx.subscribe()
    }

    /// Read access to the authoritative record cache.
    #[must_use]
    pub fn ledger(&self) -> Arc<AppointmentLedger> {
        Arc::clone(&self.ledger)
    }

    /// Current channel health.
    #[must_use]
    pub fn channel_health(&self) -> ChannelHealth {
        self.feed.health()
    }

    /// Asks a downed channel to try connecting again right away.
    pub fn reconnect_now(&self) {
        self.feed.reconnect_now();
    }

    /// Activates a view and loads it if it has no fresh page.
    pub async fn open_view(&self, view: ViewId) -> Result<(), SyncError> {
        self.send(ViewCommand::Open(view)).await
    }

    /// Moves a view to a zero-based page.
    pub async fn set_page(&self, view: ViewId, page: u32) -> Result<(), SyncError> {
        self.send(ViewCommand::SetPage { view, page }).await
    }

    /// Forces a refetch regardless of staleness.
    pub async fn refresh_view(&self, view: ViewId) -> Result<(), SyncError> {
        self.send(ViewCommand::Refresh(view)).await
    }

    async fn send(&self, command: ViewCommand) -> Result<(), SyncError> {
        self.controls_tx
            .send(command)
            .await
            .map_err(|_| SyncError::EngineStopped)
    }

    /// Open slots on a date for a booking of the requested length.
    ///
    /// Computed locally from the ledger, so the answer is as fresh as the
    /// last synchronization and costs no backend call.
    pub async fn available_slots(
        &self,
        date: NaiveDate,
        target: &SlotTarget,
        requested_minutes: u32,
    ) -> Result<Vec<TimeSlot>, SlotError> {
        let records = self.ledger.all().await;
        let windows: Vec<BookingWindow> = records
            .iter()
            .map(|record| BookingWindow::from_appointment(record, self.utc_offset_minutes))
            .collect();
        available_slots(&self.grid, date, target, requested_minutes, &windows)
    }

    /// The civil date the engine currently considers "today".
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        local_date(self.clock.now(), self.utc_offset_minutes)
    }

    /// Books a new appointment.
    ///
    /// The ledger is not touched on success; the confirmation event and
    /// its view refetches carry the new record in.
    pub async fn book(&self, request: &BookingRequest) -> Result<CommandReceipt, CommandError> {
        self.commands.book(request).await
    }

    /// Cancels an appointment.
    pub async fn cancel(
        &self,
        id: &AppointmentId,
        reason: Option<&str>,
    ) -> Result<CommandReceipt, CommandError> {
        self.commands.cancel(id, reason).await
    }

    /// Marks an appointment's payment as received.
    pub async fn confirm_payment(&self, id: &AppointmentId) -> Result<CommandReceipt, CommandError> {
        self.commands.confirm_payment(id).await
    }

    /// Completes a session scheduled for today.
    pub async fn complete_session(&self, id: &AppointmentId) -> Result<CommandReceipt, CommandError> {
        self.commands.complete_session(id).await
    }

    /// Cached record lookup straight from the ledger.
    pub async fn appointment(&self, id: &AppointmentId) -> Option<Appointment> {
        self.ledger.get(id).await
    }

    /// Stops the reconciler and the channel.
    ///
    /// In-flight refetches get `drain_timeout` to settle; after that the
    /// task is aborted. The ledger stays readable through any
    /// outstanding [`Self::ledger`] clones.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let mut task = self.task;
        if tokio::time::timeout(self.drain_timeout, &mut task)
            .await
            .is_err()
        {
            tracing::warn!("reconciler did not drain in time, aborting");
            task.abort();
        }
        self.feed.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_use_the_standard_grid() {
        let options = EngineOptions::default();
        assert_eq!(options.view_page_size, 20);
        assert_eq!(options.sweep_page_size, 200);
        assert_eq!(options.grid, SlotGrid::standard());
        assert_eq!(options.utc_offset_minutes, 0);
    }
}
