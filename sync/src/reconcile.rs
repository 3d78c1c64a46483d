//! The reconciler task.
//!
//! One task owns the ledger, the view registry, and the statistics; every
//! write funnels through its loop. Events, refetch completions, view
//! commands from the UI, and channel health transitions are all just
//! messages here, so applications are serialized without any lock
//! ordering to reason about.
//!
//! Refetch I/O runs on spawned tasks. Each dispatch is tagged with the
//! view's generation; a completion whose tag is no longer current is
//! discarded on arrival, which makes rapid page flips converge on the
//! last request without aborting anything in flight.

use frontdesk_channel::ChannelHealth;
use frontdesk_client::{Backend, ClientError, Page, PageQuery, SortDirection, SortSpec};
use frontdesk_core::{
    local_date, views_invalidated_by, Appointment, AppointmentId, Clock, LedgerEvent, ViewId,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

use crate::engine::EngineOptions;
use crate::ledger::AppointmentLedger;
use crate::notice::Notice;
use crate::stats::AggregateStatistics;
use crate::views::{SyncSnapshot, ViewPage, ViewRegistry};

/// A view-level request from the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ViewCommand {
    /// Activate a view (first access) and load it if it has no fresh page.
    Open(ViewId),
    /// Move an active view to another page.
    SetPage {
        /// The view to move.
        view: ViewId,
        /// Zero-based target page.
        page: u32,
    },
    /// Force a refetch regardless of staleness.
    Refresh(ViewId),
}

/// A finished piece of refetch I/O, funneled back into the loop.
pub(crate) enum Completion {
    Page {
        view: ViewId,
        generation: u64,
        result: Result<Page<Appointment>, ClientError>,
    },
    Record {
        id: AppointmentId,
        result: Result<Option<Appointment>, ClientError>,
    },
    Sweep {
        generation: u64,
        result: Result<Vec<Appointment>, ClientError>,
    },
}

pub(crate) struct Reconciler {
    pub backend: Arc<dyn Backend>,
    pub ledger: Arc<AppointmentLedger>,
    pub registry: ViewRegistry,
    pub statistics: Option<AggregateStatistics>,
    pub clock: Arc<dyn Clock>,
    pub options: EngineOptions,
    pub events: broadcast::Receiver<LedgerEvent>,
    pub health: watch::Receiver<ChannelHealth>,
    pub controls: mpsc::Receiver<ViewCommand>,
    pub completions_tx: mpsc::Sender<Completion>,
    pub completions_rx: mpsc::Receiver<Completion>,
    pub snapshot_tx: watch::Sender<SyncSnapshot>,
    pub notices: broadcast::Sender<Notice>,
    pub shutdown: watch::Receiver<bool>,
    pub record_fetches: HashSet<AppointmentId>,
    pub record_rerun: HashSet<AppointmentId>,
    pub health_now: ChannelHealth,
    pub was_healthy: bool,
    pub feed_open: bool,
    pub health_open: bool,
}

impl Reconciler {
    pub async fn run(mut self) {
        // The channel may have connected before this task started; a
        // watch only reports changes, so read the starting value.
        let initial = self.health.borrow_and_update().clone();
        self.was_healthy = initial.is_healthy();
        self.health_now = initial;
        if self.was_healthy {
            self.full_resync("channel connected before the reconciler started");
        }
        self.publish().await;
        tracing::info!("reconciler started");

        while !*self.shutdown.borrow() {
            tokio::select! {
                result = self.shutdown.changed() => {
                    if result.is_err() {
                        break;
                    }
                }
                result = self.health.changed(), if self.health_open => {
                    match result {
                        Ok(()) => {
                            let health = self.health.borrow_and_update().clone();
                            self.apply_health(health).await;
                        }
                        Err(_) => self.health_open = false,
                    }
                }
                event = self.events.recv(), if self.feed_open => {
                    self.apply_feed(event).await;
                }
                Some(command) = self.controls.recv() => {
                    self.apply_control(command).await;
                }
                Some(completion) = self.completions_rx.recv() => {
                    self.apply_completion(completion).await;
                }
            }
        }
        tracing::info!("reconciler stopped");
    }

    async fn apply_feed(&mut self, event: Result<LedgerEvent, broadcast::error::RecvError>) {
        match event {
            Ok(event) => self.apply_event(event).await,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                metrics::counter!("sync.events.lagged").increment(missed);
                tracing::warn!(missed, "fell behind the event feed, resynchronizing");
                self.full_resync("event subscription lagged");
                self.publish().await;
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::debug!("event feed closed");
                self.feed_open = false;
            }
        }
    }

    async fn apply_event(&mut self, event: LedgerEvent) {
        metrics::counter!("sync.events.handled", "kind" => event.kind.wire_name()).increment(1);
        let today = local_date(self.clock.now(), self.options.utc_offset_minutes);
        // An event without a usable timestamp is treated as today's; the
        // cost of an extra refresh beats a stale today list.
        let event_is_today = event
            .scheduled_at
            .is_none_or(|at| local_date(at, self.options.utc_offset_minutes) == today);

        tracing::debug!(
            kind = %event.kind,
            appointment = ?event.appointment_id,
            today = event_is_today,
            "applying event"
        );
        for view in views_invalidated_by(event.kind, event_is_today) {
            self.invalidate(view);
        }
        if let Some(id) = event.appointment_id {
            self.request_record(id);
        }
        self.publish().await;
    }

    /// Marks a view stale and schedules its refetch.
    ///
    /// Inactive views stay stale until activation. An active view with a
    /// refetch already in flight records a rerun instead of spawning a
    /// second one.
    fn invalidate(&mut self, view: ViewId) {
        let state = self.registry.state_mut(view);
        state.stale = true;
        if !state.active {
            return;
        }
        if state.in_flight {
            state.rerun = true;
            metrics::counter!("sync.refetch.coalesced", "view" => view.as_str()).increment(1);
            tracing::debug!(view = %view, "refetch in flight, coalescing");
            return;
        }
        self.dispatch(view);
    }

    /// Spawns the refetch I/O for a view at its current cursor.
    fn dispatch(&mut self, view: ViewId) {
        let generation = self.registry.state_mut(view).begin_fetch();
        metrics::counter!("sync.refetch.dispatched", "view" => view.as_str()).increment(1);

        if view == ViewId::Statistics {
            let backend = Arc::clone(&self.backend);
            let completions = self.completions_tx.clone();
            let page_size = self.options.sweep_page_size;
            tracing::debug!(generation, "starting statistics sweep");
            tokio::spawn(async move {
                let result = sweep_all(backend.as_ref(), page_size).await;
                let _ = completions.send(Completion::Sweep { generation, result }).await;
            });
            return;
        }

        let cursor = self.registry.state(view).cursor;
        let mut query = PageQuery::at(cursor);
        if let Some(sort) = default_sort(view) {
            query = query.sorted_by(sort);
        }
        tracing::debug!(view = %view, page = cursor.page, generation, "refreshing view");
        let backend = Arc::clone(&self.backend);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = match view {
                ViewId::Today => backend.list_today_appointments(&query).await,
                ViewId::PendingPayments => backend.list_pending_payments(&query).await,
                ViewId::AllAppointments | ViewId::Statistics => {
                    backend.list_appointments(&query).await
                }
            };
            let _ = completions
                .send(Completion::Page {
                    view,
                    generation,
                    result,
                })
                .await;
        });
    }

    /// Spawns the targeted single-record fetch an event asks for.
    fn request_record(&mut self, id: AppointmentId) {
        if self.record_fetches.contains(&id) {
            metrics::counter!("sync.record_fetch.coalesced").increment(1);
            self.record_rerun.insert(id);
            return;
        }
        self.record_fetches.insert(id.clone());
        let backend = Arc::clone(&self.backend);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = backend.fetch_appointment(&id).await;
            let _ = completions.send(Completion::Record { id, result }).await;
        });
    }

    async fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Page {
                view,
                generation,
                result,
            } => self.apply_page(view, generation, result).await,
            Completion::Record { id, result } => self.apply_record(id, result).await,
            Completion::Sweep { generation, result } => self.apply_sweep(generation, result).await,
        }
    }

    fn is_superseded(&self, view: ViewId, generation: u64) -> bool {
        let current = self.registry.state(view).generation;
        if generation == current {
            return false;
        }
        metrics::counter!("sync.refetch.superseded", "view" => view.as_str()).increment(1);
        tracing::debug!(view = %view, generation, current, "discarding superseded refetch");
        true
    }

    async fn apply_page(
        &mut self,
        view: ViewId,
        generation: u64,
        result: Result<Page<Appointment>, ClientError>,
    ) {
        if self.is_superseded(view, generation) {
            return;
        }
        match result {
            Ok(page) => {
                let Page {
                    content,
                    total_elements,
                    total_pages,
                    ..
                } = page;
                let ids: Vec<AppointmentId> =
                    content.iter().map(|record| record.id.clone()).collect();
                self.ledger.absorb(content).await;

                let now = self.clock.now();
                let mut follow_up = false;
                {
                    let state = self.registry.state_mut(view);
                    state.in_flight = false;
                    state.content = ids;
                    state.total_elements = total_elements;
                    state.total_pages = total_pages;
                    state.last_refreshed = Some(now);
                    state.stale = false;

                    // The listing shrank under the cursor; pull it back
                    // to the last page that still exists.
                    let last = total_pages.saturating_sub(1);
                    if state.cursor.page > last {
                        tracing::debug!(view = %view, from = state.cursor.page, to = last, "clamping cursor to a shrunken listing");
                        state.cursor = state.cursor.at(last);
                        state.stale = true;
                        follow_up = true;
                    } else if state.rerun {
                        state.stale = true;
                        follow_up = true;
                    }
                }
                if follow_up {
                    self.dispatch(view);
                }
                tracing::debug!(view = %view, total_elements, "view refreshed");
            }
            Err(error) => {
                let follow_up = {
                    let state = self.registry.state_mut(view);
                    state.in_flight = false;
                    let rerun = state.rerun;
                    state.rerun = false;
                    rerun
                };
                tracing::warn!(view = %view, error = %error, "view refresh failed");
                let _ = self.notices.send(Notice::RefreshFailed {
                    view,
                    kind: error.kind(),
                    message: error.to_string(),
                });
                if follow_up {
                    self.dispatch(view);
                }
            }
        }
        self.publish().await;
    }

    async fn apply_record(
        &mut self,
        id: AppointmentId,
        result: Result<Option<Appointment>, ClientError>,
    ) {
        self.record_fetches.remove(&id);
        match result {
            Ok(Some(record)) => {
                tracing::debug!(appointment = %id, status = ?record.status, "record refreshed");
                self.ledger.upsert(record).await;
            }
            Ok(None) => {
                tracing::debug!(appointment = %id, "record no longer exists on the backend");
            }
            Err(error) => {
                tracing::warn!(appointment = %id, error = %error, "targeted record fetch failed");
            }
        }
        if self.record_rerun.remove(&id) {
            self.request_record(id);
        }
        self.publish().await;
    }

    async fn apply_sweep(
        &mut self,
        generation: u64,
        result: Result<Vec<Appointment>, ClientError>,
    ) {
        if self.is_superseded(ViewId::Statistics, generation) {
            return;
        }
        match result {
            Ok(records) => {
                let today = local_date(self.clock.now(), self.options.utc_offset_minutes);
                let stats =
                    AggregateStatistics::compute(&records, today, self.options.utc_offset_minutes);
                tracing::debug!(
                    total = stats.total_appointments,
                    pending = stats.pending_payments,
                    "statistics sweep finished"
                );
                self.ledger.replace_all(records).await;
                self.statistics = Some(stats);

                let now = self.clock.now();
                let follow_up = {
                    let state = self.registry.state_mut(ViewId::Statistics);
                    state.in_flight = false;
                    state.stale = false;
                    state.last_refreshed = Some(now);
                    let rerun = state.rerun;
                    state.rerun = false;
                    if rerun {
                        state.stale = true;
                    }
                    rerun
                };
                if follow_up {
                    self.dispatch(ViewId::Statistics);
                }
            }
            Err(error) => {
                let follow_up = {
                    let state = self.registry.state_mut(ViewId::Statistics);
                    state.in_flight = false;
                    let rerun = state.rerun;
                    state.rerun = false;
                    rerun
                };
                tracing::warn!(error = %error, "statistics sweep failed");
                let _ = self.notices.send(Notice::RefreshFailed {
                    view: ViewId::Statistics,
                    kind: error.kind(),
                    message: error.to_string(),
                });
                if follow_up {
                    self.dispatch(ViewId::Statistics);
                }
            }
        }
        self.publish().await;
    }

    async fn apply_control(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::Open(view) => {
                let needs_fetch = {
                    let state = self.registry.state_mut(view);
                    let first = !state.active;
                    state.active = true;
                    if first {
                        tracing::debug!(view = %view, "view activated");
                    }
                    state.stale || !state.loaded()
                };
                if needs_fetch {
                    self.invalidate(view);
                }
            }
            ViewCommand::SetPage { view, page } => {
                let changed = {
                    let state = self.registry.state_mut(view);
                    state.active = true;
                    let changed = state.cursor.page != page;
                    state.cursor = state.cursor.at(page);
                    changed || state.stale
                };
                if changed {
                    // Page moves bypass coalescing: each one dispatches
                    // at a new generation and older responses are
                    // discarded, so rapid flips settle on the last page
                    // the user asked for.
                    self.dispatch(view);
                }
            }
            ViewCommand::Refresh(view) => {
                self.registry.state_mut(view).active = true;
                self.invalidate(view);
            }
        }
        self.publish().await;
    }

    async fn apply_health(&mut self, health: ChannelHealth) {
        let is_healthy = health.is_healthy();
        tracing::info!(health = ?health, "channel health changed");
        let _ = self.notices.send(Notice::ConnectionChanged {
            health: health.clone(),
        });
        self.health_now = health;
        if is_healthy && !self.was_healthy {
            // Events may have been missed while disconnected; nothing
            // can say which, so everything active refreshes.
            self.full_resync("channel restored");
        }
        self.was_healthy = is_healthy;
        self.publish().await;
    }

    fn full_resync(&mut self, reason: &str) {
        metrics::counter!("sync.resync").increment(1);
        tracing::info!(reason, "resynchronizing every view");
        for view in ViewId::ALL {
            self.invalidate(view);
        }
    }

    /// Assembles and publishes a fresh snapshot from registry plus ledger.
    async fn publish(&self) {
        let mut views = Vec::new();
        for (view, state) in self.registry.entries() {
            if view == ViewId::Statistics || !state.active {
                continue;
            }
            let records = self.ledger.select(&state.content).await;
            views.push(ViewPage {
                view,
                cursor: state.cursor,
                total_elements: state.total_elements,
                total_pages: state.total_pages,
                stale: state.stale,
                records,
            });
        }
        let snapshot = SyncSnapshot {
            views,
            statistics: self.statistics.clone(),
            statistics_stale: self.registry.state(ViewId::Statistics).stale,
            health: self.health_now.clone(),
            generated_at: self.clock.now(),
        };
        let _ = self.snapshot_tx.send(snapshot);
    }
}

/// Walks every page of the unfiltered listing for the statistics sweep.
async fn sweep_all(backend: &dyn Backend, page_size: u32) -> Result<Vec<Appointment>, ClientError> {
    let mut records = Vec::new();
    let mut page_index = 0u32;
    loop {
        let query = PageQuery {
            page: page_index,
            size: page_size.max(1),
            sort: None,
        };
        let page = backend.list_appointments(&query).await?;
        let total_pages = page.total_pages;
        let drained = page.content.is_empty();
        records.extend(page.content);
        page_index = page_index.saturating_add(1);
        if drained || page_index >= total_pages {
            return Ok(records);
        }
    }
}

fn default_sort(view: ViewId) -> Option<SortSpec> {
    match view {
        ViewId::Today | ViewId::PendingPayments => {
            Some(SortSpec::by("scheduledAt", SortDirection::Ascending))
        }
        ViewId::AllAppointments => Some(SortSpec::by("scheduledAt", SortDirection::Descending)),
        ViewId::Statistics => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_views_carry_a_schedule_ordering() {
        assert!(default_sort(ViewId::Today).is_some());
        assert!(default_sort(ViewId::PendingPayments).is_some());
        let all = default_sort(ViewId::AllAppointments);
        assert_eq!(
            all.map(|sort| sort.as_param()),
            Some("scheduledAt,desc".to_string())
        );
        assert!(default_sort(ViewId::Statistics).is_none());
    }
}
