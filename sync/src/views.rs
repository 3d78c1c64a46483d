//! Derived view registry and published snapshots.
//!
//! Each view owns a page cursor and the ordered record ids of its current
//! page; the records themselves live in the ledger. Rendering joins the
//! two at publish time, so a targeted record update shows up in every
//! view that lists the id without any view refetching.

use chrono::{DateTime, Utc};
use frontdesk_channel::ChannelHealth;
use frontdesk_core::{Appointment, AppointmentId, PageCursor, ViewId};
use serde::Serialize;

use crate::stats::AggregateStatistics;

/// Bookkeeping for one derived view.
///
/// `generation` tags every dispatched refetch; a completion carrying an
/// older generation is discarded on arrival. `rerun` coalesces
/// invalidations that land while a refetch is in flight into exactly one
/// follow-up.
#[derive(Debug)]
pub(crate) struct ViewState {
    pub active: bool,
    pub stale: bool,
    pub in_flight: bool,
    pub rerun: bool,
    pub generation: u64,
    pub cursor: PageCursor,
    pub content: Vec<AppointmentId>,
    pub total_elements: u64,
    pub total_pages: u32,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl ViewState {
    fn new(page_size: u32) -> Self {
        Self {
            active: false,
            stale: true,
            in_flight: false,
            rerun: false,
            generation: 0,
            cursor: PageCursor::first(page_size),
            content: Vec::new(),
            total_elements: 0,
            total_pages: 0,
            last_refreshed: None,
        }
    }

    /// True once at least one refetch has landed.
    pub fn loaded(&self) -> bool {
        self.last_refreshed.is_some()
    }

    /// Marks a refetch as dispatched and returns its generation tag.
    ///
    /// The view stays stale until a completion carrying the current
    /// generation applies, so a page move never shows the old page's
    /// rows as fresh under the new cursor.
    pub fn begin_fetch(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = true;
        self.stale = true;
        self.rerun = false;
        self.generation
    }
}

/// All four view states, keyed by [`ViewId`].
#[derive(Debug)]
pub(crate) struct ViewRegistry {
    today: ViewState,
    pending_payments: ViewState,
    all_appointments: ViewState,
    statistics: ViewState,
}

impl ViewRegistry {
    pub fn new(page_size: u32) -> Self {
        Self {
            today: ViewState::new(page_size),
            pending_payments: ViewState::new(page_size),
            all_appointments: ViewState::new(page_size),
            statistics: ViewState::new(page_size),
        }
    }

    pub fn state(&self, view: ViewId) -> &ViewState {
        match view {
            ViewId::Today => &self.today,
            ViewId::PendingPayments => &self.pending_payments,
            ViewId::AllAppointments => &self.all_appointments,
            ViewId::Statistics => &self.statistics,
        }
    }

    pub fn state_mut(&mut self, view: ViewId) -> &mut ViewState {
        match view {
            ViewId::Today => &mut self.today,
            ViewId::PendingPayments => &mut self.pending_payments,
            ViewId::AllAppointments => &mut self.all_appointments,
            ViewId::Statistics => &mut self.statistics,
        }
    }

    pub fn entries(&self) -> [(ViewId, &ViewState); 4] {
        [
            (ViewId::Today, &self.today),
            (ViewId::PendingPayments, &self.pending_payments),
            (ViewId::AllAppointments, &self.all_appointments),
            (ViewId::Statistics, &self.statistics),
        ]
    }
}

/// One rendered page of a derived view.
#[derive(Debug, Clone, Serialize)]
pub struct ViewPage {
    /// Which view this page belongs to.
    pub view: ViewId,
    /// Page position the user is on.
    pub cursor: PageCursor,
    /// Total records the view holds across all pages.
    pub total_elements: u64,
    /// Total pages at the current page size.
    pub total_pages: u32,
    /// True while the shown rows await a refetch, either because an
    /// invalidation landed or because the cursor moved.
    pub stale: bool,
    /// Records of the current page, in collaborator order.
    pub records: Vec<Appointment>,
}

/// Everything a consumer needs to render the dashboard, published over a
/// `watch` channel after every reconciler step.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSnapshot {
    /// Active list views, in a stable order.
    pub views: Vec<ViewPage>,
    /// Aggregate counters, once the first sweep has completed.
    pub statistics: Option<AggregateStatistics>,
    /// True when the counters predate an invalidating event.
    pub statistics_stale: bool,
    /// Current push-feed health.
    pub health: ChannelHealth,
    /// When this snapshot was assembled.
    pub generated_at: DateTime<Utc>,
}

impl SyncSnapshot {
    pub(crate) fn initial(generated_at: DateTime<Utc>, health: ChannelHealth) -> Self {
        Self {
            views: Vec::new(),
            statistics: None,
            statistics_stale: true,
            health,
            generated_at,
        }
    }

    /// The page for `view`, when that view is active.
    #[must_use]
    pub fn view(&self, view: ViewId) -> Option<&ViewPage> {
        self.views.iter().find(|page| page.view == view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_start_inactive_and_stale() {
        let registry = ViewRegistry::new(20);
        for (view, state) in registry.entries() {
            assert!(!state.active, "{view} should start inactive");
            assert!(state.stale, "{view} should start stale");
            assert!(!state.loaded());
            assert_eq!(state.cursor.size, 20);
        }
    }

    #[test]
    fn begin_fetch_tags_each_dispatch() {
        let mut registry = ViewRegistry::new(20);
        let state = registry.state_mut(ViewId::Today);
        state.rerun = true;
        state.stale = false;
        let first = state.begin_fetch();
        assert!(state.in_flight);
        assert!(state.stale);
        assert!(!state.rerun);
        let second = registry.state_mut(ViewId::Today).begin_fetch();
        assert_eq!(second, first + 1);
    }

    #[test]
    fn snapshot_lookup_by_view_id() {
        let snapshot = SyncSnapshot::initial(Utc::now(), ChannelHealth::Healthy);
        assert!(snapshot.view(ViewId::Today).is_none());
        assert!(snapshot.statistics.is_none());
        assert!(snapshot.statistics_stale);
    }
}
