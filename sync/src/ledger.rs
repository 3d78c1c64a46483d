//! Authoritative in-memory appointment cache.

use frontdesk_core::{Appointment, AppointmentId};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// The single authoritative map of appointment records on this side of
/// the wire.
///
/// Only the reconciler task writes here, and only from backend-confirmed
/// data: bulk upserts from view refetches, targeted upserts from
/// event-triggered single-record fetches, and wholesale replacement from
/// the statistics sweep. Command responses never touch the ledger, so a
/// record changes only once the backend has confirmed it.
///
/// Readers get cloned records; a snapshot stays coherent no matter what
/// lands after it was taken.
#[derive(Debug, Default)]
pub struct AppointmentLedger {
    records: RwLock<HashMap<AppointmentId, Appointment>>,
}

impl AppointmentLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True when nothing has been cached yet.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Cloned record by id.
    pub async fn get(&self, id: &AppointmentId) -> Option<Appointment> {
        self.records.read().await.get(id).cloned()
    }

    /// Cloned records for `ids`, preserving their order; ids the ledger
    /// does not know are skipped.
    pub async fn select(&self, ids: &[AppointmentId]) -> Vec<Appointment> {
        let records = self.records.read().await;
        ids.iter()
            .filter_map(|id| records.get(id).cloned())
            .collect()
    }

    /// Cloned copy of every record, in no particular order.
    pub async fn all(&self) -> Vec<Appointment> {
        self.records.read().await.values().cloned().collect()
    }

    pub(crate) async fn upsert(&self, record: Appointment) {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record);
    }

    pub(crate) async fn absorb<I>(&self, records: I)
    where
        I: IntoIterator<Item = Appointment>,
    {
        let mut map = self.records.write().await;
        for record in records {
            map.insert(record.id.clone(), record);
        }
    }

    pub(crate) async fn replace_all<I>(&self, records: I)
    where
        I: IntoIterator<Item = Appointment>,
    {
        let mut map = self.records.write().await;
        map.clear();
        for record in records {
            map.insert(record.id.clone(), record);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use frontdesk_core::{AppointmentStatus, PaymentStatus};

    fn record(id: &str, name: &str) -> Appointment {
        Appointment {
            id: AppointmentId::new(id),
            customer_name: name.to_string(),
            customer_phone: None,
            resource: None,
            services: Vec::new(),
            scheduled_at: Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap(),
            status: AppointmentStatus::Booked,
            payment_status: PaymentStatus::Pending,
            total_amount: None,
            discount_amount: None,
            final_amount: None,
            tip: None,
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let ledger = AppointmentLedger::new();
        ledger.upsert(record("apt-1", "Dana")).await;
        ledger.upsert(record("apt-1", "Dana Updated")).await;

        assert_eq!(ledger.len().await, 1);
        let cached = ledger.get(&AppointmentId::new("apt-1")).await.unwrap();
        assert_eq!(cached.customer_name, "Dana Updated");
    }

    #[tokio::test]
    async fn select_preserves_order_and_skips_unknown_ids() {
        let ledger = AppointmentLedger::new();
        ledger
            .absorb([record("apt-1", "A"), record("apt-2", "B")])
            .await;

        let ids = [
            AppointmentId::new("apt-2"),
            AppointmentId::new("missing"),
            AppointmentId::new("apt-1"),
        ];
        let selected = ledger.select(&ids).await;
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].customer_name, "B");
        assert_eq!(selected[1].customer_name, "A");
    }

    #[tokio::test]
    async fn replace_all_drops_records_absent_from_the_sweep() {
        let ledger = AppointmentLedger::new();
        ledger
            .absorb([record("apt-1", "A"), record("apt-2", "B")])
            .await;
        ledger.replace_all([record("apt-2", "B2")]).await;

        assert!(ledger.get(&AppointmentId::new("apt-1")).await.is_none());
        assert_eq!(
            ledger
                .get(&AppointmentId::new("apt-2"))
                .await
                .unwrap()
                .customer_name,
            "B2"
        );
        assert_eq!(ledger.len().await, 1);
    }
}
