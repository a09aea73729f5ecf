use crate::DbError;
use crate::store::{MetricsStore, ReportHistoryProvider, SwapOutcome};
use async_trait::async_trait;
use core_types::{AnalystId, AnalystMetrics, MetricsCandidate, ReportOutcome, Version};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// An in-process `MetricsStore`.
///
/// The write lock is held only for the version check and the swap itself, so
/// it serializes same-key writers at the swap instant and nothing longer.
#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    records: RwLock<HashMap<AnalystId, AnalystMetrics>>,
    next_record_id: AtomicI64,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn get(&self, analyst_id: AnalystId) -> Result<AnalystMetrics, DbError> {
        self.records
            .read()
            .await
            .get(&analyst_id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn compare_and_swap(
        &self,
        analyst_id: AnalystId,
        expected: Version,
        candidate: &MetricsCandidate,
    ) -> Result<SwapOutcome, DbError> {
        let mut records = self.records.write().await;

        let current = records.get(&analyst_id);
        let current_version = current.map_or(Version::INITIAL, |r| r.version);
        if current_version != expected {
            return Ok(SwapOutcome::VersionConflict { expected });
        }

        let record_id = match current {
            Some(existing) => existing.record_id,
            None => self.next_record_id.fetch_add(1, Ordering::Relaxed) + 1,
        };
        let record = AnalystMetrics {
            record_id,
            analyst_id,
            metrics: candidate.metrics.clone(),
            update_count: candidate.update_count,
            updated_at: candidate.updated_at,
            version: expected.next(),
        };
        records.insert(analyst_id, record.clone());

        Ok(SwapOutcome::Applied(record))
    }

    async fn snapshot(&self) -> Result<Vec<AnalystMetrics>, DbError> {
        let mut all: Vec<_> = self.records.read().await.values().cloned().collect();
        all.sort_by_key(|r| r.record_id);
        Ok(all)
    }
}

/// An in-process report history feed.
#[derive(Debug, Default)]
pub struct InMemoryReportHistory {
    reports: RwLock<HashMap<AnalystId, Vec<ReportOutcome>>>,
}

impl InMemoryReportHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the analyst's whole history.
    pub async fn set_history(&self, analyst_id: AnalystId, history: Vec<ReportOutcome>) {
        self.reports.write().await.insert(analyst_id, history);
    }

    /// Appends one more evaluated report.
    pub async fn push(&self, analyst_id: AnalystId, outcome: ReportOutcome) {
        self.reports
            .write()
            .await
            .entry(analyst_id)
            .or_default()
            .push(outcome);
    }
}

#[async_trait]
impl ReportHistoryProvider for InMemoryReportHistory {
    async fn report_history(&self, analyst_id: AnalystId) -> Result<Vec<ReportOutcome>, DbError> {
        let mut history = self
            .reports
            .read()
            .await
            .get(&analyst_id)
            .cloned()
            .unwrap_or_default();
        history.sort_by(|a, b| {
            a.report_date
                .cmp(&b.report_date)
                .then(a.report_id.cmp(&b.report_id))
        });
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::{MetricValues, Opinion};
    use rust_decimal_macros::dec;

    fn candidate(update_count: i64) -> MetricsCandidate {
        MetricsCandidate {
            metrics: MetricValues::insufficient(0),
            update_count,
            updated_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn get_on_empty_store_is_not_found() {
        let store = InMemoryMetricsStore::new();
        assert!(matches!(store.get(AnalystId(1)).await, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn first_write_must_expect_initial_version() {
        let store = InMemoryMetricsStore::new();
        let stale = store
            .compare_and_swap(AnalystId(1), Version(3), &candidate(1))
            .await
            .unwrap();
        assert_eq!(stale, SwapOutcome::VersionConflict { expected: Version(3) });
        assert!(store.is_empty().await);

        let SwapOutcome::Applied(record) = store
            .compare_and_swap(AnalystId(1), Version::INITIAL, &candidate(1))
            .await
            .unwrap()
        else {
            panic!("initial insert should apply");
        };
        assert_eq!(record.version, Version(1));
        assert_eq!(record.record_id, 1);
    }

    #[tokio::test]
    async fn stale_version_is_rejected_and_leaves_record_untouched() {
        let store = InMemoryMetricsStore::new();
        let id = AnalystId(7);
        store
            .compare_and_swap(id, Version::INITIAL, &candidate(1))
            .await
            .unwrap();
        store.compare_and_swap(id, Version(1), &candidate(2)).await.unwrap();

        let outcome = store.compare_and_swap(id, Version(1), &candidate(99)).await.unwrap();
        assert!(matches!(outcome, SwapOutcome::VersionConflict { .. }));

        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.update_count, 2);
        assert_eq!(stored.version, Version(2));
    }

    #[tokio::test]
    async fn record_ids_follow_creation_order() {
        let store = InMemoryMetricsStore::new();
        for analyst in [30, 10, 20] {
            store
                .compare_and_swap(AnalystId(analyst), Version::INITIAL, &candidate(1))
                .await
                .unwrap();
        }
        let snapshot = store.snapshot().await.unwrap();
        let order: Vec<_> = snapshot.iter().map(|r| (r.record_id, r.analyst_id.0)).collect();
        assert_eq!(order, vec![(1, 30), (2, 10), (3, 20)]);
    }

    #[tokio::test]
    async fn history_is_returned_oldest_first() {
        let history = InMemoryReportHistory::new();
        let id = AnalystId(3);
        for (report_id, day) in [(2, 20), (1, 5), (3, 12)] {
            history
                .push(
                    id,
                    ReportOutcome {
                        report_id,
                        report_date: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
                        opinion: Opinion::Sell,
                        opinion_correct: true,
                        realized_return: dec!(0.01),
                        target_price: dec!(100),
                        realized_price: dec!(95),
                        peer_avg_return: dec!(0),
                        peer_avg_target_diff: dec!(0),
                    },
                )
                .await;
        }
        let ids: Vec<_> = history
            .report_history(id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.report_id)
            .collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert!(history.report_history(AnalystId(99)).await.unwrap().is_empty());
    }
}
