//! Fixtures and fault-injecting stores shared by the unit tests.

use crate::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use core_types::{
    AnalystId, AnalystMetrics, MetricsCandidate, Opinion, ReportOutcome, Version,
};
use database::{DbError, InMemoryMetricsStore, MetricsStore, SwapOutcome};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU32, Ordering};

pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at_noon() -> Self {
        Self(Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn outcome(report_id: i64, correct: bool) -> ReportOutcome {
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
    ReportOutcome {
        report_id,
        report_date: start + Duration::days(report_id),
        opinion: Opinion::Buy,
        opinion_correct: correct,
        realized_return: if correct { dec!(0.08) } else { dec!(-0.03) },
        target_price: dec!(80000),
        realized_price: Decimal::from(76000 + report_id * 100),
        peer_avg_return: dec!(0.02),
        peer_avg_target_diff: dec!(0.05),
    }
}

/// `count` reports, every third one wrong.
pub fn history(count: i64) -> Vec<ReportOutcome> {
    (1..=count).map(|i| outcome(i, i % 3 != 0)).collect()
}

/// Loses the first `forced` swaps. Before each lost swap another writer
/// lands a full update on the record, the way a racing caller would.
pub struct InterleavingStore {
    pub inner: InMemoryMetricsStore,
    forced: AtomicU32,
    pub swaps: AtomicU32,
}

impl InterleavingStore {
    pub fn new(forced: u32) -> Self {
        Self {
            inner: InMemoryMetricsStore::new(),
            forced: AtomicU32::new(forced),
            swaps: AtomicU32::new(0),
        }
    }

    async fn land_rival_write(&self, analyst_id: AnalystId, candidate: &MetricsCandidate) {
        let (version, update_count) = match self.inner.get(analyst_id).await {
            Ok(current) => (current.version, current.update_count),
            Err(_) => (Version::INITIAL, 0),
        };
        let rival = MetricsCandidate {
            update_count: update_count + 1,
            ..candidate.clone()
        };
        let _ = self.inner.compare_and_swap(analyst_id, version, &rival).await;
    }
}

#[async_trait]
impl MetricsStore for InterleavingStore {
    async fn get(&self, analyst_id: AnalystId) -> Result<AnalystMetrics, DbError> {
        self.inner.get(analyst_id).await
    }

    async fn compare_and_swap(
        &self,
        analyst_id: AnalystId,
        expected: Version,
        candidate: &MetricsCandidate,
    ) -> Result<SwapOutcome, DbError> {
        self.swaps.fetch_add(1, Ordering::SeqCst);
        let remaining = self.forced.load(Ordering::SeqCst);
        if remaining > 0 {
            self.forced.store(remaining - 1, Ordering::SeqCst);
            self.land_rival_write(analyst_id, candidate).await;
        }
        self.inner.compare_and_swap(analyst_id, expected, candidate).await
    }

    async fn snapshot(&self) -> Result<Vec<AnalystMetrics>, DbError> {
        self.inner.snapshot().await
    }
}

/// Rejects every swap without writing anything.
#[derive(Default)]
pub struct AlwaysConflictingStore {
    pub inner: InMemoryMetricsStore,
    pub swaps: AtomicU32,
}

#[async_trait]
impl MetricsStore for AlwaysConflictingStore {
    async fn get(&self, analyst_id: AnalystId) -> Result<AnalystMetrics, DbError> {
        self.inner.get(analyst_id).await
    }

    async fn compare_and_swap(
        &self,
        _analyst_id: AnalystId,
        expected: Version,
        _candidate: &MetricsCandidate,
    ) -> Result<SwapOutcome, DbError> {
        self.swaps.fetch_add(1, Ordering::SeqCst);
        Ok(SwapOutcome::VersionConflict { expected })
    }

    async fn snapshot(&self) -> Result<Vec<AnalystMetrics>, DbError> {
        self.inner.snapshot().await
    }
}

/// A store whose connection is gone.
#[derive(Default)]
pub struct UnreachableStore {
    pub calls: AtomicU32,
}

#[async_trait]
impl MetricsStore for UnreachableStore {
    async fn get(&self, _analyst_id: AnalystId) -> Result<AnalystMetrics, DbError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DbError::Unavailable(sqlx::Error::PoolTimedOut))
    }

    async fn compare_and_swap(
        &self,
        _analyst_id: AnalystId,
        _expected: Version,
        _candidate: &MetricsCandidate,
    ) -> Result<SwapOutcome, DbError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DbError::Unavailable(sqlx::Error::PoolTimedOut))
    }

    async fn snapshot(&self) -> Result<Vec<AnalystMetrics>, DbError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DbError::Unavailable(sqlx::Error::PoolTimedOut))
    }
}
