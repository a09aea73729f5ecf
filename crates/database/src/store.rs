use crate::error::DbError;
use async_trait::async_trait;
use core_types::{AnalystId, AnalystMetrics, MetricsCandidate, ReportOutcome, Version};

/// The result of a compare-and-swap against a metrics record.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    /// The write landed. Carries the record as now stored, with its new version.
    Applied(AnalystMetrics),
    /// The stored version no longer matched `expected`; nothing was written.
    VersionConflict { expected: Version },
}

/// Durable per-analyst record storage.
///
/// Implementations must make `compare_and_swap` atomic for a single record:
/// of all writers naming the same expected version, at most one succeeds.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Reads the current record. Returns `DbError::NotFound` if the analyst has none.
    async fn get(&self, analyst_id: AnalystId) -> Result<AnalystMetrics, DbError>;

    /// Writes `candidate` only if the stored version equals `expected`.
    ///
    /// `Version::INITIAL` means "no record yet": the write is an insert that
    /// conflicts if another writer created the record first.
    async fn compare_and_swap(
        &self,
        analyst_id: AnalystId,
        expected: Version,
        candidate: &MetricsCandidate,
    ) -> Result<SwapOutcome, DbError>;

    /// Reads every record, ordered by record id.
    async fn snapshot(&self) -> Result<Vec<AnalystMetrics>, DbError>;
}

/// Supplies the evaluated report history an analyst is scored on.
#[async_trait]
pub trait ReportHistoryProvider: Send + Sync {
    /// Returns the analyst's report outcomes, oldest first. Empty if none.
    async fn report_history(&self, analyst_id: AnalystId) -> Result<Vec<ReportOutcome>, DbError>;
}
