use crate::clock::Clock;
use crate::error::EngineError;
use crate::retry::RetryPolicy;
use analytics::MetricsAggregator;
use core_types::{AnalystId, AnalystMetrics, MetricsCandidate, Version};
use database::{DbError, MetricsStore, ReportHistoryProvider, SwapOutcome};
use std::sync::Arc;
use tokio::time::sleep;

/// Recomputes an analyst's metrics and merges them into the shared record
/// without losing concurrent updates.
///
/// Each attempt reads the record and its version, recomputes the metrics from
/// the current report history, and writes back through a compare-and-swap on
/// that version. A writer that lost the race re-reads and tries again, so
/// every call that returns `Ok` moved `update_count` forward by exactly one.
/// Nothing is locked while the aggregation runs.
pub struct ConcurrencySafeUpdater {
    store: Arc<dyn MetricsStore>,
    history: Arc<dyn ReportHistoryProvider>,
    aggregator: MetricsAggregator,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl ConcurrencySafeUpdater {
    pub fn new(
        store: Arc<dyn MetricsStore>,
        history: Arc<dyn ReportHistoryProvider>,
        aggregator: MetricsAggregator,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            history,
            aggregator,
            clock,
            policy,
        }
    }

    /// Runs the recompute-and-merge cycle for one analyst.
    ///
    /// Returns the record as stored by the winning swap. Dropping the returned
    /// future between attempts is safe: each attempt either lands completely or
    /// not at all.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyExhausted` once `max_attempts` swaps have all conflicted.
    /// - `StoreUnavailable` on the first store failure; those are not retried here.
    #[tracing::instrument(name = "trigger_recompute", skip_all, fields(analyst_id = %analyst_id))]
    pub async fn trigger_recompute(
        &self,
        analyst_id: AnalystId,
    ) -> Result<AnalystMetrics, EngineError> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            match self.attempt(analyst_id).await? {
                SwapOutcome::Applied(record) => {
                    tracing::info!(
                        attempt,
                        version = %record.version,
                        update_count = record.update_count,
                        aims_score = ?record.metrics.aims_score,
                        "Metrics update applied."
                    );
                    return Ok(record);
                }
                SwapOutcome::VersionConflict { expected } => {
                    tracing::debug!(attempt, %expected, "Lost compare-and-swap, retrying.");
                    if attempt < max_attempts {
                        sleep(self.policy.delay(attempt)).await;
                    }
                }
            }
        }

        tracing::warn!(attempts = max_attempts, "Retry budget exhausted.");
        Err(EngineError::ConcurrencyExhausted {
            analyst_id,
            attempts: max_attempts,
        })
    }

    /// One read, recompute, swap round.
    async fn attempt(&self, analyst_id: AnalystId) -> Result<SwapOutcome, EngineError> {
        let (expected, update_count) = match self.store.get(analyst_id).await {
            Ok(current) => (current.version, current.update_count),
            Err(DbError::NotFound) => (Version::INITIAL, 0),
            Err(e) => return Err(EngineError::StoreUnavailable(e)),
        };

        // History is re-read every round; reports may have arrived since the last one.
        let history = self.history.report_history(analyst_id).await?;
        let metrics = self.aggregator.compute(&history);

        let candidate = MetricsCandidate {
            metrics,
            update_count: update_count + 1,
            updated_at: self.clock.now(),
        };

        Ok(self
            .store
            .compare_and_swap(analyst_id, expected, &candidate)
            .await?)
    }
}
