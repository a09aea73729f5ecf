use crate::clock::{Clock, SystemClock};
use crate::error::EngineError;
use crate::ranking::{RankedAnalyst, Ranking, RankingEngine, rank_in_snapshot};
use crate::retry::RetryPolicy;
use crate::updater::ConcurrencySafeUpdater;
use analytics::MetricsAggregator;
use configuration::Config;
use core_types::{AnalystId, AnalystMetrics};
use database::{MetricsStore, ReportHistoryProvider};
use serde::Serialize;
use std::sync::Arc;

/// An analyst's metrics together with where they stand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalystMetricsReport {
    pub metrics: AnalystMetrics,
    pub rank: Option<usize>,
    pub total_analysts: usize,
}

/// The entry point callers use: recompute on demand, read ranks and metrics.
pub struct MetricsService {
    updater: ConcurrencySafeUpdater,
    ranking: RankingEngine,
    store: Arc<dyn MetricsStore>,
}

impl MetricsService {
    /// Builds the service from configuration, stamping records with wall-clock time.
    pub fn new(
        store: Arc<dyn MetricsStore>,
        history: Arc<dyn ReportHistoryProvider>,
        config: &Config,
    ) -> Result<Self, EngineError> {
        Self::with_clock(store, history, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn MetricsStore>,
        history: Arc<dyn ReportHistoryProvider>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        let aggregator = MetricsAggregator::new(config.aggregator.clone())?;
        let policy = RetryPolicy::from(&config.updater);
        let updater =
            ConcurrencySafeUpdater::new(Arc::clone(&store), history, aggregator, clock, policy);

        Ok(Self {
            updater,
            ranking: RankingEngine::new(Arc::clone(&store)),
            store,
        })
    }

    pub async fn trigger_recompute(
        &self,
        analyst_id: AnalystId,
    ) -> Result<AnalystMetrics, EngineError> {
        self.updater.trigger_recompute(analyst_id).await
    }

    pub async fn get_rank(&self, analyst_id: AnalystId) -> Result<Ranking, EngineError> {
        self.ranking.rank(analyst_id).await
    }

    pub async fn leaderboard(&self) -> Result<Vec<RankedAnalyst>, EngineError> {
        self.ranking.leaderboard().await
    }

    /// The analyst's record with its rank attached, both read from one snapshot.
    pub async fn analyst_metrics(
        &self,
        analyst_id: AnalystId,
    ) -> Result<AnalystMetricsReport, EngineError> {
        let snapshot = self.store.snapshot().await?;
        let ranking =
            rank_in_snapshot(&snapshot, analyst_id).ok_or(EngineError::NotFound(analyst_id))?;
        let metrics = snapshot
            .into_iter()
            .find(|r| r.analyst_id == analyst_id)
            .ok_or(EngineError::NotFound(analyst_id))?;

        Ok(AnalystMetricsReport {
            metrics,
            rank: ranking.position,
            total_analysts: ranking.total_count,
        })
    }
}
