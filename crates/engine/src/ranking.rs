use crate::error::EngineError;
use core_types::{AnalystId, AnalystMetrics};
use database::MetricsStore;
use serde::Serialize;
use std::sync::Arc;

/// Where one analyst stands in the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ranking {
    /// 1-based position among scored analysts; `None` if this analyst has no score.
    pub position: Option<usize>,
    /// Every analyst with a record, scored or not.
    pub total_count: usize,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedAnalyst {
    pub position: usize,
    pub analyst_id: AnalystId,
    pub record_id: i64,
    pub aims_score: i32,
    pub report_count: i32,
}

/// Ranks analysts by AIMS score over a snapshot of all records.
///
/// The snapshot may trail in-flight recomputes; positions are consistent for
/// the snapshot they were computed from.
pub struct RankingEngine {
    store: Arc<dyn MetricsStore>,
}

impl RankingEngine {
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self { store }
    }

    /// Returns the analyst's position, or `NotFound` if it has no record.
    pub async fn rank(&self, analyst_id: AnalystId) -> Result<Ranking, EngineError> {
        let snapshot = self.store.snapshot().await?;
        rank_in_snapshot(&snapshot, analyst_id).ok_or(EngineError::NotFound(analyst_id))
    }

    /// The full scored population, best first.
    pub async fn leaderboard(&self) -> Result<Vec<RankedAnalyst>, EngineError> {
        let snapshot = self.store.snapshot().await?;
        Ok(leaderboard(&snapshot))
    }
}

/// Scored records paired with their score, in rank order: score descending,
/// then record id ascending. Unscored records are left out.
pub fn order_by_score(snapshot: &[AnalystMetrics]) -> Vec<(i32, &AnalystMetrics)> {
    let mut scored: Vec<_> = snapshot
        .iter()
        .filter_map(|r| r.metrics.aims_score.map(|score| (score, r)))
        .collect();
    scored.sort_by(|(a_score, a), (b_score, b)| {
        b_score
            .cmp(a_score)
            .then_with(|| a.record_id.cmp(&b.record_id))
    });
    scored
}

/// Ranks `analyst_id` within `snapshot`. `None` if the analyst has no record.
pub fn rank_in_snapshot(snapshot: &[AnalystMetrics], analyst_id: AnalystId) -> Option<Ranking> {
    let target = snapshot.iter().find(|r| r.analyst_id == analyst_id)?;

    let position = order_by_score(snapshot)
        .iter()
        .position(|(_, r)| r.record_id == target.record_id)
        .map(|index| index + 1);

    Some(Ranking {
        position,
        total_count: snapshot.len(),
    })
}

pub fn leaderboard(snapshot: &[AnalystMetrics]) -> Vec<RankedAnalyst> {
    order_by_score(snapshot)
        .into_iter()
        .enumerate()
        .map(|(index, (aims_score, r))| RankedAnalyst {
            position: index + 1,
            analyst_id: r.analyst_id,
            record_id: r.record_id,
            aims_score,
            report_count: r.metrics.report_count,
        })
        .collect()
}
