use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest composite score an analyst with enough history can receive.
pub const MIN_AIMS_SCORE: i32 = 40;
/// Highest composite score.
pub const MAX_AIMS_SCORE: i32 = 100;

/// Identity of an analyst. One metrics record exists per analyst at most.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct AnalystId(pub i64);

impl fmt::Display for AnalystId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AnalystId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Optimistic concurrency token of a metrics record.
///
/// A record that does not exist yet is at `Version::INITIAL`. Every successful
/// write moves the record to `next()`, so a version is never observed twice.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Version(pub i64);

impl Version {
    pub const INITIAL: Version = Version(0);

    pub fn next(self) -> Version {
        Version(self.0 + 1)
    }

    pub fn is_initial(self) -> bool {
        self == Version::INITIAL
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One evaluated report, as supplied by the report history feed.
///
/// Returns and deviations are fractions (0.05 == 5%). `realized_return` is
/// already adjusted for the direction of the opinion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub report_id: i64,
    pub report_date: DateTime<Utc>,
    pub opinion: crate::Opinion,
    pub opinion_correct: bool,
    pub realized_return: Decimal,
    pub target_price: Decimal,
    pub realized_price: Decimal,
    /// Average return of all analysts covering the same stock over the same window.
    pub peer_avg_return: Decimal,
    /// Average target-price error of all analysts covering the same stock.
    pub peer_avg_target_diff: Decimal,
}

/// The metric tuple derived from an analyst's report history.
///
/// Score fields are `None` when the history is too short to be meaningful.
/// The two target fields are also `None` when no report had a usable target price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub accuracy_rate: Option<Decimal>,
    pub return_rate: Option<Decimal>,
    pub target_diff_rate: Option<Decimal>,
    pub avg_return_diff: Option<Decimal>,
    pub avg_target_diff: Option<Decimal>,
    pub aims_score: Option<i32>,
    pub report_count: i32,
}

impl MetricValues {
    /// The "insufficient data" result: only the report count is known.
    pub fn insufficient(report_count: i32) -> Self {
        Self {
            report_count,
            ..Self::default()
        }
    }

    pub fn has_score(&self) -> bool {
        self.aims_score.is_some()
    }
}

/// The per-analyst aggregate record, as persisted by a metrics store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystMetrics {
    /// Store-assigned identity, used as the deterministic tie-break when ranking.
    pub record_id: i64,
    pub analyst_id: AnalystId,
    pub metrics: MetricValues,
    /// Number of recomputes that landed on this record.
    pub update_count: i64,
    pub updated_at: DateTime<Utc>,
    pub version: Version,
}

/// The content of a write, minus the identity and version the store owns.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsCandidate {
    pub metrics: MetricValues,
    pub update_count: i64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_advances_from_initial() {
        let v = Version::INITIAL;
        assert!(v.is_initial());
        assert_eq!(v.next(), Version(1));
        assert!(!v.next().is_initial());
    }

    #[test]
    fn insufficient_values_carry_no_score() {
        let values = MetricValues::insufficient(3);
        assert_eq!(values.report_count, 3);
        assert!(!values.has_score());
        assert!(values.accuracy_rate.is_none());
        assert!(values.avg_target_diff.is_none());
    }
}
