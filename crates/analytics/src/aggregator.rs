use crate::error::AnalyticsError;
use configuration::AggregatorSettings;
use core_types::{MAX_AIMS_SCORE, MIN_AIMS_SCORE, MetricValues, ReportOutcome};
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on every stored rate.
const RATE_SCALE: u32 = 6;

/// A stateless calculator for deriving analyst metrics from report outcomes.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    params: AggregatorSettings,
}

impl MetricsAggregator {
    /// Creates a new `MetricsAggregator`, checking that the score weights are usable.
    pub fn new(params: AggregatorSettings) -> Result<Self, AnalyticsError> {
        let weights = [
            params.weight_accuracy,
            params.weight_return,
            params.weight_target,
        ];
        if weights.iter().any(|w| w.is_sign_negative()) {
            return Err(AnalyticsError::InvalidParameters(
                "score weights must not be negative".to_string(),
            ));
        }
        if weights.iter().sum::<Decimal>() != Decimal::ONE {
            return Err(AnalyticsError::InvalidParameters(
                "score weights must sum to 1".to_string(),
            ));
        }
        Ok(Self { params })
    }

    pub fn min_reports(&self) -> usize {
        self.params.min_reports.max(1)
    }

    /// The main entry point for calculating an analyst's metrics.
    ///
    /// # Arguments
    ///
    /// * `history` - The analyst's evaluated reports, oldest first.
    ///
    /// # Returns
    ///
    /// The full metric tuple, or an "insufficient data" tuple (report count
    /// only) when the history is shorter than `min_reports`. An empty history
    /// yields the insufficient tuple too.
    ///
    /// Reports whose target price is not positive still count toward
    /// `report_count`, accuracy and return, but are left out of the target
    /// deviation averages. If no report has a usable target, both target fields
    /// stay unset and the score is built from accuracy and return alone.
    pub fn compute(&self, history: &[ReportOutcome]) -> MetricValues {
        let report_count = i32::try_from(history.len()).unwrap_or(i32::MAX);

        if history.len() < self.min_reports() {
            tracing::debug!(
                report_count,
                min_reports = self.min_reports(),
                "Not enough reports for a score."
            );
            return MetricValues::insufficient(report_count);
        }

        let n = Decimal::from(history.len());
        let mut correct = 0usize;
        let mut return_sum = Decimal::ZERO;
        let mut return_gap_sum = Decimal::ZERO;
        let mut targeted = 0usize;
        let mut target_diff_sum = Decimal::ZERO;
        let mut target_gap_sum = Decimal::ZERO;

        for report in history {
            if report.opinion_correct {
                correct += 1;
            }
            return_sum += report.realized_return;
            return_gap_sum += report.realized_return - report.peer_avg_return;

            match target_diff(report) {
                Some(diff) => {
                    targeted += 1;
                    target_diff_sum += diff;
                    target_gap_sum += diff - report.peer_avg_target_diff;
                }
                None => tracing::debug!(
                    report_id = report.report_id,
                    target_price = %report.target_price,
                    "Skipping report without a usable target price."
                ),
            }
        }

        let accuracy_rate = Decimal::from(correct) / n;
        let return_rate = return_sum / n;
        let (target_diff_rate, avg_target_diff) = if targeted > 0 {
            let m = Decimal::from(targeted);
            (Some(target_diff_sum / m), Some(target_gap_sum / m))
        } else {
            (None, None)
        };

        MetricValues {
            accuracy_rate: Some(round_rate(accuracy_rate)),
            return_rate: Some(round_rate(return_rate)),
            target_diff_rate: target_diff_rate.map(round_rate),
            avg_return_diff: Some(round_rate(return_gap_sum / n)),
            avg_target_diff: avg_target_diff.map(round_rate),
            aims_score: Some(self.score(accuracy_rate, return_rate, target_diff_rate)),
            report_count,
        }
    }

    /// Maps the weighted composite in [0, 1] onto the 40..=100 score range.
    ///
    /// Without a target deviation the remaining weights are rescaled to sum to 1.
    fn score(
        &self,
        accuracy_rate: Decimal,
        return_rate: Decimal,
        target_diff_rate: Option<Decimal>,
    ) -> i32 {
        let p = &self.params;
        let return_component = unit_clamp(Decimal::new(5, 1) + return_rate);
        let partial = accuracy_rate * p.weight_accuracy + return_component * p.weight_return;

        let composite = match target_diff_rate {
            Some(diff) => partial + unit_clamp(Decimal::ONE - diff) * p.weight_target,
            None => {
                let remaining = p.weight_accuracy + p.weight_return;
                if remaining.is_zero() {
                    Decimal::ZERO
                } else {
                    partial / remaining
                }
            }
        };

        let span = Decimal::from(MAX_AIMS_SCORE - MIN_AIMS_SCORE);
        let raw = (Decimal::from(MIN_AIMS_SCORE) + span * unit_clamp(composite))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        raw.to_i32()
            .unwrap_or(MIN_AIMS_SCORE)
            .clamp(MIN_AIMS_SCORE, MAX_AIMS_SCORE)
    }
}

/// Relative distance between the target price and the price actually reached.
/// `None` when the target price is not positive.
fn target_diff(report: &ReportOutcome) -> Option<Decimal> {
    if report.target_price <= Decimal::ZERO {
        return None;
    }
    Some((report.target_price - report.realized_price).abs() / report.target_price)
}

fn unit_clamp(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(Decimal::ONE)
}

fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
