use crate::DbError;
use crate::store::{MetricsStore, ReportHistoryProvider, SwapOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{
    AnalystId, AnalystMetrics, MetricValues, MetricsCandidate, ReportOutcome, Version,
};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::postgres::PgPool;

const METRICS_COLUMNS: &str = "id, analyst_id, accuracy_rate, return_rate, target_diff_rate, \
     avg_return_diff, avg_target_diff, aims_score, report_count, update_count, updated_at, version";

/// The `DbRepository` provides PostgreSQL-backed implementations of the store
/// traits. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

/// A row fetched from the `analyst_metrics` table.
#[derive(Debug, Clone, FromRow)]
struct DbAnalystMetrics {
    id: i64,
    analyst_id: AnalystId,
    accuracy_rate: Option<Decimal>,
    return_rate: Option<Decimal>,
    target_diff_rate: Option<Decimal>,
    avg_return_diff: Option<Decimal>,
    avg_target_diff: Option<Decimal>,
    aims_score: Option<i32>,
    report_count: i32,
    update_count: i64,
    updated_at: DateTime<Utc>,
    version: Version,
}

impl From<DbAnalystMetrics> for AnalystMetrics {
    fn from(row: DbAnalystMetrics) -> Self {
        Self {
            record_id: row.id,
            analyst_id: row.analyst_id,
            metrics: MetricValues {
                accuracy_rate: row.accuracy_rate,
                return_rate: row.return_rate,
                target_diff_rate: row.target_diff_rate,
                avg_return_diff: row.avg_return_diff,
                avg_target_diff: row.avg_target_diff,
                aims_score: row.aims_score,
                report_count: row.report_count,
            },
            update_count: row.update_count,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

/// A row fetched from the `report_outcomes` table.
#[derive(Debug, Clone, FromRow)]
struct DbReportOutcome {
    report_id: i64,
    report_date: DateTime<Utc>,
    opinion: String,
    opinion_correct: bool,
    realized_return: Decimal,
    target_price: Decimal,
    realized_price: Decimal,
    peer_avg_return: Decimal,
    peer_avg_target_diff: Decimal,
}

impl TryFrom<DbReportOutcome> for ReportOutcome {
    type Error = DbError;

    fn try_from(row: DbReportOutcome) -> Result<Self, Self::Error> {
        Ok(Self {
            report_id: row.report_id,
            report_date: row.report_date,
            opinion: row.opinion.parse()?,
            opinion_correct: row.opinion_correct,
            realized_return: row.realized_return,
            target_price: row.target_price,
            realized_price: row.realized_price,
            peer_avg_return: row.peer_avg_return,
            peer_avg_target_diff: row.peer_avg_target_diff,
        })
    }
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the record if no row exists for the analyst yet.
    /// `ON CONFLICT DO NOTHING` turns a lost race into an empty result.
    async fn insert_first(
        &self,
        analyst_id: AnalystId,
        candidate: &MetricsCandidate,
    ) -> Result<Option<DbAnalystMetrics>, DbError> {
        let sql = format!(
            r#"
            INSERT INTO analyst_metrics (
                analyst_id, accuracy_rate, return_rate, target_diff_rate, avg_return_diff,
                avg_target_diff, aims_score, report_count, update_count, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (analyst_id) DO NOTHING
            RETURNING {METRICS_COLUMNS}
            "#
        );
        let m = &candidate.metrics;
        let row = sqlx::query_as::<_, DbAnalystMetrics>(&sql)
            .bind(analyst_id)
            .bind(m.accuracy_rate)
            .bind(m.return_rate)
            .bind(m.target_diff_rate)
            .bind(m.avg_return_diff)
            .bind(m.avg_target_diff)
            .bind(m.aims_score)
            .bind(m.report_count)
            .bind(candidate.update_count)
            .bind(candidate.updated_at)
            .bind(Version::INITIAL.next())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Overwrites the record only while its version still equals `expected`.
    async fn update_if_current(
        &self,
        analyst_id: AnalystId,
        expected: Version,
        candidate: &MetricsCandidate,
    ) -> Result<Option<DbAnalystMetrics>, DbError> {
        let sql = format!(
            r#"
            UPDATE analyst_metrics
            SET accuracy_rate = $3, return_rate = $4, target_diff_rate = $5,
                avg_return_diff = $6, avg_target_diff = $7, aims_score = $8,
                report_count = $9, update_count = $10, updated_at = $11,
                version = version + 1
            WHERE analyst_id = $1 AND version = $2
            RETURNING {METRICS_COLUMNS}
            "#
        );
        let m = &candidate.metrics;
        let row = sqlx::query_as::<_, DbAnalystMetrics>(&sql)
            .bind(analyst_id)
            .bind(expected)
            .bind(m.accuracy_rate)
            .bind(m.return_rate)
            .bind(m.target_diff_rate)
            .bind(m.avg_return_diff)
            .bind(m.avg_target_diff)
            .bind(m.aims_score)
            .bind(m.report_count)
            .bind(candidate.update_count)
            .bind(candidate.updated_at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl MetricsStore for DbRepository {
    async fn get(&self, analyst_id: AnalystId) -> Result<AnalystMetrics, DbError> {
        let sql = format!("SELECT {METRICS_COLUMNS} FROM analyst_metrics WHERE analyst_id = $1");
        let row = sqlx::query_as::<_, DbAnalystMetrics>(&sql)
            .bind(analyst_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(row.into())
    }

    async fn compare_and_swap(
        &self,
        analyst_id: AnalystId,
        expected: Version,
        candidate: &MetricsCandidate,
    ) -> Result<SwapOutcome, DbError> {
        let written = if expected.is_initial() {
            self.insert_first(analyst_id, candidate).await?
        } else {
            self.update_if_current(analyst_id, expected, candidate).await?
        };

        Ok(match written {
            Some(row) => SwapOutcome::Applied(row.into()),
            None => SwapOutcome::VersionConflict { expected },
        })
    }

    async fn snapshot(&self) -> Result<Vec<AnalystMetrics>, DbError> {
        let sql = format!("SELECT {METRICS_COLUMNS} FROM analyst_metrics ORDER BY id ASC");
        let rows = sqlx::query_as::<_, DbAnalystMetrics>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(AnalystMetrics::from).collect())
    }
}

#[async_trait]
impl ReportHistoryProvider for DbRepository {
    async fn report_history(&self, analyst_id: AnalystId) -> Result<Vec<ReportOutcome>, DbError> {
        let rows = sqlx::query_as::<_, DbReportOutcome>(
            r#"
            SELECT report_id, report_date, opinion, opinion_correct, realized_return,
                   target_price, realized_price, peer_avg_return, peer_avg_target_diff
            FROM report_outcomes
            WHERE analyst_id = $1
            ORDER BY report_date ASC, report_id ASC
            "#,
        )
        .bind(analyst_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ReportOutcome::try_from).collect()
    }
}
