//! Runs the store contracts against a live PostgreSQL instance.
//!
//! Needs `DATABASE_URL`; run with `cargo test -p database -- --ignored`.

use chrono::{TimeZone, Utc};
use core_types::{AnalystId, MetricValues, MetricsCandidate, Version};
use database::{
    DbError, DbRepository, MetricsStore, ReportHistoryProvider, SwapOutcome, connect,
    run_migrations,
};
use rust_decimal_macros::dec;
use sqlx::PgPool;

async fn repository() -> (PgPool, DbRepository) {
    let pool = connect().await.expect("DATABASE_URL must point at a test database");
    run_migrations(&pool).await.unwrap();
    (pool.clone(), DbRepository::new(pool))
}

/// An analyst id no earlier run has used.
fn fresh_analyst() -> AnalystId {
    AnalystId(Utc::now().timestamp_micros())
}

async fn cleanup(pool: &PgPool, analyst_id: AnalystId) {
    sqlx::query("DELETE FROM analyst_metrics WHERE analyst_id = $1")
        .bind(analyst_id)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM report_outcomes WHERE analyst_id = $1")
        .bind(analyst_id)
        .execute(pool)
        .await
        .unwrap();
}

fn candidate(update_count: i64, aims_score: Option<i32>) -> MetricsCandidate {
    MetricsCandidate {
        metrics: MetricValues {
            accuracy_rate: aims_score.map(|_| dec!(0.75)),
            aims_score,
            report_count: 8,
            ..MetricValues::default()
        },
        update_count,
        updated_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn first_insert_applies_once_and_a_second_insert_conflicts() {
    let (pool, repo) = repository().await;
    let analyst = fresh_analyst();

    assert!(matches!(repo.get(analyst).await, Err(DbError::NotFound)));

    let SwapOutcome::Applied(created) = repo
        .compare_and_swap(analyst, Version::INITIAL, &candidate(1, Some(70)))
        .await
        .unwrap()
    else {
        panic!("initial insert should apply");
    };
    assert_eq!(created.version, Version(1));
    assert_eq!(created.update_count, 1);
    assert_eq!(created.metrics.aims_score, Some(70));

    let raced = repo
        .compare_and_swap(analyst, Version::INITIAL, &candidate(1, Some(55)))
        .await
        .unwrap();
    assert_eq!(raced, SwapOutcome::VersionConflict { expected: Version::INITIAL });
    assert_eq!(repo.get(analyst).await.unwrap(), created);

    cleanup(&pool, analyst).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn update_applies_only_against_the_current_version() {
    let (pool, repo) = repository().await;
    let analyst = fresh_analyst();

    repo.compare_and_swap(analyst, Version::INITIAL, &candidate(1, None))
        .await
        .unwrap();

    let SwapOutcome::Applied(updated) = repo
        .compare_and_swap(analyst, Version(1), &candidate(2, Some(81)))
        .await
        .unwrap()
    else {
        panic!("update on the current version should apply");
    };
    assert_eq!(updated.version, Version(2));
    assert_eq!(updated.update_count, 2);

    // A writer still holding version 1 must not overwrite the newer row.
    let stale = repo
        .compare_and_swap(analyst, Version(1), &candidate(2, Some(40)))
        .await
        .unwrap();
    assert_eq!(stale, SwapOutcome::VersionConflict { expected: Version(1) });

    let stored = repo.get(analyst).await.unwrap();
    assert_eq!(stored, updated);
    assert!(repo.snapshot().await.unwrap().contains(&stored));

    cleanup(&pool, analyst).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn report_history_is_read_oldest_first() {
    let (pool, repo) = repository().await;
    let analyst = fresh_analyst();

    for (offset, day, opinion) in [(1, 20, "SELL"), (2, 5, "BUY")] {
        sqlx::query(
            r#"
            INSERT INTO report_outcomes (
                report_id, analyst_id, report_date, opinion, opinion_correct,
                realized_return, target_price, realized_price
            )
            VALUES ($1, $2, $3, $4, TRUE, 0.05, 100, 95)
            "#,
        )
        .bind(analyst.0 * 10 + offset)
        .bind(analyst)
        .bind(Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap())
        .bind(opinion)
        .execute(&pool)
        .await
        .unwrap();
    }

    let history = repo.report_history(analyst).await.unwrap();
    let ids: Vec<_> = history.iter().map(|r| r.report_id).collect();
    assert_eq!(ids, vec![analyst.0 * 10 + 2, analyst.0 * 10 + 1]);
    assert_eq!(history[0].target_price, dec!(100));

    cleanup(&pool, analyst).await;
}
