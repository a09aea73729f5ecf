//! # AIMS Engine
//!
//! Keeps the per-analyst aggregate records correct under concurrent recomputes
//! and ranks analysts over them.
//!
//! ## Architectural Principles
//!
//! - **Optimistic Concurrency:** `ConcurrencySafeUpdater` never holds a lock
//!   while metrics are aggregated. It writes through the store's
//!   compare-and-swap and retries with bounded, jittered backoff when another
//!   writer got there first. Different analysts never contend.
//! - **Snapshot Ranking:** `RankingEngine` orders one snapshot of all records
//!   by score, breaking ties on record id, so repeated queries against the same
//!   snapshot agree.
//!
//! ## Public API
//!
//! - `MetricsService`: `trigger_recompute`, `get_rank`, `analyst_metrics`, `leaderboard`.
//! - `ConcurrencySafeUpdater`, `RetryPolicy`: the recompute loop and its budget.
//! - `RankingEngine`, `Ranking`, `RankedAnalyst`: ranking over a snapshot.
//! - `Clock`, `SystemClock`: timestamp source.
//! - `EngineError`: the errors surfaced to callers.

pub mod clock;
pub mod error;
pub mod ranking;
pub mod retry;
pub mod service;
pub mod updater;

#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
pub use error::EngineError;
pub use ranking::{RankedAnalyst, Ranking, RankingEngine};
pub use retry::RetryPolicy;
pub use service::{AnalystMetricsReport, MetricsService};
pub use updater::ConcurrencySafeUpdater;
