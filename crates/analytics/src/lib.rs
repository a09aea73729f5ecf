//! # AIMS Analytics
//!
//! Turns an analyst's report history into the AIMS metric tuple.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** This crate has no knowledge of storage or concurrency. It
//!   depends only on `core-types` and the typed settings from `configuration`.
//! - **Stateless Calculation:** `MetricsAggregator` holds nothing but its
//!   parameters. The same history always produces the same `MetricValues`, so
//!   any number of callers may use one aggregator at the same time.
//!
//! ## Public API
//!
//! - `MetricsAggregator`: computes `MetricValues` from `ReportOutcome`s.
//! - `AnalyticsError`: the errors this crate can return.

pub mod aggregator;
pub mod error;

pub use aggregator::MetricsAggregator;
pub use error::AnalyticsError;
