//! # AIMS Database Crate
//!
//! Storage for the per-analyst aggregate records and the report history feed.
//!
//! ## Architectural Principles
//!
//! - **Store Abstraction:** The rest of the system only sees the `MetricsStore`
//!   and `ReportHistoryProvider` traits. `compare_and_swap` is the single
//!   mutation primitive; it is atomic per record and never blocks other keys.
//! - **Two Backends:** `DbRepository` keeps records in PostgreSQL, with the
//!   version check done inside one `UPDATE`/`INSERT` statement.
//!   `InMemoryMetricsStore` gives the same guarantees in-process.
//!
//! ## Public API
//!
//! - `connect`, `run_migrations`: pool setup and schema migration.
//! - `MetricsStore`, `SwapOutcome`, `ReportHistoryProvider`: the store contracts.
//! - `DbRepository`, `InMemoryMetricsStore`, `InMemoryReportHistory`: implementations.
//! - `DbError`: the errors this crate can return.

pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;
pub mod store;

pub use connection::{connect, connect_with, run_migrations};
pub use error::DbError;
pub use memory::{InMemoryMetricsStore, InMemoryReportHistory};
pub use repository::DbRepository;
pub use store::{MetricsStore, ReportHistoryProvider, SwapOutcome};
