use core_types::AnalystId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Analyst {0} has no metrics record.")]
    NotFound(AnalystId),

    /// Every attempt lost its compare-and-swap. The store was not modified by
    /// this call; the caller may resubmit.
    #[error("Gave up recomputing metrics for analyst {analyst_id} after {attempts} conflicting attempts.")]
    ConcurrencyExhausted { analyst_id: AnalystId, attempts: u32 },

    #[error("Metrics store unavailable: {0}")]
    StoreUnavailable(#[from] database::DbError),

    /// Raised only while building the service, never by a recompute.
    #[error("Invalid aggregator settings: {0}")]
    InvalidSettings(#[from] analytics::AnalyticsError),
}
