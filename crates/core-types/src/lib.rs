pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::Opinion;
pub use error::CoreError;
pub use structs::{
    AnalystId, AnalystMetrics, MetricValues, MetricsCandidate, ReportOutcome, Version,
    MAX_AIMS_SCORE, MIN_AIMS_SCORE,
};
