use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid aggregator parameters: {0}")]
    InvalidParameters(String),
}
