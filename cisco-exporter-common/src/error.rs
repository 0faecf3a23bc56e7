use thiserror::Error;

/// Common error type for exporter components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metric '{metric}' expects {expected} label values, got {actual}")]
    LabelArity {
        metric: String,
        expected: usize,
        actual: usize,
    },

    #[error("Metric '{0}' is already registered")]
    DuplicateMetric(String),

    #[error("Metric '{0}' is not registered")]
    UnknownMetric(String),
}

/// Result type alias using the exporter's Error.
pub type Result<T> = std::result::Result<T, Error>;
