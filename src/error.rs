//! Ошибки библиотеки

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("invalid record {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("history is empty")]
    EmptyHistory,

    #[error("column '{0}' has no valid timestamps")]
    NoTimestamps(String),

    #[error("forecast is empty")]
    EmptyForecast,

    #[error("outlier bounds are not fitted")]
    NotFitted,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Ошибка одного вызова модели. Прогноз её не прерывает.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    #[error("model is not loaded")]
    Unavailable,

    #[error("feature '{0}' is missing from the feature row")]
    MissingFeature(String),

    #[error("model returned a non-finite value")]
    NonFinite,

    #[error("prediction failed: {0}")]
    Failed(String),
}
