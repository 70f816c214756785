//! PM2.5 Forecast - очистка выбросов и рекурсивный прогноз на 7 дней

pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod preprocessing;
pub mod types;

pub use config::{AppConfig, CleanerConfig, ForecastConfig, Settings, MAX_HORIZON_DAYS};
pub use error::{Error, PredictorError, Result};
pub use models::*;
pub use preprocessing::*;
pub use types::*;
