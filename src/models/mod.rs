/// Модели: обученный предсказатель, рекурсивный прогноз, сводка

pub mod forecasting;
pub mod predictor;
pub mod summary;

pub use forecasting::{forecast, forecast_table, RecursiveForecaster};
pub use predictor::{LinearPredictor, Predictor, UnavailablePredictor};
pub use summary::SummaryBuilder;
