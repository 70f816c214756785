//! Рекурсивный многошаговый прогноз PM2.5

use chrono::Duration;

use crate::config::ForecastConfig;
use crate::error::{Error, Result};
use crate::models::predictor::Predictor;
use crate::preprocessing::{FeatureEngineer, HistorySeries};
use crate::types::{Dataset, ForecastPoint, Value};

/// Применяет одношаговую модель день за днём, подставляя прогнозы
/// обратно в лаговые признаки.
pub struct RecursiveForecaster {
    config: ForecastConfig,
}

impl RecursiveForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn forecast<P>(&self, model: &P, history: &Dataset) -> Result<Vec<ForecastPoint>>
    where
        P: Predictor + ?Sized,
    {
        self.config.validate()?;
        let series = HistorySeries::from_dataset(history, &self.config)?;
        let last_timestamp = series
            .last_timestamp()
            .ok_or_else(|| Error::NoTimestamps(self.config.timestamp_column.clone()))?;

        // Фиксированы на весь горизонт
        let covariate_averages =
            FeatureEngineer::covariate_averages(&series, self.config.covariate_window);
        let history_rate =
            FeatureEngineer::trailing_mean(&series.target, self.config.rolling_window);

        let horizon = self.config.horizon_days;
        let mut predictions: Vec<f64> = Vec::with_capacity(horizon);
        let mut working: Vec<f64> = series.target.clone();
        let mut points = Vec::with_capacity(horizon);

        tracing::info!(
            "Forecasting {} days from {} ({} history rows)",
            horizon,
            last_timestamp,
            series.len()
        );

        for step in 0..horizon {
            let date = last_timestamp + Duration::days(step as i64 + 1);
            let row = FeatureEngineer::build_row(
                &self.config,
                date,
                &covariate_averages,
                &working,
                &predictions,
                step,
                history_rate,
            );
            tracing::debug!(
                "Step {}: lags={:?}, rolling_rate={:.3}",
                step,
                row.lags,
                row.rolling_rate
            );

            let predicted = match model.predict(&row) {
                Ok(value) => value,
                Err(e) => {
                    let fallback =
                        FeatureEngineer::trailing_mean(&working, self.config.fallback_window);
                    tracing::warn!(
                        "Prediction failed for {}: {}. Using trailing mean {:.3}",
                        date.date(),
                        e,
                        fallback
                    );
                    fallback
                }
            };

            predictions.push(predicted);
            working.push(predicted);

            points.push(ForecastPoint {
                timestamp: row.timestamp,
                predicted,
                covariates: row.covariates,
            });
        }

        Ok(points)
    }
}

impl Default for RecursiveForecaster {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}

/// Прогноз с настройками по умолчанию и заданным горизонтом
pub fn forecast<P>(model: &P, history: &Dataset, horizon_days: usize) -> Result<Vec<ForecastPoint>>
where
    P: Predictor + ?Sized,
{
    RecursiveForecaster::new(ForecastConfig::default().with_horizon(horizon_days))
        .forecast(model, history)
}

/// Таблица прогноза: timestamp, predicted_<target>, средние ковариат
pub fn forecast_table(points: &[ForecastPoint], config: &ForecastConfig) -> Dataset {
    let mut columns = vec![
        config.timestamp_column.clone(),
        format!("predicted_{}", config.target_column),
    ];
    let covariate_names: Vec<String> = points
        .first()
        .map(|p| p.covariates.keys().cloned().collect())
        .unwrap_or_default();
    columns.extend(covariate_names.iter().cloned());

    let rows = points
        .iter()
        .map(|p| {
            let mut row = vec![Value::Timestamp(p.timestamp), Value::Number(p.predicted)];
            row.extend(covariate_names.iter().map(|name| {
                p.covariates
                    .get(name)
                    .map(|v| Value::Number(*v))
                    .unwrap_or(Value::Missing)
            }));
            row
        })
        .collect();

    Dataset { columns, rows }
}
