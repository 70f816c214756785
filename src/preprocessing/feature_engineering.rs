//! Feature engineering для рекурсивного прогноза

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::config::ForecastConfig;
use crate::error::{Error, Result};
use crate::types::{Dataset, FeatureRow};

/// История в виде, удобном для построения признаков
#[derive(Debug, Clone)]
pub struct HistorySeries {
    pub timestamps: Vec<Option<NaiveDateTime>>,
    pub target: Vec<f64>,
    pub covariates: BTreeMap<String, Vec<f64>>,
}

impl HistorySeries {
    /// Проверяет обязательные колонки и достаёт ряды из таблицы
    pub fn from_dataset(dataset: &Dataset, config: &ForecastConfig) -> Result<Self> {
        if dataset.is_empty() {
            return Err(Error::EmptyHistory);
        }

        let target = dataset
            .numeric_column(&config.target_column)
            .ok_or_else(|| Error::MissingColumn(config.target_column.clone()))?;
        let timestamps = dataset
            .timestamp_column(&config.timestamp_column)
            .ok_or_else(|| Error::MissingColumn(config.timestamp_column.clone()))?;

        if timestamps.iter().all(Option::is_none) {
            return Err(Error::NoTimestamps(config.timestamp_column.clone()));
        }

        let mut covariates = BTreeMap::new();
        for name in &config.covariates {
            match dataset.numeric_column(name) {
                Some(values) => {
                    covariates.insert(name.clone(), values);
                }
                None => tracing::debug!("Covariate '{}' not found in history, skipping", name),
            }
        }

        Ok(Self {
            timestamps,
            target,
            covariates,
        })
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Последняя (максимальная) валидная метка времени
    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.iter().flatten().max().copied()
    }

    /// Индексы строк по возрастанию времени; строки без метки в конце
    fn chronological_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| match (self.timestamps[a], self.timestamps[b]) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        order
    }
}

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Средние ковариат за последние `covariate_window` строк по времени
    pub fn covariate_averages(history: &HistorySeries, window: usize) -> BTreeMap<String, f64> {
        let order = history.chronological_order();
        let recent = &order[order.len().saturating_sub(window)..];

        history
            .covariates
            .iter()
            .map(|(name, values)| {
                let window_values: Vec<f64> = recent.iter().map(|&i| values[i]).collect();
                (name.clone(), Self::mean(&window_values))
            })
            .collect()
    }

    /// Среднее без учёта NaN; NaN, если значений нет
    pub fn mean(values: &[f64]) -> f64 {
        let (sum, count) = values
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }

    /// Среднее последних `window` значений
    pub fn trailing_mean(values: &[f64], window: usize) -> f64 {
        let start = values.len().saturating_sub(window);
        Self::mean(&values[start..])
    }

    /// Лаг `lag` для шага `step`.
    ///
    /// Если лаг попадает на уже спрогнозированный день, берётся прогноз.
    /// Иначе отступаем `(lag - step) * periods_per_day` строк от конца
    /// рабочей истории; если истории не хватает, берётся первая строка.
    pub fn lag_value(
        working: &[f64],
        predictions: &[f64],
        step: usize,
        lag: usize,
        periods_per_day: usize,
    ) -> f64 {
        if step >= lag {
            return predictions[step - lag];
        }
        let offset = (lag - step) * periods_per_day;
        if offset > working.len() {
            working[0]
        } else {
            working[working.len() - offset]
        }
    }

    /// Скользящее среднее для шага: на первом шаге из истории, дальше по прогнозам
    pub fn rolling_rate(
        history_rate: f64,
        predictions: &[f64],
        step: usize,
        window: usize,
    ) -> f64 {
        if step == 0 {
            history_rate
        } else {
            Self::trailing_mean(predictions, window.min(step))
        }
    }

    /// Строит строку признаков для одного дня прогноза
    pub fn build_row(
        config: &ForecastConfig,
        date: NaiveDateTime,
        covariate_averages: &BTreeMap<String, f64>,
        working: &[f64],
        predictions: &[f64],
        step: usize,
        history_rate: f64,
    ) -> FeatureRow {
        let mut row = FeatureRow::new(date, config.target_column.clone());
        row.hour = 0;
        row.covariates = covariate_averages.clone();
        row.lags = (1..=config.lag_periods)
            .map(|lag| Self::lag_value(working, predictions, step, lag, config.periods_per_day))
            .collect();
        row.rolling_rate = Self::rolling_rate(
            history_rate,
            predictions,
            step,
            config.rolling_prediction_window,
        );
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn mean_skips_nan() {
        assert_relative_eq!(FeatureEngineer::mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(FeatureEngineer::mean(&[f64::NAN]).is_nan());
        assert!(FeatureEngineer::mean(&[]).is_nan());
    }

    #[test]
    fn trailing_mean_uses_whole_series_when_short() {
        assert_relative_eq!(FeatureEngineer::trailing_mean(&[2.0, 4.0], 72), 3.0);
        assert_relative_eq!(FeatureEngineer::trailing_mean(&[2.0, 4.0, 9.0], 1), 9.0);
    }

    #[test]
    fn lag_reads_history_offset_before_predictions_exist() {
        let working: Vec<f64> = (0..100).map(|v| v as f64).collect();
        // шаг 0, лаг 1 → 24 строки от конца
        assert_eq!(FeatureEngineer::lag_value(&working, &[], 0, 1, 24), 76.0);
        // шаг 0, лаг 4 → 96 строк от конца
        assert_eq!(FeatureEngineer::lag_value(&working, &[], 0, 4, 24), 4.0);
        // шаг 0, лаг 5 → 120 > 100 → первая строка
        assert_eq!(FeatureEngineer::lag_value(&working, &[], 0, 5, 24), 0.0);
    }

    #[test]
    fn lag_reads_predictions_once_available() {
        let predictions = [10.0, 20.0, 30.0];
        let working = vec![1.0; 48];
        assert_eq!(FeatureEngineer::lag_value(&working, &predictions, 3, 1, 24), 30.0);
        assert_eq!(FeatureEngineer::lag_value(&working, &predictions, 3, 3, 24), 10.0);
    }

    #[test]
    fn offset_exactly_equal_to_length_reads_first_row() {
        let working: Vec<f64> = (0..48).map(|v| v as f64 + 1.0).collect();
        assert_eq!(FeatureEngineer::lag_value(&working, &[], 0, 2, 24), 1.0);
    }

    #[test]
    fn rolling_rate_averages_available_predictions() {
        let preds = [3.0, 6.0, 9.0, 12.0];
        assert_eq!(FeatureEngineer::rolling_rate(5.0, &[], 0, 3), 5.0);
        assert_eq!(FeatureEngineer::rolling_rate(5.0, &preds[..1], 1, 3), 3.0);
        assert_eq!(FeatureEngineer::rolling_rate(5.0, &preds[..2], 2, 3), 4.5);
        assert_eq!(FeatureEngineer::rolling_rate(5.0, &preds[..4], 4, 3), 9.0);
    }

    #[test]
    fn covariate_window_follows_timestamps_not_row_order() {
        // Строки перемешаны: последние по времени имеют humidity = 100
        let rows = vec![
            vec![Value::Timestamp(start() + Duration::hours(2)), Value::Number(1.0), Value::Number(100.0)],
            vec![Value::Timestamp(start()), Value::Number(1.0), Value::Number(0.0)],
            vec![Value::Timestamp(start() + Duration::hours(3)), Value::Number(1.0), Value::Number(100.0)],
            vec![Value::Timestamp(start() + Duration::hours(1)), Value::Number(1.0), Value::Number(0.0)],
        ];
        let data = Dataset::from_rows(
            vec!["timestamp".into(), "pm_2_5".into(), "humidity".into()],
            rows,
        )
        .unwrap();
        let history = HistorySeries::from_dataset(&data, &ForecastConfig::default()).unwrap();

        let averages = FeatureEngineer::covariate_averages(&history, 2);
        assert_eq!(averages.get("humidity"), Some(&100.0));
        assert!(!averages.contains_key("temperature"));
        assert_eq!(history.last_timestamp(), Some(start() + Duration::hours(3)));
    }

    #[test]
    fn history_requires_target_and_timestamps() {
        let config = ForecastConfig::default();
        let no_target = Dataset::from_rows(
            vec!["timestamp".into()],
            vec![vec![Value::Timestamp(start())]],
        )
        .unwrap();
        assert!(matches!(
            HistorySeries::from_dataset(&no_target, &config),
            Err(Error::MissingColumn(c)) if c == "pm_2_5"
        ));

        let bad_timestamps = Dataset::from_rows(
            vec!["timestamp".into(), "pm_2_5".into()],
            vec![vec![Value::Missing, Value::Number(3.0)]],
        )
        .unwrap();
        assert!(matches!(
            HistorySeries::from_dataset(&bad_timestamps, &config),
            Err(Error::NoTimestamps(_))
        ));

        let empty = Dataset::new(vec!["timestamp".into(), "pm_2_5".into()]);
        assert!(matches!(
            HistorySeries::from_dataset(&empty, &config),
            Err(Error::EmptyHistory)
        ));
    }

    #[test]
    fn build_row_sets_calendar_fields() {
        let config = ForecastConfig::default();
        let date = start() + Duration::days(14) + Duration::hours(13);
        let mut covs = BTreeMap::new();
        covs.insert("humidity".to_string(), 71.5);
        let working = vec![5.0; 200];

        let row = FeatureEngineer::build_row(&config, date, &covs, &working, &[], 0, 8.0);
        assert_eq!(row.day, 15);
        assert_eq!(row.hour, 0);
        assert_eq!(row.lags.len(), 7);
        assert_eq!(row.rolling_rate, 8.0);
        assert_eq!(row.feature("humidity"), Some(71.5));
    }
}
