//! Сводные показатели для дашборда

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::ForecastConfig;
use crate::error::{Error, Result};
use crate::preprocessing::{FeatureEngineer, HistorySeries};
use crate::types::{DailyMean, Dataset, ForecastExtreme, ForecastPoint, ForecastSummary};

pub struct SummaryBuilder;

impl SummaryBuilder {
    pub fn build(
        history: &Dataset,
        points: &[ForecastPoint],
        config: &ForecastConfig,
    ) -> Result<ForecastSummary> {
        let series = HistorySeries::from_dataset(history, config)?;
        let first = points.first().ok_or(Error::EmptyForecast)?;

        // Первое вхождение экстремума, как idxmax/idxmin
        let mut max = first;
        let mut min = first;
        for p in &points[1..] {
            if p.predicted > max.predicted {
                max = p;
            }
            if p.predicted < min.predicted {
                min = p;
            }
        }
        let predicted: Vec<f64> = points.iter().map(|p| p.predicted).collect();

        Ok(ForecastSummary {
            current: series.target[series.len() - 1],
            average_last_7_days: FeatureEngineer::trailing_mean(
                &series.target,
                7 * config.periods_per_day,
            ),
            forecast_max: ForecastExtreme {
                timestamp: max.timestamp,
                value: max.predicted,
            },
            forecast_min: ForecastExtreme {
                timestamp: min.timestamp,
                value: min.predicted,
            },
            forecast_average: FeatureEngineer::mean(&predicted),
            daily_history: Self::daily_means(&series, config.summary_history_days),
        })
    }

    /// Среднесуточные значения за последние `days` календарных дней с данными
    pub fn daily_means(series: &HistorySeries, days: usize) -> Vec<DailyMean> {
        let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for (ts, value) in series.timestamps.iter().zip(series.target.iter()) {
            if let Some(ts) = ts {
                by_date.entry(ts.date()).or_default().push(*value);
            }
        }

        let daily: Vec<DailyMean> = by_date
            .into_iter()
            .map(|(date, values)| DailyMean {
                date,
                value: FeatureEngineer::mean(&values),
            })
            .collect();
        let skip = daily.len().saturating_sub(days);
        daily.into_iter().skip(skip).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDateTime};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn history(days: usize) -> Dataset {
        let rows = (0..days * 24)
            .map(|i| {
                vec![
                    Value::Timestamp(start() + Duration::hours(i as i64)),
                    Value::Number((i / 24) as f64),
                ]
            })
            .collect();
        Dataset::from_rows(vec!["timestamp".into(), "pm_2_5".into()], rows).unwrap()
    }

    fn point(day: i64, value: f64) -> ForecastPoint {
        ForecastPoint {
            timestamp: start() + Duration::days(day),
            predicted: value,
            covariates: BTreeMap::new(),
        }
    }

    #[test]
    fn summary_statistics() {
        let data = history(40);
        let points = vec![point(41, 20.0), point(42, 35.0), point(43, 10.0), point(44, 35.0)];
        let summary = SummaryBuilder::build(&data, &points, &ForecastConfig::default()).unwrap();

        assert_eq!(summary.current, 39.0);
        // последние 7 суток: 33..=39
        assert_relative_eq!(summary.average_last_7_days, 36.0);
        assert_eq!(summary.forecast_max.value, 35.0);
        assert_eq!(summary.forecast_max.timestamp, start() + Duration::days(42));
        assert_eq!(summary.forecast_min.value, 10.0);
        assert_relative_eq!(summary.forecast_average, 25.0);

        assert_eq!(summary.daily_history.len(), 30);
        assert_eq!(
            summary.daily_history[0].date,
            (start() + Duration::days(10)).date()
        );
        assert_eq!(summary.daily_history[29].value, 39.0);
    }

    #[test]
    fn empty_forecast_is_rejected() {
        let data = history(2);
        assert!(matches!(
            SummaryBuilder::build(&data, &[], &ForecastConfig::default()),
            Err(Error::EmptyForecast)
        ));
    }
}
