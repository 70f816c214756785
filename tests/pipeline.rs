//! Сквозной сценарий: файл → очистка → прогноз → таблица и сводка

use std::io::Write;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pm25_forecast::{
    data, forecast_table, ForecastConfig, LinearPredictor, OutlierCleaner, RecursiveForecaster,
    SummaryBuilder, UnavailablePredictor, Value,
};

fn end() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 2, 28)
        .unwrap()
        .and_hms_opt(23, 0, 0)
        .unwrap()
}

const MODEL: &str = r#"{
    "intercept": 1.5,
    "coefficients": {
        "pm_2_5_lag_1": 0.4,
        "pm_2_5_lag_2": 0.2,
        "pm_2_5_roll_rate_3": 0.3,
        "humidity": 0.01,
        "temperature": -0.05,
        "day": 0.0,
        "hour": 0.0
    }
}"#;

#[test]
fn sample_history_through_clean_and_forecast() {
    let mut raw = data::generate_history(end(), 45, 99);
    let rows_before = raw.len();

    // Один явный выброс и одна строка с пропуском
    let pm_idx = raw.column_index("pm_2_5").unwrap();
    raw.rows[100][pm_idx] = Value::Number(2500.0);
    raw.rows[200][pm_idx] = Value::Missing;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("history.csv");
    data::write_csv(&raw, &input).unwrap();
    let loaded = data::load_file(&input, "timestamp").unwrap();
    assert_eq!(loaded.len(), rows_before);

    let mut cleaner = OutlierCleaner::default();
    let (cleaned, report) = cleaner.clean(&loaded).unwrap();
    assert_eq!(report.rows_after_drop_missing, rows_before - 1);
    assert!(report.removed_rows >= 1);
    assert!(cleaned
        .numeric_column("pm_2_5")
        .unwrap()
        .iter()
        .all(|v| *v < 2500.0));

    let model_path = dir.path().join("final_model.json");
    std::fs::File::create(&model_path)
        .unwrap()
        .write_all(MODEL.as_bytes())
        .unwrap();
    let model = LinearPredictor::load(&model_path).unwrap();

    let config = ForecastConfig::default();
    let forecaster = RecursiveForecaster::new(config.clone());
    let points = forecaster.forecast(&model, &cleaned).unwrap();

    assert_eq!(points.len(), 7);
    for (i, p) in points.iter().enumerate() {
        assert_eq!(p.timestamp, end() + Duration::days(i as i64 + 1));
        assert!(p.predicted.is_finite());
        assert!(p.predicted > 0.0 && p.predicted < 100.0);
    }

    let table = forecast_table(&points, &config);
    let output = dir.path().join("forecast.csv");
    data::write_csv(&table, &output).unwrap();
    let reread = data::load_file(&output, "timestamp").unwrap();
    assert_eq!(reread.len(), 7);
    assert_eq!(
        reread.columns,
        vec!["timestamp", "predicted_pm_2_5", "humidity", "temperature"]
    );

    let summary = SummaryBuilder::build(&cleaned, &points, &config).unwrap();
    assert!(summary.forecast_min.value <= summary.forecast_average);
    assert!(summary.forecast_average <= summary.forecast_max.value);
    assert_eq!(summary.daily_history.len(), 30);
    assert_eq!(summary.daily_history.last().unwrap().date, end().date());
}

#[test]
fn missing_model_degrades_to_trailing_means() {
    let history = data::generate_history(end(), 10, 5);
    let points = RecursiveForecaster::default()
        .forecast(&UnavailablePredictor, &history)
        .unwrap();

    assert_eq!(points.len(), 7);
    let pm = history.numeric_column("pm_2_5").unwrap();
    let expected = pm[pm.len() - 24..].iter().sum::<f64>() / 24.0;
    approx::assert_relative_eq!(points[0].predicted, expected, epsilon = 1e-9);
}
