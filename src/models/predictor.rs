//! Обученная модель как непрозрачный предсказатель

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, Result};
use crate::types::FeatureRow;

/// Одношаговая регрессия: строка признаков → значение целевой переменной
pub trait Predictor {
    fn predict(&self, row: &FeatureRow) -> std::result::Result<f64, PredictorError>;
}

impl<F> Predictor for F
where
    F: Fn(&FeatureRow) -> std::result::Result<f64, PredictorError>,
{
    fn predict(&self, row: &FeatureRow) -> std::result::Result<f64, PredictorError> {
        self(row)
    }
}

/// Формат файла модели
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinearModelFile {
    intercept: f64,
    coefficients: BTreeMap<String, f64>,
}

/// Линейная модель, сохранённая после обучения: bias + Σ wᵢ·xᵢ
#[derive(Debug, Clone)]
pub struct LinearPredictor {
    feature_names: Vec<String>,
    weights: Array1<f64>,
    bias: f64,
}

impl LinearPredictor {
    pub fn new(bias: f64, coefficients: BTreeMap<String, f64>) -> Self {
        let (feature_names, weights): (Vec<String>, Vec<f64>) = coefficients.into_iter().unzip();
        Self {
            feature_names,
            weights: Array1::from(weights),
            bias,
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: LinearModelFile = serde_json::from_str(text)?;
        Ok(Self::new(file.intercept, file.coefficients))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let model = Self::from_json(&text)?;
        tracing::info!(
            "Loaded linear model from {} ({} features)",
            path.display(),
            model.feature_names.len()
        );
        Ok(model)
    }
}

impl Predictor for LinearPredictor {
    fn predict(&self, row: &FeatureRow) -> std::result::Result<f64, PredictorError> {
        let x = row.to_array(&self.feature_names)?;
        let pred = self.bias + x.dot(&self.weights);
        if pred.is_finite() {
            Ok(pred)
        } else {
            Err(PredictorError::NonFinite)
        }
    }
}

/// Заглушка на случай, когда модель не загрузилась: каждый вызов — ошибка
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePredictor;

impl Predictor for UnavailablePredictor {
    fn predict(&self, _row: &FeatureRow) -> std::result::Result<f64, PredictorError> {
        Err(PredictorError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn row() -> FeatureRow {
        let ts = NaiveDate::from_ymd_opt(2024, 2, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut row = FeatureRow::new(ts, "pm_2_5");
        row.covariates.insert("humidity".into(), 50.0);
        row.lags = vec![20.0, 10.0];
        row.rolling_rate = 15.0;
        row
    }

    #[test]
    fn linear_model_from_json() {
        let model = LinearPredictor::from_json(
            r#"{
                "intercept": 2.0,
                "coefficients": {
                    "pm_2_5_lag_1": 0.5,
                    "pm_2_5_roll_rate_3": 0.2,
                    "humidity": -0.1,
                    "day": 0.05
                }
            }"#,
        )
        .unwrap();
        // 2 + 0.5·20 + 0.2·15 − 0.1·50 + 0.05·10
        assert_relative_eq!(model.predict(&row()).unwrap(), 10.5);
    }

    #[test]
    fn unknown_feature_is_a_prediction_error() {
        let mut coefficients = BTreeMap::new();
        coefficients.insert("pm_10".to_string(), 1.0);
        let model = LinearPredictor::new(0.0, coefficients);
        assert_eq!(
            model.predict(&row()),
            Err(PredictorError::MissingFeature("pm_10".into()))
        );
    }

    #[test]
    fn non_finite_output_is_rejected() {
        let mut r = row();
        r.rolling_rate = f64::NAN;
        let mut coefficients = BTreeMap::new();
        coefficients.insert("pm_2_5_roll_rate_3".to_string(), 1.0);
        let model = LinearPredictor::new(0.0, coefficients);
        assert_eq!(model.predict(&r), Err(PredictorError::NonFinite));
    }

    #[test]
    fn malformed_model_file_fails_to_load() {
        assert!(LinearPredictor::from_json(r#"{ "coefficients": [] }"#).is_err());
    }

    #[test]
    fn closures_are_predictors() {
        let double_lag = |r: &FeatureRow| -> std::result::Result<f64, PredictorError> {
            Ok(r.lags[0] * 2.0)
        };
        assert_eq!(double_lag.predict(&row()), Ok(40.0));
        assert_eq!(UnavailablePredictor.predict(&row()), Err(PredictorError::Unavailable));
    }
}
