/// Типы данных для очистки и прогнозирования PM2.5

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use ndarray::Array1;
use serde::Serialize;

use crate::error::{Error, PredictorError, Result};

/// Значение одной ячейки таблицы
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Missing,
}

impl Value {
    /// NaN считается пропуском, как в pandas
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Number(v) => v.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Missing => Ok(()),
        }
    }
}

/// Таблица наблюдений: упорядоченные строки с общей схемой колонок
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Собирает таблицу, проверяя ширину каждой строки
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::InvalidRecord {
                    row: i,
                    reason: format!("expected {} values, got {}", columns.len(), row.len()),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidRecord {
                row: self.rows.len(),
                reason: format!("expected {} values, got {}", self.columns.len(), row.len()),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Числовые значения колонки; всё нечисловое превращается в NaN
    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row[idx].as_f64().unwrap_or(f64::NAN))
                .collect(),
        )
    }

    pub fn timestamp_column(&self, name: &str) -> Option<Vec<Option<NaiveDateTime>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_timestamp()).collect())
    }

    /// Новая таблица из строк с указанными индексами (порядок сохраняется)
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Строки в виде JSON-объектов для API; пропуски и NaN становятся `null`
    pub fn to_records(&self) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, val)| -> Result<(String, serde_json::Value)> {
                        Ok((col.clone(), serde_json::to_value(val)?))
                    })
                    .collect()
            })
            .collect()
    }
}

/// Границы выбросов для одной числовой колонки
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bounds {
    pub column: String,
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    /// Значение ровно на границе остаётся
    pub fn contains(&self, value: f64) -> bool {
        !(value < self.lower || value > self.upper)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub original_rows: usize,
    pub rows_after_drop_missing: usize,
    pub cleaned_rows: usize,
    /// Строки, удалённые фильтром выбросов (без учёта строк с пропусками)
    pub removed_rows: usize,
}

/// Строка признаков для одного шага прогноза.
///
/// Живёт ровно один шаг: создаётся и передаётся модели; в рабочую
/// историю дописывается уже только значение прогноза.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: NaiveDateTime,
    pub day: u32,
    pub hour: u32,
    pub covariates: BTreeMap<String, f64>,
    /// lags[k - 1] — значение целевой переменной с лагом k
    pub lags: Vec<f64>,
    pub rolling_rate: f64,
    target_name: String,
}

impl FeatureRow {
    pub fn new(timestamp: NaiveDateTime, target_name: impl Into<String>) -> Self {
        use chrono::{Datelike, Timelike};
        Self {
            timestamp,
            day: timestamp.day(),
            hour: timestamp.hour(),
            covariates: BTreeMap::new(),
            lags: Vec::new(),
            rolling_rate: f64::NAN,
            target_name: target_name.into(),
        }
    }

    pub fn lag_name(&self, lag: usize) -> String {
        format!("{}_lag_{}", self.target_name, lag)
    }

    pub fn rolling_rate_name(&self) -> String {
        format!("{}_roll_rate_3", self.target_name)
    }

    /// Имена всех признаков в стабильном порядке
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec!["day".to_string(), "hour".to_string()];
        names.extend(self.covariates.keys().cloned());
        names.extend((1..=self.lags.len()).map(|k| self.lag_name(k)));
        names.push(self.rolling_rate_name());
        names
    }

    /// Значение признака по имени
    pub fn feature(&self, name: &str) -> Option<f64> {
        match name {
            "day" => return Some(self.day as f64),
            "hour" => return Some(self.hour as f64),
            _ => {}
        }
        if let Some(v) = self.covariates.get(name) {
            return Some(*v);
        }
        if name == self.rolling_rate_name() {
            return Some(self.rolling_rate);
        }
        let lag = name
            .strip_prefix(self.target_name.as_str())?
            .strip_prefix("_lag_")?
            .parse::<usize>()
            .ok()?;
        if lag == 0 {
            return None;
        }
        self.lags.get(lag - 1).copied()
    }

    /// Вектор признаков в порядке `names`
    pub fn to_array(&self, names: &[String]) -> std::result::Result<Array1<f64>, PredictorError> {
        names
            .iter()
            .map(|name| {
                self.feature(name)
                    .ok_or_else(|| PredictorError::MissingFeature(name.clone()))
            })
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map(Array1::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,
    pub predicted: f64,
    pub covariates: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMean {
    pub date: NaiveDate,
    pub value: f64,
}

/// Экстремум прогноза вместе с датой
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastExtreme {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Сводка для слоя визуализации
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub current: f64,
    pub average_last_7_days: f64,
    pub forecast_max: ForecastExtreme,
    pub forecast_min: ForecastExtreme,
    pub forecast_average: f64,
    pub daily_history: Vec<DailyMean>,
}
