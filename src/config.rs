//! Настройки очистки, прогноза и сервера

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Верхняя граница горизонта прогноза, дней
pub const MAX_HORIZON_DAYS: usize = 366;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
    #[serde(default = "default_target_column")]
    pub target_column: String,
    #[serde(default = "default_covariates")]
    pub covariates: Vec<String>,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: usize,
    #[serde(default = "default_lag_periods")]
    pub lag_periods: usize,
    #[serde(default = "default_periods_per_day")]
    pub periods_per_day: usize, // строк истории на сутки
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize, // 3 дня почасовых данных
    #[serde(default = "default_covariate_window")]
    pub covariate_window: usize, // 30 дней почасовых данных
    #[serde(default = "default_rolling_prediction_window")]
    pub rolling_prediction_window: usize,
    #[serde(default = "default_fallback_window")]
    pub fallback_window: usize,
    #[serde(default = "default_summary_history_days")]
    pub summary_history_days: usize,
}

fn default_timestamp_column() -> String { "timestamp".to_string() }
fn default_target_column() -> String { "pm_2_5".to_string() }
fn default_covariates() -> Vec<String> { vec!["humidity".to_string(), "temperature".to_string()] }
fn default_horizon_days() -> usize { 7 }
fn default_lag_periods() -> usize { 7 }
fn default_periods_per_day() -> usize { 24 }
fn default_rolling_window() -> usize { 72 }
fn default_covariate_window() -> usize { 720 }
fn default_rolling_prediction_window() -> usize { 3 }
fn default_fallback_window() -> usize { 24 }
fn default_summary_history_days() -> usize { 30 }

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            timestamp_column: default_timestamp_column(),
            target_column: default_target_column(),
            covariates: default_covariates(),
            horizon_days: default_horizon_days(),
            lag_periods: default_lag_periods(),
            periods_per_day: default_periods_per_day(),
            rolling_window: default_rolling_window(),
            covariate_window: default_covariate_window(),
            rolling_prediction_window: default_rolling_prediction_window(),
            fallback_window: default_fallback_window(),
            summary_history_days: default_summary_history_days(),
        }
    }
}

impl ForecastConfig {
    pub fn with_horizon(mut self, horizon_days: usize) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("periods_per_day", self.periods_per_day),
            ("rolling_window", self.rolling_window),
            ("covariate_window", self.covariate_window),
            ("rolling_prediction_window", self.rolling_prediction_window),
            ("fallback_window", self.fallback_window),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be positive")));
            }
        }
        if self.horizon_days > MAX_HORIZON_DAYS {
            return Err(Error::Config(format!(
                "horizon_days must not exceed {MAX_HORIZON_DAYS}, got {}",
                self.horizon_days
            )));
        }
        if self.target_column.is_empty() || self.timestamp_column.is_empty() {
            return Err(Error::Config("column names must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanerConfig {
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
    #[serde(default = "default_lower_quantile")]
    pub lower_quantile: f64,
    #[serde(default = "default_upper_quantile")]
    pub upper_quantile: f64,
}

fn default_iqr_multiplier() -> f64 { 1.5 }
fn default_lower_quantile() -> f64 { 0.25 }
fn default_upper_quantile() -> f64 { 0.75 }

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier: default_iqr_multiplier(),
            lower_quantile: default_lower_quantile(),
            upper_quantile: default_upper_quantile(),
        }
    }
}

impl CleanerConfig {
    pub fn validate(&self) -> Result<()> {
        let in_range = |q: f64| (0.0..=1.0).contains(&q);
        if !in_range(self.lower_quantile) || !in_range(self.upper_quantile) {
            return Err(Error::Config("quantiles must lie in [0, 1]".to_string()));
        }
        if self.lower_quantile > self.upper_quantile {
            return Err(Error::Config("lower_quantile exceeds upper_quantile".to_string()));
        }
        if self.iqr_multiplier.is_nan() || self.iqr_multiplier < 0.0 {
            return Err(Error::Config("iqr_multiplier must be non-negative".to_string()));
        }
        Ok(())
    }
}

/// Содержимое JSON-файла настроек
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub cleaner: CleanerConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&text)?;
        config.forecast.validate()?;
        config.cleaner.validate()?;
        Ok(config)
    }
}

/// Настройки сервера из переменных окружения
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    pub bind_addr: String,
    pub config_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("cleaned_data.csv"),
            model_path: PathBuf::from("final_model.json"),
            bind_addr: "0.0.0.0:8000".to_string(),
            config_path: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Чтение настроек через произвольный источник (удобно в тестах)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_path: lookup("PM25_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            model_path: lookup("PM25_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            bind_addr: lookup("PM25_BIND_ADDR").unwrap_or(defaults.bind_addr),
            config_path: lookup("PM25_CONFIG_PATH").map(PathBuf::from),
        }
    }

    pub fn app_config(&self) -> Result<AppConfig> {
        match &self.config_path {
            Some(path) => AppConfig::from_file(path),
            None => Ok(AppConfig::default()),
        }
    }
}
