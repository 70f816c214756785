//! Очистка выбросов по межквартильному размаху

use crate::config::CleanerConfig;
use crate::error::{Error, Result};
use crate::types::{Bounds, CleaningReport, Dataset, Value};

pub struct OutlierCleaner {
    config: CleanerConfig,
    bounds: Option<Vec<(usize, Bounds)>>,
    is_fitted: bool,
}

impl OutlierCleaner {
    pub fn new(config: CleanerConfig) -> Self {
        Self {
            config,
            bounds: None,
            is_fitted: false,
        }
    }

    /// Удаляет строки, где пропущено хотя бы одно значение
    pub fn drop_missing(dataset: &Dataset) -> Dataset {
        let keep: Vec<usize> = dataset
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.iter().any(Value::is_missing))
            .map(|(i, _)| i)
            .collect();
        dataset.select_rows(&keep)
    }

    /// Индексы колонок, где каждое присутствующее значение числовое.
    /// Пропуски тип колонки не меняют.
    pub fn numeric_columns(dataset: &Dataset) -> Vec<usize> {
        if dataset.is_empty() {
            return Vec::new();
        }
        (0..dataset.columns.len())
            .filter(|&col| {
                dataset
                    .rows
                    .iter()
                    .all(|row| row[col].is_missing() || matches!(row[col], Value::Number(_)))
            })
            .collect()
    }

    /// Считает границы по таблице без пропусков
    pub fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        let columns = Self::numeric_columns(dataset);
        self.fit_columns(dataset, &columns)
    }

    /// Границы для заранее выбранных колонок
    pub fn fit_columns(&mut self, dataset: &Dataset, columns: &[usize]) -> Result<()> {
        self.config.validate()?;
        let mut bounds = Vec::new();

        for &col in columns {
            let mut values: Vec<f64> = dataset
                .rows
                .iter()
                .filter_map(|row| row[col].as_f64())
                .collect();
            values.sort_by(|a, b| a.total_cmp(b));

            let q1 = quantile(&values, self.config.lower_quantile);
            let q3 = quantile(&values, self.config.upper_quantile);
            let iqr = q3 - q1;

            bounds.push((
                col,
                Bounds {
                    column: dataset.columns[col].clone(),
                    q1,
                    q3,
                    lower: q1 - self.config.iqr_multiplier * iqr,
                    upper: q3 + self.config.iqr_multiplier * iqr,
                },
            ));
        }

        tracing::debug!("Fitted outlier bounds for {} numeric columns", bounds.len());
        self.bounds = Some(bounds);
        self.is_fitted = true;
        Ok(())
    }

    pub fn bounds(&self) -> Option<Vec<&Bounds>> {
        self.bounds
            .as_ref()
            .map(|bounds| bounds.iter().map(|(_, b)| b).collect())
    }

    /// Оставляет строки, у которых ВСЕ числовые колонки в своих границах
    pub fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        if !self.is_fitted {
            return Err(Error::NotFitted);
        }
        let bounds = self.bounds.as_ref().ok_or(Error::NotFitted)?;

        // Колонки ищем по имени: таблица может отличаться от той, на которой считали
        let mut resolved = Vec::with_capacity(bounds.len());
        for (_, b) in bounds {
            let idx = dataset
                .column_index(&b.column)
                .ok_or_else(|| Error::MissingColumn(b.column.clone()))?;
            resolved.push((idx, b));
        }

        let keep: Vec<usize> = dataset
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                resolved.iter().all(|(idx, b)| match row[*idx].as_f64() {
                    Some(v) => b.contains(v),
                    None => false,
                })
            })
            .map(|(i, _)| i)
            .collect();

        Ok(dataset.select_rows(&keep))
    }

    /// Полный проход: пропуски → границы → фильтрация
    pub fn clean(&mut self, dataset: &Dataset) -> Result<(Dataset, CleaningReport)> {
        self.config.validate()?;
        // Тип колонки определяется по исходной таблице, до удаления строк
        let numeric = Self::numeric_columns(dataset);
        let complete = Self::drop_missing(dataset);
        self.fit_columns(&complete, &numeric)?;
        let cleaned = self.transform(&complete)?;

        let report = CleaningReport {
            original_rows: dataset.len(),
            rows_after_drop_missing: complete.len(),
            cleaned_rows: cleaned.len(),
            removed_rows: complete.len() - cleaned.len(),
        };
        tracing::info!(
            "Cleaned dataset: {} of {} rows kept ({} outliers removed, {} rows with missing values dropped)",
            report.cleaned_rows,
            report.original_rows,
            report.removed_rows,
            report.original_rows - report.rows_after_drop_missing
        );

        Ok((cleaned, report))
    }
}

impl Default for OutlierCleaner {
    fn default() -> Self {
        Self::new(CleanerConfig::default())
    }
}

/// Очистка с настройками по умолчанию
pub fn clean(dataset: &Dataset) -> Result<(Dataset, CleaningReport)> {
    OutlierCleaner::default().clean(dataset)
}

/// Квантиль с линейной интерполяцией; `sorted` отсортирован по возрастанию
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = pos - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}
