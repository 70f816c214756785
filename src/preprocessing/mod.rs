/// Модуль предобработки данных

pub mod feature_engineering;
pub mod outliers;

pub use feature_engineering::{FeatureEngineer, HistorySeries};
pub use outliers::{clean, quantile, OutlierCleaner};
