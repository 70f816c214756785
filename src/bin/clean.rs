//! Очистка файла наблюдений от пропусков и выбросов.
//!
//! Использование: `clean <input.csv|json> <output.csv> [config.json]`

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use pm25_forecast::{data, AppConfig, OutlierCleaner};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.len() > 3 {
        bail!("usage: clean <input.csv|json> <output.csv> [config.json]");
    }
    let input = PathBuf::from(&args[0]);
    let output = PathBuf::from(&args[1]);
    let config = match args.get(2) {
        Some(path) => AppConfig::from_file(Path::new(path))
            .with_context(|| format!("reading config {path}"))?,
        None => AppConfig::default(),
    };

    let dataset = data::load_file(&input, &config.forecast.timestamp_column)
        .with_context(|| format!("loading {}", input.display()))?;
    let (cleaned, report) = OutlierCleaner::new(config.cleaner).clean(&dataset)?;
    data::write_csv(&cleaned, &output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Cleaned data has {} rows out of {} (removed {} outliers, {} rows with missing values)",
        report.cleaned_rows,
        report.rows_after_drop_missing,
        report.removed_rows,
        report.original_rows - report.rows_after_drop_missing
    );
    Ok(())
}
