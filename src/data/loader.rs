use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::types::{Dataset, Value};

// ---------------------------------------------------------------------------
// Точка входа
// ---------------------------------------------------------------------------

/// Загрузка таблицы наблюдений; формат по расширению.
///
/// * `.csv`  – строка заголовков, далее значения
/// * `.json` – `[{ "timestamp": "...", "pm_2_5": 12.0, ... }, ...]`
///
/// Значения колонки `timestamp_column` разбираются как дата-время;
/// нераспознанные становятся пропусками.
pub fn load_file(path: &Path, timestamp_column: &str) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path, timestamp_column)?,
        "json" => load_json(path, timestamp_column)?,
        other => return Err(Error::UnsupportedFormat(other.to_string())),
    };
    tracing::info!(
        "Loaded {} rows, {} columns from {}",
        dataset.len(),
        dataset.columns.len(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub fn load_csv(path: &Path, timestamp_column: &str) -> Result<Dataset> {
    let file = std::fs::File::open(path)?;
    read_csv(file, timestamp_column)
}

pub fn read_csv<R: Read>(reader: R, timestamp_column: &str) -> Result<Dataset> {
    let mut reader = csv::Reader::from_reader(reader);
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let ts_idx = columns.iter().position(|c| c == timestamp_column);

    let mut dataset = Dataset::new(columns);
    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        let row: Vec<Value> = record
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                if Some(i) == ts_idx {
                    parse_timestamp(raw).map(Value::Timestamp).unwrap_or(Value::Missing)
                } else {
                    guess_value(raw)
                }
            })
            .collect();
        dataset.push_row(row).map_err(|_| Error::InvalidRecord {
            row: row_no,
            reason: format!("expected {} fields, got {}", dataset.columns.len(), record.len()),
        })?;
    }
    Ok(dataset)
}

pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv_to(dataset, file)?;
    tracing::info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

pub fn write_csv_to<W: Write>(dataset: &Dataset, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&dataset.columns)?;
    for row in &dataset.rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn guess_value(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() || matches!(s, "nan" | "NaN" | "NA" | "N/A" | "null") {
        return Value::Missing;
    }
    match s.parse::<f64>() {
        Ok(v) => Value::Number(v),
        Err(_) => Value::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn load_json(path: &Path, timestamp_column: &str) -> Result<Dataset> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;
    let records = root.as_array().ok_or_else(|| Error::InvalidRecord {
        row: 0,
        reason: "expected top-level JSON array".to_string(),
    })?;
    from_records(records, timestamp_column)
}

/// Таблица из массива JSON-объектов; отсутствующие ключи — пропуски
pub fn from_records(records: &[JsonValue], timestamp_column: &str) -> Result<Dataset> {
    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| Error::InvalidRecord {
            row: i,
            reason: "not a JSON object".to_string(),
        })?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut dataset = Dataset::new(columns.clone());
    for (i, rec) in records.iter().enumerate() {
        // Проверено в первом проходе
        let Some(obj) = rec.as_object() else { continue };
        let mut row = Vec::with_capacity(columns.len());
        for col in &columns {
            let value = match obj.get(col) {
                None | Some(JsonValue::Null) => Value::Missing,
                Some(JsonValue::String(s)) if col == timestamp_column => {
                    parse_timestamp(s).map(Value::Timestamp).unwrap_or(Value::Missing)
                }
                Some(JsonValue::String(s)) => Value::Text(s.clone()),
                Some(JsonValue::Number(n)) => n.as_f64().map(Value::Number).unwrap_or(Value::Missing),
                Some(JsonValue::Bool(b)) => Value::Text(b.to_string()),
                Some(other) => {
                    return Err(Error::InvalidRecord {
                        row: i,
                        reason: format!("column '{col}' has unsupported value {other}"),
                    })
                }
            };
            row.push(value);
        }
        dataset.push_row(row)?;
    }
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Даты
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Разбор даты-времени; `None` для всего нераспознанного
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_local());
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}
