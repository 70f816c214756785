//! Синтетическая почасовая история на случай, когда файл данных не загрузился

use std::f64::consts::PI;

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Dataset, Value};

/// Координаты точки измерения (Хатъяй)
const LATITUDE: f64 = 7.0086;
const LONGITUDE: f64 = 100.4747;

/// `days` суток почасовых данных, заканчивающихся в `end` включительно.
/// Одинаковый `seed` даёт одинаковые данные.
pub fn generate_history(end: NaiveDateTime, days: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let hours = days * 24;
    let start = end - Duration::hours(hours as i64 - 1);

    let columns = ["timestamp", "pm_2_5", "humidity", "temperature", "latitude", "longitude"]
        .iter()
        .map(|c| c.to_string())
        .collect();

    let rows = (0..hours)
        .map(|i| {
            let ts = start + Duration::hours(i as i64);
            let hour = (i % 24) as f64;
            // Суточный цикл: пик PM2.5 утром, пик температуры днём
            let daily = (2.0 * PI * (hour - 8.0) / 24.0).cos();
            let heat = (2.0 * PI * (hour - 14.0) / 24.0).cos();

            let pm25 = (35.0 + 12.0 * daily + rng.gen_range(-6.0..6.0)).max(1.0);
            let temperature = 29.0 + 4.0 * heat + rng.gen_range(-1.0..1.0);
            let humidity = (75.0 - 10.0 * heat + rng.gen_range(-3.0..3.0)).clamp(0.0, 100.0);

            vec![
                Value::Timestamp(ts),
                Value::Number((pm25 * 10.0).round() / 10.0),
                Value::Number((humidity * 10.0).round() / 10.0),
                Value::Number((temperature * 10.0).round() / 10.0),
                Value::Number(LATITUDE),
                Value::Number(LONGITUDE),
            ]
        })
        .collect();

    Dataset { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn end() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
    }

    #[test]
    fn sample_is_hourly_and_ends_at_requested_time() {
        let data = generate_history(end(), 3, 7);
        assert_eq!(data.len(), 72);
        let ts = data.timestamp_column("timestamp").unwrap();
        assert_eq!(ts.last().copied().flatten(), Some(end()));
        for pair in ts.windows(2) {
            assert_eq!(pair[1].unwrap() - pair[0].unwrap(), Duration::hours(1));
        }
        let pm = data.numeric_column("pm_2_5").unwrap();
        assert!(pm.iter().all(|v| *v >= 1.0 && *v < 60.0));
    }

    #[test]
    fn same_seed_same_data() {
        assert_eq!(generate_history(end(), 2, 42), generate_history(end(), 2, 42));
        assert_ne!(generate_history(end(), 2, 42), generate_history(end(), 2, 43));
    }
}
