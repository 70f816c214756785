/// Слой данных: загрузка таблиц и синтетические данные.
///
/// ```text
///  .csv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  файл → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌─────────────────┐
///   │ OutlierCleaner  │  пропуски, IQR-фильтр
///   └─────────────────┘
///        │
///        ▼
///   ┌─────────────────────┐
///   │ RecursiveForecaster │  7 дней вперёд
///   └─────────────────────┘
/// ```

pub mod loader;
pub mod sample;

pub use loader::{from_records, load_file, parse_timestamp, read_csv, write_csv, write_csv_to};
pub use sample::generate_history;
