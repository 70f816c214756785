/// API сервер прогноза PM2.5

use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use pm25_forecast::{
    data, forecast_table, AppConfig, CleaningReport, Dataset, Error, ForecastPoint,
    ForecastSummary, LinearPredictor, OutlierCleaner, Predictor, RecursiveForecaster, Settings,
    SummaryBuilder, UnavailablePredictor,
};

/// Сколько суток синтетической истории подставлять, если файл не загрузился
const SAMPLE_DAYS: usize = 60;

#[derive(Clone)]
struct AppState {
    config: Arc<AppConfig>,
    history: Arc<Dataset>,
    predictor: Arc<dyn Predictor + Send + Sync>,
}

#[derive(Debug, Deserialize)]
struct ForecastRequest {
    records: Vec<serde_json::Value>,
    #[serde(default)]
    horizon_days: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ForecastResponse {
    forecast: Vec<ForecastPoint>,
    records: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct CleanRequest {
    records: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct CleanResponse {
    report: CleaningReport,
    records: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    summary: ForecastSummary,
    forecast: Vec<ForecastPoint>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::from_env();
    let config = settings.app_config()?;
    let state = load_state(&settings, config)?;

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Server listening on http://{}", settings.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Загружает и очищает историю, загружает модель.
/// Ошибки загрузки не фатальны: подставляются синтетические данные и заглушка модели.
fn load_state(settings: &Settings, config: AppConfig) -> anyhow::Result<AppState> {
    let raw = match data::load_file(&settings.data_path, &config.forecast.timestamp_column) {
        Ok(dataset) => dataset,
        Err(e) => {
            tracing::warn!(
                "Failed to load data from {}: {}. Using sample data",
                settings.data_path.display(),
                e
            );
            let end = chrono::Local::now()
                .naive_local()
                .date()
                .and_hms_opt(23, 0, 0)
                .ok_or_else(|| anyhow::anyhow!("invalid sample end time"))?;
            data::generate_history(end, SAMPLE_DAYS, 123)
        }
    };

    let (history, _) = OutlierCleaner::new(config.cleaner.clone()).clean(&raw)?;
    if history.is_empty() {
        anyhow::bail!("no rows left after cleaning {}", settings.data_path.display());
    }

    let predictor: Arc<dyn Predictor + Send + Sync> =
        match LinearPredictor::load(&settings.model_path) {
            Ok(model) => Arc::new(model),
            Err(e) => {
                tracing::warn!(
                    "Failed to load model from {}: {}. Forecast will use trailing means",
                    settings.model_path.display(),
                    e
                );
                Arc::new(UnavailablePredictor)
            }
        };

    Ok(AppState {
        config: Arc::new(config),
        history: Arc::new(history),
        predictor,
    })
}

fn router(state: AppState) -> Router {
    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/forecast", get(forecast_latest).post(forecast_records))
        .route("/api/clean", post(clean_records))
        .route("/api/summary", get(summary))
        .layer(cors)
        .with_state(state)
}

fn error_response(e: Error) -> (StatusCode, String) {
    let status = match e {
        Error::MissingColumn(_)
        | Error::EmptyHistory
        | Error::NoTimestamps(_)
        | Error::InvalidRecord { .. }
        | Error::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "PM2.5 Forecast API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn run_forecast(
    state: &AppState,
    history: &Dataset,
    horizon_days: Option<usize>,
) -> Result<ForecastResponse, Error> {
    let mut config = state.config.forecast.clone();
    if let Some(days) = horizon_days {
        config.horizon_days = days;
    }
    let forecaster = RecursiveForecaster::new(config);
    let points = forecaster.forecast(state.predictor.as_ref(), history)?;
    let records = forecast_table(&points, forecaster.config()).to_records()?;
    Ok(ForecastResponse {
        forecast: points,
        records,
    })
}

async fn forecast_latest(State(state): State<AppState>) -> ApiResult<ForecastResponse> {
    tracing::info!("Forecast request: {} history rows", state.history.len());
    run_forecast(&state, &state.history, None)
        .map(Json)
        .map_err(error_response)
}

async fn forecast_records(
    State(state): State<AppState>,
    Json(request): Json<ForecastRequest>,
) -> ApiResult<ForecastResponse> {
    tracing::info!("Forecast request: {} records", request.records.len());

    let history = data::from_records(&request.records, &state.config.forecast.timestamp_column)
        .map_err(error_response)?;
    run_forecast(&state, &history, request.horizon_days)
        .map(Json)
        .map_err(error_response)
}

async fn clean_records(
    State(state): State<AppState>,
    Json(request): Json<CleanRequest>,
) -> ApiResult<CleanResponse> {
    tracing::info!("Clean request: {} records", request.records.len());

    let dataset = data::from_records(&request.records, &state.config.forecast.timestamp_column)
        .map_err(error_response)?;
    let (cleaned, report) = OutlierCleaner::new(state.config.cleaner.clone())
        .clean(&dataset)
        .map_err(error_response)?;

    let records = cleaned.to_records().map_err(error_response)?;
    Ok(Json(CleanResponse { report, records }))
}

async fn summary(State(state): State<AppState>) -> ApiResult<SummaryResponse> {
    let response = run_forecast(&state, &state.history, None).map_err(error_response)?;
    let summary = SummaryBuilder::build(&state.history, &response.forecast, &state.config.forecast)
        .map_err(error_response)?;

    Ok(Json(SummaryResponse {
        summary,
        forecast: response.forecast,
    }))
}
