// Vahan Insights - Web Server
// REST API over the registration table with Axum

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use vahan_insights::{
    compute_quarterly_growth, load_csv, manufacturer_growth, save_csv, telemetry, AppConfig,
    Category, DashboardSummary, DateRange, GeneratorConfig, QuarterlyAggregate, RecordFilter,
    RegistrationRecord, SampleDataGenerator, SeriesGrowth, YearMonth,
};

const MAX_REFRESH_YEARS: i32 = 50;

type Records = Arc<Vec<RegistrationRecord>>;

/// Shared application state
///
/// Handlers take a snapshot of the table; a refresh swaps in a new one.
#[derive(Clone)]
struct AppState {
    records: Arc<RwLock<Records>>,
    refresh_lock: Arc<tokio::sync::Mutex<()>>,
    csv_path: PathBuf,
    default_years: i32,
}

impl AppState {
    fn new(records: Vec<RegistrationRecord>, csv_path: PathBuf, default_years: i32) -> Self {
        Self {
            records: Arc::new(RwLock::new(Arc::new(records))),
            refresh_lock: Arc::new(tokio::sync::Mutex::new(())),
            csv_path,
            default_years,
        }
    }

    fn snapshot(&self) -> Result<Records, ApiError> {
        self.records
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| ApiError::Internal("record table lock poisoned".to_string()))
    }

    fn replace(&self, records: Vec<RegistrationRecord>) -> Result<(), ApiError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| ApiError::Internal("record table lock poisoned".to_string()))?;
        *guard = Arc::new(records);
        Ok(())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(ApiResponse::error(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Filter query string: `from`/`to` as YYYY-MM, comma-separated
/// `category` and `manufacturer` lists
#[derive(Debug, Default, Deserialize)]
struct FilterQuery {
    from: Option<String>,
    to: Option<String>,
    category: Option<String>,
    manufacturer: Option<String>,
}

impl FilterQuery {
    fn to_filter(&self, records: &[RegistrationRecord]) -> Result<RecordFilter, ApiError> {
        let mut filter = RecordFilter::all();

        let from = parse_month("from", self.from.as_deref())?;
        let to = parse_month("to", self.to.as_deref())?;
        if from.is_some() || to.is_some() {
            let span = DateRange::spanning(records);
            let start = from.or(span.map(|s| s.start));
            let end = to.or(span.map(|s| s.end));
            if let (Some(start), Some(end)) = (start, end) {
                let range = DateRange::new(start, end).map_err(ApiError::BadRequest)?;
                filter = filter.with_date_range(range);
            }
        }

        if let Some(raw) = &self.category {
            let categories = split_list(raw)
                .map(|code| code.parse::<Category>().map_err(ApiError::BadRequest))
                .collect::<Result<BTreeSet<_>, _>>()?;
            filter = filter.with_categories(categories);
        }

        if let Some(raw) = &self.manufacturer {
            filter = filter.with_manufacturers(split_list(raw));
        }

        Ok(filter)
    }
}

fn parse_month(field: &str, value: Option<&str>) -> Result<Option<YearMonth>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<YearMonth>()
            .map(Some)
            .map_err(|e| ApiError::BadRequest(format!("invalid `{}`: {}", field, e))),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
struct RefreshQuery {
    years: Option<i32>,
    seed: Option<u64>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    records: usize,
}

#[derive(Serialize)]
struct ManufacturerResponse {
    name: String,
    categories: Vec<Category>,
    total_registrations: u64,
}

#[derive(Serialize)]
struct ManufacturerGrowthResponse {
    manufacturer: String,
    overall: Vec<SeriesGrowth>,
    by_category: Vec<QuarterlyAggregate>,
}

#[derive(Serialize)]
struct RefreshResponse {
    records: usize,
    years: i32,
    seed: Option<u64>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let records = state.snapshot()?;
    Ok(Json(ApiResponse::ok(HealthResponse {
        status: "OK",
        records: records.len(),
    })))
}

/// GET /api/records - Filtered registration records
async fn get_records(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> ApiResult<Vec<RegistrationRecord>> {
    let records = state.snapshot()?;
    let filter = query.to_filter(&records)?;
    let selected = filter.apply(&records).into_iter().cloned().collect();
    Ok(Json(ApiResponse::ok(selected)))
}

/// GET /api/growth - Quarterly growth per (category, manufacturer)
async fn get_growth(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> ApiResult<Vec<QuarterlyAggregate>> {
    let records = state.snapshot()?;
    let filter = query.to_filter(&records)?;
    Ok(Json(ApiResponse::ok(compute_quarterly_growth(&records, &filter))))
}

/// GET /api/summary - Dashboard KPIs and insights
async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> ApiResult<DashboardSummary> {
    let records = state.snapshot()?;
    let filter = query.to_filter(&records)?;
    Ok(Json(ApiResponse::ok(DashboardSummary::build(&records, &filter))))
}

/// GET /api/manufacturers - Manufacturers present in the data
async fn get_manufacturers(State(state): State<AppState>) -> ApiResult<Vec<ManufacturerResponse>> {
    let records = state.snapshot()?;

    let mut by_name: BTreeMap<&str, (BTreeSet<Category>, u64)> = BTreeMap::new();
    for record in records.iter() {
        let entry = by_name.entry(record.manufacturer.as_str()).or_default();
        entry.0.insert(record.category);
        entry.1 = entry.1.saturating_add(record.count);
    }

    let response = by_name
        .into_iter()
        .map(|(name, (categories, total))| ManufacturerResponse {
            name: name.to_string(),
            categories: categories.into_iter().collect(),
            total_registrations: total,
        })
        .collect();

    Ok(Json(ApiResponse::ok(response)))
}

/// GET /api/manufacturers/:name/growth - Growth of one manufacturer
async fn get_manufacturer_growth(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<FilterQuery>,
) -> ApiResult<ManufacturerGrowthResponse> {
    let records = state.snapshot()?;

    // `Path` has already percent-decoded the segment
    if !records.iter().any(|r| r.manufacturer == name) {
        return Err(ApiError::NotFound(format!("unknown manufacturer: {}", name)));
    }

    let mut filter = query.to_filter(&records)?;
    filter.manufacturers = Some(BTreeSet::from([name.clone()]));

    Ok(Json(ApiResponse::ok(ManufacturerGrowthResponse {
        overall: manufacturer_growth(&records, &filter),
        by_category: compute_quarterly_growth(&records, &filter),
        manufacturer: name,
    })))
}

/// POST /api/refresh - Regenerate sample data, persist it, swap it in
async fn refresh_data(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> ApiResult<RefreshResponse> {
    let years = query.years.unwrap_or(state.default_years);
    if !(1..=MAX_REFRESH_YEARS).contains(&years) {
        return Err(ApiError::BadRequest(format!(
            "`years` must be between 1 and {}",
            MAX_REFRESH_YEARS
        )));
    }

    // One refresh at a time; readers keep using the old snapshot meanwhile
    let _guard = state.refresh_lock.lock().await;

    let csv_path = state.csv_path.clone();
    let seed = query.seed;
    let records = tokio::task::spawn_blocking(move || -> Result<Vec<RegistrationRecord>> {
        let records = SampleDataGenerator::new(GeneratorConfig {
            years,
            seed,
            ..GeneratorConfig::default()
        })
        .generate();
        save_csv(&csv_path, &records)?;
        Ok(records)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("refresh task failed: {}", e)))?
    .map_err(|e| ApiError::Internal(format!("{:#}", e)))?;

    let count = records.len();
    state.replace(records)?;
    info!(records = count, years, "sample data refreshed");

    Ok(Json(ApiResponse::ok(RefreshResponse {
        records: count,
        years,
        seed,
    })))
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn build_router(state: AppState) -> Router {
    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/records", get(get_records))
        .route("/growth", get(get_growth))
        .route("/summary", get(get_summary))
        .route("/manufacturers", get(get_manufacturers))
        .route("/manufacturers/:name/growth", get(get_manufacturer_growth))
        .route("/refresh", post(refresh_data))
        .with_state(state);

    // Build main router
    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(CorsLayer::permissive())
}

/// Load the CSV, or generate and persist sample data when it is missing
fn load_initial_records(config: &AppConfig) -> Result<Vec<RegistrationRecord>> {
    let path = &config.data.csv_path;
    if path.exists() {
        return Ok(load_csv(path)?);
    }

    warn!(path = %path.display(), "data file not found, generating sample data");
    let records = SampleDataGenerator::new(GeneratorConfig {
        years: config.generator.years,
        seed: config.generator.seed,
        ..GeneratorConfig::default()
    })
    .generate();
    save_csv(path, &records)?;
    Ok(records)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    telemetry::init(&config.log);

    println!("🌐 Vahan Insights - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let records = load_initial_records(&config)?;
    println!(
        "✓ Loaded {} records from {}",
        records.len(),
        config.data.csv_path.display()
    );

    let state = AppState::new(records, config.data.csv_path.clone(), config.generator.years);
    let app = build_router(state);

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/summary", addr);
    println!("   UI:  http://{}", addr);
    println!("\n   Press Ctrl+C to stop\n");
    info!(addr = %addr, "server listening");

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state(dir: &tempfile::TempDir) -> AppState {
        let records = SampleDataGenerator::new(GeneratorConfig {
            years: 2,
            end: YearMonth::new(2024, 12).unwrap(),
            seed: Some(21),
        })
        .generate();
        AppState::new(records, dir.path().join("vehicle_data.csv"), 2)
    }

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(build_router(test_state(&dir)), Method::GET, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["records"], 24 * 15);
    }

    #[tokio::test]
    async fn test_records_filtered_by_category_and_range() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(
            build_router(test_state(&dir)),
            Method::GET,
            "/api/records?category=2W,3W&from=2024-01&to=2024-03",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 3 * 10);
        assert!(rows.iter().all(|r| r["category"] != "4W"));
        assert!(rows.iter().all(|r| r["date"].as_str().unwrap().starts_with("2024-0")));
    }

    #[tokio::test]
    async fn test_growth_reports_missing_baseline_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(
            build_router(test_state(&dir)),
            Method::GET,
            "/api/growth?manufacturer=Honda",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 8);
        let first = rows.iter().find(|r| r["quarter"]["number"] == 1 && r["quarter"]["year"] == 2023).unwrap();
        assert!(first["qoq_growth"].is_null());
        assert!(first["yoy_growth"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_filter_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let (status, body) = call(app.clone(), Method::GET, "/api/summary?category=5W").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = call(app.clone(), Method::GET, "/api/growth?from=2024-13").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(app, Method::GET, "/api/growth?from=2024-06&to=2024-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_summary_empty_selection() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(
            build_router(test_state(&dir)),
            Method::GET,
            "/api/summary?manufacturer=Nobody",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["record_count"], 0);
        assert!(body["data"]["top_manufacturer"].is_null());
    }

    #[tokio::test]
    async fn test_manufacturers_and_growth_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let (_, body) = call(app.clone(), Method::GET, "/api/manufacturers").await;
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 12);
        let mahindra = list.iter().find(|m| m["name"] == "Mahindra").unwrap();
        assert_eq!(mahindra["categories"], serde_json::json!(["3W", "4W"]));

        let (status, body) = call(
            app.clone(),
            Method::GET,
            "/api/manufacturers/Maruti%20Suzuki/growth",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["manufacturer"], "Maruti Suzuki");
        assert_eq!(body["data"]["overall"].as_array().unwrap().len(), 8);

        let (status, _) = call(app, Method::GET, "/api/manufacturers/Nobody/growth").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_manufacturer_name_is_decoded_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let period = YearMonth::new(2024, 1).unwrap();
        state
            .replace(vec![RegistrationRecord::new(period, Category::FourWheeler, "Motors 100%25", 10)])
            .unwrap();
        let app = build_router(state);

        let (status, body) = call(app, Method::GET, "/api/manufacturers/Motors%20100%2525/growth").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["manufacturer"], "Motors 100%25");
    }

    #[tokio::test]
    async fn test_refresh_swaps_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let app = build_router(state.clone());

        let (status, body) = call(app.clone(), Method::POST, "/api/refresh?years=1&seed=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["records"], 12 * 15);

        assert_eq!(state.snapshot().unwrap().len(), 12 * 15);
        let saved = load_csv(&state.csv_path).unwrap();
        assert_eq!(saved.len(), 12 * 15);

        let (status, _) = call(app, Method::POST, "/api/refresh?years=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
