use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::bookmarks::BookmarkSet;
use crate::catalog::normalize::normalize_transcript;
use crate::catalog::source::{load_catalog_snapshot, provider_from_config};
use crate::catalog::{CatalogSnapshot, Transcript};
use crate::config::Config;
use crate::eligibility::evaluator::evaluate_in_snapshot;
use crate::eligibility::history::{record_from_report, summarize_history, CheckRecord};
use crate::eligibility::EligibilityReport;
use crate::query::filter::filter_programmes;
use crate::query::group::{group_by_cluster, Bucket};
use crate::query::sort::{sort_programmes, SortKey};
use crate::query::FilterSpec;
use crate::snapshot::cache::SnapshotCache;
use crate::snapshot::store::SnapshotStore;

const CATALOG_CACHE_KEY: &str = "catalog";
const CATALOG_TAG: &str = "catalog";

#[derive(Clone)]
struct ApiState {
    config: Config,
    db_path: PathBuf,
    cache: Arc<Mutex<SnapshotCache<CatalogSnapshot>>>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Deserialize, Default)]
struct BrowseRequest {
    #[serde(default)]
    filter: FilterSpec,
    sort: Option<String>,
    #[serde(default)]
    bookmarks: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct GroupsRequest {
    #[serde(default)]
    filter: FilterSpec,
    #[serde(default)]
    bookmarks: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct EligibilityRequest {
    programme_id: u64,
    index_number: Option<String>,
    /// Raw subject-result records; takes precedence over `index_number`.
    results: Option<Vec<Value>>,
    #[serde(default = "default_true")]
    persist_history: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct HistoryRequest {
    index_number: Option<String>,
    programme_id: Option<u64>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct BrowseResponse {
    total: usize,
    programmes: Vec<crate::catalog::Programme>,
}

#[derive(Debug, Serialize)]
struct GroupsResponse {
    buckets: Vec<Bucket>,
}

#[derive(Debug, Serialize)]
struct EligibilityResponse {
    programme_name: String,
    report: EligibilityReport,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    summary: String,
    records: Vec<CheckRecord>,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    invalidated: usize,
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let state = ApiState {
        db_path: config.resolved_db_path(),
        config,
        cache: Arc::new(Mutex::new(SnapshotCache::new())),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/v1/browse", post(browse))
        .route("/v1/groups", post(groups))
        .route("/v1/eligibility", post(eligibility))
        .route("/v1/history", post(history))
        .route("/v1/refresh", post(refresh))
        .route("/v1/config", get(show_config))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse { status: "ok" })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config)
}

async fn browse(
    State(state): State<ApiState>,
    Json(request): Json<BrowseRequest>,
) -> ApiResult<BrowseResponse> {
    let snapshot = cached_snapshot(&state).await?;
    let bookmarks = BookmarkSet::from_ids(request.bookmarks);
    let mut programmes = filter_programmes(&snapshot.programmes, &request.filter, &bookmarks);
    if let Some(raw_key) = request.sort.as_deref() {
        let key: SortKey = raw_key
            .parse()
            .map_err(|e: crate::query::sort::SortKeyParseError| {
                ApiError::bad_request(e.to_string())
            })?;
        programmes = sort_programmes(&programmes, key);
    }

    Ok(ok(BrowseResponse {
        total: programmes.len(),
        programmes,
    }))
}

async fn groups(
    State(state): State<ApiState>,
    Json(request): Json<GroupsRequest>,
) -> ApiResult<GroupsResponse> {
    let snapshot = cached_snapshot(&state).await?;
    let bookmarks = BookmarkSet::from_ids(request.bookmarks);
    let filtered = filter_programmes(&snapshot.programmes, &request.filter, &bookmarks);
    let buckets = group_by_cluster(&filtered, &snapshot.clusters);
    Ok(ok(GroupsResponse { buckets }))
}

async fn eligibility(
    State(state): State<ApiState>,
    Json(request): Json<EligibilityRequest>,
) -> ApiResult<EligibilityResponse> {
    let snapshot = cached_snapshot(&state).await?;
    let programme = snapshot
        .programme(request.programme_id)
        .cloned()
        .ok_or_else(|| {
            ApiError::bad_request(format!("unknown programme id: {}", request.programme_id))
        })?;

    let index_number = request
        .index_number
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| state.config.student.index_number.clone());
    let transcript = resolve_transcript(&state, &request, &index_number).await?;

    let report = evaluate_in_snapshot(&snapshot, &programme, &transcript);

    if request.persist_history {
        let store = open_store(&state)?;
        let record = record_from_report(index_number, &programme, &report);
        store
            .insert_check_record(&record)
            .map_err(ApiError::internal)?;
    }

    Ok(ok(EligibilityResponse {
        programme_name: programme.name,
        report,
    }))
}

async fn history(
    State(state): State<ApiState>,
    Json(request): Json<HistoryRequest>,
) -> ApiResult<HistoryResponse> {
    let index_number = request
        .index_number
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| state.config.student.index_number.clone());
    if index_number.trim().is_empty() {
        return Err(ApiError::bad_request("index_number is required"));
    }
    let limit = request.limit.unwrap_or(50).max(1);

    let store = open_store(&state)?;
    let records = store
        .load_history(&index_number, request.programme_id, limit)
        .map_err(ApiError::internal)?;
    let summary = summarize_history(&records, request.programme_id);

    Ok(ok(HistoryResponse { summary, records }))
}

/// Explicit cache invalidation hook: after the upstream catalog mutates,
/// callers drop the cached snapshot and the next query refetches.
async fn refresh(State(state): State<ApiState>) -> ApiResult<RefreshResponse> {
    let invalidated = {
        let mut cache = state.cache.lock().expect("catalog cache mutex poisoned");
        cache.invalidate(CATALOG_TAG)
    };
    Ok(ok(RefreshResponse { invalidated }))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

fn default_true() -> bool {
    true
}

fn open_store(state: &ApiState) -> std::result::Result<SnapshotStore, ApiError> {
    SnapshotStore::open(&state.db_path).map_err(ApiError::internal)
}

async fn cached_snapshot(state: &ApiState) -> std::result::Result<CatalogSnapshot, ApiError> {
    let cached = {
        let cache = state.cache.lock().expect("catalog cache mutex poisoned");
        cache.get(CATALOG_CACHE_KEY).map(|entry| entry.data.clone())
    };
    if let Some(snapshot) = cached {
        return Ok(snapshot);
    }

    let provider = provider_from_config(&state.config);
    let snapshot = load_catalog_snapshot(provider.as_ref())
        .await
        .map_err(ApiError::internal)?;
    if let Ok(store) = open_store(state) {
        if let Err(error) = store.insert_snapshot(&snapshot) {
            warn!("failed persisting catalog snapshot: {error}");
        }
    }

    let mut cache = state.cache.lock().expect("catalog cache mutex poisoned");
    cache.put(
        CATALOG_CACHE_KEY,
        vec![CATALOG_TAG.to_string()],
        snapshot.clone(),
    );
    Ok(snapshot)
}

async fn resolve_transcript(
    state: &ApiState,
    request: &EligibilityRequest,
    index_number: &str,
) -> std::result::Result<Transcript, ApiError> {
    if let Some(raw) = &request.results {
        let (transcript, failures) = normalize_transcript(raw);
        for failure in &failures {
            warn!(
                "dropping malformed result record at index {}: {}",
                failure.index, failure.error
            );
        }
        return Ok(transcript);
    }
    if index_number.trim().is_empty() {
        return Err(ApiError::bad_request(
            "either inline results or an index_number is required",
        ));
    }
    let provider = provider_from_config(&state.config);
    let raw = provider
        .fetch_student_results(index_number)
        .await
        .map_err(ApiError::internal)?;
    let (transcript, failures) = normalize_transcript(&raw);
    for failure in &failures {
        warn!(
            "dropping malformed result record at index {}: {}",
            failure.index, failure.error
        );
    }
    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_request_tolerates_minimal_payload() {
        let request: BrowseRequest = serde_json::from_str("{}").expect("should deserialize");
        assert_eq!(request.filter, FilterSpec::default());
        assert!(request.bookmarks.is_empty());
        assert!(request.sort.is_none());
    }

    #[test]
    fn eligibility_request_defaults_persist_history() {
        let request: EligibilityRequest =
            serde_json::from_str(r#"{"programme_id": 101}"#).expect("should deserialize");
        assert!(request.persist_history);
        assert!(request.results.is_none());
    }
}
