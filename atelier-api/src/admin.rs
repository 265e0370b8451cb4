use atelier_catalog::{ImportRecord, ImportReport};
use atelier_quote::PriceListing;
use atelier_shared::{PriceRecord, RecordKey};
use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub records: Vec<ImportRecord>,
}

#[derive(Debug, Deserialize)]
pub struct GlobalMarkupRequest {
    pub markup_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct GlobalMarkupResponse {
    pub markup_percent: f64,
    pub updated: usize,
}

/// `markup_percent: null` clears the override
#[derive(Debug, Deserialize)]
pub struct RecordMarkupRequest {
    #[serde(flatten)]
    pub key: RecordKey,
    pub markup_percent: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    pub removed: usize,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/price-records", get(list_price_records))
        .route("/v1/admin/price-records/import", post(import_price_records))
        .route("/v1/admin/price-records/markup", put(set_record_markup))
        .route("/v1/admin/markup", put(set_global_markup))
        .route("/v1/admin/cache/clear", post(clear_cache))
        .route("/v1/admin/cache/clear-expired", post(clear_expired_cache))
}

async fn list_price_records(State(state): State<AppState>) -> Result<Json<PriceListing>, AppError> {
    Ok(Json(state.service.price_listing()?))
}

async fn import_price_records(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportReport>, AppError> {
    let report = state
        .run_blocking(move |service| service.import_catalog(req.records))
        .await?;
    Ok(Json(report))
}

async fn set_global_markup(
    State(state): State<AppState>,
    Json(req): Json<GlobalMarkupRequest>,
) -> Result<Json<GlobalMarkupResponse>, AppError> {
    let percent = req.markup_percent;
    let updated = state
        .run_blocking(move |service| service.set_global_markup(percent))
        .await?;
    Ok(Json(GlobalMarkupResponse {
        markup_percent: percent,
        updated,
    }))
}

async fn set_record_markup(
    State(state): State<AppState>,
    Json(req): Json<RecordMarkupRequest>,
) -> Result<Json<PriceRecord>, AppError> {
    let record = state
        .run_blocking(move |service| service.set_record_markup(&req.key, req.markup_percent))
        .await?;
    Ok(Json(record))
}

async fn clear_cache(State(state): State<AppState>) -> Json<CacheClearResponse> {
    Json(CacheClearResponse {
        removed: state.service.clear_cache(),
    })
}

async fn clear_expired_cache(State(state): State<AppState>) -> Json<CacheClearResponse> {
    Json(CacheClearResponse {
        removed: state.service.clear_expired_cache(),
    })
}
