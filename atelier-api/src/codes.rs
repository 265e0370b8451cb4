use atelier_provider::{StructuredCode, TokenCode};
use atelier_shared::ProductSelection;
use axum::{extract::State, routing::post, Json, Router};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/codes/structured", post(structured_code))
        .route("/v1/codes/token", post(token_code))
}

async fn structured_code(
    State(state): State<AppState>,
    Json(selection): Json<ProductSelection>,
) -> Result<Json<StructuredCode>, AppError> {
    Ok(Json(state.service.structured_code(&selection)?))
}

async fn token_code(
    State(state): State<AppState>,
    Json(selection): Json<ProductSelection>,
) -> Result<Json<TokenCode>, AppError> {
    Ok(Json(state.service.token_code(&selection)?))
}
