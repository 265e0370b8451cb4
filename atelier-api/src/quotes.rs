use atelier_quote::{Quote, QuoteRequest};
use axum::{extract::State, routing::post, Json, Router};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/quotes", post(create_quote))
}

async fn create_quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    let quote = state.service.quote(&req)?;
    tracing::debug!(
        product_line = %quote.product_line_id,
        code = %quote.provider_code.code_string(),
        cached = quote.cached,
        "quote served"
    );
    Ok(Json(quote))
}
