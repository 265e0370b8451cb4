use atelier_catalog::{CatalogError, MarkupError};
use atelier_provider::TranslationError;
use atelier_quote::QuoteError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    UnprocessableError(String),
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFoundError(_) => StatusCode::NOT_FOUND,
            AppError::UnprocessableError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::ValidationError(msg)
            | AppError::NotFoundError(msg)
            | AppError::UnprocessableError(msg) => msg,
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        let msg = err.to_string();
        match err {
            QuoteError::Taxonomy(_) => AppError::ValidationError(msg),
            QuoteError::Price(_) => AppError::NotFoundError(msg),
            QuoteError::Translation(TranslationError::InvalidMapping { .. }) => AppError::InternalServerError(msg),
            QuoteError::Translation(_) => AppError::UnprocessableError(msg),
            QuoteError::Catalog(CatalogError::Markup(MarkupError::InvalidMarkup(_))) => AppError::ValidationError(msg),
            QuoteError::Catalog(CatalogError::Markup(MarkupError::RecordNotFound(_))) => AppError::NotFoundError(msg),
            QuoteError::Catalog(_)
            | QuoteError::InvalidDefinition { .. }
            | QuoteError::DefinitionLoad(_)
            | QuoteError::Fulfillment(_) => AppError::InternalServerError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_catalog::{PriceTableError, TaxonomyError};
    use atelier_core::CoreError;
    use atelier_provider::ProviderKind;

    #[test]
    fn test_status_mapping() {
        let invalid = QuoteError::Taxonomy(TaxonomyError::InvalidSelection {
            product_line: "canvas".to_string(),
            reason: "expected 2 choices".to_string(),
        });
        assert_eq!(AppError::from(invalid).status(), StatusCode::BAD_REQUEST);

        let missing = QuoteError::Price(PriceTableError::PriceNotFound {
            category: "Canvas".to_string(),
            subcategory: "1.25in".to_string(),
            size_label: "8x10".to_string(),
        });
        assert_eq!(AppError::from(missing).status(), StatusCode::NOT_FOUND);

        let unmappable = QuoteError::Translation(TranslationError::UnmappableSelection {
            provider: ProviderKind::Structured,
            product_line: "canvas".to_string(),
            tuple: vec!["1.25in".to_string(), "Gold".to_string()],
            reason: "no option id".to_string(),
        });
        assert_eq!(AppError::from(unmappable).status(), StatusCode::UNPROCESSABLE_ENTITY);

        let markup = QuoteError::Catalog(CatalogError::Markup(MarkupError::InvalidMarkup(-1.0)));
        assert_eq!(AppError::from(markup).status(), StatusCode::BAD_REQUEST);

        let persistence = QuoteError::Catalog(CatalogError::PersistenceFailed(CoreError::StorageError(
            "disk full".to_string(),
        )));
        assert_eq!(AppError::from(persistence).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
