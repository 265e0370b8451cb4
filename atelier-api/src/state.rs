use atelier_quote::{QuoteError, QuoteService};
use std::sync::Arc;

use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QuoteService>,
}

impl AppState {
    pub fn new(service: QuoteService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Run a catalog write off the async executor; the repository does blocking I/O
    pub async fn run_blocking<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&QuoteService) -> Result<T, QuoteError> + Send + 'static,
        T: Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || op(&service))
            .await
            .map_err(|e| AppError::InternalServerError(format!("Blocking task failed: {}", e)))?
            .map_err(AppError::from)
    }
}
