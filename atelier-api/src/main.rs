use anyhow::Context;
use atelier_api::{app, AppState};
use atelier_catalog::{CatalogStore, SizeScaler};
use atelier_quote::{PriceCache, ProductLineCatalog, QuoteService};
use atelier_store::{Config, JsonFileRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Atelier pricing API on port {}", config.server.port);

    let repository = JsonFileRepository::open(&config.storage.price_records_path)
        .context("Failed to open price record store")?;
    let catalog = CatalogStore::open(Arc::new(repository), config.pricing.global_markup_percent)
        .context("Failed to load price records")?;

    let product_lines = ProductLineCatalog::load(&config.storage.product_lines_path)?
        .compile()
        .context("Invalid product line definitions")?;

    let scaler = SizeScaler::checked(config.pricing.scaling_exponent)
        .with_context(|| format!("Invalid scaling exponent {}", config.pricing.scaling_exponent))?;
    let ttl = i64::try_from(config.pricing.cache_ttl_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .context("cache_ttl_seconds out of range")?;

    let service = QuoteService::new(product_lines, catalog, scaler, PriceCache::new(ttl));
    let app = app(AppState::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
