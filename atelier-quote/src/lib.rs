pub mod cache;
pub mod definition;
pub mod service;

pub use cache::{CacheEntry, PriceCache};
pub use definition::{CompiledProductLines, PricingSource, ProductLineCatalog, ProductLineDefinition};
pub use service::{CachedPrice, PriceListing, Quote, QuoteRequest, QuoteService};

use atelier_catalog::{CatalogError, PriceTableError, TaxonomyError};
use atelier_core::CoreError;
use atelier_provider::TranslationError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),

    #[error(transparent)]
    Price(#[from] PriceTableError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Invalid definition for product line '{product_line}': {reason}")]
    InvalidDefinition { product_line: String, reason: String },

    #[error("Failed to load product line definitions: {0}")]
    DefinitionLoad(#[from] CoreError),

    #[error("Fulfillment submission failed: {0}")]
    Fulfillment(#[source] BoxError),
}
