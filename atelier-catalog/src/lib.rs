pub mod taxonomy;
pub mod price_table;
pub mod scaler;
pub mod markup;
pub mod import;
pub mod store;

pub use taxonomy::{CanonicalTuple, LevelDefinition, OptionValue, ResolvedSelection, TaxonomyError, TaxonomyNode, TaxonomyRegistry};
pub use price_table::{PriceLookup, PriceTable, PriceTableError, PricingPath};
pub use scaler::{SizeScaler, DEFAULT_SCALING_EXPONENT};
pub use markup::{MarkupEngine, MarkupError};
pub use import::{ImportRecord, ImportReport, ImportValidationError};
pub use store::{CatalogState, CatalogStore};

use atelier_core::CoreError;

/// Errors raised by catalog writes
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error("Persistence failed, catalog left unchanged: {0}")]
    PersistenceFailed(#[source] CoreError),

    #[error("Persistence failed ({cause}) and restoring the previous catalog also failed: {restore}")]
    RollbackFailed { cause: CoreError, restore: CoreError },

    #[error("Catalog state lock poisoned")]
    LockPoisoned,
}
