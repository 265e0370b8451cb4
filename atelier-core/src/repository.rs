use atelier_shared::PriceRecord;
use serde::{Deserialize, Serialize};

use crate::CoreResult;

/// Persisted pricing state: every price record plus the global markup setting
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredCatalog {
    #[serde(default)]
    pub global_markup_percent: Option<f64>,
    #[serde(default)]
    pub records: Vec<PriceRecord>,
}

/// Repository trait for price record persistence.
///
/// Implementations are synchronous; callers that run on an async runtime are
/// responsible for moving blocking implementations off the executor.
pub trait PriceRecordRepository: Send + Sync {
    /// Load the full persisted catalog
    fn load(&self) -> CoreResult<StoredCatalog>;

    /// Insert or overwrite one record by its (category, subcategory, size label) key
    fn save_record(&self, record: &PriceRecord) -> CoreResult<()>;

    /// Replace the persisted state wholesale in one write
    fn replace_all(&self, catalog: &StoredCatalog) -> CoreResult<()>;
}
