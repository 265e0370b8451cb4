use atelier_core::{CoreError, CoreResult, PriceRecordRepository, StoredCatalog};
use atelier_shared::PriceRecord;
use std::sync::{Mutex, MutexGuard};

/// In-memory repository for tests and ephemeral deployments
#[derive(Default)]
pub struct InMemoryRepository {
    inner: Mutex<StoredCatalog>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: StoredCatalog) -> Self {
        Self {
            inner: Mutex::new(catalog),
        }
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, StoredCatalog>> {
        self.inner
            .lock()
            .map_err(|e| CoreError::StorageError(format!("Lock: {}", e)))
    }
}

impl PriceRecordRepository for InMemoryRepository {
    fn load(&self) -> CoreResult<StoredCatalog> {
        Ok(self.lock()?.clone())
    }

    fn save_record(&self, record: &PriceRecord) -> CoreResult<()> {
        let mut catalog = self.lock()?;
        let key = record.key();
        match catalog.records.iter_mut().find(|r| r.key() == key) {
            Some(existing) => *existing = record.clone(),
            None => catalog.records.push(record.clone()),
        }
        Ok(())
    }

    fn replace_all(&self, catalog: &StoredCatalog) -> CoreResult<()> {
        *self.lock()? = catalog.clone();
        Ok(())
    }
}
