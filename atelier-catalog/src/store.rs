use atelier_core::{PriceRecordRepository, StoredCatalog};
use atelier_shared::{PriceRecord, RecordKey};
use chrono::Utc;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{error, info, warn};

use crate::import::{apply_batch, ImportRecord, ImportReport};
use crate::markup::{validate_percent, MarkupEngine, MarkupError};
use crate::CatalogError;

/// One published version of the pricing state
#[derive(Debug, Clone)]
pub struct CatalogState {
    pub version: u64,
    pub table: crate::PriceTable,
    pub markup: MarkupEngine,
}

impl CatalogState {
    fn to_stored(&self) -> StoredCatalog {
        StoredCatalog {
            global_markup_percent: Some(self.markup.global_markup_percent()),
            records: self.table.records().cloned().collect(),
        }
    }
}

/// Versioned pricing state behind a single writer lock.
///
/// Readers clone the current `Arc` and never see a partially applied write:
/// writers build the next state from a copy, persist it, and only then swap
/// it in. A persistence failure restores the repository from the previous
/// state and leaves that state published.
pub struct CatalogStore {
    current: RwLock<Arc<CatalogState>>,
    writer: Mutex<()>,
    repository: Arc<dyn PriceRecordRepository>,
}

impl CatalogStore {
    /// Load persisted records; `default_markup_percent` applies when the
    /// repository has never stored a global markup
    pub fn open(
        repository: Arc<dyn PriceRecordRepository>,
        default_markup_percent: f64,
    ) -> Result<Self, CatalogError> {
        let stored = repository.load().map_err(CatalogError::PersistenceFailed)?;
        let markup = MarkupEngine::new(stored.global_markup_percent.unwrap_or(default_markup_percent))?;
        let table = crate::PriceTable::from_records(stored.records);

        info!(records = table.len(), markup = markup.global_markup_percent(), "catalog loaded");

        Ok(Self {
            current: RwLock::new(Arc::new(CatalogState {
                version: 0,
                table,
                markup,
            })),
            writer: Mutex::new(()),
            repository,
        })
    }

    /// Consistent read-only view of the current state
    pub fn snapshot(&self) -> Result<Arc<CatalogState>, CatalogError> {
        let guard = self.current.read().map_err(|_| CatalogError::LockPoisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Apply one catalog import batch. Invalid rows are skipped and counted;
    /// the accepted rows are persisted in a single write or not at all.
    pub fn import_batch(&self, batch: Vec<ImportRecord>) -> Result<ImportReport, CatalogError> {
        let _writer = self.writer.lock().map_err(|_| CatalogError::LockPoisoned)?;
        let before = self.snapshot()?;
        let mut next = (*before).clone();
        let mut report = ImportReport::new();

        let changed = apply_batch(&mut next.table, batch, &next.markup, Utc::now(), &mut report);
        if changed.is_empty() {
            warn!(batch_id = %report.batch_id, rejected = report.rejected_count(), "catalog import changed nothing");
            return Ok(report);
        }

        self.persist(&before, &next)?;
        self.publish(next)?;
        info!(
            batch_id = %report.batch_id,
            inserted = report.inserted,
            refreshed = report.refreshed,
            rejected = report.rejected_count(),
            "catalog import applied"
        );
        Ok(report)
    }

    /// Set the global markup and recompute retail for every record. All or
    /// nothing: returns the number of records updated.
    pub fn update_global_markup(&self, percent: f64) -> Result<usize, CatalogError> {
        let percent = validate_percent(percent)?;
        let _writer = self.writer.lock().map_err(|_| CatalogError::LockPoisoned)?;
        let before = self.snapshot()?;
        let mut next = (*before).clone();

        next.markup = MarkupEngine::new(percent)?;
        let updated = next.markup.reprice_all(&mut next.table, Utc::now());

        self.persist(&before, &next)?;
        self.publish(next)?;
        info!(markup = percent, updated, "global markup updated");
        Ok(updated)
    }

    /// Set or clear the markup override of one record
    pub fn set_record_markup(
        &self,
        key: &RecordKey,
        percent: Option<f64>,
    ) -> Result<PriceRecord, CatalogError> {
        let percent = percent.map(validate_percent).transpose()?;
        let _writer = self.writer.lock().map_err(|_| CatalogError::LockPoisoned)?;
        let before = self.snapshot()?;
        let mut next = (*before).clone();

        let markup = next.markup;
        let record = next
            .table
            .get_mut(key)
            .ok_or_else(|| MarkupError::RecordNotFound(key.clone()))?;
        record.markup_percent_override = percent;
        markup.reprice(record, Utc::now());
        let updated = record.clone();

        if let Err(e) = self.repository.save_record(&updated) {
            return Err(self.rollback(&before, e));
        }

        self.publish(next)?;
        info!(record = %key, markup = ?percent, "record markup updated");
        Ok(updated)
    }

    /// Write the whole next state as one document
    fn persist(&self, before: &CatalogState, next: &CatalogState) -> Result<(), CatalogError> {
        self.repository
            .replace_all(&next.to_stored())
            .map_err(|e| self.rollback(before, e))
    }

    fn publish(&self, mut next: CatalogState) -> Result<(), CatalogError> {
        let mut current = self.current.write().map_err(|_| CatalogError::LockPoisoned)?;
        next.version = current.version + 1;
        *current = Arc::new(next);
        Ok(())
    }

    fn rollback(&self, before: &CatalogState, cause: atelier_core::CoreError) -> CatalogError {
        error!(version = before.version, "persistence failed, restoring previous catalog: {}", cause);
        match self.repository.replace_all(&before.to_stored()) {
            Ok(()) => CatalogError::PersistenceFailed(cause),
            Err(restore) => CatalogError::RollbackFailed { cause, restore },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::{CoreError, CoreResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Repository that fails the write calls whose index is listed in `fail_on`
    #[derive(Default)]
    struct FlakyRepository {
        stored: Mutex<StoredCatalog>,
        writes: AtomicUsize,
        fail_on: Vec<usize>,
    }

    impl FlakyRepository {
        fn failing_on(calls: &[usize]) -> Self {
            Self {
                fail_on: calls.to_vec(),
                ..Default::default()
            }
        }

        fn check(&self) -> CoreResult<()> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&n) {
                return Err(CoreError::StorageError("disk full".to_string()));
            }
            Ok(())
        }

        fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl PriceRecordRepository for FlakyRepository {
        fn load(&self) -> CoreResult<StoredCatalog> {
            Ok(self.stored.lock().unwrap().clone())
        }

        fn save_record(&self, record: &PriceRecord) -> CoreResult<()> {
            self.check()?;
            let mut stored = self.stored.lock().unwrap();
            stored.records.retain(|r| r.key() != record.key());
            stored.records.push(record.clone());
            Ok(())
        }

        fn replace_all(&self, catalog: &StoredCatalog) -> CoreResult<()> {
            self.check()?;
            *self.stored.lock().unwrap() = catalog.clone();
            Ok(())
        }
    }

    fn seeded(repository: &Arc<FlakyRepository>) -> CatalogStore {
        let store = CatalogStore::open(repository.clone(), 100.0).unwrap();
        store.import_batch(rows()).unwrap();
        store
    }

    fn rows() -> Vec<ImportRecord> {
        ["8x10", "11x14", "16x20"]
            .iter()
            .zip([(8.0, 10.0, 10.99), (11.0, 14.0, 15.5), (16.0, 20.0, 24.5)])
            .map(|(label, (w, h, p))| ImportRecord {
                category: "Canvas".to_string(),
                subcategory: "1.25in".to_string(),
                size_label: label.to_string(),
                width: w,
                height: h,
                wholesale_price: p,
            })
            .collect()
    }

    #[test]
    fn test_global_markup_updates_every_record() {
        let store = seeded(&Arc::new(FlakyRepository::default()));

        let updated = store.update_global_markup(150.0).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(updated, snapshot.table.len());
        assert_eq!(snapshot.version, 2);

        let record = snapshot.table.get(&RecordKey::new("Canvas", "1.25in", "8x10")).unwrap();
        assert!((record.retail_price - 27.475).abs() < 1e-9);
    }

    #[test]
    fn test_each_write_is_one_repository_call() {
        let repository = Arc::new(FlakyRepository::default());
        let store = seeded(&repository);
        assert_eq!(repository.write_count(), 1);

        store.update_global_markup(150.0).unwrap();
        assert_eq!(repository.write_count(), 2);

        let persisted = repository.load().unwrap();
        assert_eq!(persisted.global_markup_percent, Some(150.0));
        assert_eq!(persisted.records.len(), 3);
        assert!(persisted.records.iter().all(|r| (r.retail_price - r.wholesale_price * 2.5).abs() < 1e-9));
    }

    #[test]
    fn test_failed_markup_update_rolls_back() {
        // Write 0 is the seed import, write 1 the markup update
        let repository = Arc::new(FlakyRepository::failing_on(&[1]));
        let store = seeded(&repository);
        let before = store.snapshot().unwrap();

        let err = store.update_global_markup(150.0).unwrap_err();
        assert!(matches!(err, CatalogError::PersistenceFailed(_)));

        let after = store.snapshot().unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(after.markup.global_markup_percent(), 100.0);
        assert!(after.table.records().all(|r| (r.retail_price - r.wholesale_price * 2.0).abs() < 1e-9));

        let persisted = repository.load().unwrap();
        assert_eq!(persisted, before.to_stored());
    }

    #[test]
    fn test_failed_import_rolls_back() {
        let repository = Arc::new(FlakyRepository::failing_on(&[1]));
        let store = seeded(&repository);
        let before = store.snapshot().unwrap();

        let mut batch = rows();
        batch[0].wholesale_price = 12.0;
        let larger = ImportRecord {
            size_label: "20x24".to_string(),
            width: 20.0,
            height: 24.0,
            ..batch[2].clone()
        };
        batch.push(larger);

        let err = store.import_batch(batch).unwrap_err();
        assert!(matches!(err, CatalogError::PersistenceFailed(_)));

        let after = store.snapshot().unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(after.table.len(), 3);
        let record = after.table.get(&RecordKey::new("Canvas", "1.25in", "8x10")).unwrap();
        assert_eq!(record.wholesale_price, 10.99);
        assert_eq!(repository.load().unwrap(), before.to_stored());
    }

    #[test]
    fn test_failed_record_markup_rolls_back() {
        // save_record is write 1, the restore is write 2
        let repository = Arc::new(FlakyRepository::failing_on(&[1]));
        let store = seeded(&repository);
        let before = store.snapshot().unwrap();
        let key = RecordKey::new("Canvas", "1.25in", "16x20");

        let err = store.set_record_markup(&key, Some(10.0)).unwrap_err();
        assert!(matches!(err, CatalogError::PersistenceFailed(_)));

        let after = store.snapshot().unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(after.table.get(&key).unwrap().markup_percent_override, None);
        assert_eq!(repository.load().unwrap(), before.to_stored());
    }

    #[test]
    fn test_failed_restore_is_reported() {
        let repository = Arc::new(FlakyRepository::failing_on(&[1, 2]));
        let store = seeded(&repository);
        let before = store.snapshot().unwrap();

        let err = store.update_global_markup(150.0).unwrap_err();
        assert!(matches!(err, CatalogError::RollbackFailed { .. }));

        // The published state is untouched even when the repository could not be restored
        let after = store.snapshot().unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(after.markup.global_markup_percent(), 100.0);
    }

    #[test]
    fn test_import_without_valid_rows_writes_nothing() {
        let repository = Arc::new(FlakyRepository::default());
        let store = seeded(&repository);

        let mut bad = rows();
        bad.iter_mut().for_each(|r| r.wholesale_price = -1.0);
        let report = store.import_batch(bad).unwrap();

        assert_eq!(report.rejected_count(), 3);
        assert_eq!(repository.write_count(), 1);
        assert_eq!(store.snapshot().unwrap().version, 1);
    }

    #[test]
    fn test_snapshot_is_stable_across_writes() {
        let store = CatalogStore::open(Arc::new(FlakyRepository::default()), 50.0).unwrap();
        store.import_batch(rows()).unwrap();
        let old = store.snapshot().unwrap();

        store.update_global_markup(200.0).unwrap();

        assert_eq!(old.markup.global_markup_percent(), 50.0);
        assert_eq!(store.snapshot().unwrap().markup.global_markup_percent(), 200.0);
    }

    #[test]
    fn test_record_markup_override() {
        let store = CatalogStore::open(Arc::new(FlakyRepository::default()), 100.0).unwrap();
        store.import_batch(rows()).unwrap();
        let key = RecordKey::new("Canvas", "1.25in", "16x20");

        let record = store.set_record_markup(&key, Some(10.0)).unwrap();
        assert!((record.retail_price - 26.95).abs() < 1e-9);

        // Overrides survive a global change
        store.update_global_markup(300.0).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert!((snapshot.table.get(&key).unwrap().retail_price - 26.95).abs() < 1e-9);

        let record = store.set_record_markup(&key, None).unwrap();
        assert!((record.retail_price - 98.0).abs() < 1e-9);

        let missing = RecordKey::new("Canvas", "1.25in", "1x1");
        assert!(matches!(
            store.set_record_markup(&missing, Some(5.0)),
            Err(CatalogError::Markup(MarkupError::RecordNotFound(_)))
        ));
    }

    #[test]
    fn test_invalid_markup_is_rejected_before_writing() {
        let store = CatalogStore::open(Arc::new(FlakyRepository::default()), 100.0).unwrap();
        assert!(matches!(
            store.update_global_markup(-1.0),
            Err(CatalogError::Markup(MarkupError::InvalidMarkup(_)))
        ));
        assert_eq!(store.snapshot().unwrap().version, 0);
    }
}
