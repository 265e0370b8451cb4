use atelier_core::{CoreError, CoreResult, PriceRecordRepository, StoredCatalog};
use atelier_shared::PriceRecord;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Price records persisted as one JSON document on disk.
///
/// Every write goes to a sibling temp file that is then renamed over the
/// document, so a failed write leaves the previous document intact. The
/// in-memory copy only changes once the file write succeeded.
pub struct JsonFileRepository {
    path: PathBuf,
    document: Mutex<StoredCatalog>,
}

impl JsonFileRepository {
    /// Open the document at `path`; a missing file is an empty catalog
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let document = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            info!("No price record document at {}, starting empty", path.display());
            StoredCatalog::default()
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, change: impl FnOnce(&mut StoredCatalog)) -> CoreResult<()> {
        let mut document = self
            .document
            .lock()
            .map_err(|e| CoreError::StorageError(format!("Lock: {}", e)))?;
        let mut next = document.clone();
        change(&mut next);
        self.write(&next)?;
        *document = next;
        Ok(())
    }

    fn write(&self, catalog: &StoredCatalog) -> CoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(catalog)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(records = catalog.records.len(), "price record document written");
        Ok(())
    }
}

impl PriceRecordRepository for JsonFileRepository {
    fn load(&self) -> CoreResult<StoredCatalog> {
        let document = self
            .document
            .lock()
            .map_err(|e| CoreError::StorageError(format!("Lock: {}", e)))?;
        Ok(document.clone())
    }

    fn save_record(&self, record: &PriceRecord) -> CoreResult<()> {
        let key = record.key();
        self.update(|doc| match doc.records.iter_mut().find(|r| r.key() == key) {
            Some(existing) => *existing = record.clone(),
            None => doc.records.push(record.clone()),
        })
    }

    fn replace_all(&self, catalog: &StoredCatalog) -> CoreResult<()> {
        self.update(|doc| *doc = catalog.clone())
    }
}
