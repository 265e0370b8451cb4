use atelier_shared::{Dimensions, PriceRecord, RecordKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::markup::MarkupEngine;
use crate::price_table::PriceTable;

/// One row of the periodic catalog import stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportRecord {
    pub category: String,
    pub subcategory: String,
    pub size_label: String,
    pub width: f64,
    pub height: f64,
    pub wholesale_price: f64,
}

impl ImportRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.category, &self.subcategory, &self.size_label)
    }

    pub fn validate(&self) -> Result<(), ImportValidationError> {
        let reject = |reason: &str| ImportValidationError {
            key: self.key(),
            reason: reason.to_string(),
        };

        if self.category.trim().is_empty()
            || self.subcategory.trim().is_empty()
            || self.size_label.trim().is_empty()
        {
            return Err(reject("category, subcategory and size label are required"));
        }
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(reject("width must be positive"));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(reject("height must be positive"));
        }
        let expected = Dimensions::new(self.width, self.height).size_label();
        if self.size_label != expected {
            return Err(ImportValidationError {
                key: self.key(),
                reason: format!("size label must match the dimensions ({expected})"),
            });
        }
        if !(self.wholesale_price.is_finite() && self.wholesale_price >= 0.0) {
            return Err(reject("wholesale price must be a non-negative number"));
        }
        Ok(())
    }
}

/// A rejected import row; the rest of the batch still applies
#[derive(Debug, Clone, Serialize, PartialEq, thiserror::Error)]
#[error("Rejected import record {key}: {reason}")]
pub struct ImportValidationError {
    pub key: RecordKey,
    pub reason: String,
}

/// Outcome of one import batch
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportReport {
    pub batch_id: Uuid,
    pub inserted: usize,
    pub refreshed: usize,
    pub rejected: Vec<ImportValidationError>,
}

impl ImportReport {
    pub fn new() -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            inserted: 0,
            refreshed: 0,
            rejected: Vec::new(),
        }
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn applied(&self) -> usize {
        self.inserted + self.refreshed
    }
}

impl Default for ImportReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a batch to a table copy. Invalid rows are skipped and reported;
/// refreshed rows keep their markup override. Returns the keys that changed.
pub fn apply_batch(
    table: &mut PriceTable,
    batch: Vec<ImportRecord>,
    markup: &MarkupEngine,
    now: DateTime<Utc>,
    report: &mut ImportReport,
) -> Vec<RecordKey> {
    let mut changed = Vec::with_capacity(batch.len());

    for row in batch {
        if let Err(rejection) = row.validate() {
            tracing::warn!(batch_id = %report.batch_id, "{}", rejection);
            report.rejected.push(rejection);
            continue;
        }

        let key = row.key();
        let markup_percent_override = table.get(&key).and_then(|r| r.markup_percent_override);
        let mut record = PriceRecord {
            category: row.category,
            subcategory: row.subcategory,
            size_label: row.size_label,
            width: row.width,
            height: row.height,
            wholesale_price: row.wholesale_price,
            retail_price: 0.0,
            markup_percent_override,
            last_updated: now,
        };
        markup.reprice(&mut record, now);

        if table.upsert(record) {
            report.inserted += 1;
        } else {
            report.refreshed += 1;
        }
        changed.push(key);
    }

    changed
}
