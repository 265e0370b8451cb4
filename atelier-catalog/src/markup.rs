use atelier_shared::{PriceRecord, RecordKey};
use chrono::{DateTime, Utc};

use crate::price_table::PriceTable;

/// Converts wholesale prices to retail
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkupEngine {
    global_markup_percent: f64,
}

impl MarkupEngine {
    pub fn new(global_markup_percent: f64) -> Result<Self, MarkupError> {
        Ok(Self {
            global_markup_percent: validate_percent(global_markup_percent)?,
        })
    }

    pub fn global_markup_percent(&self) -> f64 {
        self.global_markup_percent
    }

    /// `wholesale * (1 + markup_percent / 100)`
    pub fn retail(wholesale: f64, markup_percent: f64) -> f64 {
        wholesale * (1.0 + markup_percent / 100.0)
    }

    /// A per-record override beats the global setting
    pub fn effective_markup(&self, override_percent: Option<f64>) -> f64 {
        override_percent.unwrap_or(self.global_markup_percent)
    }

    pub fn retail_for(&self, wholesale: f64, override_percent: Option<f64>) -> f64 {
        Self::retail(wholesale, self.effective_markup(override_percent))
    }

    /// Recompute and stamp the persisted retail price of one record
    pub fn reprice(&self, record: &mut PriceRecord, now: DateTime<Utc>) {
        record.retail_price = self.retail_for(record.wholesale_price, record.markup_percent_override);
        record.last_updated = now;
    }

    /// Recompute retail for every record in the table, returning the count
    pub fn reprice_all(&self, table: &mut PriceTable, now: DateTime<Utc>) -> usize {
        let mut updated = 0;
        for record in table.records_mut() {
            self.reprice(record, now);
            updated += 1;
        }
        updated
    }
}

impl Default for MarkupEngine {
    fn default() -> Self {
        Self {
            global_markup_percent: 0.0,
        }
    }
}

/// Markup percentages must be finite and non-negative
pub fn validate_percent(percent: f64) -> Result<f64, MarkupError> {
    if percent.is_finite() && percent >= 0.0 {
        Ok(percent)
    } else {
        Err(MarkupError::InvalidMarkup(percent))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkupError {
    #[error("Invalid markup percentage: {0}")]
    InvalidMarkup(f64),

    #[error("Price record not found: {0}")]
    RecordNotFound(RecordKey),
}
