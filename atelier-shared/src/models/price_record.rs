use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::selection::Dimensions;

/// Unique key of a price record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub category: String,
    pub subcategory: String,
    pub size_label: String,
}

impl RecordKey {
    pub fn new(
        category: impl Into<String>,
        subcategory: impl Into<String>,
        size_label: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
            size_label: size_label.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.category, self.subcategory, self.size_label)
    }
}

/// A wholesale price for one (category, subcategory, size)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRecord {
    pub category: String,
    pub subcategory: String,
    pub size_label: String,
    pub width: f64,
    pub height: f64,
    pub wholesale_price: f64,
    /// Persisted markup-adjusted price, recomputed on every markup change
    pub retail_price: f64,
    #[serde(default)]
    pub markup_percent_override: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

impl PriceRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.category, &self.subcategory, &self.size_label)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}
