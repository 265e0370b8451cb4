use atelier_shared::{Dimensions, PriceRecord, RecordKey};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::scaler::SizeScaler;

/// How a wholesale price was obtained
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingPath {
    /// Stored record for the exact size
    Exact,
    /// Scaled from the nearest stored size
    Scaled { base_size_label: String, area_ratio: f64 },
}

/// Result of a wholesale price lookup
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceLookup {
    /// Key of the record the price was taken from
    pub base_key: RecordKey,
    pub wholesale_price: f64,
    pub markup_percent_override: Option<f64>,
    pub path: PricingPath,
}

/// Wholesale price records keyed by (category, subcategory, size label)
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    records: BTreeMap<RecordKey, PriceRecord>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = PriceRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.key(), r)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&PriceRecord> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &RecordKey) -> Option<&mut PriceRecord> {
        self.records.get_mut(key)
    }

    pub fn records(&self) -> impl Iterator<Item = &PriceRecord> {
        self.records.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut PriceRecord> {
        self.records.values_mut()
    }

    /// Insert or replace a record; returns true when the key was new
    pub fn upsert(&mut self, record: PriceRecord) -> bool {
        self.records.insert(record.key(), record).is_none()
    }

    /// All records sharing (category, subcategory), in key order
    pub fn group(&self, category: &str, subcategory: &str) -> Vec<&PriceRecord> {
        let start = RecordKey::new(category, subcategory, "");
        self.records
            .range(start..)
            .take_while(|(k, _)| k.category == category && k.subcategory == subcategory)
            .map(|(_, r)| r)
            .collect()
    }

    /// Nearest stored size by Manhattan distance, tie-broken by smaller area
    /// then size label
    pub fn nearest(&self, category: &str, subcategory: &str, target: &Dimensions) -> Option<&PriceRecord> {
        self.group(category, subcategory).into_iter().min_by(|a, b| {
            let (da, db) = (a.dimensions(), b.dimensions());
            da.manhattan_distance(target)
                .total_cmp(&db.manhattan_distance(target))
                .then_with(|| da.area().total_cmp(&db.area()))
                .then_with(|| a.size_label.cmp(&b.size_label))
        })
    }

    /// Wholesale price for a size: the stored value on an exact hit, otherwise
    /// the nearest stored size scaled by area
    pub fn get_price(
        &self,
        category: &str,
        subcategory: &str,
        width: f64,
        height: f64,
        scaler: &SizeScaler,
    ) -> Result<PriceLookup, PriceTableError> {
        let target = Dimensions::new(width, height);
        let exact_key = RecordKey::new(category, subcategory, target.size_label());

        if let Some(record) = self.records.get(&exact_key) {
            return Ok(PriceLookup {
                base_key: exact_key,
                wholesale_price: record.wholesale_price,
                markup_percent_override: record.markup_percent_override,
                path: PricingPath::Exact,
            });
        }

        let base = self
            .nearest(category, subcategory, &target)
            .ok_or_else(|| PriceTableError::PriceNotFound {
                category: category.to_string(),
                subcategory: subcategory.to_string(),
                size_label: exact_key.size_label.clone(),
            })?;

        let base_dims = base.dimensions();
        Ok(PriceLookup {
            base_key: base.key(),
            wholesale_price: scaler.scale(base.wholesale_price, &base_dims, &target),
            markup_percent_override: base.markup_percent_override,
            path: PricingPath::Scaled {
                base_size_label: base.size_label.clone(),
                area_ratio: SizeScaler::area_ratio(&base_dims, &target),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PriceTableError {
    #[error("No price for {category}/{subcategory} at size {size_label}")]
    PriceNotFound {
        category: String,
        subcategory: String,
        size_label: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(subcategory: &str, width: f64, height: f64, price: f64) -> PriceRecord {
        let dims = Dimensions::new(width, height);
        PriceRecord {
            category: "Canvas".to_string(),
            subcategory: subcategory.to_string(),
            size_label: dims.size_label(),
            width,
            height,
            wholesale_price: price,
            retail_price: price,
            markup_percent_override: None,
            last_updated: Utc::now(),
        }
    }

    fn table() -> PriceTable {
        PriceTable::from_records(vec![
            record("1.25in", 8.0, 10.0, 10.99),
            record("1.25in", 16.0, 20.0, 24.50),
            record("0.75in", 8.0, 10.0, 8.25),
        ])
    }

    #[test]
    fn test_exact_match_is_unscaled() {
        let lookup = table()
            .get_price("Canvas", "1.25in", 8.0, 10.0, &SizeScaler::default())
            .unwrap();
        assert_eq!(lookup.wholesale_price, 10.99);
        assert_eq!(lookup.path, PricingPath::Exact);
    }

    #[test]
    fn test_fallback_scales_from_nearest() {
        let lookup = table()
            .get_price("Canvas", "1.25in", 9.0, 11.0, &SizeScaler::default())
            .unwrap();
        let expected = 10.99 * (99.0_f64 / 80.0).powf(0.7);
        assert!((lookup.wholesale_price - expected).abs() < 0.01);
        assert_eq!(lookup.base_key.size_label, "8x10");
        assert!(matches!(lookup.path, PricingPath::Scaled { .. }));
    }

    #[test]
    fn test_nearest_tie_breaks_on_area_then_label() {
        let table = PriceTable::from_records(vec![
            record("1.25in", 10.0, 10.0, 15.0),
            record("1.25in", 8.0, 12.0, 14.0),
            record("1.25in", 12.0, 8.0, 14.5),
        ]);
        // 10x11 is distance 1 from 10x10, while 8x12 and 12x8 are further away
        let nearest = table.nearest("Canvas", "1.25in", &Dimensions::new(10.0, 11.0)).unwrap();
        assert_eq!(nearest.size_label, "10x10");

        // 10x10 is equidistant (4) from 8x12 and 12x8; equal areas, so the label decides
        let table = PriceTable::from_records(vec![
            record("1.25in", 8.0, 12.0, 14.0),
            record("1.25in", 12.0, 8.0, 14.5),
        ]);
        let nearest = table.nearest("Canvas", "1.25in", &Dimensions::new(10.0, 10.0)).unwrap();
        assert_eq!(nearest.size_label, "12x8");

        // Equidistant with different areas: the smaller area wins
        let table = PriceTable::from_records(vec![
            record("1.25in", 8.0, 8.0, 9.0),
            record("1.25in", 12.0, 12.0, 18.0),
        ]);
        let nearest = table.nearest("Canvas", "1.25in", &Dimensions::new(10.0, 10.0)).unwrap();
        assert_eq!(nearest.size_label, "8x8");
    }

    #[test]
    fn test_group_does_not_leak_between_subcategories() {
        let table = table();
        assert_eq!(table.group("Canvas", "1.25in").len(), 2);
        assert_eq!(table.group("Canvas", "0.75in").len(), 1);
        assert_eq!(table.group("Canvas", "1.5in").len(), 0);
    }

    #[test]
    fn test_price_not_found() {
        let err = table()
            .get_price("Canvas", "1.5in", 8.0, 10.0, &SizeScaler::default())
            .unwrap_err();
        assert_eq!(
            err,
            PriceTableError::PriceNotFound {
                category: "Canvas".to_string(),
                subcategory: "1.5in".to_string(),
                size_label: "8x10".to_string(),
            }
        );
    }

    #[test]
    fn test_upsert_reports_new_keys() {
        let mut table = table();
        assert!(!table.upsert(record("1.25in", 8.0, 10.0, 11.99)));
        assert!(table.upsert(record("1.25in", 11.0, 14.0, 16.0)));
        assert_eq!(table.len(), 4);
    }
}
