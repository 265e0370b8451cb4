use atelier_catalog::{
    CatalogState, CatalogStore, ImportRecord, ImportReport, MarkupEngine, PricingPath, ResolvedSelection,
    SizeScaler, TaxonomyRegistry,
};
use atelier_provider::{ProviderCode, ProviderCodeTranslator, ProviderKind, StructuredCode, TokenCode};
use atelier_shared::{PriceRecord, ProductSelection, RecordKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::cache::PriceCache;
use crate::definition::{CompiledProductLines, PricingSource};
use crate::{BoxError, QuoteError};

/// A price query: a selection plus the provider whose code keys the cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteRequest {
    #[serde(flatten)]
    pub selection: ProductSelection,
    pub provider: ProviderKind,
}

/// Unit prices memoized per provider code
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPrice {
    pub wholesale_price: f64,
    pub retail_price: f64,
    pub markup_percent: f64,
    pub base_key: RecordKey,
    pub path: PricingPath,
    pub catalog_version: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Quote {
    pub product_line_id: String,
    pub canonical_options: Vec<String>,
    pub provider_code: ProviderCode,
    pub quantity: u32,
    pub wholesale_price: f64,
    pub retail_price: f64,
    pub markup_percent: f64,
    pub wholesale_total: f64,
    pub retail_total: f64,
    pub base_record: RecordKey,
    pub pricing_path: PricingPath,
    pub catalog_version: u64,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceListing {
    pub catalog_version: u64,
    pub global_markup_percent: f64,
    pub records: Vec<PriceRecord>,
}

pub struct QuoteService {
    taxonomy: TaxonomyRegistry,
    pricing: HashMap<String, PricingSource>,
    translator: ProviderCodeTranslator,
    catalog: CatalogStore,
    scaler: SizeScaler,
    cache: PriceCache<CachedPrice>,
}

impl QuoteService {
    pub fn new(
        product_lines: CompiledProductLines,
        catalog: CatalogStore,
        scaler: SizeScaler,
        cache: PriceCache<CachedPrice>,
    ) -> Self {
        Self {
            taxonomy: product_lines.taxonomy,
            pricing: product_lines.pricing,
            translator: product_lines.translator,
            catalog,
            scaler,
            cache,
        }
    }

    pub fn taxonomy(&self) -> &TaxonomyRegistry {
        &self.taxonomy
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// Validate, encode and price a selection, serving unit prices from the
    /// cache while they are fresh and computed against the current catalog
    pub fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        let resolved = self.taxonomy.resolve_selection(&request.selection)?;
        let provider_code = self.translator.translate(request.provider, &self.taxonomy, &resolved)?;
        let key = provider_code.cache_key();
        let state = self.catalog.snapshot()?;

        let mut computed = false;
        let mut price = self.cache.get_or_compute(&key, || {
            computed = true;
            self.compute_price(&state, &resolved)
        })?;
        if price.catalog_version != state.version {
            // Computed against a catalog that has since been replaced
            debug!(key = %key, cached = price.catalog_version, current = state.version, "evicting stale price");
            self.cache.invalidate(&key);
            price = self.cache.get_or_compute(&key, || self.compute_price(&state, &resolved))?;
            computed = true;
        }

        let quantity = f64::from(resolved.quantity);
        Ok(Quote {
            product_line_id: resolved.product_line_id.clone(),
            canonical_options: resolved.canonical.values().to_vec(),
            provider_code,
            quantity: resolved.quantity,
            wholesale_price: price.wholesale_price,
            retail_price: price.retail_price,
            markup_percent: price.markup_percent,
            wholesale_total: price.wholesale_price * quantity,
            retail_total: price.retail_price * quantity,
            base_record: price.base_key,
            pricing_path: price.path,
            catalog_version: price.catalog_version,
            cached: !computed,
        })
    }

    pub fn structured_code(&self, selection: &ProductSelection) -> Result<StructuredCode, QuoteError> {
        let resolved = self.taxonomy.resolve_selection(selection)?;
        Ok(self.translator.structured(&self.taxonomy, &resolved)?)
    }

    pub fn token_code(&self, selection: &ProductSelection) -> Result<TokenCode, QuoteError> {
        let resolved = self.taxonomy.resolve_selection(selection)?;
        Ok(self.translator.token(&self.taxonomy, &resolved)?)
    }

    /// Encode the selection for `provider` and hand it to the fulfillment client
    pub fn fulfill<F, R, E>(&self, request: &QuoteRequest, submit: F) -> Result<R, QuoteError>
    where
        F: FnOnce(&ProviderCode, u32) -> Result<R, E>,
        E: Into<BoxError>,
    {
        let resolved = self.taxonomy.resolve_selection(&request.selection)?;
        let code = self.translator.translate(request.provider, &self.taxonomy, &resolved)?;
        info!(provider = %request.provider, code = %code.code_string(), quantity = resolved.quantity, "submitting to fulfillment");
        submit(&code, resolved.quantity).map_err(|e| QuoteError::Fulfillment(e.into()))
    }

    /// Set the global markup, returning the number of records repriced
    pub fn set_global_markup(&self, percent: f64) -> Result<usize, QuoteError> {
        let updated = self.catalog.update_global_markup(percent)?;
        self.invalidate_prices();
        Ok(updated)
    }

    pub fn set_record_markup(&self, key: &RecordKey, percent: Option<f64>) -> Result<PriceRecord, QuoteError> {
        let record = self.catalog.set_record_markup(key, percent)?;
        self.invalidate_prices();
        Ok(record)
    }

    pub fn import_catalog(&self, batch: Vec<ImportRecord>) -> Result<ImportReport, QuoteError> {
        let report = self.catalog.import_batch(batch)?;
        if report.applied() > 0 {
            self.invalidate_prices();
        }
        Ok(report)
    }

    /// Every record together with the global markup, read from one catalog version
    pub fn price_listing(&self) -> Result<PriceListing, QuoteError> {
        let state = self.catalog.snapshot()?;
        Ok(PriceListing {
            catalog_version: state.version,
            global_markup_percent: state.markup.global_markup_percent(),
            records: state.table.records().cloned().collect(),
        })
    }

    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.clear_all();
        info!(removed, "price cache cleared");
        removed
    }

    pub fn clear_expired_cache(&self) -> usize {
        let removed = self.cache.clear_expired();
        info!(removed, "expired price cache entries cleared");
        removed
    }

    fn invalidate_prices(&self) {
        let removed = self.cache.clear_all();
        debug!(removed, "price cache cleared after catalog write");
    }

    fn compute_price(&self, state: &CatalogState, selection: &ResolvedSelection) -> Result<CachedPrice, QuoteError> {
        let line = &selection.product_line_id;
        let source = self.pricing.get(line).ok_or_else(|| QuoteError::InvalidDefinition {
            product_line: line.clone(),
            reason: "no pricing source".to_string(),
        })?;
        let subcategory = source
            .subcategory(&selection.canonical)
            .ok_or_else(|| QuoteError::InvalidDefinition {
                product_line: line.clone(),
                reason: "selection has no value for the pricing subcategory level".to_string(),
            })?;

        let dims = &selection.dimensions;
        let lookup = state
            .table
            .get_price(&source.category, subcategory, dims.width, dims.height, &self.scaler)?;
        let markup_percent = state.markup.effective_markup(lookup.markup_percent_override);

        Ok(CachedPrice {
            wholesale_price: lookup.wholesale_price,
            retail_price: MarkupEngine::retail(lookup.wholesale_price, markup_percent),
            markup_percent,
            base_key: lookup.base_key,
            path: lookup.path,
            catalog_version: state.version,
        })
    }
}
