use atelier_catalog::{CanonicalTuple, LevelDefinition, TaxonomyRegistry};
use atelier_core::CoreError;
use atelier_provider::{ProviderCodeTranslator, StructuredCodec, StructuredMapping, TokenCodec, TokenMapping};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::QuoteError;

/// Where a product line's prices live in the price table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingSource {
    pub category: String,
    /// Option level whose canonical value is the price subcategory
    #[serde(default)]
    pub subcategory_level: Option<usize>,
    /// Fixed subcategory for lines where no level supplies one
    #[serde(default)]
    pub default_subcategory: Option<String>,
}

impl PricingSource {
    pub fn subcategory<'a>(&'a self, canonical: &'a CanonicalTuple) -> Option<&'a str> {
        match self.subcategory_level {
            Some(index) => canonical.get(index),
            None => self.default_subcategory.as_deref(),
        }
    }

    fn validate(&self, levels: usize) -> Result<(), String> {
        if self.category.trim().is_empty() {
            return Err("pricing category is empty".to_string());
        }
        match (self.subcategory_level, &self.default_subcategory) {
            (Some(index), None) if index < levels => Ok(()),
            (Some(index), None) => Err(format!(
                "subcategory_level {} out of range for {} level(s)",
                index, levels
            )),
            (None, Some(sub)) if !sub.trim().is_empty() => Ok(()),
            (None, Some(_)) => Err("default_subcategory is empty".to_string()),
            _ => Err("declare exactly one of subcategory_level or default_subcategory".to_string()),
        }
    }
}

/// One product line as declared in the definitions file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductLineDefinition {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub pricing: PricingSource,
    #[serde(default)]
    pub levels: Vec<LevelDefinition>,
    #[serde(default)]
    pub structured: Option<StructuredMapping>,
    #[serde(default)]
    pub token: Option<TokenMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProductLineCatalog {
    pub product_lines: Vec<ProductLineDefinition>,
}

/// Registries built from a validated definitions file
pub struct CompiledProductLines {
    pub taxonomy: TaxonomyRegistry,
    pub pricing: HashMap<String, PricingSource>,
    pub translator: ProviderCodeTranslator,
}

impl ProductLineCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QuoteError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(CoreError::from)?;
        let catalog: Self = serde_json::from_slice(&bytes).map_err(CoreError::from)?;
        info!(
            product_lines = catalog.product_lines.len(),
            "Loaded product line definitions from {}",
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_json_str(json: &str) -> Result<Self, QuoteError> {
        serde_json::from_str(json).map_err(|e| QuoteError::DefinitionLoad(e.into()))
    }

    /// Register every line with the taxonomy and provider codecs. Any invalid
    /// line fails the whole catalog.
    pub fn compile(self) -> Result<CompiledProductLines, QuoteError> {
        let mut taxonomy = TaxonomyRegistry::new();
        let mut pricing = HashMap::new();
        let mut structured = StructuredCodec::new();
        let mut token = TokenCodec::new();

        for line in self.product_lines {
            let invalid = |reason: String| QuoteError::InvalidDefinition {
                product_line: line.id.clone(),
                reason,
            };

            line.pricing.validate(line.levels.len()).map_err(invalid)?;
            taxonomy.register(&line.id, line.levels)?;

            if let Some(mut mapping) = line.structured {
                mapping.product_line_id = claim_mapping(&line.id, mapping.product_line_id).map_err(invalid)?;
                structured.register(&taxonomy, mapping)?;
            }
            if let Some(mut mapping) = line.token {
                mapping.product_line_id = claim_mapping(&line.id, mapping.product_line_id).map_err(invalid)?;
                token.register(&taxonomy, mapping)?;
            }

            pricing.insert(line.id, line.pricing);
        }

        Ok(CompiledProductLines {
            taxonomy,
            pricing,
            translator: ProviderCodeTranslator::new()
                .with_codec(structured)
                .with_codec(token),
        })
    }
}

/// A mapping may omit its product line id; if present it must match
fn claim_mapping(line_id: &str, declared: String) -> Result<String, String> {
    if declared.is_empty() || declared == line_id {
        Ok(line_id.to_string())
    } else {
        Err(format!("mapping declares product line '{declared}'"))
    }
}
