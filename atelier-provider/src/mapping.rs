use atelier_catalog::{CanonicalTuple, TaxonomyRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{ProviderKind, TranslationError};

/// Canonical option prefix a mapping row is keyed by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct MappingKey {
    #[serde(default)]
    pub level1: Option<String>,
    #[serde(default)]
    pub level2: Option<String>,
}

impl MappingKey {
    /// Key made of the first `depth` values of a canonical tuple
    pub fn from_tuple(tuple: &CanonicalTuple, depth: usize) -> Self {
        Self {
            level1: if depth >= 1 { tuple.level1().map(str::to_string) } else { None },
            level2: if depth >= 2 { tuple.level2().map(str::to_string) } else { None },
        }
    }

    pub fn depth(&self) -> usize {
        match (&self.level1, &self.level2) {
            (None, None) => 0,
            (Some(_), None) => 1,
            (_, Some(_)) => 2,
        }
    }
}

/// Row of a structured-provider mapping table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredRow {
    #[serde(flatten)]
    pub key: MappingKey,
    pub subcategory_id: u32,
    /// Fixed options always sent for this row, in order
    #[serde(default)]
    pub option_ids: Vec<u32>,
}

/// Structured-provider mapping for one product line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredMapping {
    #[serde(default)]
    pub product_line_id: String,
    /// When set, the level-2 value picks a distinct subcategory id (rows are
    /// keyed by both levels) instead of being appended as an option id
    #[serde(default)]
    pub level2_selects_subcategory: bool,
    pub rows: Vec<StructuredRow>,
}

impl StructuredMapping {
    /// Number of canonical values a row key carries for a line with `levels` levels
    pub fn key_depth(&self, levels: usize) -> usize {
        match levels {
            0 => 0,
            2 if self.level2_selects_subcategory => 2,
            _ => 1,
        }
    }

    /// The level-2 value contributes an option id rather than a subcategory
    pub fn appends_level2(&self, levels: usize) -> bool {
        levels == 2 && !self.level2_selects_subcategory
    }
}

/// Position of a token in a token-string code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenField {
    ProductType,
    Material,
    Variant,
    Orientation,
    Width,
    Height,
    Level1,
    Level2,
}

impl TokenField {
    pub fn level_index(&self) -> Option<usize> {
        match self {
            TokenField::Level1 => Some(0),
            TokenField::Level2 => Some(1),
            _ => None,
        }
    }
}

/// Ordered token layout shared by 0-, 1- and 2-option lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenTemplate {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    pub fields: Vec<TokenField>,
}

fn default_delimiter() -> String {
    "_".to_string()
}

impl Default for TokenTemplate {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            fields: vec![
                TokenField::ProductType,
                TokenField::Material,
                TokenField::Variant,
                TokenField::Orientation,
                TokenField::Width,
                TokenField::Height,
                TokenField::Level1,
                TokenField::Level2,
            ],
        }
    }
}

/// Row of a token-provider mapping table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRow {
    #[serde(flatten)]
    pub key: MappingKey,
    pub material_tag: String,
    pub variant_tag: String,
}

/// Token-provider mapping for one product line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMapping {
    #[serde(default)]
    pub product_line_id: String,
    pub product_type_tag: String,
    #[serde(default)]
    pub template: TokenTemplate,
    /// Token used for a level slot the line does not have; empty tokens are omitted
    #[serde(default)]
    pub level_defaults: Vec<String>,
    /// Rows are keyed by both levels instead of level 1 only
    #[serde(default)]
    pub key_includes_level2: bool,
    pub rows: Vec<TokenRow>,
}

impl TokenMapping {
    pub fn key_depth(&self, levels: usize) -> usize {
        match levels {
            0 => 0,
            2 if self.key_includes_level2 => 2,
            _ => 1,
        }
    }
}

/// Index rows by key, checking every key against the taxonomy
pub(crate) fn index_rows<R>(
    provider: ProviderKind,
    taxonomy: &TaxonomyRegistry,
    product_line_id: &str,
    depth: usize,
    rows: impl IntoIterator<Item = (MappingKey, R)>,
) -> Result<HashMap<MappingKey, R>, TranslationError> {
    let invalid = |reason: String| TranslationError::InvalidMapping {
        provider,
        product_line: product_line_id.to_string(),
        reason,
    };

    let mut index = HashMap::new();
    for (key, row) in rows {
        if key.depth() != depth || (depth == 2 && key.level1.is_none()) {
            return Err(invalid(format!("row {key:?} must be keyed by exactly {depth} level(s)")));
        }
        let levels = [key.level1.as_deref(), key.level2.as_deref()];
        for (level_index, value) in levels.iter().enumerate() {
            let Some(value) = value else { continue };
            let known = taxonomy
                .node(product_line_id, level_index)
                .and_then(|node| node.value(value))
                .is_some();
            if !known {
                return Err(invalid(format!("row references unregistered value '{value}'")));
            }
        }
        if index.insert(key.clone(), row).is_some() {
            return Err(invalid(format!("duplicate row {key:?}")));
        }
    }
    Ok(index)
}
