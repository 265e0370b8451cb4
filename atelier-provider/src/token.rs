use atelier_catalog::{CanonicalTuple, ResolvedSelection, TaxonomyRegistry};
use atelier_shared::{format_dimension, Dimensions};
use std::collections::HashMap;

use crate::mapping::{index_rows, MappingKey, TokenField, TokenMapping, TokenRow};
use crate::translator::ProviderCodec;
use crate::{ProviderCode, ProviderKind, TokenCode, TranslationError};

struct TokenLine {
    levels: usize,
    mapping: TokenMapping,
    rows: HashMap<MappingKey, TokenRow>,
}

/// One non-empty slot of a token string; dimension slots are filled per request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Fixed(String),
    Orientation,
    Width,
    Height,
}

impl Segment {
    fn render(&self, dims: &Dimensions) -> String {
        match self {
            Segment::Fixed(token) => token.clone(),
            Segment::Orientation => dims.orientation().as_token().to_string(),
            Segment::Width => format_dimension(dims.width),
            Segment::Height => format_dimension(dims.height),
        }
    }
}

/// Codec for the provider that takes a single delimited token string
#[derive(Default)]
pub struct TokenCodec {
    lines: HashMap<String, TokenLine>,
    /// Segment layout of every encodable tuple, across all product lines
    layouts: HashMap<(String, Vec<Segment>), (String, CanonicalTuple)>,
}

impl TokenCodec {
    pub fn new() -> Self {
        Self {
            lines: HashMap::new(),
            layouts: HashMap::new(),
        }
    }

    /// Register a product line's token table. Rejects tokens containing the
    /// delimiter and tables under which two tuples, of this or any registered
    /// line, would render the same string.
    pub fn register(
        &mut self,
        taxonomy: &TaxonomyRegistry,
        mapping: TokenMapping,
    ) -> Result<(), TranslationError> {
        let product_line_id = mapping.product_line_id.clone();
        let invalid = |reason: String| TranslationError::InvalidMapping {
            provider: ProviderKind::Token,
            product_line: product_line_id.clone(),
            reason,
        };

        let levels = taxonomy
            .level_count(&product_line_id)
            .ok_or_else(|| invalid("product line is not registered in the taxonomy".to_string()))?;
        if self.lines.contains_key(&product_line_id) {
            return Err(invalid("mapping already registered".to_string()));
        }
        if mapping.template.fields.is_empty() || mapping.template.delimiter.is_empty() {
            return Err(invalid("template needs at least one field and a delimiter".to_string()));
        }
        if mapping.key_includes_level2 && levels != 2 {
            return Err(invalid("key_includes_level2 requires two option levels".to_string()));
        }
        for field in &mapping.template.fields {
            if let Some(index) = field.level_index() {
                if index >= levels && mapping.level_defaults.get(index).is_none() {
                    return Err(invalid(format!("no default token declared for absent level {}", index + 1)));
                }
            }
        }

        let rows = index_rows(
            ProviderKind::Token,
            taxonomy,
            &product_line_id,
            mapping.key_depth(levels),
            mapping.rows.iter().map(|r| (r.key.clone(), r.clone())),
        )?;

        let line = TokenLine { levels, mapping, rows };
        let delimiter = line.mapping.template.delimiter.clone();
        let mut layouts: HashMap<(String, Vec<Segment>), CanonicalTuple> = HashMap::new();
        for tuple in taxonomy.canonical_tuples(&product_line_id) {
            // Tuples with a missing row or token fail at request time
            let Ok(segments) = segments(taxonomy, &product_line_id, &line, &tuple) else {
                continue;
            };
            if let Some(token) = segments.iter().find_map(|s| match s {
                Segment::Fixed(token) if token.contains(delimiter.as_str()) => Some(token),
                _ => None,
            }) {
                return Err(invalid(format!("token '{token}' contains the delimiter '{delimiter}'")));
            }

            let layout = (delimiter.clone(), segments);
            if let Some(previous) = layouts.get(&layout) {
                return Err(invalid(format!(
                    "{:?} and {:?} map to the same token string",
                    previous.values(),
                    tuple.values()
                )));
            }
            if let Some((other_line, other)) = self.layouts.get(&layout) {
                return Err(invalid(format!(
                    "{:?} renders the same token string as {:?} of '{}'",
                    tuple.values(),
                    other.values(),
                    other_line
                )));
            }
            layouts.insert(layout, tuple);
        }

        tracing::debug!(product_line = %product_line_id, rows = line.rows.len(), "token mapping registered");
        self.layouts.extend(
            layouts
                .into_iter()
                .map(|(layout, tuple)| (layout, (product_line_id.clone(), tuple))),
        );
        self.lines.insert(product_line_id, line);
        Ok(())
    }

    /// Token-string code for a resolved selection
    pub fn token_code(
        &self,
        taxonomy: &TaxonomyRegistry,
        selection: &ResolvedSelection,
    ) -> Result<TokenCode, TranslationError> {
        let line = self
            .lines
            .get(&selection.product_line_id)
            .ok_or_else(|| unmappable(selection, "no token mapping for product line".to_string()))?;

        let segments = segments(taxonomy, &selection.product_line_id, line, &selection.canonical)
            .map_err(|reason| unmappable(selection, reason))?;
        let tokens: Vec<String> = segments
            .iter()
            .map(|segment| segment.render(&selection.dimensions))
            .collect();

        Ok(TokenCode {
            code: tokens.join(&line.mapping.template.delimiter),
        })
    }
}

impl ProviderCodec for TokenCodec {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Token
    }

    fn encode(
        &self,
        taxonomy: &TaxonomyRegistry,
        selection: &ResolvedSelection,
    ) -> Result<ProviderCode, TranslationError> {
        self.token_code(taxonomy, selection).map(ProviderCode::Token)
    }
}

/// Template slots for a tuple, with empty tokens omitted
fn segments(
    taxonomy: &TaxonomyRegistry,
    product_line_id: &str,
    line: &TokenLine,
    tuple: &CanonicalTuple,
) -> Result<Vec<Segment>, String> {
    let key = MappingKey::from_tuple(tuple, line.mapping.key_depth(line.levels));
    let row = line
        .rows
        .get(&key)
        .ok_or_else(|| format!("no mapping row for {:?}", tuple.values()))?;

    let mut segments = Vec::with_capacity(line.mapping.template.fields.len());
    for field in &line.mapping.template.fields {
        let segment = match field {
            TokenField::ProductType => Segment::Fixed(line.mapping.product_type_tag.clone()),
            TokenField::Material => Segment::Fixed(row.material_tag.clone()),
            TokenField::Variant => Segment::Fixed(row.variant_tag.clone()),
            TokenField::Orientation => Segment::Orientation,
            TokenField::Width => Segment::Width,
            TokenField::Height => Segment::Height,
            TokenField::Level1 | TokenField::Level2 => {
                let index = field.level_index().unwrap_or_default();
                Segment::Fixed(level_token(taxonomy, product_line_id, line, tuple, index)?)
            }
        };
        if segment != Segment::Fixed(String::new()) {
            segments.push(segment);
        }
    }
    Ok(segments)
}

fn level_token(
    taxonomy: &TaxonomyRegistry,
    product_line_id: &str,
    line: &TokenLine,
    tuple: &CanonicalTuple,
    index: usize,
) -> Result<String, String> {
    if index >= line.levels {
        // Checked at registration
        return Ok(line.mapping.level_defaults.get(index).cloned().unwrap_or_default());
    }

    let value = tuple
        .get(index)
        .ok_or_else(|| format!("missing value for level {}", index + 1))?;
    taxonomy
        .node(product_line_id, index)
        .and_then(|node| node.value(value))
        .and_then(|v| v.token.clone())
        .ok_or_else(|| format!("'{value}' has no token"))
}

fn unmappable(selection: &ResolvedSelection, reason: String) -> TranslationError {
    TranslationError::UnmappableSelection {
        provider: ProviderKind::Token,
        product_line: selection.product_line_id.clone(),
        tuple: selection.canonical.values().to_vec(),
        reason,
    }
}
