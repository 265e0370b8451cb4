use atelier_catalog::{CanonicalTuple, ResolvedSelection, TaxonomyRegistry};
use std::collections::{BTreeSet, HashMap};

use crate::mapping::{index_rows, MappingKey, StructuredMapping, StructuredRow};
use crate::translator::ProviderCodec;
use crate::{ProviderCode, ProviderKind, StructuredCode, TranslationError};

struct StructuredLine {
    levels: usize,
    mapping: StructuredMapping,
    rows: HashMap<MappingKey, StructuredRow>,
}

/// Subcategory id plus the unordered option ids a tuple encodes to
type CodeSignature = (u32, BTreeSet<u32>);

/// Codec for the provider that takes a subcategory id plus option ids
#[derive(Default)]
pub struct StructuredCodec {
    lines: HashMap<String, StructuredLine>,
    /// Every encodable code, across all product lines, with the tuple it came from
    codes: HashMap<CodeSignature, (String, CanonicalTuple)>,
}

impl StructuredCodec {
    pub fn new() -> Self {
        Self {
            lines: HashMap::new(),
            codes: HashMap::new(),
        }
    }

    /// Register a product line's mapping table. Rejects tables that would send
    /// two ids for one option category or map two canonical tuples to the
    /// same code.
    pub fn register(
        &mut self,
        taxonomy: &TaxonomyRegistry,
        mapping: StructuredMapping,
    ) -> Result<(), TranslationError> {
        let product_line_id = mapping.product_line_id.clone();
        let invalid = |reason: String| TranslationError::InvalidMapping {
            provider: ProviderKind::Structured,
            product_line: product_line_id.clone(),
            reason,
        };

        let levels = taxonomy
            .level_count(&product_line_id)
            .ok_or_else(|| invalid("product line is not registered in the taxonomy".to_string()))?;
        if self.lines.contains_key(&product_line_id) {
            return Err(invalid("mapping already registered".to_string()));
        }
        if mapping.level2_selects_subcategory && levels != 2 {
            return Err(invalid("level2_selects_subcategory requires two option levels".to_string()));
        }

        let rows = index_rows(
            ProviderKind::Structured,
            taxonomy,
            &product_line_id,
            mapping.key_depth(levels),
            mapping.rows.iter().map(|r| (r.key.clone(), r.clone())),
        )?;

        if mapping.appends_level2(levels) {
            let level2_ids: BTreeSet<u32> = taxonomy
                .node(&product_line_id, 1)
                .map(|node| node.allowed_values.iter().filter_map(|v| v.structured_option_id).collect())
                .unwrap_or_default();
            for row in rows.values() {
                if let Some(id) = row.option_ids.iter().find(|id| level2_ids.contains(id)) {
                    return Err(invalid(format!(
                        "row {:?} already carries level-2 option id {}",
                        row.key, id
                    )));
                }
            }
        }

        let line = StructuredLine { levels, mapping, rows };
        let signatures = signatures(taxonomy, &product_line_id, &line).map_err(&invalid)?;
        for (signature, tuple) in &signatures {
            if let Some((other_line, other)) = self.codes.get(signature) {
                return Err(invalid(format!(
                    "{:?} encodes to the same structured code as {:?} of '{}'",
                    tuple.values(),
                    other.values(),
                    other_line
                )));
            }
        }

        tracing::debug!(product_line = %product_line_id, rows = line.rows.len(), "structured mapping registered");
        self.codes.extend(
            signatures
                .into_iter()
                .map(|(signature, tuple)| (signature, (product_line_id.clone(), tuple))),
        );
        self.lines.insert(product_line_id, line);
        Ok(())
    }

    /// Structured code for a resolved selection
    pub fn structured_code(
        &self,
        taxonomy: &TaxonomyRegistry,
        selection: &ResolvedSelection,
    ) -> Result<StructuredCode, TranslationError> {
        let line = self.lines.get(&selection.product_line_id).ok_or_else(|| {
            unmappable(selection, "no structured mapping for product line")
        })?;
        let (subcategory_id, option_ids) =
            resolve_ids(taxonomy, &selection.product_line_id, line, &selection.canonical)
                .map_err(|reason| unmappable(selection, &reason))?;

        Ok(StructuredCode {
            subcategory_id,
            width: selection.dimensions.width,
            height: selection.dimensions.height,
            quantity: selection.quantity,
            option_ids,
        })
    }
}

impl ProviderCodec for StructuredCodec {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Structured
    }

    fn encode(
        &self,
        taxonomy: &TaxonomyRegistry,
        selection: &ResolvedSelection,
    ) -> Result<ProviderCode, TranslationError> {
        self.structured_code(taxonomy, selection).map(ProviderCode::Structured)
    }
}

fn resolve_ids(
    taxonomy: &TaxonomyRegistry,
    product_line_id: &str,
    line: &StructuredLine,
    tuple: &CanonicalTuple,
) -> Result<(u32, Vec<u32>), String> {
    let key = MappingKey::from_tuple(tuple, line.mapping.key_depth(line.levels));
    let row = line
        .rows
        .get(&key)
        .ok_or_else(|| format!("no mapping row for {:?}", tuple.values()))?;

    let mut option_ids = row.option_ids.clone();
    if line.mapping.appends_level2(line.levels) {
        let value = tuple.level2().ok_or_else(|| "missing level-2 value".to_string())?;
        let id = taxonomy
            .node(product_line_id, 1)
            .and_then(|node| node.value(value))
            .and_then(|v| v.structured_option_id)
            .ok_or_else(|| format!("level-2 value '{value}' has no structured option id"))?;
        option_ids.push(id);
    }
    Ok((row.subcategory_id, option_ids))
}

/// Code signature of every encodable tuple of a line; fails if two tuples share one
fn signatures(
    taxonomy: &TaxonomyRegistry,
    product_line_id: &str,
    line: &StructuredLine,
) -> Result<Vec<(CodeSignature, CanonicalTuple)>, String> {
    let mut seen: HashMap<CodeSignature, CanonicalTuple> = HashMap::new();
    for tuple in taxonomy.canonical_tuples(product_line_id) {
        // Tuples without a row fail at request time; they cannot collide
        let Ok((subcategory_id, option_ids)) = resolve_ids(taxonomy, product_line_id, line, &tuple) else {
            continue;
        };
        let signature = (subcategory_id, option_ids.into_iter().collect::<BTreeSet<_>>());
        if let Some(previous) = seen.insert(signature, tuple.clone()) {
            return Err(format!(
                "{:?} and {:?} map to the same structured code",
                previous.values(),
                tuple.values()
            ));
        }
    }
    Ok(seen.into_iter().collect())
}

fn unmappable(selection: &ResolvedSelection, reason: &str) -> TranslationError {
    TranslationError::UnmappableSelection {
        provider: ProviderKind::Structured,
        product_line: selection.product_line_id.clone(),
        tuple: selection.canonical.values().to_vec(),
        reason: reason.to_string(),
    }
}
