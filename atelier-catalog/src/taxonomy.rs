use atelier_shared::{Dimensions, ProductSelection};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Maximum number of option levels a product line may declare
pub const MAX_LEVELS: usize = 2;

/// One allowed value of an option level, with its provider-specific codes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionValue {
    /// Canonical spelling
    pub value: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Option id understood by the structured-parameter provider
    #[serde(default)]
    pub structured_option_id: Option<u32>,
    /// Token understood by the token-string provider
    #[serde(default)]
    pub token: Option<String>,
}

impl OptionValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            aliases: Vec::new(),
            structured_option_id: None,
            token: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_structured_id(mut self, id: u32) -> Self {
        self.structured_option_id = Some(id);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn matches_normalized(&self, normalized: &str) -> bool {
        normalize(&self.value) == normalized || self.aliases.iter().any(|a| normalize(a) == normalized)
    }
}

/// Registration data for one option level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub name: String,
    pub values: Vec<OptionValue>,
}

impl LevelDefinition {
    pub fn new(name: impl Into<String>, values: Vec<OptionValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// One option level of a registered product line
#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyNode {
    pub product_line_id: String,
    pub level_index: usize,
    pub name: String,
    pub allowed_values: Vec<OptionValue>,
}

impl TaxonomyNode {
    /// Look up an allowed value by its canonical spelling
    pub fn value(&self, canonical: &str) -> Option<&OptionValue> {
        self.allowed_values.iter().find(|v| v.value == canonical)
    }

    fn resolve_choice(&self, input: &str) -> Result<&OptionValue, TaxonomyError> {
        if let Some(exact) = self.value(input) {
            return Ok(exact);
        }

        let normalized = normalize(input);
        if normalized.is_empty() {
            return Err(TaxonomyError::InvalidSelection {
                product_line: self.product_line_id.clone(),
                reason: format!("empty choice for level '{}'", self.name),
            });
        }

        let candidates: Vec<&OptionValue> = self
            .allowed_values
            .iter()
            .filter(|v| v.matches_normalized(&normalized))
            .collect();

        match candidates.as_slice() {
            [] => Err(TaxonomyError::InvalidSelection {
                product_line: self.product_line_id.clone(),
                reason: format!("'{}' is not registered for level '{}'", input, self.name),
            }),
            [single] => Ok(*single),
            many => Err(TaxonomyError::AmbiguousAlias {
                product_line: self.product_line_id.clone(),
                level: self.name.clone(),
                input: input.to_string(),
                candidates: many.iter().map(|v| v.value.clone()).collect(),
            }),
        }
    }
}

/// Normalized, validated option choices for a product line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct CanonicalTuple(Vec<String>);

impl CanonicalTuple {
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, level_index: usize) -> Option<&str> {
        self.0.get(level_index).map(String::as_str)
    }

    pub fn level1(&self) -> Option<&str> {
        self.get(0)
    }

    pub fn level2(&self) -> Option<&str> {
        self.get(1)
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

/// A selection after taxonomy validation and alias normalization
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSelection {
    pub product_line_id: String,
    pub canonical: CanonicalTuple,
    pub dimensions: Dimensions,
    pub quantity: u32,
}

/// Defines and normalizes the option hierarchy per product line
#[derive(Debug, Default)]
pub struct TaxonomyRegistry {
    lines: HashMap<String, Vec<TaxonomyNode>>,
}

impl TaxonomyRegistry {
    pub fn new() -> Self {
        Self {
            lines: HashMap::new(),
        }
    }

    /// Register a product line with 0, 1 or 2 option levels
    pub fn register(
        &mut self,
        product_line_id: &str,
        levels: Vec<LevelDefinition>,
    ) -> Result<(), TaxonomyError> {
        let invalid = |reason: String| TaxonomyError::InvalidRegistration {
            product_line: product_line_id.to_string(),
            reason,
        };

        if self.lines.contains_key(product_line_id) {
            return Err(invalid("product line already registered".to_string()));
        }
        if levels.len() > MAX_LEVELS {
            return Err(invalid(format!(
                "{} levels declared, at most {} supported",
                levels.len(),
                MAX_LEVELS
            )));
        }

        let mut nodes = Vec::with_capacity(levels.len());
        for (level_index, level) in levels.into_iter().enumerate() {
            if level.values.is_empty() {
                return Err(invalid(format!("level '{}' has no allowed values", level.name)));
            }
            let mut seen = HashSet::new();
            for value in &level.values {
                if !seen.insert(value.value.as_str()) {
                    return Err(invalid(format!(
                        "duplicate value '{}' in level '{}'",
                        value.value, level.name
                    )));
                }
            }
            nodes.push(TaxonomyNode {
                product_line_id: product_line_id.to_string(),
                level_index,
                name: level.name,
                allowed_values: level.values,
            });
        }

        tracing::debug!(product_line = product_line_id, levels = nodes.len(), "registered product line");
        self.lines.insert(product_line_id.to_string(), nodes);
        Ok(())
    }

    pub fn contains(&self, product_line_id: &str) -> bool {
        self.lines.contains_key(product_line_id)
    }

    pub fn level_count(&self, product_line_id: &str) -> Option<usize> {
        self.lines.get(product_line_id).map(Vec::len)
    }

    pub fn levels(&self, product_line_id: &str) -> Option<&[TaxonomyNode]> {
        self.lines.get(product_line_id).map(Vec::as_slice)
    }

    pub fn node(&self, product_line_id: &str, level_index: usize) -> Option<&TaxonomyNode> {
        self.lines.get(product_line_id)?.get(level_index)
    }

    /// Resolve raw choices into the canonical tuple for a product line
    pub fn resolve(
        &self,
        product_line_id: &str,
        choices: &[String],
    ) -> Result<CanonicalTuple, TaxonomyError> {
        let nodes = self
            .lines
            .get(product_line_id)
            .ok_or_else(|| TaxonomyError::InvalidSelection {
                product_line: product_line_id.to_string(),
                reason: "unknown product line".to_string(),
            })?;

        if choices.len() != nodes.len() {
            return Err(TaxonomyError::InvalidSelection {
                product_line: product_line_id.to_string(),
                reason: format!("expected {} choices, got {}", nodes.len(), choices.len()),
            });
        }

        let values = nodes
            .iter()
            .zip(choices)
            .map(|(node, choice)| node.resolve_choice(choice).map(|v| v.value.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CanonicalTuple::new(values))
    }

    /// Validate a full selection: choices, dimensions and quantity
    pub fn resolve_selection(
        &self,
        selection: &ProductSelection,
    ) -> Result<ResolvedSelection, TaxonomyError> {
        let canonical = self.resolve(&selection.product_line_id, &selection.choices)?;

        let dimensions = selection.dimensions();
        if !dimensions.is_valid() {
            return Err(TaxonomyError::InvalidSelection {
                product_line: selection.product_line_id.clone(),
                reason: format!(
                    "dimensions must be positive, got {}x{}",
                    selection.width, selection.height
                ),
            });
        }
        if selection.quantity == 0 {
            return Err(TaxonomyError::InvalidSelection {
                product_line: selection.product_line_id.clone(),
                reason: "quantity must be at least 1".to_string(),
            });
        }

        Ok(ResolvedSelection {
            product_line_id: selection.product_line_id.clone(),
            canonical,
            dimensions,
            quantity: selection.quantity,
        })
    }

    /// Every canonical tuple the product line accepts, in registration order
    pub fn canonical_tuples(&self, product_line_id: &str) -> Vec<CanonicalTuple> {
        let Some(nodes) = self.lines.get(product_line_id) else {
            return Vec::new();
        };

        let mut tuples: Vec<Vec<String>> = vec![Vec::new()];
        for node in nodes {
            tuples = tuples
                .into_iter()
                .flat_map(|prefix| {
                    node.allowed_values.iter().map(move |v| {
                        let mut next = prefix.clone();
                        next.push(v.value.clone());
                        next
                    })
                })
                .collect();
        }
        tuples.into_iter().map(CanonicalTuple::new).collect()
    }
}

/// Case, whitespace and punctuation-insensitive form of an option spelling
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaxonomyError {
    #[error("Invalid selection for product line '{product_line}': {reason}")]
    InvalidSelection { product_line: String, reason: String },

    #[error("Ambiguous choice '{input}' for '{product_line}' level '{level}': matches {candidates:?}")]
    AmbiguousAlias {
        product_line: String,
        level: String,
        input: String,
        candidates: Vec<String>,
    },

    #[error("Invalid registration for product line '{product_line}': {reason}")]
    InvalidRegistration { product_line: String, reason: String },
}
