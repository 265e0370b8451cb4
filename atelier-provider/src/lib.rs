pub mod mapping;
pub mod structured;
pub mod token;
pub mod translator;

pub use mapping::{MappingKey, StructuredMapping, StructuredRow, TokenField, TokenMapping, TokenRow, TokenTemplate};
pub use structured::StructuredCodec;
pub use token::TokenCodec;
pub use translator::{ProviderCodec, ProviderCodeTranslator};

use atelier_shared::format_dimension;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a fulfillment provider dialect
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Typed parameters: subcategory id plus option ids
    Structured,
    /// One delimited token string
    Token,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Structured => "structured",
            ProviderKind::Token => "token",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredCode {
    pub subcategory_id: u32,
    pub width: f64,
    pub height: f64,
    pub quantity: u32,
    pub option_ids: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenCode {
    pub code: String,
}

/// A resolved selection encoded for one provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderCode {
    Structured(StructuredCode),
    Token(TokenCode),
}

impl ProviderCode {
    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderCode::Structured(_) => ProviderKind::Structured,
            ProviderCode::Token(_) => ProviderKind::Token,
        }
    }

    /// String form of the code, excluding quantity
    pub fn code_string(&self) -> String {
        match self {
            ProviderCode::Structured(code) => {
                let options: Vec<String> = code.option_ids.iter().map(u32::to_string).collect();
                format!(
                    "{}/{}x{}/{}",
                    code.subcategory_id,
                    format_dimension(code.width),
                    format_dimension(code.height),
                    options.join(",")
                )
            }
            ProviderCode::Token(code) => code.code.clone(),
        }
    }

    /// Key under which prices for this code are cached
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.provider(), self.code_string())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslationError {
    #[error("Cannot map {tuple:?} of product line '{product_line}' for the {provider} provider: {reason}")]
    UnmappableSelection {
        provider: ProviderKind,
        product_line: String,
        tuple: Vec<String>,
        reason: String,
    },

    #[error("Invalid {provider} mapping for product line '{product_line}': {reason}")]
    InvalidMapping {
        provider: ProviderKind,
        product_line: String,
        reason: String,
    },

    #[error("No codec registered for provider {0}")]
    UnknownProvider(ProviderKind),
}
