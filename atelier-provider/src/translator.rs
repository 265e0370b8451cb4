use atelier_catalog::{ResolvedSelection, TaxonomyRegistry};
use std::collections::HashMap;

use crate::{ProviderCode, ProviderKind, StructuredCode, TokenCode, TranslationError};

/// One provider dialect
pub trait ProviderCodec: Send + Sync {
    fn provider(&self) -> ProviderKind;

    fn encode(
        &self,
        taxonomy: &TaxonomyRegistry,
        selection: &ResolvedSelection,
    ) -> Result<ProviderCode, TranslationError>;
}

/// Dispatches a resolved selection to the codec of the requested provider
#[derive(Default)]
pub struct ProviderCodeTranslator {
    codecs: HashMap<ProviderKind, Box<dyn ProviderCodec>>,
}

impl ProviderCodeTranslator {
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Install a codec, replacing any previous codec for the same provider
    pub fn with_codec(mut self, codec: impl ProviderCodec + 'static) -> Self {
        self.codecs.insert(codec.provider(), Box::new(codec));
        self
    }

    pub fn translate(
        &self,
        provider: ProviderKind,
        taxonomy: &TaxonomyRegistry,
        selection: &ResolvedSelection,
    ) -> Result<ProviderCode, TranslationError> {
        let codec = self
            .codecs
            .get(&provider)
            .ok_or(TranslationError::UnknownProvider(provider))?;
        codec.encode(taxonomy, selection)
    }

    pub fn structured(
        &self,
        taxonomy: &TaxonomyRegistry,
        selection: &ResolvedSelection,
    ) -> Result<StructuredCode, TranslationError> {
        match self.translate(ProviderKind::Structured, taxonomy, selection)? {
            ProviderCode::Structured(code) => Ok(code),
            ProviderCode::Token(_) => Err(TranslationError::UnknownProvider(ProviderKind::Structured)),
        }
    }

    pub fn token(
        &self,
        taxonomy: &TaxonomyRegistry,
        selection: &ResolvedSelection,
    ) -> Result<TokenCode, TranslationError> {
        match self.translate(ProviderKind::Token, taxonomy, selection)? {
            ProviderCode::Token(code) => Ok(code),
            ProviderCode::Structured(_) => Err(TranslationError::UnknownProvider(ProviderKind::Token)),
        }
    }
}
