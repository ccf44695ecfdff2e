//! Entity Tagging Strategies
//!
//! Provides the tagger interface the graph core consumes and the two
//! implementations shipped with the crate: a regex tagger for legal text
//! and a client for an external NLP service.

pub mod external_nlp;
pub mod normalize;
pub mod patterns;

pub use external_nlp::ExternalNlpTagger;
pub use patterns::PatternTagger;

use crate::config::TaggerConfig;
use crate::domain::EntitySpan;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;

// =============================================================================
// Tagger Trait
// =============================================================================

/// Turns raw text into typed spans.
///
/// Offsets are authoritative for proximity and section calculations; spans
/// may overlap.
#[async_trait]
pub trait EntityTagger: Send + Sync + std::fmt::Debug {
    /// Tag a text.
    async fn tag(&self, text: &str) -> Result<Vec<EntitySpan>>;

    /// Get the name of this tagger.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Factory
// =============================================================================

/// Build the tagger selected by configuration.
pub fn build_tagger(config: &TaggerConfig) -> Result<Arc<dyn EntityTagger>> {
    match config.provider.as_str() {
        "pattern" => Ok(Arc::new(PatternTagger::new())),
        "external" => {
            let base_url = config
                .base_url
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| anyhow!("tagger.base_url is required for the external tagger"))?;
            Ok(Arc::new(ExternalNlpTagger::with_config(
                base_url,
                config.clone(),
            )))
        }
        other => Err(anyhow!("Unknown tagger provider: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_provider() {
        let config = TaggerConfig::default();
        assert_eq!(build_tagger(&config).unwrap().name(), "pattern");

        let external = TaggerConfig {
            provider: "external".to_string(),
            base_url: Some("http://localhost:8080".to_string()),
            ..TaggerConfig::default()
        };
        assert_eq!(build_tagger(&external).unwrap().name(), "external_nlp");
    }

    #[test]
    fn test_factory_rejects_incomplete_config() {
        let missing_url = TaggerConfig {
            provider: "external".to_string(),
            base_url: None,
            ..TaggerConfig::default()
        };
        assert!(build_tagger(&missing_url).is_err());

        let unknown = TaggerConfig {
            provider: "spacy-magic".to_string(),
            ..TaggerConfig::default()
        };
        assert!(build_tagger(&unknown).is_err());
    }
}
