//! External NLP Service Client
//!
//! REST client for taggers hosted outside the process (SpaCy, Stanza, a
//! fine-tuned legal NER model, ...). Only entity spans are requested; the
//! graph core infers relationships itself.

use super::EntityTagger;
use crate::config::TaggerConfig;
use crate::domain::EntitySpan;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

// =============================================================================
// REST API Request/Response Types
// =============================================================================

/// Request body for the /extract endpoint.
#[derive(Debug, Serialize)]
pub struct ExtractRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ExtractOptions>,
}

/// Options for extraction.
#[derive(Debug, Serialize)]
pub struct ExtractOptions {
    pub extract_entities: bool,
    pub extract_relations: bool,
    pub coreference: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            extract_entities: true,
            extract_relations: false,
            coreference: false,
        }
    }
}

/// Response from the /extract endpoint.
#[derive(Debug, Deserialize)]
pub struct ExtractResponse {
    pub entities: Vec<EntityDto>,
}

/// Entity as returned by the external service.
#[derive(Debug, Deserialize)]
pub struct EntityDto {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub confidence: Option<f32>,
}

// =============================================================================
// External NLP Tagger
// =============================================================================

/// Client for external NLP tagging services.
#[derive(Debug, Clone)]
pub struct ExternalNlpTagger {
    client: Client,
    base_url: String,
    config: TaggerConfig,
}

impl ExternalNlpTagger {
    /// Create a new external tagger.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the NLP service (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_config(base_url, TaggerConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(base_url: impl Into<String>, config: TaggerConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config,
        }
    }

    /// Convert the service response into spans, applying the confidence
    /// floor and entity cap.
    ///
    /// The service reports character offsets; spans carry byte offsets into
    /// `text`. Entities whose offsets fall outside `text` are dropped.
    fn spans_from(&self, text: &str, response: ExtractResponse) -> Vec<EntitySpan> {
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(byte, _)| byte)
            .chain(std::iter::once(text.len()))
            .collect();
        let to_byte = |offset: usize| boundaries.get(offset).copied();

        response
            .entities
            .into_iter()
            .filter(|e| e.start <= e.end)
            .filter_map(|e| {
                let (start, end) = (to_byte(e.start)?, to_byte(e.end)?);
                Some((e, start, end))
            })
            .filter(|(e, _, _)| e.confidence.unwrap_or(1.0) >= self.config.min_confidence)
            .take(self.config.max_entities)
            .map(|(e, start, end)| {
                EntitySpan::new(e.label, e.text, start, end)
                    .with_confidence(e.confidence.unwrap_or(1.0))
            })
            .collect()
    }
}

#[async_trait]
impl EntityTagger for ExternalNlpTagger {
    async fn tag(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let url = format!("{}/extract", self.base_url);

        let request = ExtractRequest {
            text: text.to_string(),
            options: Some(ExtractOptions::default()),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to connect to NLP service: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("NLP service returned error: {}", response.status()));
        }

        let extract_response: ExtractResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse NLP response: {}", e))?;

        let spans = self.spans_from(text, extract_response);
        tracing::debug!(count = spans.len(), "External NLP tagged spans");
        Ok(spans)
    }

    fn name(&self) -> &'static str {
        "external_nlp"
    }
}

// =============================================================================
// Tests
// =============================================================================
