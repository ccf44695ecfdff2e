//! Input records consumed by a graph build.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source document. When `content` is absent the service reads
/// `file_path` as UTF-8 text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Caller-side document reference
    #[serde(alias = "_id")]
    pub id: String,
    /// Original filename, used as the document node label
    #[serde(default)]
    pub filename: Option<String>,
    /// Extracted plain text
    #[serde(default)]
    pub content: Option<String>,
    /// Path to a text file holding the content
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

impl Document {
    /// A document whose text is already extracted.
    pub fn from_text(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A document read lazily from disk.
    pub fn from_path(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(String::from);
        Self {
            id: id.into(),
            filename,
            content: None,
            file_path: Some(path),
        }
    }

    /// Label shown on the document node.
    pub fn display_name(&self) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| format!("Document {}", self.id))
    }
}

/// One exchange in a chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user_message: String,
    pub ai_response: String,
}

impl ChatTurn {
    pub fn new(user_message: impl Into<String>, ai_response: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ai_response: ai_response.into(),
        }
    }
}

/// A typed span returned by an entity tagger. Offsets are byte offsets
/// into the tagged text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Tagger label, e.g. "CASE" or "case_citation"
    #[serde(rename = "type", alias = "label")]
    pub entity_type: String,
    /// Surface text
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Tagger confidence in [0, 1]
    #[serde(default = "default_span_confidence")]
    pub confidence: f32,
}

fn default_span_confidence() -> f32 {
    1.0
}

impl EntitySpan {
    pub fn new(entity_type: impl Into<String>, text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            entity_type: entity_type.into(),
            text: text.into(),
            start,
            end,
            confidence: 1.0,
        }
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}
