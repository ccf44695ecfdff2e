//! Regex tagger for legal text.
//!
//! Needs no network access. Recall is modest; it exists so a graph can be
//! built without an NLP service and as the default provider.

use super::EntityTagger;
use crate::domain::EntitySpan;
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

struct Rule {
    tag: &'static str,
    regex: Regex,
    /// Capture group holding the entity text (0 = whole match)
    group: usize,
    confidence: f32,
}

fn rule(tag: &'static str, pattern: &str, group: usize, confidence: f32) -> Rule {
    Rule {
        tag,
        regex: Regex::new(pattern).expect("static tagger pattern"),
        group,
        confidence,
    }
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            rule("CASE", r"\b([A-Z][a-z]+\s+v\.\s+[A-Z][a-z]+)", 1, 0.9),
            rule("STATUTE", r"(\d+\s+U\.S\.C\.\s+§+\s*\d+[a-z]?)", 1, 0.95),
            rule(
                "DATE",
                r"\b((?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4})",
                1,
                0.85,
            ),
            rule(
                "PRINCIPLE",
                r"(?:principle|doctrine) of\s+([A-Za-z]+(?:\s+[A-Za-z]+){0,2})",
                1,
                0.7,
            ),
            rule(
                "COURT",
                r"\b(Supreme Court|District Court|Circuit Court|Court of Appeals|High Court)\b",
                1,
                0.9,
            ),
            rule("JUDGE", r"\b(?:Chief\s+)?(?:Justice|Judge)\s+[A-Z][a-z]+", 0, 0.8),
            rule(
                "PROVISION",
                r"\b((?:Section|Article|Clause)\s+\d+[A-Za-z]?(?:\(\w+\))*)",
                1,
                0.75,
            ),
            rule(
                "PETITIONER",
                r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?),?\s+\(?(?:the\s+)?(?:petitioner|appellant|plaintiff)\b",
                1,
                0.7,
            ),
            rule(
                "RESPONDENT",
                r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?),?\s+\(?(?:the\s+)?(?:respondent|appellee|defendant)\b",
                1,
                0.7,
            ),
        ]
    })
}

/// Tagger driven by a fixed table of legal-text patterns.
#[derive(Debug, Default, Clone)]
pub struct PatternTagger;

impl PatternTagger {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`EntityTagger::tag`].
    pub fn tag_text(&self, text: &str) -> Vec<EntitySpan> {
        let mut spans: Vec<EntitySpan> = rules()
            .iter()
            .flat_map(|rule| {
                rule.regex.captures_iter(text).filter_map(move |caps| {
                    let m = caps.get(rule.group)?;
                    Some(
                        EntitySpan::new(rule.tag, m.as_str().trim(), m.start(), m.end())
                            .with_confidence(rule.confidence),
                    )
                })
            })
            .collect();
        spans.sort_by_key(|s| (s.start, s.end));
        spans
    }
}

#[async_trait]
impl EntityTagger for PatternTagger {
    async fn tag(&self, text: &str) -> Result<Vec<EntitySpan>> {
        Ok(self.tag_text(text))
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}
