//! Entity Registry
//!
//! Collapses tagged spans from one or more sources into canonical entity
//! nodes keyed by `(type, normalized_value)`.

use crate::domain::{EntityNode, EntitySpan, EntityType};
use crate::extraction::normalize::{
    canonical_tag, ceil_boundary, context_window, floor_boundary, normalize_value,
};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// One occurrence of a node inside a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mention {
    /// Index into [`EntityRegistry::nodes`]
    pub node: usize,
    /// Byte offsets, snapped to char boundaries
    pub start: usize,
    pub end: usize,
}

/// A tagged text (document body or chat response) and the mentions found in it.
#[derive(Debug, Clone)]
pub struct SourceText {
    /// Id of the anchor node representing this source
    pub anchor_id: String,
    pub text: String,
    /// Mentions in tagging order
    pub mentions: Vec<Mention>,
}

impl SourceText {
    /// Mentions sorted by position.
    pub fn mentions_by_offset(&self) -> Vec<Mention> {
        let mut mentions = self.mentions.clone();
        mentions.sort_by_key(|m| (m.start, m.end, m.node));
        mentions
    }
}

/// Deterministic node id for a dedup key.
pub fn entity_id(entity_type: EntityType, normalized_value: &str) -> String {
    let name = format!("{entity_type}:{normalized_value}");
    let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
    format!("{}_{}", entity_type.as_str(), uuid.simple())
}

/// Deduplicating node store for a single build.
#[derive(Debug)]
pub struct EntityRegistry {
    context_window: usize,
    nodes: Vec<EntityNode>,
    index: HashMap<(EntityType, String), usize>,
    by_type: BTreeMap<EntityType, Vec<usize>>,
    sources: Vec<SourceText>,
}

impl EntityRegistry {
    pub fn new(context_window: usize) -> Self {
        Self {
            context_window,
            nodes: Vec::new(),
            index: HashMap::new(),
            by_type: BTreeMap::new(),
            sources: Vec::new(),
        }
    }

    /// Register a source text; returns its index for [`Self::register`].
    pub fn add_source(&mut self, anchor_id: impl Into<String>, text: impl Into<String>) -> usize {
        self.sources.push(SourceText {
            anchor_id: anchor_id.into(),
            text: text.into(),
            mentions: Vec::new(),
        });
        self.sources.len() - 1
    }

    /// Merge one span found in `source`. Returns the node index, or `None`
    /// when the span carries no usable text.
    pub fn register(&mut self, source: usize, span: &EntitySpan) -> Option<usize> {
        let surface = span.text.trim();
        if surface.is_empty() {
            return None;
        }

        let tag = canonical_tag(&span.entity_type);
        let entity_type = EntityType::from_tag(&tag);
        let normalized = normalize_value(entity_type, surface);
        if normalized.is_empty() {
            return None;
        }

        let text = &self.sources.get(source)?.text;
        let start = floor_boundary(text, span.start);
        let end = ceil_boundary(text, span.end.max(start));
        let key = (entity_type, normalized);

        let node = match self.index.get(&key) {
            Some(&idx) => {
                let node = &mut self.nodes[idx];
                node.frequency += 1;
                node.confidence = node.confidence.max(span.confidence);
                idx
            }
            None => {
                let context = context_window(text, start, end, self.context_window).to_string();
                let idx = self.nodes.len();
                self.nodes.push(EntityNode {
                    id: entity_id(entity_type, &key.1),
                    label: surface.to_string(),
                    entity_type,
                    tag: Some(tag),
                    normalized_value: key.1.clone(),
                    context,
                    frequency: 1,
                    confidence: span.confidence,
                    ..EntityNode::anchor("", "", entity_type)
                });
                self.by_type.entry(entity_type).or_default().push(idx);
                self.index.insert(key, idx);
                idx
            }
        };

        self.sources[source]
            .mentions
            .push(Mention { node, start, end });
        Some(node)
    }

    /// Merge every span of a source, returning how many were kept.
    pub fn register_all(&mut self, source: usize, spans: &[EntitySpan]) -> usize {
        spans
            .iter()
            .filter(|span| self.register(source, span).is_some())
            .count()
    }

    pub fn nodes(&self) -> &[EntityNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &EntityNode {
        &self.nodes[idx]
    }

    pub fn sources(&self) -> &[SourceText] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node indices of one type, in registration order.
    pub fn of_type(&self, entity_type: EntityType) -> &[usize] {
        self.by_type.get(&entity_type).map_or(&[], Vec::as_slice)
    }

    /// Node indices carrying a canonical tag, in registration order.
    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = usize> + 'a {
        let entity_type = EntityType::from_tag(tag);
        self.of_type(entity_type)
            .iter()
            .copied()
            .filter(move |&idx| self.nodes[idx].tag() == tag)
    }

    /// Per-source index: each node mentioned in `source` with its mention
    /// count, in order of first mention.
    pub fn source_index(&self, source: usize) -> Vec<(usize, usize)> {
        let mut counts: Vec<(usize, usize)> = Vec::new();
        let mut seen: HashMap<usize, usize> = HashMap::new();
        for mention in &self.sources[source].mentions {
            match seen.get(&mention.node) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    seen.insert(mention.node, counts.len());
                    counts.push((mention.node, 1));
                }
            }
        }
        counts
    }

    /// Hand the node set to the assembler.
    pub fn into_nodes(self) -> Vec<EntityNode> {
        self.nodes
    }
}
