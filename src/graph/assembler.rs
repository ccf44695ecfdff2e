//! Graph Assembler
//!
//! Accumulates anchors, tagged sources and edges, then freezes them into a
//! [`DocumentGraph`] annotated with community ids and centrality.

use super::centrality::betweenness;
use super::inference::{EdgeSet, InferenceContext, InferenceStrategy, default_strategies, run_strategies};
use super::louvain::{CommunityConfig, CommunityDetector};
use super::project;
use super::registry::EntityRegistry;
use crate::config::GraphConfig;
use crate::domain::{
    ChatTurn, DEFAULT_COMMUNITY, DocumentGraph, EntityNode, EntitySpan, EntityType, GraphKind,
    RelationLabel, RelationshipEdge,
};
use chrono::Utc;
use uuid::Uuid;

/// Characters of a chat turn kept in its node label.
const CHAT_LABEL_CHARS: usize = 30;

/// Knobs the assembler needs from [`GraphConfig`].
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub proximity_threshold: usize,
    pub context_window: usize,
    pub community_detection: bool,
    pub centrality: bool,
    pub community: CommunityConfig,
}

impl From<&GraphConfig> for BuildSettings {
    fn from(config: &GraphConfig) -> Self {
        Self {
            proximity_threshold: config.proximity_threshold,
            context_window: config.context_window,
            community_detection: config.community_detection,
            centrality: config.centrality,
            community: CommunityConfig {
                resolution: config.resolution,
                max_iterations: config.max_iterations,
                ..CommunityConfig::default()
            },
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self::from(&GraphConfig::default())
    }
}

pub fn document_anchor_id(doc_id: &str) -> String {
    format!("doc_{doc_id}")
}

fn chat_label(text: &str) -> String {
    let head: String = text.chars().take(CHAT_LABEL_CHARS).collect();
    format!("{head}...")
}

/// In-memory graph under construction. Consumed by [`GraphBuilder::build`].
#[derive(Debug)]
pub struct GraphBuilder {
    settings: BuildSettings,
    strategies: Vec<Box<dyn InferenceStrategy>>,
    registry: EntityRegistry,
    anchors: Vec<EntityNode>,
    /// Relation from each source's anchor to the entities it mentions
    containment: Vec<RelationLabel>,
    anchor_edges: Vec<RelationshipEdge>,
    messages: Vec<String>,
    referenced: Vec<String>,
}

impl GraphBuilder {
    pub fn new(settings: BuildSettings) -> Self {
        let registry = EntityRegistry::new(settings.context_window);
        Self {
            settings,
            strategies: default_strategies(),
            registry,
            anchors: Vec::new(),
            containment: Vec::new(),
            anchor_edges: Vec::new(),
            messages: Vec::new(),
            referenced: Vec::new(),
        }
    }

    /// Replace the inference strategies (run in the given order).
    #[must_use]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn InferenceStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    fn push_anchor(&mut self, node: EntityNode) -> String {
        let id = node.id.clone();
        if !self.anchors.iter().any(|a| a.id == id) {
            self.anchors.push(node);
        }
        id
    }

    fn add_source(&mut self, anchor_id: &str, text: &str, label: RelationLabel, spans: &[EntitySpan]) -> usize {
        let source = self.registry.add_source(anchor_id, text);
        self.containment.push(label);
        self.registry.register_all(source, spans)
    }

    /// Add a document and its tagged spans. Returns the document node id.
    pub fn add_document(&mut self, doc_id: &str, label: impl Into<String>, text: &str, spans: &[EntitySpan]) -> String {
        let anchor = self.push_anchor(EntityNode::anchor(
            document_anchor_id(doc_id),
            label,
            EntityType::Document,
        ));
        let kept = self.add_source(&anchor, text, RelationLabel::Contains, spans);
        tracing::debug!(document_id = %doc_id, spans = spans.len(), kept, "Document registered");
        anchor
    }

    /// Add one chat exchange. Only the response text is mined for entities.
    pub fn add_chat_turn(&mut self, index: usize, turn: &ChatTurn, response_spans: &[EntitySpan]) {
        let message = self.push_anchor(EntityNode::anchor(
            format!("msg_{index}"),
            chat_label(&turn.user_message),
            EntityType::UserMessage,
        ));
        let response = self.push_anchor(EntityNode::anchor(
            format!("resp_{index}"),
            chat_label(&turn.ai_response),
            EntityType::AiResponse,
        ));
        self.anchor_edges
            .push(RelationshipEdge::new(&message, &response, RelationLabel::Generates));
        self.messages.push(message);
        self.add_source(&response, &turn.ai_response, RelationLabel::Mentions, response_spans);
    }

    /// Add a document referenced during a chat; it is linked to every user message.
    pub fn add_referenced_document(&mut self, doc_id: &str) {
        let short: String = doc_id.chars().take(8).collect();
        let anchor = self.push_anchor(EntityNode::anchor(
            document_anchor_id(doc_id),
            format!("Document {short}"),
            EntityType::Document,
        ));
        if !self.referenced.contains(&anchor) {
            self.referenced.push(anchor);
        }
    }

    /// Run inference, annotate, and freeze the graph under a fresh id.
    pub fn build(self, kind: GraphKind, name: impl Into<String>, document_ids: Vec<String>) -> DocumentGraph {
        let Self {
            settings,
            strategies,
            registry,
            anchors,
            containment,
            anchor_edges,
            messages,
            referenced,
        } = self;

        let mut edges = EdgeSet::new();
        for edge in anchor_edges {
            edges.insert(edge);
        }
        for doc in &referenced {
            for message in &messages {
                edges.insert(RelationshipEdge::new(doc, message, RelationLabel::ReferencedIn));
            }
        }

        for (source, label) in containment.iter().enumerate() {
            let anchor = &registry.sources()[source].anchor_id;
            for (node, count) in registry.source_index(source) {
                let edge = RelationshipEdge::new(anchor, &registry.node(node).id, *label)
                    .with_weight(count as f32 / 10.0);
                edges.insert(edge);
            }
        }

        let ctx = InferenceContext {
            registry: &registry,
            proximity_threshold: settings.proximity_threshold,
        };
        let inferred = run_strategies(&strategies, &ctx, &mut edges);

        let mut nodes = anchors;
        nodes.extend(registry.into_nodes());
        let edges = edges.into_edges();
        annotate(&settings, &mut nodes, &edges);

        let graph = DocumentGraph {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            created_at: Utc::now(),
            document_ids,
            nodes,
            edges,
        };
        tracing::info!(
            graph_id = %graph.id,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            inferred,
            "Graph assembled"
        );
        graph
    }
}

/// Assign community ids and centrality. Failures fall back to the
/// documented defaults and are logged.
fn annotate(settings: &BuildSettings, nodes: &mut [EntityNode], edges: &[RelationshipEdge]) {
    let graph = project(nodes, edges);

    if !settings.community_detection {
        tracing::debug!("Community detection disabled, assigning community 0");
    } else if nodes.len() < 2 {
        tracing::debug!(nodes = nodes.len(), "Too few nodes for community detection");
    } else {
        match CommunityDetector::with_config(settings.community.clone()).detect(&graph) {
            Ok(communities) => {
                for node_idx in graph.node_indices() {
                    nodes[graph[node_idx]].community = communities[node_idx.index()];
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Community detection failed, assigning community 0");
                for node in nodes.iter_mut() {
                    node.community = DEFAULT_COMMUNITY;
                }
            }
        }
    }

    if !settings.centrality {
        tracing::debug!("Centrality disabled, leaving default");
        return;
    }
    match betweenness(&graph) {
        Ok(scores) => {
            for node_idx in graph.node_indices() {
                nodes[graph[node_idx]].centrality = scores[node_idx.index()];
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Centrality computation failed, leaving default");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UNCOMPUTED_CENTRALITY;

    fn span(tag: &str, text: &str, haystack: &str) -> EntitySpan {
        let start = haystack.find(text).unwrap();
        EntitySpan::new(tag, text, start, start + text.len())
    }

    #[test]
    fn test_document_graph_has_anchor_and_containment() {
        let text = "Jones v. Smith cited Roe v. Wade. Jones v. Smith again.";
        let spans = vec![
            span("CASE", "Jones v. Smith", text),
            span("CASE", "Roe v. Wade", text),
            EntitySpan::new("CASE", "Jones v. Smith", 34, 48),
        ];
        let mut builder = GraphBuilder::new(BuildSettings::default());
        let anchor = builder.add_document("7", "brief.txt", text, &spans);
        let graph = builder.build(GraphKind::Document, "g", vec!["7".into()]);

        assert_eq!(anchor, "doc_7");
        assert_eq!(graph.node("doc_7").unwrap().label, "brief.txt");
        assert_eq!(graph.entities().count(), 2);
        let contains: Vec<_> = graph
            .edges_labelled(RelationLabel::Contains)
            .filter(|e| e.source == "doc_7")
            .collect();
        assert_eq!(contains.len(), 2);
        assert!((contains[0].weight - 0.2).abs() < f32::EPSILON);
        assert_eq!(graph.edges_labelled(RelationLabel::Cites).count(), 1);
    }

    #[test]
    fn test_chat_graph_wiring() {
        let turns = [
            ChatTurn::new("What did Jones v. Smith hold?", "Jones v. Smith held that the statute applies."),
            ChatTurn::new("And later?", "It was followed."),
        ];
        let mut builder = GraphBuilder::new(BuildSettings::default());
        for (i, turn) in turns.iter().enumerate() {
            let spans = if i == 0 {
                vec![span("CASE", "Jones v. Smith", &turn.ai_response)]
            } else {
                Vec::new()
            };
            builder.add_chat_turn(i, turn, &spans);
        }
        builder.add_referenced_document("0123456789abcdef");
        let graph = builder.build(GraphKind::Chat, "chat", vec!["0123456789abcdef".into()]);

        assert_eq!(graph.nodes_of_type(EntityType::UserMessage).count(), 2);
        assert_eq!(graph.nodes_of_type(EntityType::AiResponse).count(), 2);
        assert_eq!(graph.edges_labelled(RelationLabel::Generates).count(), 2);
        assert_eq!(graph.edges_labelled(RelationLabel::ReferencedIn).count(), 2);
        assert_eq!(graph.edges_labelled(RelationLabel::Mentions).count(), 1);
        assert_eq!(graph.node("doc_0123456789abcdef").unwrap().label, "Document 01234567");
        assert_eq!(graph.node("msg_0").unwrap().label, "What did Jones v. Smith hold?...");
    }

    #[test]
    fn test_single_node_graph_defaults() {
        let mut builder = GraphBuilder::new(BuildSettings::default());
        builder.add_document("1", "empty.txt", "", &[]);
        let graph = builder.build(GraphKind::Document, "g", vec!["1".into()]);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.nodes[0].community, 0);
        assert!(graph.nodes[0].centrality.is_finite());
    }

    #[test]
    fn test_disabled_annotation_keeps_defaults() {
        let settings = BuildSettings {
            community_detection: false,
            centrality: false,
            ..BuildSettings::default()
        };
        let text = "Smith and Brown";
        let mut builder = GraphBuilder::new(settings);
        builder.add_document("1", "a", text, &[span("PARTY", "Smith", text), span("PARTY", "Brown", text)]);
        let graph = builder.build(GraphKind::Document, "g", vec!["1".into()]);
        assert!(graph.nodes.iter().all(|n| n.community == 0));
        assert!(graph.nodes.iter().all(|n| (n.centrality - UNCOMPUTED_CENTRALITY).abs() < f64::EPSILON));
    }

    #[test]
    fn test_triangle_has_zero_betweenness() {
        let text = "Smith and Brown";
        let mut builder = GraphBuilder::new(BuildSettings::default());
        builder.add_document("1", "a", text, &[span("PARTY", "Smith", text), span("PARTY", "Brown", text)]);
        let graph = builder.build(GraphKind::Document, "g", vec!["1".into()]);
        // triangle: doc contains both parties, parties related to each other
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.nodes.iter().all(|n| n.centrality.abs() < 1e-9));
    }
}
