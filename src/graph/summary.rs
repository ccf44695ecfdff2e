//! Derived views of a finished graph: statistics, key entities, the
//! simplified projection and the persisted record. Everything here is
//! recomputed from the node and edge sets on demand, never cached.

use crate::domain::{DocumentGraph, EntityNode, EntityType, RelationLabel};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// An entity ranked by centrality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEntity {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub centrality: f64,
}

impl From<&EntityNode> for KeyEntity {
    fn from(node: &EntityNode) -> Self {
        Self {
            id: node.id.clone(),
            label: node.label.clone(),
            entity_type: node.entity_type,
            centrality: node.centrality,
        }
    }
}

/// Size and composition of one community.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub count: usize,
    pub types: BTreeMap<EntityType, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub document_count: usize,
    /// Extracted entities (anchors excluded)
    pub entity_count: usize,
    /// Edges between extracted entities (anchor edges excluded)
    pub relationship_count: usize,
    pub entity_types: BTreeMap<EntityType, usize>,
    pub relationship_types: BTreeMap<RelationLabel, usize>,
    pub communities: BTreeMap<u32, CommunitySummary>,
    pub key_entities: Vec<KeyEntity>,
    pub key_entities_by_type: BTreeMap<EntityType, Vec<KeyEntity>>,
}

/// Highest centrality first; id breaks ties so rankings are stable.
fn by_centrality(a: &&EntityNode, b: &&EntityNode) -> Ordering {
    b.centrality
        .total_cmp(&a.centrality)
        .then_with(|| a.id.cmp(&b.id))
}

/// Top `limit` extracted entities by centrality.
pub fn key_entities(graph: &DocumentGraph, limit: usize) -> Vec<KeyEntity> {
    let mut ranked: Vec<&EntityNode> = graph.entities().collect();
    ranked.sort_by(by_centrality);
    ranked.into_iter().take(limit).map(KeyEntity::from).collect()
}

/// Top `limit` extracted entities of each type.
pub fn key_entities_by_type(
    graph: &DocumentGraph,
    limit: usize,
) -> BTreeMap<EntityType, Vec<KeyEntity>> {
    let mut grouped: BTreeMap<EntityType, Vec<&EntityNode>> = BTreeMap::new();
    for node in graph.entities() {
        grouped.entry(node.entity_type).or_default().push(node);
    }
    grouped
        .into_iter()
        .map(|(ty, mut nodes)| {
            nodes.sort_by(by_centrality);
            let top = nodes.into_iter().take(limit).map(KeyEntity::from).collect();
            (ty, top)
        })
        .collect()
}

impl GraphStatistics {
    pub fn compute(graph: &DocumentGraph, key_entity_limit: usize) -> Self {
        let mut entity_types: BTreeMap<EntityType, usize> = BTreeMap::new();
        let mut communities: BTreeMap<u32, CommunitySummary> = BTreeMap::new();
        for node in &graph.nodes {
            *entity_types.entry(node.entity_type).or_default() += 1;
            let summary = communities.entry(node.community).or_default();
            summary.count += 1;
            *summary.types.entry(node.entity_type).or_default() += 1;
        }

        let mut relationship_types: BTreeMap<RelationLabel, usize> = BTreeMap::new();
        for edge in &graph.edges {
            *relationship_types.entry(edge.label).or_default() += 1;
        }

        let is_entity = |id: &str| graph.node(id).is_some_and(|n| !n.entity_type.is_anchor());
        let relationship_count = graph
            .edges
            .iter()
            .filter(|e| is_entity(&e.source) && is_entity(&e.target))
            .count();

        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            document_count: graph.nodes_of_type(EntityType::Document).count(),
            entity_count: graph.entities().count(),
            relationship_count,
            entity_types,
            relationship_types,
            communities,
            key_entities: key_entities(graph, key_entity_limit),
            key_entities_by_type: key_entities_by_type(graph, key_entity_limit),
        }
    }
}

// =============================================================================
// Simplified projection
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub community: u32,
    pub centrality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedLink {
    pub source: String,
    pub target: String,
    pub label: RelationLabel,
}

/// Lightweight view for transport and visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedGraph {
    pub nodes: Vec<SimplifiedNode>,
    pub links: Vec<SimplifiedLink>,
}

impl SimplifiedGraph {
    /// Project `graph`, truncating labels to `label_limit` characters.
    pub fn from_graph(graph: &DocumentGraph, label_limit: usize) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|n| SimplifiedNode {
                id: n.id.clone(),
                label: n.label.chars().take(label_limit).collect(),
                entity_type: n.entity_type,
                community: n.community,
                centrality: n.centrality,
            })
            .collect();
        let links = graph
            .edges
            .iter()
            .map(|e| SimplifiedLink {
                source: e.source.clone(),
                target: e.target.clone(),
                label: e.label,
            })
            .collect();
        Self { nodes, links }
    }
}

// =============================================================================
// Persisted record
// =============================================================================

/// Full form written by the store: the graph plus its statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRecord {
    #[serde(flatten)]
    pub graph: DocumentGraph,
    pub statistics: GraphStatistics,
}

impl GraphRecord {
    pub fn new(graph: DocumentGraph, key_entity_limit: usize) -> Self {
        let statistics = GraphStatistics::compute(&graph, key_entity_limit);
        Self { graph, statistics }
    }

    pub fn into_graph(self) -> DocumentGraph {
        self.graph
    }
}
