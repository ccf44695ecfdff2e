//! Graph Construction Engine
//!
//! Registry -> inference -> assembly -> annotation. The petgraph
//! projection below is shared by community detection and centrality.

pub mod assembler;
pub mod centrality;
pub mod inference;
pub mod louvain;
pub mod registry;
pub mod summary;

pub use assembler::{BuildSettings, GraphBuilder};
pub use inference::{EdgeSet, InferenceStrategy};
pub use louvain::{CommunityConfig, CommunityDetector};
pub use registry::EntityRegistry;
pub use summary::{GraphRecord, GraphStatistics, SimplifiedGraph};

use crate::domain::{EntityNode, RelationshipEdge};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

/// Undirected weighted view of a node/edge set. Node weights are indices
/// into `nodes`; parallel edges are merged by summing their weights.
pub fn project(nodes: &[EntityNode], edges: &[RelationshipEdge]) -> UnGraph<usize, f64> {
    let mut graph = UnGraph::with_capacity(nodes.len(), edges.len());
    let index: HashMap<&str, NodeIndex> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), graph.add_node(i)))
        .collect();

    for edge in edges {
        let (Some(&a), Some(&b)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str()))
        else {
            continue;
        };
        if a == b {
            continue;
        }
        let weight = f64::from(edge.weight);
        match graph.find_edge(a, b) {
            Some(existing) => graph[existing] += weight,
            None => {
                graph.add_edge(a, b, weight);
            }
        }
    }
    graph
}
