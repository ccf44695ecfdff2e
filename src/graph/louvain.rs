//! Louvain Community Detection
//!
//! Multi-level modularity optimisation over the undirected projection.
//! Nodes are visited in index order and ties keep the current community,
//! so the same graph always yields the same partition.

use anyhow::{Result, bail};
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use std::collections::BTreeMap;

// =============================================================================
// Configuration
// =============================================================================

/// Parameters for community detection.
#[derive(Debug, Clone)]
pub struct CommunityConfig {
    /// Resolution parameter (higher = smaller communities)
    pub resolution: f64,
    /// Maximum passes per level, and maximum number of levels
    pub max_iterations: usize,
    /// Minimum gain for a node move to count
    pub min_improvement: f64,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_iterations: 100,
            min_improvement: 1e-7,
        }
    }
}

/// A weighted graph at one aggregation level. `adjacency` excludes
/// self-loops; `loops[c]` holds the weight internal to super-node `c`.
#[derive(Debug)]
struct Level {
    adjacency: Vec<BTreeMap<usize, f64>>,
    loops: Vec<f64>,
}

impl Level {
    fn degree(&self, node: usize) -> f64 {
        2.0 * self.loops[node] + self.adjacency[node].values().sum::<f64>()
    }

    /// Collapse each community into a single node.
    fn aggregate(&self, membership: &[usize], count: usize) -> Self {
        let mut adjacency = vec![BTreeMap::new(); count];
        let mut loops = vec![0.0; count];
        for (node, neighbours) in self.adjacency.iter().enumerate() {
            let c = membership[node];
            loops[c] += self.loops[node];
            for (&other, &weight) in neighbours {
                let d = membership[other];
                if c == d {
                    // each internal edge is seen from both ends
                    loops[c] += weight / 2.0;
                } else {
                    *adjacency[c].entry(d).or_insert(0.0) += weight;
                }
            }
        }
        Self { adjacency, loops }
    }
}

// =============================================================================
// Detector
// =============================================================================

#[derive(Debug, Default)]
pub struct CommunityDetector {
    config: CommunityConfig,
}

impl CommunityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CommunityConfig) -> Self {
        Self { config }
    }

    /// Community id per node index, numbered densely from 0 in order of
    /// first appearance.
    pub fn detect<N>(&self, graph: &UnGraph<N, f64>) -> Result<Vec<u32>> {
        let n = graph.node_count();
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut level = Level {
            adjacency: vec![BTreeMap::new(); n],
            loops: vec![0.0; n],
        };
        for edge in graph.edge_references() {
            let weight = *edge.weight();
            if !weight.is_finite() || weight < 0.0 {
                bail!("edge weight {weight} is not a finite non-negative number");
            }
            let (a, b) = (edge.source().index(), edge.target().index());
            if a == b {
                level.loops[a] += weight;
            } else {
                *level.adjacency[a].entry(b).or_insert(0.0) += weight;
                *level.adjacency[b].entry(a).or_insert(0.0) += weight;
            }
        }

        let mut membership: Vec<usize> = (0..n).collect();
        let mut levels = 0;
        while levels < self.config.max_iterations {
            levels += 1;
            let (local, count, moved) = self.one_level(&level);
            for community in &mut membership {
                *community = local[*community];
            }
            if !moved {
                break;
            }
            level = level.aggregate(&local, count);
        }

        let (dense, count) = renumber(&membership);
        tracing::debug!(communities = count, levels, "Louvain partition complete");
        Ok(dense.into_iter().map(|c| c as u32).collect())
    }

    /// Local moving phase. Returns the dense partition of this level's
    /// nodes, its size, and whether any node changed community.
    fn one_level(&self, level: &Level) -> (Vec<usize>, usize, bool) {
        let n = level.adjacency.len();
        let degrees: Vec<f64> = (0..n).map(|i| level.degree(i)).collect();
        let m2: f64 = degrees.iter().sum();
        let mut community: Vec<usize> = (0..n).collect();
        if m2 <= 0.0 {
            return (community, n, false);
        }

        let resolution = self.config.resolution;
        let mut totals = degrees.clone();
        let mut moved = false;

        for _ in 0..self.config.max_iterations {
            let mut improved = false;
            for node in 0..n {
                let current = community[node];
                let k = degrees[node];

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for (&other, &weight) in &level.adjacency[node] {
                    *links.entry(community[other]).or_insert(0.0) += weight;
                }

                totals[current] -= k;
                let gain = |c: usize, w: f64| w - resolution * totals[c] * k / m2;
                let mut best = current;
                let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
                for (&candidate, &weight) in &links {
                    let g = gain(candidate, weight);
                    if g > best_gain + self.config.min_improvement {
                        best = candidate;
                        best_gain = g;
                    }
                }
                totals[best] += k;

                if best != current {
                    community[node] = best;
                    improved = true;
                    moved = true;
                }
            }
            if !improved {
                break;
            }
        }

        let (dense, count) = renumber(&community);
        (dense, count, moved)
    }
}

/// Relabel communities 0..k in order of first appearance.
fn renumber(membership: &[usize]) -> (Vec<usize>, usize) {
    let mut ids: BTreeMap<usize, usize> = BTreeMap::new();
    let dense = membership
        .iter()
        .map(|&c| {
            let next = ids.len();
            *ids.entry(c).or_insert(next)
        })
        .collect();
    (dense, ids.len())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(n: usize, edges: &[(usize, usize, f64)]) -> UnGraph<(), f64> {
        let mut g = UnGraph::new_undirected();
        let nodes: Vec<_> = (0..n).map(|_| g.add_node(())).collect();
        for &(a, b, w) in edges {
            g.add_edge(nodes[a], nodes[b], w);
        }
        g
    }

    #[test]
    fn test_empty_graph() {
        let detector = CommunityDetector::new();
        assert!(detector.detect(&graph(0, &[])).unwrap().is_empty());
    }

    #[test]
    fn test_single_node() {
        let detector = CommunityDetector::new();
        assert_eq!(detector.detect(&graph(1, &[])).unwrap(), vec![0]);
    }

    #[test]
    fn test_two_triangles_split() {
        let g = graph(
            6,
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (0, 2, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (3, 5, 1.0),
                (2, 3, 0.1),
            ],
        );
        let communities = CommunityDetector::new().detect(&g).unwrap();
        assert_eq!(communities, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_isolated_nodes_keep_own_community() {
        let g = graph(3, &[]);
        let communities = CommunityDetector::new().detect(&g).unwrap();
        assert_eq!(communities, vec![0, 1, 2]);
    }

    #[test]
    fn test_deterministic() {
        let edges = [(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 0, 1.0), (3, 4, 0.5)];
        let detector = CommunityDetector::new();
        let first = detector.detect(&graph(5, &edges)).unwrap();
        assert_eq!(first, detector.detect(&graph(5, &edges)).unwrap());
    }

    #[test]
    fn test_rejects_non_finite_weights() {
        let g = graph(2, &[(0, 1, f64::NAN)]);
        assert!(CommunityDetector::new().detect(&g).is_err());
    }
}
