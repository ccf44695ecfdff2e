//! Betweenness Centrality
//!
//! Brandes' algorithm over the unweighted undirected projection, normalised
//! by `1 / ((n - 1)(n - 2))` so values fall in `[0, 1]`.

use anyhow::{Result, bail};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::VecDeque;

/// Betweenness per node index.
pub fn betweenness<N, E>(graph: &UnGraph<N, E>) -> Result<Vec<f64>> {
    let n = graph.node_count();
    let mut scores = vec![0.0_f64; n];

    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut queue: VecDeque<usize> = VecDeque::with_capacity(n);
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut dist = vec![-1_i64; n];
    let mut delta = vec![0.0_f64; n];

    for s in 0..n {
        stack.clear();
        queue.clear();
        for i in 0..n {
            preds[i].clear();
            sigma[i] = 0.0;
            dist[i] = -1;
            delta[i] = 0.0;
        }
        sigma[s] = 1.0;
        dist[s] = 0;
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for w in graph.neighbors(NodeIndex::new(v)).map(NodeIndex::index) {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                scores[w] += delta[w];
            }
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for score in &mut scores {
            *score *= scale;
        }
    }

    if let Some(bad) = scores.iter().find(|s| !s.is_finite() || **s < 0.0) {
        bail!("betweenness produced an invalid score: {bad}");
    }
    Ok(scores)
}
