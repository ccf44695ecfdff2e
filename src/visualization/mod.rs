//! Visualization export.
//!
//! Rendering is optional: a failed or disabled export never invalidates a
//! stored graph.

use crate::domain::{DocumentGraph, EntityType, RelationLabel};
use anyhow::Result;
use serde::Serialize;

/// Renders a graph to a self-contained document.
pub trait VisualizationExporter: Send + Sync + std::fmt::Debug {
    fn render(&self, graph: &DocumentGraph) -> Result<String>;

    fn name(&self) -> &'static str;
}

pub fn node_color(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Document => "lightcoral",
        EntityType::CaseCitation => "lightblue",
        EntityType::StatuteReference | EntityType::UserMessage | EntityType::AiResponse => {
            "lightgreen"
        }
        EntityType::Court => "orange",
        EntityType::JudicialEntity => "yellow",
        EntityType::Jurisdiction => "cyan",
        EntityType::LegalParty => "pink",
        EntityType::LegalPrinciple => "purple",
        EntityType::LegalDate => "gray",
        EntityType::LegalClause => "brown",
        EntityType::LegalProcedure => "olive",
        EntityType::Entity => "lightgray",
    }
}

pub fn edge_color(label: RelationLabel) -> &'static str {
    match label {
        RelationLabel::Contains | RelationLabel::Mentions => "gray",
        RelationLabel::Cites => "blue",
        RelationLabel::Interprets => "green",
        RelationLabel::Overrules | RelationLabel::Reverses => "red",
        RelationLabel::FollowsPrecedent => "purple",
        RelationLabel::RelatedCase => "orange",
        _ => "darkgray",
    }
}

#[derive(Serialize)]
struct VisNode<'a> {
    id: &'a str,
    label: &'a str,
    title: String,
    color: &'static str,
    size: f64,
    group: u32,
}

#[derive(Serialize)]
struct VisEdge<'a> {
    from: &'a str,
    to: &'a str,
    label: &'static str,
    title: String,
    color: &'static str,
    width: f32,
    arrows: &'static str,
}

/// Interactive page backed by vis-network.
#[derive(Debug, Default, Clone)]
pub struct HtmlExporter;

impl HtmlExporter {
    pub fn new() -> Self {
        Self
    }
}

/// Serialize for inline `<script>` use.
fn script_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl VisualizationExporter for HtmlExporter {
    fn render(&self, graph: &DocumentGraph) -> Result<String> {
        let nodes: Vec<VisNode<'_>> = graph
            .nodes
            .iter()
            .map(|n| VisNode {
                id: &n.id,
                label: &n.label,
                title: format!(
                    "Type: {}\nConfidence: {:.2}\nCentrality: {:.3}",
                    n.entity_type, n.confidence, n.centrality
                ),
                color: node_color(n.entity_type),
                size: 20.0 + 30.0 * n.centrality,
                group: n.community,
            })
            .collect();
        let edges: Vec<VisEdge<'_>> = graph
            .edges
            .iter()
            .map(|e| VisEdge {
                from: &e.source,
                to: &e.target,
                label: e.label.as_str(),
                title: format!("{} (confidence {:.2})", e.label, e.confidence),
                color: edge_color(e.label),
                width: 2.0 * e.weight,
                arrows: if e.label.is_symmetric() { "" } else { "to" },
            })
            .collect();

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="https://unpkg.com/vis-network/standalone/umd/vis-network.min.js"></script>
<style>
  body {{ margin: 0; font-family: sans-serif; }}
  h1 {{ font-size: 16px; margin: 8px; }}
  #graph {{ width: 100%; height: 800px; border-top: 1px solid #ddd; }}
</style>
</head>
<body>
<h1>{title} ({node_count} nodes, {edge_count} edges)</h1>
<div id="graph"></div>
<script>
  const nodes = new vis.DataSet({nodes});
  const edges = new vis.DataSet({edges});
  new vis.Network(document.getElementById("graph"), {{ nodes, edges }}, {{
    physics: {{ stabilization: true, barnesHut: {{ springLength: 150 }} }},
    edges: {{ font: {{ size: 9, align: "middle" }} }},
    interaction: {{ hover: true, tooltipDelay: 100 }}
  }});
</script>
</body>
</html>
"#,
            title = escape_html(&graph.name),
            node_count = graph.node_count(),
            edge_count = graph.edge_count(),
            nodes = script_json(&nodes)?,
            edges = script_json(&edges)?,
        ))
    }

    fn name(&self) -> &'static str {
        "html"
    }
}
