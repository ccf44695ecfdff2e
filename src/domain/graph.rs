//! Knowledge Graph Domain Models
//!
//! Entity nodes, relationship edges and the frozen document graph produced
//! by a build. Nodes and edges are fixed record types rather than open
//! attribute bags, so serialization and dedup keys stay type-safe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Community assigned when detection is skipped or unavailable.
pub const DEFAULT_COMMUNITY: u32 = 0;

/// Centrality assigned when it could not be computed. Means "uncomputed",
/// not "average".
pub const UNCOMPUTED_CENTRALITY: f64 = 0.5;

// =============================================================================
// Entity Types
// =============================================================================

/// Node taxonomy. Legal entity kinds plus the anchor kinds a build creates
/// for its inputs (documents, chat messages) and a generic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A source document
    Document,
    /// A case citation such as "Jones v. Smith"
    CaseCitation,
    /// A statute reference such as "42 U.S.C. § 1983"
    StatuteReference,
    /// A named court
    Court,
    /// A judge or justice
    JudicialEntity,
    /// A jurisdiction or place
    Jurisdiction,
    /// A party to proceedings
    LegalParty,
    /// A doctrine or principle
    LegalPrinciple,
    /// A date mentioned in legal text
    LegalDate,
    /// A clause or provision
    LegalClause,
    /// A procedural step
    LegalProcedure,
    /// A user turn in a chat transcript
    UserMessage,
    /// An assistant turn in a chat transcript
    AiResponse,
    /// Anything the tagger labelled outside the legal taxonomy
    Entity,
}

impl EntityType {
    /// Wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::CaseCitation => "case_citation",
            Self::StatuteReference => "statute_reference",
            Self::Court => "court",
            Self::JudicialEntity => "judicial_entity",
            Self::Jurisdiction => "jurisdiction",
            Self::LegalParty => "legal_party",
            Self::LegalPrinciple => "legal_principle",
            Self::LegalDate => "legal_date",
            Self::LegalClause => "legal_clause",
            Self::LegalProcedure => "legal_procedure",
            Self::UserMessage => "user_message",
            Self::AiResponse => "ai_response",
            Self::Entity => "entity",
        }
    }

    /// Map a canonical tag (see `extraction::normalize::canonical_tag`) to a type.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "CASE" | "PRECEDENT" => Self::CaseCitation,
            "STATUTE" => Self::StatuteReference,
            "PROVISION" | "CLAUSE" => Self::LegalClause,
            "COURT" => Self::Court,
            "JUDGE" => Self::JudicialEntity,
            "JURISDICTION" => Self::Jurisdiction,
            "PETITIONER" | "RESPONDENT" | "PARTY" => Self::LegalParty,
            "PRINCIPLE" => Self::LegalPrinciple,
            "DATE" => Self::LegalDate,
            "PROCEDURE" => Self::LegalProcedure,
            _ => Self::Entity,
        }
    }

    /// Anchor nodes represent build inputs rather than extracted entities.
    pub fn is_anchor(self) -> bool {
        matches!(self, Self::Document | Self::UserMessage | Self::AiResponse)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Relationship Labels
// =============================================================================

/// Relationship vocabulary. Direction matters for every label except the
/// symmetric ones (`related`, `related_case`, `versus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationLabel {
    Contains,
    Cites,
    Interprets,
    Overrules,
    FollowsPrecedent,
    RelatedCase,
    Versus,
    PresidesIn,
    Applies,
    Affirms,
    Reverses,
    FollowedBy,
    Related,
    /// Chat response mentions an entity
    Mentions,
    /// User message generates an assistant response
    Generates,
    /// Document is referenced in a user message
    ReferencedIn,
}

impl RelationLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Cites => "cites",
            Self::Interprets => "interprets",
            Self::Overrules => "overrules",
            Self::FollowsPrecedent => "follows_precedent",
            Self::RelatedCase => "related_case",
            Self::Versus => "versus",
            Self::PresidesIn => "presides_in",
            Self::Applies => "applies",
            Self::Affirms => "affirms",
            Self::Reverses => "reverses",
            Self::FollowedBy => "followed_by",
            Self::Related => "related",
            Self::Mentions => "mentions",
            Self::Generates => "generates",
            Self::ReferencedIn => "referenced_in",
        }
    }

    /// Symmetric labels are deduplicated regardless of edge direction.
    pub fn is_symmetric(self) -> bool {
        matches!(self, Self::Related | Self::RelatedCase | Self::Versus)
    }
}

impl std::fmt::Display for RelationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Entity Node
// =============================================================================

/// A deduplicated entity (or anchor) in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    /// Stable identifier, derived from `(type, normalized_value)` for entities
    pub id: String,
    /// Display text (first surface form seen)
    pub label: String,
    /// Taxonomy type
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Canonical tagger label, e.g. "PETITIONER"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Canonical form used for equality
    pub normalized_value: String,
    /// Text around the first occurrence
    #[serde(default)]
    pub context: String,
    /// Number of mentions merged into this node
    #[serde(default = "default_frequency")]
    pub frequency: usize,
    /// Highest tagger confidence among merged mentions
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Cluster id from community detection
    #[serde(default)]
    pub community: u32,
    /// Betweenness centrality
    #[serde(default = "default_centrality")]
    pub centrality: f64,
}

fn default_frequency() -> usize {
    1
}

fn default_confidence() -> f32 {
    1.0
}

fn default_centrality() -> f64 {
    UNCOMPUTED_CENTRALITY
}

impl EntityNode {
    /// Create an anchor node (document, user message, AI response).
    pub fn anchor(id: impl Into<String>, label: impl Into<String>, entity_type: EntityType) -> Self {
        let id = id.into();
        Self {
            normalized_value: id.clone(),
            id,
            label: label.into(),
            entity_type,
            tag: None,
            context: String::new(),
            frequency: 1,
            confidence: 1.0,
            community: DEFAULT_COMMUNITY,
            centrality: UNCOMPUTED_CENTRALITY,
        }
    }

    /// Dedup key shared by every mention merged into this node.
    pub fn dedup_key(&self) -> (EntityType, String) {
        (self.entity_type, self.normalized_value.clone())
    }

    /// Canonical tag, or an empty string for anchors.
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or("")
    }
}

// =============================================================================
// Relationship Edge
// =============================================================================

/// A typed, weighted connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Relationship type
    pub label: RelationLabel,
    /// Relative importance (not normalized)
    #[serde(default = "default_confidence")]
    pub weight: f32,
    /// Heuristic certainty in [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Evidence supporting the edge
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

impl RelationshipEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, label: RelationLabel) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label,
            weight: 1.0,
            confidence: 1.0,
            context: String::new(),
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Whether this edge joins `a` and `b` in either direction.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

// =============================================================================
// Document Graph
// =============================================================================

/// Which build produced a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    Document,
    Chat,
}

/// A fully assembled graph. Immutable once built; a new build yields a new id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentGraph {
    pub id: String,
    pub name: String,
    pub kind: GraphKind,
    pub created_at: DateTime<Utc>,
    pub document_ids: Vec<String>,
    pub nodes: Vec<EntityNode>,
    pub edges: Vec<RelationshipEdge>,
}

impl DocumentGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&EntityNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Nodes extracted from text (everything but anchors).
    pub fn entities(&self) -> impl Iterator<Item = &EntityNode> {
        self.nodes.iter().filter(|n| !n.entity_type.is_anchor())
    }

    /// Nodes of one type.
    pub fn nodes_of_type(&self, entity_type: EntityType) -> impl Iterator<Item = &EntityNode> {
        self.nodes.iter().filter(move |n| n.entity_type == entity_type)
    }

    /// Edges carrying a label.
    pub fn edges_labelled(&self, label: RelationLabel) -> impl Iterator<Item = &RelationshipEdge> {
        self.edges.iter().filter(move |e| e.label == label)
    }

    /// Dedup keys of every extracted entity. Stable across rebuilds of the same input.
    pub fn dedup_keys(&self) -> BTreeSet<(EntityType, String)> {
        self.entities().map(EntityNode::dedup_key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_from_tag() {
        assert_eq!(EntityType::from_tag("CASE"), EntityType::CaseCitation);
        assert_eq!(EntityType::from_tag("PRECEDENT"), EntityType::CaseCitation);
        assert_eq!(EntityType::from_tag("PETITIONER"), EntityType::LegalParty);
        assert_eq!(EntityType::from_tag("PROVISION"), EntityType::LegalClause);
        assert_eq!(EntityType::from_tag("WIDGET"), EntityType::Entity);
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for ty in [
            EntityType::CaseCitation,
            EntityType::StatuteReference,
            EntityType::UserMessage,
        ] {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
        let json = serde_json::to_string(&RelationLabel::FollowsPrecedent).unwrap();
        assert_eq!(json, "\"follows_precedent\"");
    }

    #[test]
    fn test_node_serializes_type_field() {
        let node = EntityNode::anchor("doc_1", "Brief.txt", EntityType::Document);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "document");
        assert_eq!(value["centrality"], UNCOMPUTED_CENTRALITY);
        assert!(value.get("tag").is_none());
    }

    #[test]
    fn test_edge_confidence_is_clamped() {
        let edge = RelationshipEdge::new("a", "b", RelationLabel::Cites).with_confidence(1.7);
        assert!((edge.confidence - 1.0).abs() < f32::EPSILON);
        assert!(edge.joins("b", "a"));
    }
}
