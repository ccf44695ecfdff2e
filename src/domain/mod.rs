//! Domain records shared by every stage of a build.

pub mod document;
pub mod graph;

pub use document::{ChatTurn, Document, EntitySpan};
pub use graph::{
    DEFAULT_COMMUNITY, DocumentGraph, EntityNode, EntityType, GraphKind, RelationLabel,
    RelationshipEdge, UNCOMPUTED_CENTRALITY,
};
