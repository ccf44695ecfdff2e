//! Legal Knowledge Graph Engine
//!
//! Turns legal documents and chat transcripts into typed entity graphs,
//! infers relationships between the entities, annotates the graph with
//! community and centrality scores, and persists the result.
//!
//! # Modules
//!
//! - [`domain`]: Graph, node, edge and input records
//! - [`extraction`]: Entity taggers and normalization
//! - [`graph`]: Registry, relationship inference and graph analytics
//! - [`persistence`]: Write-once graph storage
//! - [`visualization`]: Optional HTML rendering
//! - [`service`]: Build and retrieval facade

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]

pub mod config;
pub mod domain;
pub mod error;
pub mod extraction;
pub mod graph;
pub mod persistence;
pub mod service;
pub mod telemetry;
pub mod visualization;

pub use error::{GraphError, Result};
pub use service::{DocumentCache, KnowledgeGraphService};
