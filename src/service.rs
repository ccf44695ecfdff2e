//! Knowledge Graph Service
//!
//! Facade over tagging, assembly, persistence and visualization. Each
//! build is independent; the only shared state is the store and the
//! document cache.

use crate::config::{AppConfig, GraphConfig};
use crate::domain::{ChatTurn, Document, DocumentGraph, EntitySpan, GraphKind};
use crate::extraction::{EntityTagger, build_tagger};
use crate::graph::{BuildSettings, GraphBuilder, GraphRecord, SimplifiedGraph};
use crate::persistence::{FileGraphStore, GraphStore};
use crate::visualization::{HtmlExporter, VisualizationExporter};
use crate::{GraphError, Result};
use chrono::Utc;
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

// =============================================================================
// Document Cache
// =============================================================================

/// Resolved document text keyed by document id. Entries live until cleared;
/// there is no eviction.
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: RwLock<HashMap<String, Arc<str>>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<Arc<str>> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn insert(&self, id: &str, text: impl Into<Arc<str>>) -> Arc<str> {
        let text = text.into();
        self.entries
            .write()
            .await
            .insert(id.to_string(), Arc::clone(&text));
        text
    }

    /// Drop one entry. Returns whether it was present.
    pub async fn clear(&self, id: &str) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    pub async fn clear_all(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

// =============================================================================
// Service
// =============================================================================

fn is_text_mime(mime: &str) -> bool {
    mime.starts_with("text/") || matches!(mime, "application/json" | "application/xml")
}

/// Reject paths whose extension names a non-text format. Unknown
/// extensions are given the benefit of the doubt.
fn check_text_file(path: &Path) -> Result<()> {
    match mime_guess::from_path(path).first() {
        Some(mime) if !is_text_mime(mime.essence_str()) => Err(GraphError::UnsupportedFileType {
            path: path.to_path_buf(),
            mime: mime.to_string(),
        }),
        _ => Ok(()),
    }
}

#[derive(Debug)]
pub struct KnowledgeGraphService {
    tagger: Arc<dyn EntityTagger>,
    store: Arc<dyn GraphStore>,
    exporter: Option<Arc<dyn VisualizationExporter>>,
    config: GraphConfig,
    cache: DocumentCache,
}

impl KnowledgeGraphService {
    pub fn new(tagger: Arc<dyn EntityTagger>, store: Arc<dyn GraphStore>, config: GraphConfig) -> Self {
        Self {
            tagger,
            store,
            exporter: None,
            config,
            cache: DocumentCache::new(),
        }
    }

    #[must_use]
    pub fn with_exporter(mut self, exporter: Arc<dyn VisualizationExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Wire the service from application configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let tagger = build_tagger(&config.tagger)?;
        let store = Arc::new(FileGraphStore::new(&config.storage.graph_dir));
        let service = Self::new(tagger, store, config.graph.clone());
        tracing::info!(
            tagger = service.tagger.name(),
            graph_dir = %config.storage.graph_dir.display(),
            visualization = config.storage.visualization,
            "Knowledge graph service ready"
        );
        Ok(if config.storage.visualization {
            service.with_exporter(Arc::new(HtmlExporter::new()))
        } else {
            service
        })
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Build one graph from one or more documents.
    pub async fn build_document_graph(
        &self,
        documents: Vec<Document>,
        name: Option<String>,
    ) -> Result<DocumentGraph> {
        if documents.is_empty() {
            return Err(GraphError::InvalidInput("no documents supplied".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = documents.iter().find(|d| !seen.insert(d.id.as_str())) {
            return Err(GraphError::InvalidInput(format!("duplicate document id: {}", dup.id)));
        }

        let tagged = try_join_all(documents.iter().map(|doc| async move {
            let text = self.resolve_text(doc).await?;
            let spans = self.tag(&doc.id, &text).await?;
            Ok::<_, GraphError>((text, spans))
        }))
        .await?;

        let mut builder = GraphBuilder::new(BuildSettings::from(&self.config));
        for (doc, (text, spans)) in documents.iter().zip(&tagged) {
            builder.add_document(&doc.id, doc.display_name(), text, spans);
        }

        let name = name.unwrap_or_else(|| {
            format!("legal_document_graph_{}", Utc::now().format("%Y%m%d_%H%M%S"))
        });
        let document_ids = documents.into_iter().map(|d| d.id).collect();
        let graph = builder.build(GraphKind::Document, name, document_ids);
        self.persist(graph).await
    }

    /// Build a graph from a chat transcript. Entities come from the
    /// assistant responses only.
    pub async fn build_chat_graph(
        &self,
        chat_history: Vec<ChatTurn>,
        document_ids: Option<Vec<String>>,
        name: Option<String>,
    ) -> Result<DocumentGraph> {
        if chat_history.is_empty() {
            return Err(GraphError::InvalidInput("chat history is empty".into()));
        }

        let spans = try_join_all(
            chat_history
                .iter()
                .enumerate()
                .map(|(i, turn)| async move { self.tag(&format!("resp_{i}"), &turn.ai_response).await }),
        )
        .await?;

        let mut builder = GraphBuilder::new(BuildSettings::from(&self.config));
        for (i, (turn, spans)) in chat_history.iter().zip(&spans).enumerate() {
            builder.add_chat_turn(i, turn, spans);
        }
        let document_ids = document_ids.unwrap_or_default();
        for doc_id in &document_ids {
            builder.add_referenced_document(doc_id);
        }

        let name = name.unwrap_or_else(|| format!("chat_graph_{}", Utc::now().format("%Y%m%d_%H%M%S")));
        let graph = builder.build(GraphKind::Chat, name, document_ids);
        self.persist(graph).await
    }

    pub async fn get_graph(&self, id: &str) -> Result<DocumentGraph> {
        self.get_graph_record(id).await.map(GraphRecord::into_graph)
    }

    /// Full persisted record including statistics.
    pub async fn get_graph_record(&self, id: &str) -> Result<GraphRecord> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| GraphError::NotFound(id.to_string()))
    }

    pub async fn get_simplified_graph(&self, id: &str) -> Result<SimplifiedGraph> {
        self.store
            .load_simplified(id)
            .await?
            .ok_or_else(|| GraphError::NotFound(id.to_string()))
    }

    /// Path of the rendered view. A missing graph and a graph without a
    /// view are reported differently.
    pub async fn get_visualization(&self, id: &str) -> Result<PathBuf> {
        if let Some(path) = self.store.visualization(id).await? {
            return Ok(path);
        }
        if self.store.load_simplified(id).await?.is_none() {
            return Err(GraphError::NotFound(id.to_string()));
        }
        Err(GraphError::VisualizationNotFound(id.to_string()))
    }

    /// Text for a document: inline content, then the cache, then the file.
    /// An unreadable file yields empty content.
    async fn resolve_text(&self, doc: &Document) -> Result<Arc<str>> {
        if let Some(content) = &doc.content {
            return Ok(self.cache.insert(&doc.id, content.as_str()).await);
        }
        if let Some(text) = self.cache.get(&doc.id).await {
            return Ok(text);
        }
        let Some(path) = &doc.file_path else {
            tracing::warn!(document_id = %doc.id, "Document has neither content nor file path");
            return Ok(Arc::from(""));
        };

        check_text_file(path)?;
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(self.cache.insert(&doc.id, text).await),
            Err(e) => {
                tracing::warn!(
                    document_id = %doc.id,
                    path = %path.display(),
                    error = %e,
                    "Failed to read document, using empty content"
                );
                Ok(Arc::from(""))
            }
        }
    }

    async fn tag(&self, source_id: &str, text: &str) -> Result<Vec<EntitySpan>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.tagger.tag(text).await.map_err(|e| GraphError::Tagging {
            document_id: source_id.to_string(),
            message: e.to_string(),
        })
    }

    /// Write the record, then try to render the view. Only the record
    /// write can fail the build.
    async fn persist(&self, graph: DocumentGraph) -> Result<DocumentGraph> {
        let record = GraphRecord::new(graph, self.config.key_entity_limit);
        let simplified = SimplifiedGraph::from_graph(&record.graph, self.config.simplified_label_limit);
        self.store.save(&record, &simplified).await?;

        if let Some(exporter) = &self.exporter {
            let id = &record.graph.id;
            let rendered = match exporter.render(&record.graph) {
                Ok(html) => self.store.save_visualization(id, &html).await.map_err(anyhow::Error::from),
                Err(e) => Err(e),
            };
            match rendered {
                Ok(path) => tracing::debug!(graph_id = %id, path = %path.display(), "Visualization written"),
                Err(e) => tracing::warn!(
                    graph_id = %id,
                    exporter = exporter.name(),
                    error = %e,
                    "Visualization failed, graph kept"
                ),
            }
        }

        Ok(record.into_graph())
    }
}
