//! Directory-per-graph store.
//!
//! Layout under the root:
//!
//! ```text
//! {id}/graph.json          full record
//! {id}/simplified.json     simplified projection
//! {id}/visualization.html  optional rendered view
//! ```
//!
//! A save stages both JSON files in a hidden sibling directory and renames
//! it into place, so readers see either the whole pair or nothing.

use super::GraphStore;
use crate::graph::{GraphRecord, SimplifiedGraph};
use crate::{GraphError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const GRAPH_FILE: &str = "graph.json";
const SIMPLIFIED_FILE: &str = "simplified.json";
const VISUALIZATION_FILE: &str = "visualization.html";

#[derive(Debug, Clone)]
pub struct FileGraphStore {
    root: PathBuf,
}

impl FileGraphStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a graph id. Only UUIDs are accepted, which also keeps
    /// ids from escaping the root.
    fn graph_dir(&self, id: &str) -> Option<PathBuf> {
        let uuid = Uuid::try_parse(id.trim()).ok()?;
        Some(self.root.join(uuid.hyphenated().to_string()))
    }

    async fn stage(&self, staging: &Path, record: &GraphRecord, simplified: &SimplifiedGraph) -> Result<()> {
        fs::create_dir(staging).await?;
        fs::write(staging.join(GRAPH_FILE), serde_json::to_vec_pretty(record)?).await?;
        fs::write(staging.join(SIMPLIFIED_FILE), serde_json::to_vec_pretty(simplified)?).await?;
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl GraphStore for FileGraphStore {
    async fn save(&self, record: &GraphRecord, simplified: &SimplifiedGraph) -> Result<()> {
        let id = &record.graph.id;
        let target = self
            .graph_dir(id)
            .ok_or_else(|| GraphError::InvalidInput(format!("graph id is not a UUID: {id}")))?;

        fs::create_dir_all(&self.root).await?;
        let staging = self
            .root
            .join(format!(".tmp-{id}-{}", Uuid::new_v4().simple()));

        let staged = match self.stage(&staging, record, simplified).await {
            Ok(()) => fs::rename(&staging, &target).await.map_err(GraphError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = staged {
            if let Err(cleanup) = fs::remove_dir_all(&staging).await {
                tracing::warn!(path = %staging.display(), error = %cleanup, "Failed to remove staging directory");
            }
            return Err(e);
        }

        tracing::debug!(graph_id = %id, path = %target.display(), "Graph persisted");
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<GraphRecord>> {
        match self.graph_dir(id) {
            Some(dir) => read_json(&dir.join(GRAPH_FILE)).await,
            None => Ok(None),
        }
    }

    async fn load_simplified(&self, id: &str) -> Result<Option<SimplifiedGraph>> {
        match self.graph_dir(id) {
            Some(dir) => read_json(&dir.join(SIMPLIFIED_FILE)).await,
            None => Ok(None),
        }
    }

    async fn save_visualization(&self, id: &str, contents: &str) -> Result<PathBuf> {
        let dir = self
            .graph_dir(id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
        if !fs::try_exists(dir.join(GRAPH_FILE)).await? {
            return Err(GraphError::NotFound(id.to_string()));
        }

        let path = dir.join(VISUALIZATION_FILE);
        let partial = dir.join(format!("{VISUALIZATION_FILE}.partial"));
        fs::write(&partial, contents).await?;
        fs::rename(&partial, &path).await?;
        Ok(path)
    }

    async fn visualization(&self, id: &str) -> Result<Option<PathBuf>> {
        let Some(dir) = self.graph_dir(id) else {
            return Ok(None);
        };
        let path = dir.join(VISUALIZATION_FILE);
        Ok(fs::try_exists(&path).await?.then_some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentGraph, EntityNode, EntityType, GraphKind};
    use chrono::Utc;
    use tempfile::TempDir;

    fn record() -> GraphRecord {
        let graph = DocumentGraph {
            id: Uuid::new_v4().to_string(),
            name: "test".into(),
            kind: GraphKind::Document,
            created_at: Utc::now(),
            document_ids: vec!["1".into()],
            nodes: vec![EntityNode::anchor("doc_1", "a.txt", EntityType::Document)],
            edges: Vec::new(),
        };
        GraphRecord::new(graph, 10)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let store = FileGraphStore::new(tmp.path().join("graphs"));
        let record = record();
        let simplified = SimplifiedGraph::from_graph(&record.graph, 20);
        store.save(&record, &simplified).await.unwrap();

        let id = record.graph.id.clone();
        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.graph.name, "test");
        assert_eq!(loaded.statistics.node_count, 1);
        assert_eq!(store.load_simplified(&id).await.unwrap().unwrap(), simplified);

        // only the committed directory remains
        let entries: Vec<_> = std::fs::read_dir(store.root()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let tmp = TempDir::new().unwrap();
        let store = FileGraphStore::new(tmp.path());
        assert!(store.load("not-a-uuid").await.unwrap().is_none());
        assert!(store.load("../../etc/passwd").await.unwrap().is_none());
        assert!(store.load(&Uuid::new_v4().to_string()).await.unwrap().is_none());
        assert!(store.visualization("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_graphs_are_write_once() {
        let tmp = TempDir::new().unwrap();
        let store = FileGraphStore::new(tmp.path());
        let record = record();
        let simplified = SimplifiedGraph::from_graph(&record.graph, 20);
        store.save(&record, &simplified).await.unwrap();
        assert!(store.save(&record, &simplified).await.is_err());
    }

    #[tokio::test]
    async fn test_visualization_lifecycle() {
        let tmp = TempDir::new().unwrap();
        let store = FileGraphStore::new(tmp.path());
        let record = record();
        let id = record.graph.id.clone();

        let missing = store.save_visualization(&id, "<html></html>").await;
        assert!(matches!(missing, Err(GraphError::NotFound(_))));

        store
            .save(&record, &SimplifiedGraph::from_graph(&record.graph, 20))
            .await
            .unwrap();
        assert!(store.visualization(&id).await.unwrap().is_none());

        let path = store.save_visualization(&id, "<html></html>").await.unwrap();
        assert_eq!(store.visualization(&id).await.unwrap(), Some(path.clone()));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<html></html>");
    }
}
