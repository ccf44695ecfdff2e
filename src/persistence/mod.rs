//! Graph persistence.
//!
//! Graphs are write-once: a record is saved when its build finishes and is
//! only ever read afterwards. There is no update or delete.

use crate::Result;
use crate::graph::{GraphRecord, SimplifiedGraph};
use async_trait::async_trait;
use std::path::PathBuf;

pub mod file_store;

pub use file_store::FileGraphStore;

#[async_trait]
pub trait GraphStore: Send + Sync + std::fmt::Debug {
    /// Persist the full record and its simplified projection as one unit.
    async fn save(&self, record: &GraphRecord, simplified: &SimplifiedGraph) -> Result<()>;

    /// Full record, or `None` for unknown or malformed ids.
    async fn load(&self, id: &str) -> Result<Option<GraphRecord>>;

    /// Simplified projection, or `None` for unknown or malformed ids.
    async fn load_simplified(&self, id: &str) -> Result<Option<SimplifiedGraph>>;

    /// Attach a rendered visualization to a stored graph. Returns its path.
    async fn save_visualization(&self, id: &str, contents: &str) -> Result<PathBuf>;

    /// Path of the rendered visualization, if one was generated.
    async fn visualization(&self, id: &str) -> Result<Option<PathBuf>>;
}
