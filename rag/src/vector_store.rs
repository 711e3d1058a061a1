use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::models::Chunk;
use crate::retrieve_chunks::Hit;
use crate::store_local::LocalStore;
use crate::store_qdrant::QdrantStore;

/// A stored chunk and its embedding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

impl StoreEntry {
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vector,
            chunk,
        }
    }
}

pub trait VectorStore {
    /// Appends entries; returns how many were written.
    fn add(&mut self, entries: Vec<StoreEntry>) -> Result<usize>;

    /// The `k` entries most similar to `vector`, best first.
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Hit>>;

    /// Makes previously added entries durable, where the backend supports it.
    fn persist(&mut self) -> Result<()>;

    fn contains_source(&self, source: &str) -> Result<bool>;
}

/// Picks the backend: a Qdrant server when `qdrant_url` is set, an embedded
/// store attached to `vector_db_dir` when that directory exists, and an
/// in-memory embedded store otherwise.
pub fn open_store(cfg: &Config) -> Result<Box<dyn VectorStore>> {
    if let Some(url) = &cfg.qdrant_url {
        info!(url = %url, collection = %cfg.collection, "using qdrant vector store");
        return Ok(Box::new(QdrantStore::new(url, &cfg.collection, &cfg.distance)));
    }
    match &cfg.vector_db_dir {
        Some(dir) if dir.is_dir() => Ok(Box::new(LocalStore::open(dir)?)),
        Some(dir) => {
            warn!(
                dir = %dir.display(),
                "vector store directory does not exist; using an in-memory store"
            );
            Ok(Box::new(LocalStore::in_memory()))
        }
        None => {
            warn!("no vector store directory configured; using an in-memory store");
            Ok(Box::new(LocalStore::in_memory()))
        }
    }
}
