use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embed_chunks::Embedder;
use crate::embed_query::embed_query;
use crate::error::Result;
use crate::models::Chunk;
use crate::vector_store::VectorStore;

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Hit {
    #[serde(default)]
    pub score: f32,
    pub payload: Option<Payload>,
}

/// Stored chunk fields. Every field is optional because a shared collection
/// may hold points written by other tools.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Payload {
    pub source: Option<String>,
    pub page: Option<u32>,
    pub text: Option<String>,
}

impl From<&Chunk> for Payload {
    fn from(chunk: &Chunk) -> Self {
        Self {
            source: Some(chunk.metadata.source.clone()),
            page: Some(chunk.metadata.page),
            text: Some(chunk.text.clone()),
        }
    }
}

pub fn retrieve_top(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    question: &str,
    k: usize,
) -> Result<Vec<Hit>> {
    let vector = embed_query(embedder, question)?;
    if vector.is_empty() {
        return Ok(vec![]);
    }
    let hits = store.query(&vector, k)?;
    debug!(hits = hits.len(), k, "retrieved chunks");
    Ok(hits)
}
