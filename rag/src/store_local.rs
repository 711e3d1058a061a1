use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::retrieve_chunks::{Hit, Payload};
use crate::vector_store::{StoreEntry, VectorStore};

const INDEX_FILE: &str = "index.json";

#[derive(Default, Serialize, Deserialize)]
struct IndexFile {
    entries: Vec<StoreEntry>,
}

/// Embedded store. Entries live in memory; when attached to a directory they
/// are loaded from and flushed to `<dir>/index.json`.
pub struct LocalStore {
    entries: Vec<StoreEntry>,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            entries: Vec::new(),
            path: None,
        }
    }

    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        let entries = if path.is_file() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str::<IndexFile>(&text)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
                .entries
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), entries = entries.len(), "opened local vector store");
        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }
}

impl VectorStore for LocalStore {
    fn add(&mut self, entries: Vec<StoreEntry>) -> Result<usize> {
        let added = entries.len();
        self.entries.extend(entries);
        Ok(added)
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Hit>> {
        if vector.is_empty() || k == 0 {
            return Ok(vec![]);
        }
        let mut scored: Vec<(f32, &StoreEntry)> = self
            .entries
            .iter()
            .filter(|entry| entry.vector.len() == vector.len())
            .map(|entry| (cosine_similarity(vector, &entry.vector), entry))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| Hit {
                score,
                payload: Some(Payload::from(&entry.chunk)),
            })
            .collect())
    }

    fn persist(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let index = IndexFile {
            entries: self.entries.clone(),
        };
        let text = serde_json::to_string(&index)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        // Write then rename so readers never see a half-written index.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), entries = self.entries.len(), "flushed local vector store");
        Ok(())
    }

    fn contains_source(&self, source: &str) -> Result<bool> {
        Ok(self.entries.iter().any(|e| e.chunk.metadata.source == source))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, ChunkMetadata};

    fn entry(text: &str, page: u32, vector: Vec<f32>) -> StoreEntry {
        StoreEntry::new(
            Chunk {
                text: text.to_string(),
                metadata: ChunkMetadata {
                    source: "guide.pdf".to_string(),
                    page,
                },
            },
            vector,
        )
    }

    #[test]
    fn query_ranks_by_similarity() {
        let mut store = LocalStore::in_memory();
        store
            .add(vec![
                entry("printers", 0, vec![0.0, 1.0]),
                entry("passwords", 1, vec![1.0, 0.0]),
                entry("mostly passwords", 2, vec![0.9, 0.1]),
            ])
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 2).unwrap();
        let pages: Vec<Option<u32>> = hits
            .iter()
            .map(|h| h.payload.as_ref().and_then(|p| p.page))
            .collect();
        assert_eq!(pages, vec![Some(1), Some(2)]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn persisted_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open(dir.path()).unwrap();
        assert!(store.is_persistent());
        store.add(vec![entry("wifi setup", 3, vec![0.3, 0.4])]).unwrap();
        store.persist().unwrap();

        let reopened = LocalStore::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.contains_source("guide.pdf").unwrap());
        assert!(!reopened.contains_source("other.pdf").unwrap());
    }

    #[test]
    fn in_memory_store_persist_is_a_no_op() {
        let mut store = LocalStore::in_memory();
        store.add(vec![entry("x", 0, vec![1.0])]).unwrap();
        store.persist().unwrap();
        assert!(!store.is_persistent());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn mismatched_dimensions_and_zero_vectors_are_harmless() {
        let mut store = LocalStore::in_memory();
        store
            .add(vec![entry("a", 0, vec![1.0, 0.0, 0.0]), entry("b", 1, vec![0.0, 0.0])])
            .unwrap();
        let hits = store.query(&[1.0, 0.0], 4).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 0.0);
        assert!(store.query(&[], 4).unwrap().is_empty());
    }
}
