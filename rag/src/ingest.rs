use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::chunk_text::chunk_pages;
use crate::config::Config;
use crate::embed_chunks::embed_texts;
use crate::error::{RagError, Result};
use crate::load_pdfs::{discover_pdfs, load_pdf};
use crate::providers::Providers;
use crate::vector_store::{open_store, StoreEntry};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub pages: usize,
    pub chunks: usize,
}

/// Loads every PDF in `dir`, splits pages into chunks, embeds them and
/// writes them to the configured vector store in one batch. Entries are
/// appended: ingesting the same files twice stores them twice.
pub fn ingest(cfg: &Config, dir: &Path, providers: &dyn Providers) -> Result<IngestReport> {
    let files = discover_pdfs(dir)?;

    let mut pages = Vec::new();
    for file in &files {
        let loaded = load_pdf(file)?;
        info!(file = %file.display(), pages = loaded.len(), "loaded pdf");
        pages.extend(loaded);
    }

    let chunks = chunk_pages(&pages, cfg);
    info!(pages = pages.len(), chunks = chunks.len(), "split pages into chunks");

    let embedder = providers.embedder(cfg)?;
    let mut store = open_store(cfg)?;

    let sources: BTreeSet<&str> = chunks.iter().map(|c| c.metadata.source.as_str()).collect();
    for source in sources {
        if store.contains_source(source)? {
            warn!(source, "store already holds entries for this file; they will be duplicated");
        }
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embed_texts(embedder.as_ref(), &texts, cfg.embed_batch_size)?;
    if vectors.len() != chunks.len() {
        return Err(RagError::Upstream(format!(
            "expected {} embeddings, got {}",
            chunks.len(),
            vectors.len()
        )));
    }

    let entries: Vec<StoreEntry> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| StoreEntry::new(chunk, vector))
        .collect();
    let written = store.add(entries)?;
    store.persist()?;

    Ok(IngestReport {
        files: files.len(),
        pages: pages.len(),
        chunks: written,
    })
}
