pub mod api;
mod build_prompt;
mod chain;
mod chunk_text;
mod config;
mod embed_chunks;
mod embed_query;
mod error;
mod generate;
mod http;
mod ingest;
mod load_pdfs;
mod models;
mod providers;
mod retrieve_chunks;
mod session_memory;
pub mod slack;
mod store_local;
mod store_qdrant;
mod vector_store;

pub use build_prompt::{ChatRequest, Message, Role};
pub use chain::{answer_question, ChainAnswer, ConversationalChain};
pub use chunk_text::{chunk_pages, chunk_text};
pub use config::Config;
pub use embed_chunks::{embed_texts, CohereEmbedder, Embedder, InputType};
pub use error::{RagError, Result};
pub use generate::{CohereChat, LanguageModel};
pub use ingest::{ingest, IngestReport};
pub use load_pdfs::{discover_pdfs, load_pdf, PageText};
pub use models::{Chunk, ChunkMetadata, Turn};
pub use providers::{CohereProviders, Providers};
pub use retrieve_chunks::{Hit, Payload};
pub use session_memory::{SessionLocks, SessionMemory};
pub use store_local::LocalStore;
pub use store_qdrant::QdrantStore;
pub use vector_store::{open_store, StoreEntry, VectorStore};
