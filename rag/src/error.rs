use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    /// Missing directory, missing credential, or an unusable setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no PDF files found in '{}'", .0.display())]
    NoDocuments(PathBuf),

    #[error("authentication error: {0}")]
    Authentication(String),

    /// Embedding, LLM, vector database, Slack or backend call failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to read PDF '{}': {}", .path.display(), .message)]
    Document { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;
