use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Deployment settings for every component. Built once at process start and
/// passed down by reference; nothing below `from_env` reads the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub cohere_api_key: Option<String>,
    pub cohere_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub embed_batch_size: usize,
    pub vector_db_dir: Option<PathBuf>,
    pub qdrant_url: Option<String>,
    pub collection: String,
    pub distance: String,
    pub top_k: usize,
    pub memory_dir: PathBuf,
    pub history_max_turns: usize,
    pub system_prompt: String,
    pub server_addr: String,
    pub slack_bot_token: Option<String>,
    pub slack_app_token: Option<String>,
    pub slack_api_url: String,
    pub backend_url: String,
    pub backend_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            chunk_size: 800,
            chunk_overlap: 100,
            cohere_api_key: None,
            cohere_url: "https://api.cohere.com".to_string(),
            embed_model: "embed-english-v3.0".to_string(),
            chat_model: "command-r-plus".to_string(),
            embed_batch_size: 96,
            vector_db_dir: None,
            qdrant_url: None,
            collection: "it_support_chunks".to_string(),
            distance: "Cosine".to_string(),
            top_k: 4,
            memory_dir: PathBuf::from("memory_store"),
            history_max_turns: 20,
            system_prompt: "You are an internal IT support assistant. Answer using the provided \
                            documentation context. If the context does not contain the answer, \
                            say that you don't know."
                .to_string(),
            server_addr: "0.0.0.0:8000".to_string(),
            slack_bot_token: None,
            slack_app_token: None,
            slack_api_url: "https://slack.com/api".to_string(),
            backend_url: "http://localhost:8000/ask".to_string(),
            backend_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        // Load .env if present so credentials work without manual `source .env`.
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        Self {
            data_dir: env::var("RAG_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            chunk_size: parsed("RAG_CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            chunk_overlap: parsed("RAG_CHUNK_OVERLAP").unwrap_or(defaults.chunk_overlap),
            cohere_api_key: non_empty("COHERE_API_KEY"),
            cohere_url: env::var("COHERE_API_URL").unwrap_or(defaults.cohere_url),
            embed_model: env::var("COHERE_EMBED_MODEL").unwrap_or(defaults.embed_model),
            chat_model: env::var("COHERE_CHAT_MODEL").unwrap_or(defaults.chat_model),
            embed_batch_size: parsed("RAG_EMBED_BATCH_SIZE").unwrap_or(defaults.embed_batch_size),
            vector_db_dir: non_empty("VECTOR_DB_DIR").map(PathBuf::from),
            qdrant_url: non_empty("QDRANT_URL"),
            collection: env::var("QDRANT_COLLECTION").unwrap_or(defaults.collection),
            distance: env::var("QDRANT_DISTANCE").unwrap_or(defaults.distance),
            top_k: parsed("RAG_TOP_K").unwrap_or(defaults.top_k),
            memory_dir: env::var("MEMORY_DIR").map(PathBuf::from).unwrap_or(defaults.memory_dir),
            history_max_turns: parsed("RAG_HISTORY_MAX_TURNS").unwrap_or(defaults.history_max_turns),
            system_prompt: env::var("RAG_SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),
            server_addr: env::var("SERVER_ADDR").unwrap_or(defaults.server_addr),
            slack_bot_token: non_empty("SLACK_BOT_TOKEN"),
            slack_app_token: non_empty("SLACK_APP_TOKEN"),
            slack_api_url: env::var("SLACK_API_URL").unwrap_or(defaults.slack_api_url),
            backend_url: env::var("BACKEND_URL").unwrap_or(defaults.backend_url),
            backend_timeout: parsed("BACKEND_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.backend_timeout),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
