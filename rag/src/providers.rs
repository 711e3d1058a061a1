use crate::config::Config;
use crate::embed_chunks::{CohereEmbedder, Embedder};
use crate::error::{RagError, Result};
use crate::generate::{CohereChat, LanguageModel};

/// Builds the hosted-model clients for one pipeline run or request.
pub trait Providers: Send + Sync {
    fn embedder(&self, cfg: &Config) -> Result<Box<dyn Embedder>>;
    fn language_model(&self, cfg: &Config) -> Result<Box<dyn LanguageModel>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CohereProviders;

impl Providers for CohereProviders {
    fn embedder(&self, cfg: &Config) -> Result<Box<dyn Embedder>> {
        let key = require_api_key(cfg)?;
        Ok(Box::new(CohereEmbedder::new(&cfg.cohere_url, key, &cfg.embed_model)))
    }

    fn language_model(&self, cfg: &Config) -> Result<Box<dyn LanguageModel>> {
        let key = require_api_key(cfg)?;
        Ok(Box::new(CohereChat::new(&cfg.cohere_url, key, &cfg.chat_model)))
    }
}

pub fn require_api_key(cfg: &Config) -> Result<&str> {
    cfg.cohere_api_key
        .as_deref()
        .ok_or_else(|| RagError::Authentication("COHERE_API_KEY environment variable is not set".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_an_authentication_error() {
        let cfg = Config::default();
        assert!(matches!(CohereProviders.embedder(&cfg), Err(RagError::Authentication(_))));
        assert!(matches!(CohereProviders.language_model(&cfg), Err(RagError::Authentication(_))));
    }

    #[test]
    fn configured_key_builds_clients() {
        let cfg = Config {
            cohere_api_key: Some("test-key".to_string()),
            ..Config::default()
        };
        assert!(CohereProviders.embedder(&cfg).is_ok());
        assert!(CohereProviders.language_model(&cfg).is_ok());
    }
}
