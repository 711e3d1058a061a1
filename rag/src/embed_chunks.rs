use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::http::post_json_authed;

/// Whether texts are being stored or used to search; hosted embedding models
/// encode the two sides differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    SearchDocument,
    SearchQuery,
}

pub trait Embedder {
    /// One vector per input text, in input order.
    fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>>;
}

pub struct CohereEmbedder {
    url: String,
    api_key: String,
    model: String,
}

impl CohereEmbedder {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            url: format!("{}/v1/embed", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: InputType,
    embedding_types: [&'a str; 1],
}

impl Embedder for CohereEmbedder {
    fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let req = EmbedRequest {
            model: &self.model,
            texts,
            input_type,
            embedding_types: ["float"],
        };
        let res = post_json_authed::<Value, _>(&self.url, &self.api_key, &req)?;
        let vectors = parse_embeddings(res)?;
        if vectors.len() != texts.len() {
            return Err(RagError::Upstream(format!(
                "embedding count mismatch: sent {} texts, got {} vectors",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

/// Embeds `texts` in batches of at most `batch_size`.
pub fn embed_texts(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        debug!(batch = batch.len(), "embedding batch");
        out.extend(embedder.embed(batch, InputType::SearchDocument)?);
    }
    Ok(out)
}

/// Accepts `{"embeddings": [[..]]}` as well as the typed
/// `{"embeddings": {"float": [[..]]}}` shape.
pub(crate) fn parse_embeddings(value: Value) -> Result<Vec<Vec<f32>>> {
    let Some(embeddings) = value.get("embeddings") else {
        return Err(RagError::Upstream("No embeddings in response".to_string()));
    };
    if let Some(float) = embeddings.get("float") {
        return parse_embeddings_value(float);
    }
    parse_embeddings_value(embeddings)
}

fn parse_embeddings_value(value: &Value) -> Result<Vec<Vec<f32>>> {
    let arr = value
        .as_array()
        .ok_or_else(|| RagError::Upstream("Invalid embeddings format".to_string()))?;
    if arr.is_empty() {
        return Ok(vec![]);
    }
    if arr[0].is_array() {
        return arr.iter().map(parse_vec).collect();
    }
    Ok(vec![parse_vec(value)?])
}

fn parse_vec(value: &Value) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| RagError::Upstream("Embedding is not an array".to_string()))?;
    arr.iter()
        .map(|v| {
            v.as_f64()
                .map(|n| n as f32)
                .ok_or_else(|| RagError::Upstream("Embedding value is not a number".to_string()))
        })
        .collect()
}
