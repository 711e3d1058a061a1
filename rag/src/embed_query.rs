use crate::embed_chunks::{Embedder, InputType};
use crate::error::Result;

pub fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let vecs = embedder.embed(&[text.to_string()], InputType::SearchQuery)?;
    Ok(vecs.into_iter().next().unwrap_or_default())
}
