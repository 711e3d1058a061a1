use serde::{Deserialize, Serialize};

use crate::build_prompt::{ChatRequest, Message};
use crate::error::{RagError, Result};
use crate::http::post_json_authed;

pub trait LanguageModel {
    fn chat(&self, request: &ChatRequest) -> Result<String>;
}

pub struct CohereChat {
    url: String,
    api_key: String,
    model: String,
}

impl CohereChat {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            url: format!("{}/v1/chat", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct CohereChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<&'a str>,
    #[serde(skip_serializing_if = "no_history")]
    chat_history: &'a [Message],
}

fn no_history(history: &&[Message]) -> bool {
    history.is_empty()
}

#[derive(Deserialize)]
struct CohereChatResponse {
    text: Option<String>,
}

impl LanguageModel for CohereChat {
    fn chat(&self, request: &ChatRequest) -> Result<String> {
        let req = CohereChatRequest {
            model: &self.model,
            message: &request.message,
            preamble: request.preamble.as_deref(),
            chat_history: &request.chat_history,
        };
        let res = post_json_authed::<CohereChatResponse, _>(&self.url, &self.api_key, &req)?;
        res.text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RagError::Upstream("language model returned no text".to_string()))
    }
}

/// Generates an answer for a fully assembled request.
pub fn generate_answer(llm: &dyn LanguageModel, request: &ChatRequest) -> Result<String> {
    llm.chat(request)
}

/// Rewrites a follow-up into a standalone question, falling back to the
/// original question when the model returns nothing usable.
pub fn generate_standalone_question(
    llm: &dyn LanguageModel,
    request: &ChatRequest,
    question: &str,
) -> Result<String> {
    let rewritten = llm.chat(request)?;
    let rewritten = rewritten.lines().next().unwrap_or("").trim();
    if rewritten.is_empty() {
        Ok(question.to_string())
    } else {
        Ok(rewritten.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_prompt::Role;

    #[test]
    fn request_omits_empty_history_and_preamble() {
        let req = CohereChatRequest {
            model: "command-r-plus",
            message: "hello",
            preamble: None,
            chat_history: &[],
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"model": "command-r-plus", "message": "hello"})
        );
    }

    #[test]
    fn request_includes_history_when_present() {
        let history = vec![Message { role: Role::User, message: "earlier".into() }];
        let req = CohereChatRequest {
            model: "m",
            message: "now",
            preamble: Some("sys"),
            chat_history: &history,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["preamble"], "sys");
        assert_eq!(value["chat_history"][0]["role"], "USER");
    }
}
