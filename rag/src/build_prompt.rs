use serde::Serialize;

use crate::models::Turn;
use crate::retrieve_chunks::Hit;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Chatbot,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub message: String,
}

/// Everything sent to the language model for one call.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub preamble: Option<String>,
    pub chat_history: Vec<Message>,
    pub message: String,
}

const CONDENSE_INSTRUCTIONS: &str = "Given the conversation below and a follow-up question, \
rewrite the follow-up question as a standalone question that can be understood without the \
conversation. Reply with the standalone question only.";

/// Asks the model to turn a follow-up into a standalone question. The
/// history travels inside the message, not as chat history.
pub fn build_condense_request(history: &[Turn], question: &str) -> ChatRequest {
    let message = format!(
        "{}\n\nConversation:\n{}\n\nFollow-up question: {}\nStandalone question:",
        CONDENSE_INSTRUCTIONS,
        format_history(history),
        question
    );
    ChatRequest {
        preamble: None,
        chat_history: Vec::new(),
        message,
    }
}

pub fn build_answer_request(
    system_prompt: &str,
    question: &str,
    hits: &[Hit],
    history: &[Turn],
) -> ChatRequest {
    let context = format_context_from_hits(hits);
    let message = format!(
        "Use the context below to answer the question.\n\nContext:\n{}\n\nQuestion: {}",
        context, question
    );
    ChatRequest {
        preamble: Some(system_prompt.to_string()),
        chat_history: history_messages(history),
        message,
    }
}

pub fn history_messages(history: &[Turn]) -> Vec<Message> {
    history
        .iter()
        .flat_map(|turn| {
            [
                Message { role: Role::User, message: turn.question.clone() },
                Message { role: Role::Chatbot, message: turn.answer.clone() },
            ]
        })
        .collect()
}

pub fn format_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_context_from_hits(hits: &[Hit]) -> String {
    let mut context_lines = Vec::new();
    for (i, hit) in hits.iter().enumerate() {
        let payload = hit.payload.as_ref();
        let source = payload
            .and_then(|p| p.source.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let page = payload
            .and_then(|p| p.page)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string());
        let text = payload.and_then(|p| p.text.clone()).unwrap_or_default();
        context_lines.push(format!("[{}] {} (page {})\n{}", i + 1, source, page, text));
    }

    if context_lines.is_empty() {
        "(no context found)".to_string()
    } else {
        context_lines.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve_chunks::Payload;

    fn turn(q: &str, a: &str) -> Turn {
        Turn { question: q.to_string(), answer: a.to_string() }
    }

    #[test]
    fn answer_request_carries_context_history_and_question() {
        let hits = vec![Hit {
            score: 0.8,
            payload: Some(Payload {
                source: Some("accounts.pdf".into()),
                page: Some(0),
                text: Some("Reset your password by visiting the portal.".into()),
            }),
        }];
        let history = vec![turn("Who runs the helpdesk?", "The IT team.")];
        let req = build_answer_request("Be brief.", "How do I reset my password?", &hits, &history);

        assert_eq!(req.preamble.as_deref(), Some("Be brief."));
        assert!(req.message.contains("[1] accounts.pdf (page 0)\nReset your password"));
        assert!(req.message.ends_with("Question: How do I reset my password?"));
        assert_eq!(
            req.chat_history,
            vec![
                Message { role: Role::User, message: "Who runs the helpdesk?".into() },
                Message { role: Role::Chatbot, message: "The IT team.".into() },
            ]
        );
    }

    #[test]
    fn missing_payload_fields_render_placeholders() {
        let hits = vec![Hit { score: 0.1, payload: None }];
        assert_eq!(format_context_from_hits(&hits), "[1] unknown (page ?)\n");
        assert_eq!(format_context_from_hits(&[]), "(no context found)");
    }

    #[test]
    fn condense_request_embeds_history_in_message() {
        let history = vec![turn("What is the VPN host?", "vpn.example.com")];
        let req = build_condense_request(&history, "And the port?");
        assert!(req.chat_history.is_empty());
        assert!(req.message.contains("Human: What is the VPN host?\nAssistant: vpn.example.com"));
        assert!(req.message.contains("Follow-up question: And the port?"));
    }

    #[test]
    fn roles_serialize_in_upper_case() {
        let msg = Message { role: Role::Chatbot, message: "hi".into() };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({"role": "CHATBOT", "message": "hi"})
        );
    }
}
