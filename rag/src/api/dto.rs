use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chain::ChainAnswer;
use crate::retrieve_chunks::Hit;

/// POST /ask body. Both fields are required strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub session_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub page: PageRef,
}

/// A page index, or an empty string when the chunk carried no page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    Number(u32),
    Text(String),
}

impl Default for PageRef {
    fn default() -> Self {
        PageRef::Text(String::new())
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::Number(n) => write!(f, "{}", n),
            PageRef::Text(s) => f.write_str(s),
        }
    }
}

impl From<&Hit> for SourceRef {
    fn from(hit: &Hit) -> Self {
        let payload = hit.payload.as_ref();
        SourceRef {
            source: payload.and_then(|p| p.source.clone()).unwrap_or_default(),
            page: payload
                .and_then(|p| p.page)
                .map(PageRef::Number)
                .unwrap_or_default(),
        }
    }
}

impl From<ChainAnswer> for AskResponse {
    fn from(result: ChainAnswer) -> Self {
        AskResponse {
            sources: result.sources.iter().map(SourceRef::from).collect(),
            answer: result.answer,
        }
    }
}

/// GET /health body
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve_chunks::Payload;
    use serde_json::json;

    #[test]
    fn missing_metadata_defaults_to_empty_strings() {
        let hit = Hit { score: 0.2, payload: Some(Payload { text: Some("x".into()), ..Payload::default() }) };
        let source = SourceRef::from(&hit);
        assert_eq!(serde_json::to_value(&source).unwrap(), json!({"source": "", "page": ""}));
    }

    #[test]
    fn page_numbers_stay_numeric_on_the_wire() {
        let source = SourceRef { source: "a.pdf".into(), page: PageRef::Number(0) };
        assert_eq!(serde_json::to_value(&source).unwrap(), json!({"source": "a.pdf", "page": 0}));

        let parsed: SourceRef = serde_json::from_value(json!({"source": "b.pdf", "page": "iv"})).unwrap();
        assert_eq!(parsed.page, PageRef::Text("iv".into()));
        assert_eq!(parsed.page.to_string(), "iv");
    }
}
