//! Slack bot: receives mentions and direct messages over Socket Mode, asks
//! the `/ask` backend, and replies in the originating thread.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::api::{AskRequest, AskResponse};
use crate::config::Config;
use crate::error::{RagError, Result};
use crate::http::{post_json_authed, post_json_with_timeout};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Events delivered inside an `events_api` envelope.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum SlackEvent {
    #[serde(rename = "app_mention")]
    AppMention(MessageEvent),
    #[serde(rename = "message")]
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

/// A question to forward, with where to send the answer.
#[derive(Clone, Debug, PartialEq)]
pub struct Inquiry {
    pub session_id: String,
    pub question: String,
    pub channel: String,
    pub thread_ts: Option<String>,
}

pub trait Backend {
    fn ask(&self, question: &str, session_id: &str) -> Result<AskResponse>;
}

pub trait Replier {
    fn reply(&self, channel: &str, thread_ts: Option<&str>, text: &str) -> Result<()>;
}

/// Calls the HTTP `/ask` endpoint.
pub struct HttpBackend {
    url: String,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            timeout,
        }
    }
}

impl Backend for HttpBackend {
    fn ask(&self, question: &str, session_id: &str) -> Result<AskResponse> {
        let body = AskRequest {
            question: question.to_string(),
            session_id: session_id.to_string(),
        };
        post_json_with_timeout(&self.url, &body, self.timeout)
    }
}

/// Posts replies with `chat.postMessage` using the bot token.
pub struct SlackWebClient {
    api_url: String,
    bot_token: String,
}

#[derive(Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl SlackWebClient {
    pub fn new(api_url: &str, bot_token: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        }
    }
}

impl Replier for SlackWebClient {
    fn reply(&self, channel: &str, thread_ts: Option<&str>, text: &str) -> Result<()> {
        let url = format!("{}/chat.postMessage", self.api_url);
        let mut body = json!({ "channel": channel, "text": text });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = json!(ts);
        }
        let res = post_json_authed::<SlackApiResponse, _>(&url, &self.bot_token, &body)?;
        if !res.ok {
            return Err(RagError::Upstream(format!(
                "chat.postMessage failed: {}",
                res.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        Ok(())
    }
}

/// Text after the leading `<@BOT>` token, or the whole text when there is none.
pub fn mention_question(text: &str) -> String {
    match text.split_once('>') {
        Some((_, rest)) => rest.trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Decides whether an event should be answered. Mentions always are; plain
/// messages only when they come from a user in a one-to-one conversation.
pub fn inquiry_for(event: &SlackEvent) -> Option<Inquiry> {
    match event {
        SlackEvent::AppMention(ev) => Some(Inquiry {
            session_id: ev.user.clone()?,
            question: mention_question(&ev.text),
            channel: ev.channel.clone()?,
            thread_ts: ev.ts.clone(),
        }),
        SlackEvent::Message(ev) => {
            if ev.channel_type.as_deref() != Some("im") || ev.bot_id.is_some() || ev.subtype.is_some() {
                return None;
            }
            Some(Inquiry {
                session_id: ev.user.clone()?,
                question: ev.text.trim().to_string(),
                channel: ev.channel.clone()?,
                thread_ts: ev.ts.clone(),
            })
        }
        SlackEvent::Other => None,
    }
}

/// Answer text followed by a `Sources:` block listing every cited source.
pub fn format_answer(response: &AskResponse) -> String {
    let answer = if response.answer.is_empty() {
        "No answer found."
    } else {
        response.answer.as_str()
    };
    if response.sources.is_empty() {
        return answer.to_string();
    }
    let sources_text = response
        .sources
        .iter()
        .filter(|src| !src.source.is_empty())
        .map(|src| format!("- {} (page {})", src.source, src.page))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\n*Sources:*\n{}", answer, sources_text)
}

/// Never fails: backend errors become the reply text.
pub fn ask_backend(backend: &dyn Backend, question: &str, session_id: &str) -> String {
    match backend.ask(question, session_id) {
        Ok(response) => format_answer(&response),
        Err(e) => {
            warn!(session = %session_id, error = %e, "backend call failed");
            format!("Error contacting backend: {}", e)
        }
    }
}

/// Handles one event; returns whether a reply was posted.
pub fn handle_event(event: &SlackEvent, backend: &dyn Backend, replier: &dyn Replier) -> Result<bool> {
    let Some(inquiry) = inquiry_for(event) else {
        debug!(?event, "ignoring event");
        return Ok(false);
    };
    let answer = ask_backend(backend, &inquiry.question, &inquiry.session_id);
    replier.reply(&inquiry.channel, inquiry.thread_ts.as_deref(), &answer)?;
    Ok(true)
}

/// What the socket loop does with one Socket Mode frame.
#[derive(Debug, PartialEq)]
enum FrameAction {
    Ignore,
    Hello,
    Reconnect,
    Dispatch(SlackEvent),
}

#[derive(Debug, PartialEq)]
struct Frame {
    /// Acknowledgement to send back before acting on the frame.
    ack: Option<String>,
    action: FrameAction,
}

/// Reads a frame loosely so that any envelope carrying an `envelope_id` is
/// acknowledged, even when its payload is not an event this bot understands.
fn read_frame(text: &str) -> Frame {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "unreadable socket mode frame");
            return Frame { ack: None, action: FrameAction::Ignore };
        }
    };
    let ack = value
        .get("envelope_id")
        .and_then(Value::as_str)
        .map(|id| json!({ "envelope_id": id }).to_string());

    let action = match value.get("type").and_then(Value::as_str).unwrap_or_default() {
        "hello" => FrameAction::Hello,
        "disconnect" => FrameAction::Reconnect,
        "events_api" => match value.pointer("/payload/event") {
            Some(event) => match SlackEvent::deserialize(event) {
                Ok(event) => FrameAction::Dispatch(event),
                Err(e) => {
                    warn!(error = %e, "unreadable event payload");
                    FrameAction::Ignore
                }
            },
            None => FrameAction::Ignore,
        },
        other => {
            debug!(kind = other, "unhandled envelope");
            FrameAction::Ignore
        }
    };
    Frame { ack, action }
}

/// Long-running Socket Mode client. Requires both Slack tokens.
pub struct SlackBot {
    app_token: String,
    api_url: String,
    backend: Arc<HttpBackend>,
    replier: Arc<SlackWebClient>,
}

impl SlackBot {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let (Some(bot_token), Some(app_token)) = (&cfg.slack_bot_token, &cfg.slack_app_token) else {
            return Err(RagError::Configuration(
                "Both SLACK_BOT_TOKEN and SLACK_APP_TOKEN must be set in your environment.".to_string(),
            ));
        };
        Ok(Self {
            app_token: app_token.clone(),
            api_url: cfg.slack_api_url.trim_end_matches('/').to_string(),
            backend: Arc::new(HttpBackend::new(&cfg.backend_url, cfg.backend_timeout)),
            replier: Arc::new(SlackWebClient::new(&cfg.slack_api_url, bot_token)),
        })
    }

    /// Connects, dispatches events, and reconnects whenever Slack closes the socket.
    pub async fn run(&self) -> Result<()> {
        info!("slack bot is running");
        loop {
            match self.run_connection().await {
                Ok(()) => info!("socket mode connection closed; reconnecting"),
                Err(e) => error!(error = %e, "socket mode connection failed; reconnecting"),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn open_connection(&self) -> Result<String> {
        let url = format!("{}/apps.connections.open", self.api_url);
        let res = reqwest::Client::new()
            .post(&url)
            .bearer_auth(&self.app_token)
            .send()
            .await
            .map_err(|e| RagError::Upstream(format!("POST {} failed: {}", url, e)))?
            .json::<SlackApiResponse>()
            .await
            .map_err(|e| RagError::Upstream(format!("POST {} decode failed: {}", url, e)))?;
        match (res.ok, res.url) {
            (true, Some(ws_url)) => Ok(ws_url),
            _ => Err(RagError::Upstream(format!(
                "apps.connections.open failed: {}",
                res.error.unwrap_or_else(|| "no url returned".to_string())
            ))),
        }
    }

    async fn run_connection(&self) -> Result<()> {
        let ws_url = self.open_connection().await?;
        let (ws_stream, _) = connect_async(ws_url.as_str())
            .await
            .map_err(|e| RagError::Upstream(format!("websocket connect failed: {}", e)))?;
        self.pump(ws_stream).await
    }

    /// Reads frames until Slack asks for a reconnect or closes the socket.
    async fn pump(&self, ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Result<()> {
        let (mut write, mut read) = ws_stream.split();

        while let Some(msg) = read.next().await {
            let msg = msg.map_err(|e| RagError::Upstream(format!("websocket read failed: {}", e)))?;
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => return Ok(()),
                _ => continue,
            };
            let frame = read_frame(&text);

            // Slack redelivers anything not acknowledged within a few seconds.
            if let Some(ack) = frame.ack {
                write
                    .send(Message::Text(ack))
                    .await
                    .map_err(|e| RagError::Upstream(format!("websocket ack failed: {}", e)))?;
            }

            match frame.action {
                FrameAction::Hello => info!("connected to slack"),
                FrameAction::Reconnect => {
                    info!("slack requested a reconnect");
                    return Ok(());
                }
                FrameAction::Dispatch(event) => self.dispatch(event),
                FrameAction::Ignore => {}
            }
        }
        Ok(())
    }

    fn dispatch(&self, event: SlackEvent) {
        let backend = Arc::clone(&self.backend);
        let replier = Arc::clone(&self.replier);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = handle_event(&event, backend.as_ref(), replier.as_ref()) {
                error!(error = %e, "failed to post reply");
            }
        });
    }
}
