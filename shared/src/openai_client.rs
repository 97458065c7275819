//! OpenAI-compatible chat-completions backend for the generative model.

use async_trait::async_trait;
use openai::chat::{ChatCompletionMessage, ChatCompletionMessageRole};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::UpstreamError;
use crate::upstream::{excerpt, GenerativeModel, InlineImage};

const SYSTEM_PROMPT: &str =
    "You are a business assistant for craft makers. Answer with exactly one JSON object.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatCompletionMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn msg(role: ChatCompletionMessageRole, txt: &str) -> ChatCompletionMessage {
    ChatCompletionMessage {
        role,
        content: Some(txt.to_string()),
        ..Default::default()
    }
}

/// Send chat messages and return the assistant's answer.
///
/// Logs status and a body excerpt on failure.
pub async fn call_openai_chat(
    client: &Client,
    api_base: &str,
    api_key: &str,
    model: &str,
    messages: Vec<ChatCompletionMessage>,
) -> Result<String, UpstreamError> {
    let req = ChatRequest {
        model,
        messages: &messages,
    };
    let url = format!("{}/v1/chat/completions", api_base.trim_end_matches('/'));
    debug!("\u{2192} OpenAI request: model = {}", req.model);
    let res = client
        .post(url)
        .bearer_auth(api_key)
        .json(&req)
        .send()
        .await
        .map_err(|e| {
            error!("network error to OpenAI: {e}");
            UpstreamError::Network(e.to_string())
        })?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| UpstreamError::Network(e.to_string()))?;
    debug!(%status, "\u{2190} body = {}", excerpt(&body));
    if !status.is_success() {
        return Err(UpstreamError::Http(status.as_u16()));
    }

    let chat: ChatResponse =
        serde_json::from_str(&body).map_err(|e| UpstreamError::Parse(e.to_string()))?;
    chat.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|answer| !answer.trim().is_empty())
        .ok_or(UpstreamError::Empty)
}

pub struct OpenAiChatClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(client: Client, api_base: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            api_base: api_base.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl GenerativeModel for OpenAiChatClient {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> Result<String, UpstreamError> {
        if image.is_some() {
            warn!(model = %self.model, "chat backend is text-only, inline image dropped");
        }
        let messages = vec![
            msg(ChatCompletionMessageRole::System, SYSTEM_PROMPT),
            msg(ChatCompletionMessageRole::User, prompt),
        ];
        call_openai_chat(&self.client, &self.api_base, &self.api_key, &self.model, messages).await
    }
}
