//! WhatsApp Cloud API text-message client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::upstream::{excerpt, MessageSender};

pub struct WhatsAppClient {
    client: Client,
    api_base: String,
    token: String,
    phone_number_id: String,
}

impl WhatsAppClient {
    pub fn new(client: Client, api_base: &str, token: &str, phone_number_id: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            phone_number_id: phone_number_id.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

#[async_trait]
impl MessageSender for WhatsAppClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<String, UpstreamError> {
        let url = format!("{}/{}/messages", self.api_base, self.phone_number_id);
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body }
        });
        debug!(to, "\u{2192} WhatsApp message");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %excerpt(&body), "WhatsApp API error");
            return Err(UpstreamError::Http(status.as_u16()));
        }
        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;
        sent.messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or(UpstreamError::Empty)
    }
}
