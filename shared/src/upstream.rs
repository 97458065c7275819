//! Narrow interfaces of the third-party services the backend orchestrates,
//! and the dependency object that holds one client per service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::UpstreamError;
use crate::gemini_client::GeminiClient;
use crate::openai_client::OpenAiChatClient;
use crate::speech_client::SpeechClient;
use crate::vision_client::VisionClient;
use crate::whatsapp_client::WhatsAppClient;

/// Image passed alongside a prompt.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw, unstructured model text for `prompt`.
    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> Result<String, UpstreamError>;
}

/// Audio encodings the speech service accepts, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    WebmOpus,
    OggOpus,
    Linear16,
    Mp3,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub text: String,
    pub segment_confidences: Vec<f32>,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], encoding: AudioEncoding) -> Result<Transcript, UpstreamError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLabel {
    pub description: String,
    pub score: f32,
}

/// Features the vision service extracts to enrich prompts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFeatures {
    pub labels: Vec<ImageLabel>,
    /// `#rrggbb`, most dominant first.
    pub dominant_colors: Vec<String>,
    pub objects: Vec<String>,
    /// False when safe-search flags adult or violent content as likely.
    pub safe: bool,
}

#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(&self, image: &[u8]) -> Result<ImageFeatures, UpstreamError>;
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Returns the provider's message id.
    async fn send_text(&self, to: &str, body: &str) -> Result<String, UpstreamError>;
}

/// First 512 characters of an upstream body, for logs.
pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(512).collect()
}

/// An upstream client, or the reason it could not be built.
pub enum Capability<T: ?Sized> {
    Configured(Arc<T>),
    NotConfigured(&'static str),
}

impl<T: ?Sized> Capability<T> {
    pub fn get(&self) -> Result<&T, UpstreamError> {
        match self {
            Capability::Configured(client) => Ok(client.as_ref()),
            Capability::NotConfigured(name) => Err(UpstreamError::NotConfigured(*name)),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Capability::Configured(_))
    }
}

impl<T: ?Sized> Clone for Capability<T> {
    fn clone(&self) -> Self {
        match self {
            Capability::Configured(client) => Capability::Configured(client.clone()),
            Capability::NotConfigured(name) => Capability::NotConfigured(*name),
        }
    }
}

/// Every upstream client, built once at process start.
#[derive(Clone)]
pub struct Upstreams {
    pub model: Capability<dyn GenerativeModel>,
    pub transcriber: Capability<dyn Transcriber>,
    pub vision: Capability<dyn VisionAnalyzer>,
    pub messenger: Capability<dyn MessageSender>,
}

impl Upstreams {
    /// No upstream configured; every use case answers with its fallback.
    pub fn unconfigured() -> Self {
        Upstreams {
            model: Capability::NotConfigured("generative model"),
            transcriber: Capability::NotConfigured("speech service"),
            vision: Capability::NotConfigured("vision service"),
            messenger: Capability::NotConfigured("WhatsApp"),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(settings.upstream_timeout())
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;
        let mut upstreams = Upstreams::unconfigured();

        match settings.genai_provider.as_str() {
            "openai" if !settings.openai_api_key.is_empty() => {
                upstreams.model = Capability::Configured(Arc::new(OpenAiChatClient::new(
                    http.clone(),
                    &settings.openai_api_base,
                    &settings.openai_api_key,
                    &settings.openai_model,
                )));
            }
            "gemini" if !settings.gemini_api_key.is_empty() => {
                upstreams.model = Capability::Configured(Arc::new(GeminiClient::new(
                    http.clone(),
                    &settings.gemini_api_base,
                    &settings.gemini_api_key,
                    &settings.gemini_model,
                )));
            }
            other => warn!(provider = other, "generative model not configured"),
        }
        if !settings.speech_api_key.is_empty() {
            upstreams.transcriber = Capability::Configured(Arc::new(SpeechClient::new(
                http.clone(),
                &settings.speech_api_base,
                &settings.speech_api_key,
                &settings.speech_language,
            )));
        }
        if !settings.vision_api_key.is_empty() {
            upstreams.vision = Capability::Configured(Arc::new(VisionClient::new(
                http.clone(),
                &settings.vision_api_base,
                &settings.vision_api_key,
            )));
        }
        if !settings.whatsapp_token.is_empty() && !settings.whatsapp_phone_number_id.is_empty() {
            upstreams.messenger = Capability::Configured(Arc::new(WhatsAppClient::new(
                http,
                &settings.whatsapp_api_base,
                &settings.whatsapp_token,
                &settings.whatsapp_phone_number_id,
            )));
        }

        info!(
            model = upstreams.model.is_configured(),
            transcriber = upstreams.transcriber.is_configured(),
            vision = upstreams.vision.is_configured(),
            messenger = upstreams.messenger.is_configured(),
            "upstream clients initialised"
        );
        Ok(upstreams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_capability_reports_its_name() {
        let upstreams = Upstreams::unconfigured();
        match upstreams.model.get() {
            Err(UpstreamError::NotConfigured(name)) => assert_eq!(name, "generative model"),
            _ => panic!("expected NotConfigured"),
        }
    }

    #[test]
    fn settings_without_keys_leave_everything_unconfigured() {
        let settings = Settings::default();
        let upstreams = Upstreams::from_settings(&settings).unwrap();
        assert!(!upstreams.model.is_configured());
        assert!(!upstreams.transcriber.is_configured());
        assert!(!upstreams.vision.is_configured());
        assert!(!upstreams.messenger.is_configured());
    }

    #[test]
    fn encodings_use_wire_names() {
        assert_eq!(AudioEncoding::WebmOpus.as_ref(), "WEBM_OPUS");
        assert_eq!(AudioEncoding::Linear16.to_string(), "LINEAR16");
    }
}
