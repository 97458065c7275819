//! Speech-to-Text `speech:recognize` client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::UpstreamError;
use crate::upstream::{excerpt, AudioEncoding, Transcriber, Transcript};

pub struct SpeechClient {
    client: Client,
    api_base: String,
    api_key: String,
    language: String,
}

impl SpeechClient {
    pub fn new(client: Client, api_base: &str, api_key: &str, language: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language: language.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: AudioEncoding,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate_hertz: Option<u32>,
    language_code: &'a str,
    enable_automatic_punctuation: bool,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f32>,
}

/// Opus containers carry their own rate; raw PCM and MP3 need a hint.
fn sample_rate_for(encoding: AudioEncoding) -> Option<u32> {
    match encoding {
        AudioEncoding::WebmOpus | AudioEncoding::OggOpus => None,
        AudioEncoding::Linear16 | AudioEncoding::Mp3 => Some(16_000),
    }
}

#[async_trait]
impl Transcriber for SpeechClient {
    async fn transcribe(&self, audio: &[u8], encoding: AudioEncoding) -> Result<Transcript, UpstreamError> {
        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding,
                sample_rate_hertz: sample_rate_for(encoding),
                language_code: &self.language,
                enable_automatic_punctuation: true,
            },
            audio: RecognitionAudio {
                content: STANDARD.encode(audio),
            },
        };
        let url = format!("{}/speech:recognize", self.api_base);
        debug!(%encoding, bytes = audio.len(), "\u{2192} speech request");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %encoding, body = %excerpt(&body), "speech API error");
            return Err(UpstreamError::Http(status.as_u16()));
        }
        let body: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        let mut transcript = Transcript::default();
        for alt in body.results.into_iter().filter_map(|r| r.alternatives.into_iter().next()) {
            let segment = alt.transcript.trim();
            if segment.is_empty() {
                continue;
            }
            if !transcript.text.is_empty() {
                transcript.text.push(' ');
            }
            transcript.text.push_str(segment);
            transcript.segment_confidences.push(alt.confidence.unwrap_or(0.0));
        }
        Ok(transcript)
    }
}
