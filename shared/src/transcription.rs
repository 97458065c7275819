//! Speech-to-text over a fixed list of encodings. Browser recordings arrive
//! without a reliable content type, so each encoding is tried in turn.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::UpstreamError;
use crate::upstream::{AudioEncoding, Transcriber};

pub const ENCODING_PRIORITY: [AudioEncoding; 4] = [
    AudioEncoding::WebmOpus,
    AudioEncoding::OggOpus,
    AudioEncoding::Linear16,
    AudioEncoding::Mp3,
];

/// Shorter transcripts are treated as noise.
pub const MIN_TRANSCRIPT_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptOutcome {
    pub text: String,
    /// Mean confidence over recognised segments, 0 when none were reported.
    pub confidence: f32,
    pub encoding: AudioEncoding,
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// First transcript longer than [`MIN_TRANSCRIPT_CHARS`], or the last
/// error seen (`Empty` when every encoding returned too little text).
pub async fn transcribe_any(transcriber: &dyn Transcriber, audio: &[u8]) -> Result<TranscriptOutcome, UpstreamError> {
    let mut last_err = UpstreamError::Empty;
    for encoding in ENCODING_PRIORITY {
        match transcriber.transcribe(audio, encoding).await {
            Ok(t) => {
                let text = t.text.trim();
                if text.chars().count() > MIN_TRANSCRIPT_CHARS {
                    info!(%encoding, chars = text.len(), "transcribed audio");
                    return Ok(TranscriptOutcome {
                        text: text.to_string(),
                        confidence: mean(&t.segment_confidences),
                        encoding,
                    });
                }
                warn!(%encoding, "transcript too short, trying next encoding");
                last_err = UpstreamError::Empty;
            }
            Err(e) => {
                warn!(%encoding, error = %e, "transcription attempt failed");
                last_err = e;
            }
        }
    }
    Err(last_err)
}
