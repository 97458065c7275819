//! Use cases: each one gathers its inputs, builds a prompt and runs the
//! pipeline once. Only malformed input is an error; everything upstream
//! degrades to a fallback result inside the envelope.

use serde::Serialize;
use tracing::{info, warn};

use crate::dto::{AnalysisEnvelope, QuotationRequest};
use crate::error::{AppError, Result};
use crate::pipeline::{self, PipelineOutcome};
use crate::prompts;
use crate::schema::{BusinessAnalysis, EnhancementAnalysis, Quotation};
use crate::transcription::{transcribe_any, TranscriptOutcome};
use crate::upstream::{ImageFeatures, InlineImage, Upstreams};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessReport {
    #[serde(flatten)]
    pub envelope: AnalysisEnvelope<BusinessAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<TranscriptOutcome>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementReport {
    #[serde(flatten)]
    pub envelope: AnalysisEnvelope<EnhancementAnalysis>,
    /// CDN effect chain for the recommended enhancements.
    pub transformation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<ImageFeatures>,
}

fn log_outcome<T>(use_case: &'static str, outcome: &PipelineOutcome<T>) {
    info!(
        use_case,
        fallback = outcome.is_fallback(),
        path = ?outcome.path,
        "analysis finished"
    );
}

/// Spoken description to business analysis.
pub async fn analyze_business(upstreams: &Upstreams, audio: &[u8]) -> Result<BusinessReport> {
    if audio.is_empty() {
        return Err(AppError::Validation("audio file is empty".into()));
    }
    let transcribed = match upstreams.transcriber.get() {
        Ok(transcriber) => transcribe_any(transcriber, audio).await,
        Err(e) => Err(e),
    };
    let transcript = match transcribed {
        Ok(t) => t,
        Err(e) => {
            let outcome = pipeline::transcription_failed::<BusinessAnalysis>(e, &());
            log_outcome("business", &outcome);
            return Ok(BusinessReport {
                envelope: outcome.into_envelope(),
                transcript: None,
            });
        }
    };

    let outcome = pipeline::run::<BusinessAnalysis>(
        upstreams.model.get(),
        &prompts::business_prompt(&transcript.text),
        None,
        &(),
    )
    .await;
    log_outcome("business", &outcome);
    Ok(BusinessReport {
        envelope: outcome.into_envelope(),
        transcript: Some(transcript),
    })
}

/// Written description to business analysis; no transcription involved.
pub async fn analyze_business_text(upstreams: &Upstreams, description: &str) -> Result<BusinessReport> {
    if description.trim().is_empty() {
        return Err(AppError::Validation("description is required".into()));
    }
    let outcome = pipeline::run::<BusinessAnalysis>(
        upstreams.model.get(),
        &prompts::business_prompt(description),
        None,
        &(),
    )
    .await;
    log_outcome("business_text", &outcome);
    Ok(BusinessReport {
        envelope: outcome.into_envelope(),
        transcript: None,
    })
}

/// Product photo to enhancement plan. Vision features enrich the prompt when
/// available; their absence never fails the request.
pub async fn analyze_image(
    upstreams: &Upstreams,
    image: &[u8],
    mime_type: &str,
    business: Option<&BusinessAnalysis>,
) -> Result<EnhancementReport> {
    if image.is_empty() {
        return Err(AppError::Validation("image file is empty".into()));
    }
    if !mime_type.starts_with("image/") {
        return Err(AppError::Validation(format!("unsupported image type {mime_type}")));
    }

    let features = match upstreams.vision.get() {
        Ok(vision) => match vision.analyze(image).await {
            Ok(f) => {
                if !f.safe {
                    warn!("vision service flagged the image as unsafe");
                }
                Some(f)
            }
            Err(e) => {
                warn!(error = %e, "vision analysis failed, continuing without features");
                None
            }
        },
        Err(_) => None,
    };

    let inline = InlineImage {
        mime_type: mime_type.to_string(),
        data: image.to_vec(),
    };
    let outcome = pipeline::run::<EnhancementAnalysis>(
        upstreams.model.get(),
        &prompts::enhancement_prompt(features.as_ref(), business),
        Some(&inline),
        &(),
    )
    .await;
    log_outcome("enhancement", &outcome);
    let transformation = outcome.result.transformation();
    Ok(EnhancementReport {
        envelope: outcome.into_envelope(),
        transformation,
        features,
    })
}

pub async fn generate_quotation(
    upstreams: &Upstreams,
    req: &QuotationRequest,
) -> Result<AnalysisEnvelope<Quotation>> {
    req.validate()?;
    let outcome = pipeline::run::<Quotation>(
        upstreams.model.get(),
        &prompts::quotation_prompt(req),
        None,
        req,
    )
    .await;
    log_outcome("quotation", &outcome);
    Ok(outcome.into_envelope())
}
