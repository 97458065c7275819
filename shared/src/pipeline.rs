//! The analysis pipeline shared by every use case:
//!
//! ```text
//! CALL_UPSTREAM ─ok─> EXTRACT ─ok─> PARSE ─ok──────────────> NORMALIZE ─> DONE
//!       │                │            └─fail─> REPAIR ─ok──┘
//!       │                │                        └─fail─┐
//!       └─err────────────┴─────────────────────────────> FALLBACK ──────> DONE
//! ```
//!
//! Every path ends with exactly one schema-valid record. The generative call
//! is never retried; the repair step runs at most once.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dto::AnalysisEnvelope;
use crate::error::{PipelineError, UpstreamError};
use crate::json_relaxed::{extract, CandidateJsonSpan};
use crate::json_repair::{reparse, strict_parse, RepairError};
use crate::schema::Normalize;
use crate::upstream::{GenerativeModel, InlineImage};

/// Named pipeline stages, recorded in the order they ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    CallUpstream,
    Extract,
    Parse,
    Repair,
    Normalize,
    Fallback,
}

enum Step<'a> {
    Extract,
    Parse(CandidateJsonSpan<'a>),
    Repair(CandidateJsonSpan<'a>),
    Normalize(Value),
    Fallback(PipelineError),
}

#[derive(Debug)]
pub struct PipelineOutcome<T> {
    pub result: T,
    /// Model text, when the upstream call succeeded.
    pub raw: Option<String>,
    /// Why the fallback was used; `None` for genuine model output.
    pub failure: Option<PipelineError>,
    pub path: Vec<Stage>,
}

impl<T> PipelineOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        self.failure.is_some()
    }

    pub fn into_envelope(self) -> AnalysisEnvelope<T> {
        AnalysisEnvelope {
            success: true,
            fallback: self.failure.is_some(),
            error: self.failure.as_ref().map(fallback_reason),
            raw_upstream_text: self.raw,
            data: self.result,
        }
    }
}

/// Short reason embedded in the fallback record.
pub fn fallback_reason(err: &PipelineError) -> String {
    match err {
        PipelineError::UpstreamUnavailable(_) | PipelineError::TranscriptionFailed(_) => err.to_string(),
        PipelineError::NoJsonFound => "no JSON".to_string(),
        PipelineError::RepairFailed(_) => "parse failed".to_string(),
    }
}

fn fall_back<T: Normalize>(err: &PipelineError, ctx: &T::Context) -> T {
    let reason = fallback_reason(err);
    warn!(%reason, "using fallback result");
    T::fallback(&reason, ctx)
}

/// Run every stage after a successful upstream call.
pub fn process_response<T: Normalize>(raw: String, ctx: &T::Context) -> PipelineOutcome<T> {
    let mut path = vec![Stage::CallUpstream];
    let (result, failure) = {
        let mut step = Step::Extract;
        loop {
            step = match step {
                Step::Extract => {
                    path.push(Stage::Extract);
                    match extract(&raw) {
                        Ok(span) => Step::Parse(span),
                        Err(_) => Step::Fallback(PipelineError::NoJsonFound),
                    }
                }
                Step::Parse(span) => {
                    path.push(Stage::Parse);
                    match strict_parse(span) {
                        Ok(value) => Step::Normalize(value),
                        Err(e) => {
                            debug!(%e, "strict parse failed, repairing");
                            Step::Repair(span)
                        }
                    }
                }
                Step::Repair(span) => {
                    path.push(Stage::Repair);
                    match reparse(span) {
                        Ok(value) => Step::Normalize(value),
                        Err(RepairError::RepairFailed(e)) => Step::Fallback(PipelineError::RepairFailed(e)),
                    }
                }
                Step::Normalize(value) => {
                    path.push(Stage::Normalize);
                    break (T::normalize(Some(&value), ctx), None);
                }
                Step::Fallback(err) => {
                    path.push(Stage::Fallback);
                    break (fall_back::<T>(&err, ctx), Some(err));
                }
            };
        }
    };
    PipelineOutcome {
        result,
        raw: Some(raw),
        failure,
        path,
    }
}

/// Terminal outcome when the model could not be asked at all.
pub fn upstream_failed<T: Normalize>(err: UpstreamError, ctx: &T::Context) -> PipelineOutcome<T> {
    short_circuit(PipelineError::UpstreamUnavailable(err), ctx)
}

/// Terminal outcome when no transcript could be obtained for the prompt.
pub fn transcription_failed<T: Normalize>(err: UpstreamError, ctx: &T::Context) -> PipelineOutcome<T> {
    short_circuit(PipelineError::TranscriptionFailed(err), ctx)
}

fn short_circuit<T: Normalize>(err: PipelineError, ctx: &T::Context) -> PipelineOutcome<T> {
    PipelineOutcome {
        result: fall_back::<T>(&err, ctx),
        raw: None,
        failure: Some(err),
        path: vec![Stage::CallUpstream, Stage::Fallback],
    }
}

/// Call the model once and turn whatever comes back into a `T`.
pub async fn run<T: Normalize>(
    model: Result<&dyn GenerativeModel, UpstreamError>,
    prompt: &str,
    image: Option<&InlineImage>,
    ctx: &T::Context,
) -> PipelineOutcome<T> {
    let model = match model {
        Ok(model) => model,
        Err(e) => return upstream_failed(e, ctx),
    };
    match model.generate(prompt, image).await {
        Ok(raw) => {
            debug!(model = model.name(), len = raw.len(), "model answered");
            process_response(raw, ctx)
        }
        Err(e) => upstream_failed(e, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BusinessAnalysis, SolutionId};

    fn business(raw: &str) -> PipelineOutcome<BusinessAnalysis> {
        process_response(raw.to_string(), &())
    }

    #[test]
    fn fenced_model_output_with_prose() {
        let raw = "Here is the result:\n```json\n{businessType: 'Pottery', confidence: 120}\n```\nHope this helps!";
        let out = business(raw);
        assert!(!out.is_fallback());
        assert_eq!(out.result.business_type, "Pottery");
        assert_eq!(out.result.confidence, 100);
        assert_eq!(out.result, BusinessAnalysis {
            business_type: "Pottery".into(),
            confidence: 100,
            ..BusinessAnalysis::normalize(None, &())
        });
        assert_eq!(
            out.path,
            vec![Stage::CallUpstream, Stage::Extract, Stage::Parse, Stage::Repair, Stage::Normalize]
        );
    }

    #[test]
    fn clean_json_skips_repair() {
        let out = business(r#"{"businessType": "Weaving", "recommendedSolution": {"id": "tiktok"}}"#);
        assert_eq!(
            out.path,
            vec![Stage::CallUpstream, Stage::Extract, Stage::Parse, Stage::Normalize]
        );
        assert_eq!(out.result.recommended_solution.id, SolutionId::Whatsapp);
    }

    #[test]
    fn prose_only_reply_falls_back() {
        let out = business("I'm sorry, I can't help with that.");
        assert!(out.is_fallback());
        assert!(matches!(out.failure, Some(PipelineError::NoJsonFound)));
        assert_eq!(out.result.problems[0], "no JSON");
        assert_eq!(out.path.last(), Some(&Stage::Fallback));
    }

    #[test]
    fn unrepairable_reply_falls_back() {
        let out = business("{ businessType = Pottery; }");
        assert!(matches!(out.failure, Some(PipelineError::RepairFailed(_))));
        assert_eq!(out.result.problems[0], "parse failed");
        assert!(out.result.fallback);
        assert_eq!(out.raw.as_deref(), Some("{ businessType = Pottery; }"));
    }

    #[test]
    fn envelope_reports_provenance() {
        let env = upstream_failed::<BusinessAnalysis>(UpstreamError::Http(503), &()).into_envelope();
        assert!(env.success);
        assert!(env.fallback);
        assert_eq!(env.data.problems[0], "upstream unavailable: http error: 503");
        assert_eq!(env.error.as_deref(), Some("upstream unavailable: http error: 503"));
        assert!(env.raw_upstream_text.is_none());
    }

    #[test]
    fn transcription_failure_reason_is_verbatim() {
        let out = transcription_failed::<BusinessAnalysis>(UpstreamError::Empty, &());
        assert_eq!(out.result.problems[0], "transcription failed: empty response");
        assert_eq!(out.path, vec![Stage::CallUpstream, Stage::Fallback]);
    }

    #[test]
    fn repair_failure_envelope_uses_short_reason() {
        let env = business("{ businessType = Pottery; }").into_envelope();
        assert_eq!(env.error.as_deref(), Some("parse failed"));
    }
}
