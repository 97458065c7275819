use thiserror::Error;

/// Failure talking to a third-party service (model, speech, vision, messaging).
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("network error: {0}")]
    Network(String),
    #[error("http error: {0}")]
    Http(u16),
    #[error("unexpected response: {0}")]
    Parse(String),
    #[error("empty response")]
    Empty,
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => UpstreamError::Http(status.as_u16()),
            None => UpstreamError::Network(e.to_string()),
        }
    }
}

/// Terminal failures of one analysis pipeline run. Each one routes to the
/// fallback generator; none of them reaches the HTTP caller as an error.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] UpstreamError),
    /// Audio never produced a usable transcript, so the model was not called.
    #[error("transcription failed: {0}")]
    TranscriptionFailed(#[source] UpstreamError),
    #[error("no JSON")]
    NoJsonFound,
    #[error("parse failed: {0}")]
    RepairFailed(#[source] serde_json::Error),
}

/// Errors surfaced to callers of the service layer.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
