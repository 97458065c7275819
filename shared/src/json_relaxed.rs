//! Helpers for locating the JSON object inside loosely formatted model
//! responses: the first markdown code fence is stripped, then everything
//! between the first `{` and the last `}` is taken as the candidate span.

use thiserror::Error;

/// Substring of a model response believed to contain a JSON object.
///
/// Always starts with `{` and ends with `}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateJsonSpan<'a>(&'a str);

impl<'a> CandidateJsonSpan<'a> {
    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no JSON object found in response")]
    NoJsonFound,
}

/// Pull the candidate JSON span out of an arbitrary text blob.
pub fn extract(raw: &str) -> Result<CandidateJsonSpan<'_>, ExtractionError> {
    let text = strip_code_fence(raw);
    let start = text.find('{').ok_or(ExtractionError::NoJsonFound)?;
    let end = text.rfind('}').ok_or(ExtractionError::NoJsonFound)?;
    if start >= end {
        return Err(ExtractionError::NoJsonFound);
    }
    Ok(CandidateJsonSpan(&text[start..=end]))
}

/// Return the body of the first ```` ``` ```` fence (optionally tagged
/// `json`), or the input unchanged when no complete fence exists.
fn strip_code_fence(s: &str) -> &str {
    let Some(open) = s.find("```") else {
        return s;
    };
    let mut body = &s[open + 3..];
    if body.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
        body = &body[4..];
    }
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => s,
    }
}
