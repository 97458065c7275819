//! Single-pass repair of the JSON mistakes language models commonly make.
//!
//! Repairs run in a fixed order and each one assumes the previous ones have
//! already been applied:
//!
//! 1. bare (or single-quoted) object keys are double-quoted,
//! 2. single-quoted string values are double-quoted,
//! 3. trailing commas before `}` / `]` are removed,
//! 4. missing closing braces are appended.
//!
//! All transforms share a small scanner that skips over string literals, so
//! the contents of quoted values are never rewritten.

use serde_json::Value;
use thiserror::Error;

use crate::json_relaxed::CandidateJsonSpan;

/// Result of parsing a candidate span.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPayload {
    pub value: Value,
    /// True when the strict parse failed and the repaired text was used.
    pub repaired: bool,
}

#[derive(Error, Debug)]
pub enum RepairError {
    #[error("JSON still invalid after repair: {0}")]
    RepairFailed(#[source] serde_json::Error),
}

/// Parse the span, falling back to one repair attempt when strict parsing fails.
pub fn repair(span: CandidateJsonSpan<'_>) -> Result<ParsedPayload, RepairError> {
    match strict_parse(span) {
        Ok(value) => Ok(ParsedPayload { value, repaired: false }),
        Err(_) => reparse(span).map(|value| ParsedPayload { value, repaired: true }),
    }
}

pub fn strict_parse(span: CandidateJsonSpan<'_>) -> Result<Value, serde_json::Error> {
    serde_json::from_str(span.as_str())
}

/// Apply the repair transforms and parse exactly once more.
pub fn reparse(span: CandidateJsonSpan<'_>) -> Result<Value, RepairError> {
    let fixed = repair_text(span.as_str());
    serde_json::from_str(&fixed).map_err(RepairError::RepairFailed)
}

pub fn repair_text(text: &str) -> String {
    let text = quote_bare_keys(text);
    let text = double_quote_values(&text);
    let text = strip_trailing_commas(&text);
    balance_braces(&text)
}

/// Index just past the closing quote of the literal opened at `start`, or
/// `None` when the literal is never closed.
fn literal_end(chars: &[char], start: usize) -> Option<usize> {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn last_significant(out: &str) -> Option<char> {
    out.trim_end().chars().last()
}

fn in_key_position(out: &str) -> bool {
    matches!(last_significant(out), Some('{') | Some(','))
}

fn in_value_position(out: &str) -> bool {
    matches!(last_significant(out), Some(':') | Some('[') | Some(','))
}

fn followed_by(chars: &[char], from: usize, wanted: &[char]) -> bool {
    chars[from.min(chars.len())..]
        .iter()
        .find(|c| !c.is_whitespace())
        .is_some_and(|c| wanted.contains(c))
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Re-emit a single-quoted literal body as a double-quoted JSON string.
fn push_double_quoted(out: &mut String, body: &[char]) {
    out.push('"');
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            '\\' if body.get(i + 1) == Some(&'\'') => {
                out.push('\'');
                i += 2;
            }
            '\\' => {
                out.push('\\');
                if let Some(next) = body.get(i + 1) {
                    out.push(*next);
                }
                i += 2;
            }
            '"' => {
                out.push_str("\\\"");
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out.push('"');
}

/// Walk `text`, copying double-quoted literals untouched and handing every
/// single-quoted literal to `on_single` together with the output so far.
fn rewrite_single_quoted(text: &str, on_single: impl Fn(&str, &[char], usize) -> bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '"' | '\'' => {
                let Some(end) = literal_end(&chars, i) else {
                    out.extend(&chars[i..]);
                    break;
                };
                if chars[i] == '\'' && on_single(&out, &chars, end) {
                    push_double_quoted(&mut out, &chars[i + 1..end - 1]);
                } else {
                    out.extend(&chars[i..end]);
                }
                i = end;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn quote_bare_keys(text: &str) -> String {
    let keyed = rewrite_single_quoted(text, |out, chars, end| {
        in_key_position(out) && followed_by(chars, end, &[':'])
    });

    let chars: Vec<char> = keyed.chars().collect();
    let mut out = String::with_capacity(keyed.len() + 16);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            let end = literal_end(&chars, i).unwrap_or(chars.len());
            out.extend(&chars[i..end]);
            i = end;
        } else if is_ident_start(c) && in_key_position(&out) {
            let mut end = i;
            while end < chars.len() && is_ident_char(chars[end]) {
                end += 1;
            }
            if followed_by(&chars, end, &[':']) {
                out.push('"');
                out.extend(&chars[i..end]);
                out.push('"');
            } else {
                out.extend(&chars[i..end]);
            }
            i = end;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn double_quote_values(text: &str) -> String {
    rewrite_single_quoted(text, |out, _, _| in_value_position(out))
}

fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '"' | '\'' => {
                let end = literal_end(&chars, i).unwrap_or(chars.len());
                out.extend(&chars[i..end]);
                i = end;
            }
            ',' if followed_by(&chars, i + 1, &['}', ']']) => i += 1,
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn balance_braces(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let (mut opens, mut closes) = (0usize, 0usize);
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '"' | '\'' => {
                i = literal_end(&chars, i).unwrap_or(chars.len());
                continue;
            }
            '{' => opens += 1,
            '}' => closes += 1,
            _ => {}
        }
        i += 1;
    }
    let mut out = text.to_string();
    for _ in closes..opens {
        out.push('}');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_relaxed::extract;
    use serde_json::json;

    fn parse(raw: &str) -> Result<ParsedPayload, RepairError> {
        repair(extract(raw).unwrap())
    }

    #[test]
    fn valid_json_skips_repair() {
        let parsed = parse(r#"{"a": 1}"#).unwrap();
        assert_eq!(parsed.value, json!({"a": 1}));
        assert!(!parsed.repaired);
    }

    #[test]
    fn trailing_comma_is_removed() {
        let parsed = parse(r#"{"a":1,}"#).unwrap();
        assert_eq!(parsed.value, json!({"a": 1}));
        assert!(parsed.repaired);

        let parsed = parse(r#"{"list": [1, 2, ], "b": true, }"#).unwrap();
        assert_eq!(parsed.value, json!({"list": [1, 2], "b": true}));
    }

    #[test]
    fn missing_closing_brace_is_appended() {
        assert_eq!(repair_text(r#"{"a": {"b": 1}"#), r#"{"a": {"b": 1}}"#);
        let parsed = parse(r#"{"a": {"b": 1}"#).unwrap();
        assert_eq!(parsed.value, json!({"a": {"b": 1}}));
    }

    #[test]
    fn bare_keys_and_single_quotes() {
        let parsed = parse("{businessType: 'Pottery', confidence: 120}").unwrap();
        assert_eq!(parsed.value, json!({"businessType": "Pottery", "confidence": 120}));
    }

    #[test]
    fn single_quoted_keys_and_array_items() {
        let parsed = parse("{'tags': ['clay', 'glaze'], 'note': 'it\\'s \"fired\"'}").unwrap();
        assert_eq!(
            parsed.value,
            json!({"tags": ["clay", "glaze"], "note": "it's \"fired\""})
        );
    }

    #[test]
    fn string_contents_are_left_alone() {
        let raw = r#"{summary: "ratio: 3, note: {x}", "k": 'v',}"#;
        let parsed = parse(raw).unwrap();
        assert_eq!(parsed.value, json!({"summary": "ratio: 3, note: {x}", "k": "v"}));
    }

    #[test]
    fn apostrophes_inside_double_quotes_survive() {
        let parsed = parse(r#"{name: "Mary's Crafts", items: [],}"#).unwrap();
        assert_eq!(parsed.value, json!({"name": "Mary's Crafts", "items": []}));
    }

    #[test]
    fn hopeless_input_reports_failure() {
        let err = parse("{this is : not json at all }").unwrap_err();
        assert!(matches!(err, RepairError::RepairFailed(_)));
    }
}
