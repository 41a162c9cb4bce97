//! Turns raw model output into an [`AnalysisResult`].
//!
//! Structured mode decodes the JSON schema and, when that fails for any
//! reason, returns [`CareerAnalysis::placeholder`] instead of an error.
//! Free-text mode passes the completion through untouched.

use serde_json::Value;
use tracing::warn;

use crate::analysis::models::{AnalysisResult, CareerAnalysis, OutputMode};

#[derive(Debug, Clone, Copy)]
pub struct ResultParser {
    mode: OutputMode,
}

impl ResultParser {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn parse(&self, raw: &str) -> AnalysisResult {
        match self.mode {
            OutputMode::FreeText => AnalysisResult::FreeText {
                text: raw.to_string(),
            },
            OutputMode::Structured => {
                let analysis = decode_structured(raw).unwrap_or_else(|e| {
                    warn!("Structured output did not match schema, using default result: {e}");
                    CareerAnalysis::placeholder()
                });
                AnalysisResult::Structured { analysis }
            }
        }
    }
}

/// Decodes the schema, tolerating code fences and prose around the object.
/// Anything other than a JSON object is rejected, including arrays that
/// serde would otherwise map onto the struct positionally.
pub fn decode_structured(raw: &str) -> Result<CareerAnalysis, serde_json::Error> {
    let text = strip_code_fence(raw);
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => match outermost_object(text) {
            Some(inner) if inner.len() < text.len() => serde_json::from_str(inner)?,
            _ => return Err(e),
        },
    };
    if !value.is_object() {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }
    serde_json::from_value(value)
}

/// Removes a surrounding markdown code fence, whatever its info string
/// (`json`, `JSON`, `javascript`, none). An unterminated fence is tolerated.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let body = body.trim();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Slice from the first `{` to the last `}`, if both exist in that order.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
