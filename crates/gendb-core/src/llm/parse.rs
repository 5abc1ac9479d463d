//! # LLM Response Parser
//!
//! Turns model output into JSON. Providers with structured output return a
//! bare object, but models prompted for JSON still wrap it in markdown
//! fences or a sentence of preamble now and then, so extraction is lenient.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{GenDbError, Result};

/// Parse the JSON object contained in a model response.
pub fn parse_json_object(response: &str) -> Result<serde_json::Value> {
    let json_str = extract_json_object(response);
    let value: serde_json::Value =
        serde_json::from_str(json_str).map_err(|e| GenDbError::Llm {
            message: format!(
                "Failed to parse LLM response as JSON: {}. Response: {}",
                e,
                truncate(response, 200),
            ),
        })?;

    if !value.is_object() {
        return Err(GenDbError::Llm {
            message: format!(
                "Expected a JSON object from the LLM. Response: {}",
                truncate(response, 200)
            ),
        });
    }
    Ok(value)
}

/// Read the `values` array of a value generation answer.
///
/// Strings are kept as they are; numbers and booleans are stringified.
/// Anything else (nested arrays, objects, null) is dropped on its own so
/// one malformed element does not cost the whole batch.
pub fn parse_values(answer: &serde_json::Value) -> Result<Vec<String>> {
    let items = answer["values"].as_array().ok_or_else(|| GenDbError::Llm {
        message: "LLM response is missing the \"values\" array".to_string(),
    })?;

    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item {
            serde_json::Value::String(s) => values.push(s.clone()),
            serde_json::Value::Number(n) => values.push(n.to_string()),
            serde_json::Value::Bool(b) => values.push(b.to_string()),
            other => tracing::debug!("Dropped non-scalar generated value: {}", other),
        }
    }
    Ok(values)
}

/// Locate the JSON object in a response that may carry markdown fences or
/// conversational text around it.
fn extract_json_object(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    static OBJECT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));

    if let Some(mat) = OBJECT_RE.find(trimmed) {
        return mat.as_str();
    }

    trimmed
}

/// Cut `s` to at most `max` bytes without splitting a character.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
