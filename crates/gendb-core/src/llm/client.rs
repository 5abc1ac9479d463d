//! # LLM API Client
//!
//! Sends JSON-producing prompts to OpenAI or Anthropic and returns the
//! parsed answer together with the tokens it cost. The provider is picked
//! from the API key found in the environment; `--model` overrides the
//! default model.

use serde_json::json;

use crate::error::{GenDbError, Result};
use crate::llm::parse::{parse_json_object, parse_values, truncate};
use crate::llm::{GeneratedValues, ValueGenerator, ValueRequest};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";

/// Token budget for a batch of column values.
pub const VALUE_MAX_TOKENS: u32 = 1000;

/// Supported LLM providers.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    OpenAI { api_key: String, model: String },
    Claude { api_key: String, model: String },
}

impl LlmProvider {
    /// Auto-detect provider from environment variables.
    ///
    /// Checks `OPENAI_API_KEY` first, then `ANTHROPIC_API_KEY`.
    pub fn from_env(model_override: Option<&str>) -> Result<Self> {
        Self::from_keys(
            non_empty_var("OPENAI_API_KEY"),
            non_empty_var("ANTHROPIC_API_KEY"),
            model_override,
        )
    }

    fn from_keys(
        openai_key: Option<String>,
        anthropic_key: Option<String>,
        model_override: Option<&str>,
    ) -> Result<Self> {
        if let Some(api_key) = openai_key {
            return Ok(LlmProvider::OpenAI {
                api_key,
                model: model_override.unwrap_or(DEFAULT_OPENAI_MODEL).to_string(),
            });
        }

        if let Some(api_key) = anthropic_key {
            return Ok(LlmProvider::Claude {
                api_key,
                model: model_override.unwrap_or(DEFAULT_CLAUDE_MODEL).to_string(),
            });
        }

        Err(GenDbError::Llm {
            message: "No LLM API key found. Set OPENAI_API_KEY or ANTHROPIC_API_KEY, or use --offline.".to_string(),
        })
    }

    pub fn model(&self) -> &str {
        match self {
            LlmProvider::OpenAI { model, .. } | LlmProvider::Claude { model, .. } => model,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI { .. } => "OpenAI",
            LlmProvider::Claude { .. } => "Anthropic",
        }
    }

    /// Ask for a JSON object following `schema`.
    ///
    /// Returns the parsed object and the total tokens the call used.
    pub async fn complete_json(
        &self,
        system: &str,
        user: &str,
        schema: &serde_json::Value,
        max_tokens: u32,
    ) -> Result<(serde_json::Value, u64)> {
        match self {
            LlmProvider::OpenAI { api_key, model } => {
                call_openai(api_key, model, system, user, schema, max_tokens).await
            }
            LlmProvider::Claude { api_key, model } => {
                call_claude(api_key, model, system, user, schema, max_tokens).await
            }
        }
    }
}

impl ValueGenerator for LlmProvider {
    async fn generate_values(&self, request: &ValueRequest) -> Result<GeneratedValues> {
        let (answer, usage) = self
            .complete_json(
                &request.system_context,
                &request.instruction,
                &request.response_schema,
                VALUE_MAX_TOKENS,
            )
            .await?;
        Ok(GeneratedValues {
            values: parse_values(&answer)?,
            usage,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Maximum time to wait for an LLM API response before aborting.
const API_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(API_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn openai_body(
    model: &str,
    system: &str,
    user: &str,
    schema: &serde_json::Value,
    max_tokens: u32,
) -> serde_json::Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": user }
        ],
        "max_tokens": max_tokens,
        "response_format": {
            "type": "json_schema",
            "json_schema": { "name": "response", "strict": true, "schema": schema }
        }
    })
}

/// Anthropic has no schema-constrained output on the Messages API, so the
/// schema goes into the prompt and the assistant turn is pre-filled with
/// `{` to skip any preamble.
fn claude_body(
    model: &str,
    system: &str,
    user: &str,
    schema: &serde_json::Value,
    max_tokens: u32,
) -> serde_json::Value {
    let prompt = format!(
        "{}\n\nRespond with a single JSON object that follows this JSON schema:\n{}",
        user, schema
    );
    json!({
        "model": model,
        "max_tokens": max_tokens,
        "system": system,
        "messages": [
            { "role": "user", "content": prompt },
            { "role": "assistant", "content": "{" }
        ]
    })
}

async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value> {
    let response = request
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| GenDbError::Llm {
            message: format!("Failed to call {} API: {}", provider, e),
        })?;

    let status = response.status();
    let response_text = response.text().await.map_err(|e| GenDbError::Llm {
        message: format!("Failed to read {} API response: {}", provider, e),
    })?;

    if !status.is_success() {
        return Err(GenDbError::Llm {
            message: format!(
                "{} API returned {}: {}",
                provider,
                status,
                truncate(&response_text, 500),
            ),
        });
    }

    serde_json::from_str(&response_text).map_err(|e| GenDbError::Llm {
        message: format!("Failed to parse {} API response JSON: {}", provider, e),
    })
}

async fn call_openai(
    api_key: &str,
    model: &str,
    system: &str,
    user: &str,
    schema: &serde_json::Value,
    max_tokens: u32,
) -> Result<(serde_json::Value, u64)> {
    let client = build_http_client();
    let body = openai_body(model, system, user, schema, max_tokens);
    let request = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {}", api_key));

    let parsed = post_json("OpenAI", request, &body).await?;
    let text = openai_text(&parsed)?;
    Ok((parse_json_object(text)?, openai_usage(&parsed)))
}

async fn call_claude(
    api_key: &str,
    model: &str,
    system: &str,
    user: &str,
    schema: &serde_json::Value,
    max_tokens: u32,
) -> Result<(serde_json::Value, u64)> {
    let client = build_http_client();
    let body = claude_body(model, system, user, schema, max_tokens);
    let request = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01");

    let parsed = post_json("Claude", request, &body).await?;
    let text = claude_text(&parsed)?;
    // The pre-filled `{` is not echoed back.
    let answer = parse_json_object(&format!("{{{}", text))?;
    Ok((answer, claude_usage(&parsed)))
}

fn openai_text(parsed: &serde_json::Value) -> Result<&str> {
    parsed["choices"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|choice| choice["message"]["content"].as_str())
        .ok_or_else(|| GenDbError::Llm {
            message: "OpenAI API response missing choices[0].message.content".to_string(),
        })
}

fn openai_usage(parsed: &serde_json::Value) -> u64 {
    parsed["usage"]["total_tokens"].as_u64().unwrap_or(0)
}

fn claude_text(parsed: &serde_json::Value) -> Result<&str> {
    parsed["content"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|block| block["text"].as_str())
        .ok_or_else(|| GenDbError::Llm {
            message: "Claude API response missing content[0].text".to_string(),
        })
}

fn claude_usage(parsed: &serde_json::Value) -> u64 {
    let usage = &parsed["usage"];
    usage["input_tokens"].as_u64().unwrap_or(0) + usage["output_tokens"].as_u64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_keys() {
        let result = LlmProvider::from_keys(None, None, None);
        assert!(matches!(result, Err(GenDbError::Llm { .. })));
    }

    #[test]
    fn test_openai_preferred() {
        let provider =
            LlmProvider::from_keys(Some("sk-1".into()), Some("ak-1".into()), None).unwrap();
        match provider {
            LlmProvider::OpenAI { api_key, model } => {
                assert_eq!(api_key, "sk-1");
                assert_eq!(model, "gpt-4o-mini");
            }
            _ => panic!("Expected OpenAI provider"),
        }
    }

    #[test]
    fn test_anthropic_fallback_with_override() {
        let provider =
            LlmProvider::from_keys(None, Some("ak-1".into()), Some("claude-3-5-haiku-latest"))
                .unwrap();
        assert_eq!(provider.provider_name(), "Anthropic");
        assert_eq!(provider.model(), "claude-3-5-haiku-latest");
    }

    #[test]
    fn test_openai_body_uses_strict_schema() {
        let schema = json!({"type": "object"});
        let body = openai_body("gpt-4o-mini", "sys", "user", &schema, 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["max_tokens"], 1000);
    }

    #[test]
    fn test_claude_body_embeds_schema() {
        let schema = json!({"type": "object"});
        let body = claude_body("claude", "sys", "Give me values.", &schema, 500);
        assert_eq!(body["system"], "sys");
        let prompt = body["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.starts_with("Give me values."));
        assert!(prompt.contains(r#"{"type":"object"}"#));
        assert_eq!(body["messages"][1]["content"], "{");
    }

    #[test]
    fn test_response_extraction() {
        let openai = json!({
            "choices": [{ "message": { "content": "{\"values\": [\"a\"]}" } }],
            "usage": { "prompt_tokens": 20, "completion_tokens": 5, "total_tokens": 25 }
        });
        assert_eq!(openai_text(&openai).unwrap(), "{\"values\": [\"a\"]}");
        assert_eq!(openai_usage(&openai), 25);

        let claude = json!({
            "content": [{ "type": "text", "text": "\"values\": [\"a\"]}" }],
            "usage": { "input_tokens": 30, "output_tokens": 7 }
        });
        assert_eq!(claude_text(&claude).unwrap(), "\"values\": [\"a\"]}");
        assert_eq!(claude_usage(&claude), 37);
        assert!(openai_text(&claude).is_err());
    }
}
