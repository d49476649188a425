//! Adapter for any provider that speaks the OpenAI chat-completions wire
//! format: OpenRouter, Groq, DeepSeek, a local OpenAI-compatible runtime
//! (vLLM/Ollama/LM Studio), OpenAI itself, and Mistral's hosted API.

use async_trait::async_trait;
use goalconvo_domain::config::ProviderCredential;
use goalconvo_domain::error::{Error, Result};
use serde_json::Value;

use crate::traits::{CompletionRequest, LlmProvider};

/// Default base URLs for the providers in the priority chain that don't
/// override one via config.
pub fn default_base_url(provider_id: &str) -> &'static str {
    match provider_id {
        "openrouter" => "https://openrouter.ai/api/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "local" => "http://localhost:11434/v1",
        "openai" => "https://api.openai.com/v1",
        "mistral" => "https://api.mistral.ai/v1",
        _ => "https://api.openai.com/v1",
    }
}

/// Default model per provider, used when the credential doesn't name one.
fn default_model(provider_id: &str) -> &'static str {
    match provider_id {
        "openrouter" => "meta-llama/llama-3.1-8b-instruct",
        "groq" => "llama-3.1-8b-instant",
        "deepseek" => "deepseek-chat",
        "local" => "llama3",
        "openai" => "gpt-4o-mini",
        "mistral" => "mistral-small-latest",
        _ => "gpt-4o-mini",
    }
}

pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(provider_id: &str, cred: &ProviderCredential) -> Self {
        let base_url = cred
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider_id).to_string());
        let model = cred
            .model
            .clone()
            .unwrap_or_else(|| default_model(provider_id).to_string());

        Self {
            id: provider_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: cred.api_key.clone(),
            model,
            client: reqwest::Client::new(),
        }
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    fn map_status(&self, status: reqwest::StatusCode, body: String) -> Error {
        if status.as_u16() == 429 {
            Error::RateLimited { retry_after_ms: None }
        } else if status.is_server_error() {
            Error::TransportFailure(format!("{} returned HTTP {}: {}", self.id, status, body))
        } else {
            Error::BadLlmResponse(format!("{} returned HTTP {}: {}", self.id, status, body))
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": req.prompt}],
            "temperature": req.temperature,
            "top_p": req.top_p,
            "max_tokens": req.max_tokens,
        });

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("{}: {e}", self.id))
                } else {
                    Error::TransportFailure(format!("{}: {e}", self.id))
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::TransportFailure(format!("{}: {e}", self.id)))?;

        if !status.is_success() {
            return Err(self.map_status(status, text));
        }

        let parsed: Value = serde_json::from_str(&text)?;
        parsed
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|a| a.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                Error::BadLlmResponse(format!("{}: no content in response", self.id))
            })
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": "text-embedding-3-small",
            "input": texts,
        });

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::TransportFailure(format!("{}: {e}", self.id)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::TransportFailure(format!("{}: {e}", self.id)))?;

        if !status.is_success() {
            return Err(self.map_status(status, text));
        }

        let parsed: Value = serde_json::from_str(&text)?;
        let data = parsed
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| Error::BadLlmResponse(format!("{}: missing 'data' array", self.id)))?;

        Ok(data
            .iter()
            .filter_map(|item| {
                let arr = item.get("embedding")?.as_array()?;
                Some(arr.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect())
            })
            .collect())
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls_are_distinct() {
        assert_ne!(default_base_url("groq"), default_base_url("openrouter"));
    }

    #[test]
    fn credential_override_takes_precedence() {
        let cred = ProviderCredential {
            api_key: Some("k".into()),
            base_url: Some("https://example.test/v1".into()),
            model: Some("custom-model".into()),
        };
        let provider = OpenAiCompatProvider::new("openai", &cred);
        assert_eq!(provider.base_url, "https://example.test/v1");
        assert_eq!(provider.model(), "custom-model");
    }
}
