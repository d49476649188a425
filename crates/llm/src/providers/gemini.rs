//! Adapter for Google's Gemini `generateContent` API, which uses a
//! different request/response shape than the OpenAI chat-completions
//! family the rest of the priority chain speaks.

use async_trait::async_trait;
use goalconvo_domain::config::ProviderCredential;
use goalconvo_domain::error::{Error, Result};
use serde_json::Value;

use crate::traits::{CompletionRequest, LlmProvider};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(cred: &ProviderCredential) -> Self {
        Self {
            base_url: cred
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: cred.api_key.clone().unwrap_or_default(),
            model: cred.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": req.prompt}]}],
            "generationConfig": {
                "temperature": req.temperature,
                "topP": req.top_p,
                "maxOutputTokens": req.max_tokens,
            },
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("gemini: {e}"))
                } else {
                    Error::TransportFailure(format!("gemini: {e}"))
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::TransportFailure(format!("gemini: {e}")))?;

        if !status.is_success() {
            return Err(if status.as_u16() == 429 {
                Error::RateLimited { retry_after_ms: None }
            } else if status.is_server_error() {
                Error::TransportFailure(format!("gemini returned HTTP {status}: {text}"))
            } else {
                Error::BadLlmResponse(format!("gemini returned HTTP {status}: {text}"))
            });
        }

        let parsed: Value = serde_json::from_str(&text)?;
        parsed
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|a| a.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .and_then(|a| a.first())
            .and_then(|p| p.get("text"))
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| Error::BadLlmResponse("gemini: no text in response".into()))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!(
            "{}/models/embedding-001:batchEmbedContents?key={}",
            self.base_url, self.api_key
        );
        let requests: Vec<Value> = texts
            .iter()
            .map(|t| {
                serde_json::json!({
                    "model": "models/embedding-001",
                    "content": {"parts": [{"text": t}]},
                })
            })
            .collect();
        let body = serde_json::json!({ "requests": requests });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::TransportFailure(format!("gemini: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::TransportFailure(format!("gemini: {e}")))?;

        if !status.is_success() {
            return Err(Error::BadLlmResponse(format!(
                "gemini returned HTTP {status}: {text}"
            )));
        }

        let parsed: Value = serde_json::from_str(&text)?;
        let embeddings = parsed
            .get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| Error::BadLlmResponse("gemini: missing 'embeddings' array".into()))?;

        Ok(embeddings
            .iter()
            .filter_map(|e| {
                let values = e.get("values")?.as_array()?;
                Some(values.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect())
            })
            .collect())
    }

    fn provider_id(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
