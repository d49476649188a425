//! Priority-chain LLM gateway.
//!
//! GoalConvo has no per-role model selection the way a planner/executor
//! split would; every call just wants "the best provider that works right
//! now". The gateway walks a fixed priority chain (OpenRouter, Groq,
//! DeepSeek, a local runtime, Gemini, OpenAI, Mistral) and falls through on
//! retriable failures, same shape as a capability router but keyed on
//! availability rather than capability.

use std::sync::Arc;
use std::time::{Duration, Instant};

use goalconvo_domain::config::ProviderCredentials;
use goalconvo_domain::error::{Error, Result};

use crate::providers::{GeminiProvider, OpenAiCompatProvider};
use crate::traits::{CompletionRequest, LlmProvider};

/// The fixed provider order. Each entry is tried in turn until one
/// succeeds or the chain is exhausted.
const CHAIN_ORDER: &[&str] = &[
    "openrouter", "groq", "deepseek", "local", "gemini", "openai", "mistral",
];

pub struct LlmGateway {
    providers: Vec<Arc<dyn LlmProvider>>,
    timeout: Duration,
    max_retries: u32,
}

impl LlmGateway {
    /// Build the chain from configured credentials, skipping any slot with
    /// no credential. Returns `Error::ConfigError` if nothing is configured
    /// (mirrors `Config::validate`, which should already have caught this).
    pub fn from_credentials(creds: &ProviderCredentials, timeout: Duration, max_retries: u32) -> Result<Self> {
        let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

        for provider_id in CHAIN_ORDER {
            let cred = match *provider_id {
                "openrouter" => &creds.openrouter,
                "groq" => &creds.groq,
                "deepseek" => &creds.deepseek,
                "local" => &creds.local,
                "gemini" => &creds.gemini,
                "openai" => &creds.openai,
                "mistral" => &creds.mistral,
                _ => unreachable!(),
            };
            if !cred.is_configured() {
                continue;
            }
            let provider: Arc<dyn LlmProvider> = if *provider_id == "gemini" {
                Arc::new(GeminiProvider::new(cred))
            } else {
                Arc::new(OpenAiCompatProvider::new(provider_id, cred))
            };
            providers.push(provider);
        }

        if providers.is_empty() {
            return Err(Error::ConfigError(
                "no LLM provider credentials configured".into(),
            ));
        }

        Ok(Self {
            providers,
            timeout,
            max_retries,
        })
    }

    /// Build a gateway from an already-constructed provider list, used by
    /// tests to inject stub providers.
    pub fn from_providers(providers: Vec<Arc<dyn LlmProvider>>, timeout: Duration, max_retries: u32) -> Self {
        Self {
            providers,
            timeout,
            max_retries,
        }
    }

    /// Send a completion request, retrying each provider up to
    /// `max_retries` times on a retriable error before falling through to
    /// the next provider in the chain.
    pub async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let mut last_err: Option<Error> = None;

        for provider in &self.providers {
            for attempt in 0..=self.max_retries {
                let start = Instant::now();
                let result = self.try_complete(provider.as_ref(), req).await;
                let elapsed_ms = start.elapsed().as_millis() as u64;

                match result {
                    Ok(text) => {
                        tracing::debug!(
                            provider = provider.provider_id(),
                            model = provider.model(),
                            attempt,
                            elapsed_ms,
                            "llm completion succeeded"
                        );
                        return Ok(text);
                    }
                    Err(e) if e.is_retriable() && attempt < self.max_retries => {
                        tracing::warn!(
                            provider = provider.provider_id(),
                            attempt,
                            error = %e,
                            "retriable LLM error, retrying"
                        );
                        last_err = Some(e);
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(
                            provider = provider.provider_id(),
                            error = %e,
                            "LLM provider exhausted, falling through chain"
                        );
                        last_err = Some(e);
                        break;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::BadLlmResponse("no providers configured".into())))
    }

    /// Embed a batch of texts using the first provider in the chain that
    /// supports it (falls through on `BadLlmResponse`, which is what a
    /// provider without embedding support returns).
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_err: Option<Error> = None;
        for provider in &self.providers {
            match provider.embed(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) => {
                    tracing::warn!(provider = provider.provider_id(), error = %e, "embed failed, trying next provider");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::BadLlmResponse("no providers configured".into())))
    }

    /// Run one provider call under the gateway timeout. A timeout with
    /// `max_tokens > 20` gets one immediate follow-up attempt at
    /// `max_tokens = 20` — slow local models often time out generating a
    /// long completion but can still produce a short one, and a short
    /// completion keeps the dialogue moving instead of losing the turn.
    async fn try_complete(&self, provider: &dyn LlmProvider, req: &CompletionRequest) -> Result<String> {
        match tokio::time::timeout(self.timeout, provider.complete(req)).await {
            Ok(result) => result,
            Err(_) => {
                if req.max_tokens > 20 {
                    let shrunk = CompletionRequest { max_tokens: 20, ..req.clone() };
                    tracing::warn!(
                        provider = provider.provider_id(),
                        "timed out, retrying once with max_tokens=20"
                    );
                    if let Ok(result) = tokio::time::timeout(self.timeout, provider.complete(&shrunk)).await {
                        return result;
                    }
                }
                Err(Error::Timeout(format!(
                    "provider '{}' timed out after {:?}",
                    provider.provider_id(),
                    self.timeout
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::StubProvider;

    fn req() -> CompletionRequest {
        CompletionRequest {
            prompt: "hi".into(),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 50,
        }
    }

    #[tokio::test]
    async fn falls_through_to_second_provider_on_non_retriable_error() {
        let a = Arc::new(StubProvider::always_err(
            "a",
            Error::BadLlmResponse("bad".into()),
        ));
        let b = Arc::new(StubProvider::always_ok("b", "hello"));
        let gw = LlmGateway::from_providers(vec![a, b], Duration::from_secs(1), 0);
        let out = gw.complete(&req()).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn retries_same_provider_on_retriable_error_before_falling_through() {
        let a = Arc::new(StubProvider::sequence(
            "a",
            vec![
                Err(Error::Timeout("t".into())),
                Ok("recovered".into()),
            ],
        ));
        let gw = LlmGateway::from_providers(vec![a.clone()], Duration::from_secs(1), 1);
        let out = gw.complete(&req()).await.unwrap();
        assert_eq!(out, "recovered");
        assert_eq!(a.call_count(), 2);
    }

    #[tokio::test]
    async fn timeout_with_large_max_tokens_retries_once_at_twenty() {
        let a = Arc::new(StubProvider::timeout_above_max_tokens("a", 20, "short reply"));
        let gw = LlmGateway::from_providers(vec![a.clone()], Duration::from_secs(1), 0);
        let out = gw.complete(&req()).await.unwrap();
        assert_eq!(out, "short reply");
        assert_eq!(a.call_count(), 2);
    }

    #[tokio::test]
    async fn timeout_with_small_max_tokens_does_not_retry() {
        let small_req = CompletionRequest { max_tokens: 20, ..req() };
        let a = Arc::new(StubProvider::always_err("a", Error::Timeout("t".into())));
        let gw = LlmGateway::from_providers(vec![a.clone()], Duration::from_secs(1), 0);
        assert!(gw.complete(&small_req).await.is_err());
        assert_eq!(a.call_count(), 1);
    }

    #[tokio::test]
    async fn returns_error_when_all_providers_exhausted() {
        let a = Arc::new(StubProvider::always_err("a", Error::Timeout("t".into())));
        let gw = LlmGateway::from_providers(vec![a], Duration::from_secs(1), 0);
        assert!(gw.complete(&req()).await.is_err());
    }
}
