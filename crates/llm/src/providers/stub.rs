//! In-memory provider used by unit and integration tests so they can
//! exercise the gateway's fallback and retry logic without network access.

use async_trait::async_trait;
use goalconvo_domain::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::traits::{CompletionRequest, LlmProvider};

pub struct StubProvider {
    id: String,
    /// Canned response returned on every `complete` call, cycling if more
    /// than one is configured.
    responses: Vec<Result<String>>,
    /// When set, `complete` only returns this response once `req.max_tokens`
    /// is at or below the given value; otherwise it always times out. Used
    /// to test the gateway's "timeout, then retry with max_tokens=20" path.
    ok_below_max_tokens: Option<(u32, String)>,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn always_ok(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            responses: vec![Ok(text.to_string())],
            ok_below_max_tokens: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_err(id: &str, err: Error) -> Self {
        Self {
            id: id.to_string(),
            responses: vec![Err(err)],
            ok_below_max_tokens: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn sequence(id: &str, responses: Vec<Result<String>>) -> Self {
        Self {
            id: id.to_string(),
            responses,
            ok_below_max_tokens: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Times out on every call whose `max_tokens` exceeds `threshold`, and
    /// succeeds with `text` otherwise.
    pub fn timeout_above_max_tokens(id: &str, threshold: u32, text: &str) -> Self {
        Self {
            id: id.to_string(),
            responses: vec![Err(Error::Timeout("stub timeout".into()))],
            ok_below_max_tokens: Some((threshold, text.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn clone_result(r: &Result<String>) -> Result<String> {
    match r {
        Ok(s) => Ok(s.clone()),
        Err(e) => Err(match e {
            Error::Timeout(m) => Error::Timeout(m.clone()),
            Error::RateLimited { retry_after_ms } => Error::RateLimited {
                retry_after_ms: *retry_after_ms,
            },
            Error::TransportFailure(m) => Error::TransportFailure(m.clone()),
            Error::BadLlmResponse(m) => Error::BadLlmResponse(m.clone()),
            other => Error::BadLlmResponse(other.to_string()),
        }),
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((threshold, text)) = &self.ok_below_max_tokens {
            return if req.max_tokens <= *threshold {
                Ok(text.clone())
            } else {
                Err(Error::Timeout("stub timeout".into()))
            };
        }
        let pick = self.responses.get(idx).unwrap_or_else(|| self.responses.last().unwrap());
        clone_result(pick)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}
