use goalconvo_domain::error::Result;

/// A single text-completion request. This is the one capability the
/// gateway exposes; provider adapters translate it into their own wire
/// format and translate the response back into plain text.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

/// Trait every provider adapter must implement.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the prompt and return the completion text.
    async fn complete(&self, req: &CompletionRequest) -> Result<String>;

    /// Embed a batch of texts, used by the evaluator's similarity stage.
    /// Providers that cannot embed return `Error::BadLlmResponse`.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// A short identifier used in logs and fallback traces (e.g. "openrouter").
    fn provider_id(&self) -> &str;

    /// The model name this adapter is currently configured to call.
    fn model(&self) -> &str;
}
