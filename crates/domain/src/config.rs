use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Credentials for one LLM provider slot in the priority chain. `None`
/// means "no credential configured", so the gateway skips it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderCredential {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() || self.base_url.is_some()
    }

    fn from_env(key_var: &str, base_var: &str, model_var: &str) -> Self {
        Self {
            api_key: std::env::var(key_var).ok().filter(|s| !s.is_empty()),
            base_url: std::env::var(base_var).ok().filter(|s| !s.is_empty()),
            model: std::env::var(model_var).ok().filter(|s| !s.is_empty()),
        }
    }
}

/// Credential slots for every provider in the fixed priority chain:
/// OpenRouter -> Groq -> DeepSeek -> local runtime -> Gemini -> OpenAI ->
/// Mistral-hosted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderCredentials {
    #[serde(default)]
    pub openrouter: ProviderCredential,
    #[serde(default)]
    pub groq: ProviderCredential,
    #[serde(default)]
    pub deepseek: ProviderCredential,
    #[serde(default)]
    pub local: ProviderCredential,
    #[serde(default)]
    pub gemini: ProviderCredential,
    #[serde(default)]
    pub openai: ProviderCredential,
    #[serde(default)]
    pub mistral: ProviderCredential,
}

impl ProviderCredentials {
    /// Read credentials from the environment, matching
    /// `{PROVIDER}_API_KEY` / `{PROVIDER}_BASE_URL` / `{PROVIDER}_MODEL`.
    pub fn from_env() -> Self {
        Self {
            openrouter: ProviderCredential::from_env(
                "OPENROUTER_API_KEY",
                "OPENROUTER_BASE_URL",
                "OPENROUTER_MODEL",
            ),
            groq: ProviderCredential::from_env("GROQ_API_KEY", "GROQ_BASE_URL", "GROQ_MODEL"),
            deepseek: ProviderCredential::from_env(
                "DEEPSEEK_API_KEY",
                "DEEPSEEK_BASE_URL",
                "DEEPSEEK_MODEL",
            ),
            local: ProviderCredential::from_env(
                "LOCAL_LLM_API_KEY",
                "LOCAL_LLM_BASE_URL",
                "LOCAL_LLM_MODEL",
            ),
            gemini: ProviderCredential::from_env(
                "GEMINI_API_KEY",
                "GEMINI_BASE_URL",
                "GEMINI_MODEL",
            ),
            openai: ProviderCredential::from_env(
                "OPENAI_API_KEY",
                "OPENAI_BASE_URL",
                "OPENAI_MODEL",
            ),
            mistral: ProviderCredential::from_env(
                "MISTRAL_API_KEY",
                "MISTRAL_BASE_URL",
                "MISTRAL_MODEL",
            ),
        }
    }
}

/// All recognized hyperparameters and tunables (spec §6 Configuration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: std::path::PathBuf,

    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens_user_turn: u32,
    pub max_tokens_supportbot_turn: u32,

    pub min_turns: usize,
    pub max_turns: usize,

    pub few_shot_examples: usize,
    pub quality_threshold: f64,
    pub discard_rate: f64,
    pub quality_improve_on_fail: bool,

    pub max_retries: u32,
    pub timeout_seconds: u64,

    pub prompt_max_words: usize,
    pub prompt_instruction_words: usize,
    pub prompt_last_k_turns: usize,

    pub domains: Vec<String>,
    pub bertscore_model: String,
    pub bertscore_fallback_model: String,

    #[serde(default)]
    pub credentials: ProviderCredentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: std::path::PathBuf::from("data"),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens_user_turn: 100,
            max_tokens_supportbot_turn: 100,
            min_turns: 7,
            max_turns: 15,
            few_shot_examples: 1,
            quality_threshold: 0.7,
            discard_rate: 0.1,
            quality_improve_on_fail: true,
            max_retries: 3,
            timeout_seconds: 30,
            prompt_max_words: 800,
            prompt_instruction_words: 200,
            prompt_last_k_turns: 6,
            domains: vec![
                "hotel".into(),
                "restaurant".into(),
                "taxi".into(),
                "train".into(),
                "attraction".into(),
            ],
            bertscore_model: "microsoft/deberta-xlarge-mnli".into(),
            bertscore_fallback_model: "bert-base-uncased".into(),
            credentials: ProviderCredentials::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file if present, then apply environment overrides
    /// for credentials (secrets are never stored in the file).
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)?;
                toml::from_str(&text)
                    .map_err(|e| Error::ConfigError(format!("invalid config file: {e}")))?
            }
            _ => Config::default(),
        };
        cfg.credentials = ProviderCredentials::from_env();
        cfg.validate()?;
        Ok(cfg)
    }

    /// At least one provider must be configured; temperature/top_p must be
    /// in-range. Fatal at startup per §7 ConfigError policy.
    pub fn validate(&self) -> Result<()> {
        let any_configured = [
            &self.credentials.openrouter,
            &self.credentials.groq,
            &self.credentials.deepseek,
            &self.credentials.local,
            &self.credentials.gemini,
            &self.credentials.openai,
            &self.credentials.mistral,
        ]
        .iter()
        .any(|c| c.is_configured());

        if !any_configured {
            return Err(Error::ConfigError(
                "no LLM provider credentials configured".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::ConfigError(format!(
                "temperature {} out of range [0, 2]",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(Error::ConfigError(format!(
                "top_p {} out of range [0, 1]",
                self.top_p
            )));
        }
        if self.min_turns > self.max_turns {
            return Err(Error::ConfigError(
                "min_turns must be <= max_turns".into(),
            ));
        }
        Ok(())
    }
}

/// Per-run overrides accepted by `RunPipeline` (spec §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_judge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub few_shot_examples: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_improve_on_fail: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_fails_validation_without_credentials() {
        let cfg = Config::default();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn valid_with_one_provider() {
        let mut cfg = Config::default();
        cfg.credentials.openai.api_key = Some("sk-test".into());
        assert!(cfg.validate().is_ok());
    }
}
