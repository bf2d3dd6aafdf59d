use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-2024-05-13";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
}

impl Provider {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            other => Err(Error::Config(format!(
                "Unknown classifier provider '{}' (expected openai or anthropic)",
                other
            ))),
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => DEFAULT_OPENAI_MODEL,
            Provider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }

    fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub concurrency_limit: usize,
    pub cache_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let provider = env::var("CLASSIFIER_PROVIDER")
            .ok()
            .map(|v| Provider::parse(&v))
            .transpose()?
            .unwrap_or(Provider::OpenAI);

        let api_key = env::var(provider.api_key_var()).map_err(|_| {
            Error::Config(format!(
                "{} environment variable not set",
                provider.api_key_var()
            ))
        })?;

        let model = env::var("CLASSIFIER_MODEL")
            .unwrap_or_else(|_| provider.default_model().to_string());

        let base_url = env::var("CLASSIFIER_BASE_URL")
            .unwrap_or_else(|_| provider.default_base_url().to_string());

        let max_tokens = env::var("CLASSIFIER_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        let timeout_secs = env::var("CLASSIFIER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        let concurrency_limit = env::var("CONCURRENCY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let cache_path = env::var("CACHE_PATH").ok().filter(|v| !v.is_empty());

        Ok(Self {
            provider,
            api_key,
            model,
            base_url,
            max_tokens,
            timeout_secs,
            concurrency_limit,
            cache_path,
        })
    }
}

/// Everything a classification client needs to talk to its endpoint.
/// Built once and handed to the client constructor; never read from the
/// environment afterwards.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    pub json_mode: bool,
}

impl ClassifierConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            max_tokens: 1000,
            temperature: 0.0,
            timeout: Duration::from_secs(120),
            json_mode: true,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl From<&Config> for ClassifierConfig {
    fn from(config: &Config) -> Self {
        Self {
            provider: config.provider,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            temperature: 0.0,
            timeout: Duration::from_secs(config.timeout_secs),
            json_mode: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of module units in flight. `0` means unbounded.
    pub concurrency_limit: usize,
    pub show_progress: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            show_progress: false,
        }
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            concurrency_limit: config.concurrency_limit,
            show_progress: true,
        }
    }
}
