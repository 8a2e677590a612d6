use anyhow::{Context, Result};

pub const DEFAULT_PROVIDER_API_URL: &str = "https://api.mistral.ai/v1/chat/completions";
pub const DEFAULT_PROVIDER_MODEL: &str = "mistral-7b-instruct";

/// Application configuration loaded from environment variables.
///
/// The provider credential is optional at startup: a missing key only fails the
/// requests that need it, never the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

/// Everything the completion adapter needs to reach the LLM provider.
/// Injected into `ResumeOptimizer::new`, never looked up from the environment there.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_PROVIDER_API_URL.to_string(),
            model: DEFAULT_PROVIDER_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            provider: ProviderConfig {
                api_key: optional_env("MISTRAL_API_KEY"),
                api_url: optional_env("PROVIDER_API_URL")
                    .unwrap_or_else(|| DEFAULT_PROVIDER_API_URL.to_string()),
                model: optional_env("PROVIDER_MODEL")
                    .unwrap_or_else(|| DEFAULT_PROVIDER_MODEL.to_string()),
                timeout_secs: parse_env("PROVIDER_TIMEOUT_SECS", 120)?,
            },
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Returns the variable's value, treating an empty or whitespace-only value as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
