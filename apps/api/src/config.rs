use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::RetryPolicy;

const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-small-en-v1.5";
const DEFAULT_SUMMARY_MODEL: &str = "Qwen/Qwen3-Coder-30B-A3B-Instruct:fireworks-ai";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,

    pub embedding_api_base: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,

    pub summary_api_base: String,
    pub summary_api_key: String,
    pub summary_model: String,

    /// Per HTTP request to either provider.
    pub provider_timeout: Duration,
    /// Whole summary call, retries included.
    pub summary_timeout: Duration,
    pub provider_max_attempts: u32,
    pub provider_retry_base: Duration,
    pub provider_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let allowed_origins = or_default("ALLOWED_ORIGINS", "http://localhost:8501")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        Ok(Config {
            host: or_default("BACKEND_HOST", "localhost"),
            port: parse_or(&lookup, "BACKEND_PORT", 8000)?,
            rust_log: or_default("RUST_LOG", "info"),
            allowed_origins,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,

            embedding_api_base: or_default("EMBEDDING_API_BASE", "http://localhost:8080/v1"),
            embedding_api_key: lookup("EMBEDDING_API_KEY").filter(|k| !k.trim().is_empty()),
            embedding_model: or_default("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),

            summary_api_base: require("HUGGING_FACE_API_BASE")?,
            summary_api_key: require("HF_API_KEY")?,
            summary_model: or_default("SUMMARY_MODEL", DEFAULT_SUMMARY_MODEL),

            provider_timeout: Duration::from_secs(parse_or(&lookup, "PROVIDER_TIMEOUT_SECS", 60)?),
            summary_timeout: Duration::from_secs(parse_or(&lookup, "SUMMARY_TIMEOUT_SECS", 120)?),
            provider_max_attempts: parse_or(&lookup, "PROVIDER_MAX_ATTEMPTS", 3u32)?.max(1),
            provider_retry_base: Duration::from_millis(parse_or(
                &lookup,
                "PROVIDER_RETRY_BASE_MS",
                1000,
            )?),
            provider_concurrency: parse_or(&lookup, "PROVIDER_CONCURRENCY", 4usize)?.max(1),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.provider_max_attempts,
            base_delay: self.provider_retry_base,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
