use anyhow::{Context, Result};

use std::time::Duration;

/// Default cap on an uploaded CV file, in bytes.
const DEFAULT_MAX_CV_BYTES: usize = 256 * 1024;
/// Default time a session may sit untouched before it is swept.
const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 3600;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Upper bound for `POST /api/v1/sessions/:id/cv` bodies.
    pub max_cv_bytes: usize,
    /// Sessions idle this long (and not pending) are removed.
    pub session_idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_cv_bytes: match std::env::var("MAX_CV_BYTES") {
                Ok(raw) => raw
                    .parse::<usize>()
                    .context("MAX_CV_BYTES must be a positive integer")?,
                Err(_) => DEFAULT_MAX_CV_BYTES,
            },
            session_idle_ttl: Duration::from_secs(match std::env::var("SESSION_IDLE_TTL_SECS") {
                Ok(raw) => match raw.parse::<u64>() {
                    Ok(secs) if secs > 0 => secs,
                    _ => anyhow::bail!("SESSION_IDLE_TTL_SECS must be a positive integer"),
                },
                Err(_) => DEFAULT_SESSION_IDLE_TTL_SECS,
            }),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
