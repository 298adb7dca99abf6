use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

use crate::services::prompt::{DEFAULT_TEMPLATE, missing_placeholders};

/// The longest session lifetime accepted, in days.
const MAX_SESSION_DURATION_DAYS: i64 = 365;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// The API key of the AI service.
    pub gemini_api_key: Zeroizing<String>,
    /// The model used to generate itineraries.
    pub gemini_model: String,
    /// The base URL of the AI service.
    pub gemini_base_url: String,
    /// How long to wait for the AI service.
    pub ai_timeout: Duration,
    /// The identity provider's userinfo endpoint.
    pub identity_userinfo_url: String,
    /// How long to wait for the identity provider.
    pub identity_timeout: Duration,
    /// Optional file overriding the built-in prompt template.
    pub prompt_template_path: Option<PathBuf>,
    /// The address the server listens on.
    pub bind_addr: SocketAddr,
    /// The origins allowed to call the API.
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `Config` from an arbitrary key lookup.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the value of a key, if set.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .context("GEMINI_API_KEY must be set")?;

        let session_duration_days: i64 = var("SESSION_DURATION_DAYS", "7")
            .parse()
            .context("Invalid SESSION_DURATION_DAYS")?;
        if !(1..=MAX_SESSION_DURATION_DAYS).contains(&session_duration_days) {
            anyhow::bail!(
                "SESSION_DURATION_DAYS must be between 1 and {}",
                MAX_SESSION_DURATION_DAYS
            );
        }

        let ai_timeout_secs: u64 = var("AI_TIMEOUT_SECS", "60")
            .parse()
            .context("Invalid AI_TIMEOUT_SECS")?;
        let identity_timeout_secs: u64 = var("IDENTITY_TIMEOUT_SECS", "10")
            .parse()
            .context("Invalid IDENTITY_TIMEOUT_SECS")?;

        let allowed_origins = var("ALLOWED_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: var("REDIS_URL", "redis://127.0.0.1:6379"),
            session_duration_days,
            gemini_api_key: Zeroizing::new(gemini_api_key),
            gemini_model: var("GEMINI_MODEL", "gemini-1.5-flash"),
            gemini_base_url: var("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com"),
            ai_timeout: Duration::from_secs(ai_timeout_secs),
            identity_userinfo_url: var(
                "IDENTITY_USERINFO_URL",
                "https://www.googleapis.com/oauth2/v1/userinfo",
            ),
            identity_timeout: Duration::from_secs(identity_timeout_secs),
            prompt_template_path: lookup("PROMPT_TEMPLATE_PATH").map(PathBuf::from),
            bind_addr: var("BIND_ADDR", "127.0.0.1:3000")
                .parse()
                .context("Invalid BIND_ADDR")?,
            allowed_origins,
        })
    }

    /// Loads the prompt template, falling back to the built-in one.
    ///
    /// # Returns
    ///
    /// A `Result` containing the template text.
    pub fn load_prompt_template(&self) -> Result<String> {
        let Some(path) = &self.prompt_template_path else {
            return Ok(DEFAULT_TEMPLATE.to_string());
        };

        let template = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read PROMPT_TEMPLATE_PATH {}", path.display()))?;

        let missing = missing_placeholders(&template);
        if !missing.is_empty() {
            tracing::warn!("⚠️ Prompt template {} never mentions {:?}", path.display(), missing);
        }

        Ok(template)
    }
}
