//! Environment-driven configuration.

use std::env;

use crate::supply::AiSupplyConfig;

pub const DEFAULT_DB_URL: &str = "sqlite:concurso.sqlite3";

/// Settings read from the process environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub db_url: String,
    pub ai: Option<AiSupplyConfig>,
}

impl ServicesConfig {
    /// Load `.env` if present, then read `CONCURSO_DB_URL` and the AI settings.
    #[must_use]
    pub fn from_env() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "failed to read .env");
            }
        }

        let db_url = env::var("CONCURSO_DB_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_URL.to_string());

        Self {
            db_url,
            ai: AiSupplyConfig::from_env(),
        }
    }
}
