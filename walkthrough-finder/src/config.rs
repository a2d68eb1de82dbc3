//! Process configuration, read once at startup.
//!
//! Supported env vars:
//! - `ANTHROPIC_API_KEY`: vision service credential (analysis fails without it)
//! - `VISION_ENDPOINT`, `VISION_MODEL`, `VISION_MAX_TOKENS`
//! - `VISION_SCHEMA`: "mission", "flat" (default) or "auto"
//! - `YOUTUBE_API_KEY`: search credential (walkthroughs are skipped without it)
//! - `SEARCH_ENDPOINT`, `SEARCH_RESULT_CAP`, `SEARCH_TIMEOUT_SECS`
//! - `ANALYZE_TIMEOUT_SECS`, `MAX_AUTO_RETRIES`, `RETRY_DELAY_MS`
//! - `HOST`, `PORT`, `CORS_ORIGINS` (comma separated)

use crate::types::{
    FinderError, ResponseSchema, Result, RetryPolicy, SearchConfig, ServerConfig, VisionConfig,
};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct FinderConfig {
    pub vision: VisionConfig,
    pub search: SearchConfig,
    pub retry: RetryPolicy,
    pub server: ServerConfig,
}

impl FinderConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        config.vision.api_key = get("ANTHROPIC_API_KEY");
        if let Some(endpoint) = get("VISION_ENDPOINT") {
            config.vision.endpoint = endpoint;
        }
        if let Some(model) = get("VISION_MODEL") {
            config.vision.model = model;
        }
        if let Some(val) = get("VISION_MAX_TOKENS") {
            config.vision.max_tokens = parse("VISION_MAX_TOKENS", &val)?;
        }
        if let Some(val) = get("VISION_SCHEMA") {
            config.vision.schema = ResponseSchema::from_str(&val)?;
        }

        config.search.api_key = get("YOUTUBE_API_KEY");
        if let Some(endpoint) = get("SEARCH_ENDPOINT") {
            config.search.endpoint = endpoint;
        }
        if let Some(val) = get("SEARCH_RESULT_CAP") {
            config.search.result_cap = parse("SEARCH_RESULT_CAP", &val)?;
        }
        if let Some(val) = get("SEARCH_TIMEOUT_SECS") {
            config.search.timeout_seconds = parse("SEARCH_TIMEOUT_SECS", &val)?;
        }

        if let Some(val) = get("ANALYZE_TIMEOUT_SECS") {
            config.retry.analyze_timeout = Duration::from_secs(parse("ANALYZE_TIMEOUT_SECS", &val)?);
        }
        if let Some(val) = get("MAX_AUTO_RETRIES") {
            config.retry.max_auto_retries = parse("MAX_AUTO_RETRIES", &val)?;
        }
        if let Some(val) = get("RETRY_DELAY_MS") {
            config.retry.retry_delay = Duration::from_millis(parse("RETRY_DELAY_MS", &val)?);
        }

        if let Some(host) = get("HOST") {
            config.server.host = host;
        }
        if let Some(val) = get("PORT") {
            config.server.port = parse("PORT", &val)?;
        }
        if let Some(val) = get("CORS_ORIGINS") {
            config.server.cors_origins = val
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| FinderError::Config(format!("{} has an invalid value: '{}'", key, value)))
}
