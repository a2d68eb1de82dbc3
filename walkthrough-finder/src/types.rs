use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use interfaces::defs::{
    AnalysisRequest, AnalysisResult, FlatAnalysis, MediaType, MissionAnalysis, MissionInfo,
    MissionKind, Phase, RankedResultSet, RequestAttempt, VideoResult, UNKNOWN_GAME,
};

/// Upper bound on queries handed to the search aggregator.
pub const MAX_QUERIES: usize = 5;

/// Default number of walkthroughs kept after merging.
pub const DEFAULT_RESULT_CAP: usize = 5;

/// Which JSON shape the vision service is asked for and parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSchema {
    /// `{gameName, mission, summary, tips, searchQueries}`
    Mission,
    /// `{gameName, context, suggestions, searchQueries}`
    #[default]
    Flat,
    /// Flat prompt; parse as mission when the reply carries a `mission` key.
    Auto,
}

impl FromStr for ResponseSchema {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mission" | "v1" => Ok(Self::Mission),
            "flat" | "v2" => Ok(Self::Flat),
            "auto" => Ok(Self::Auto),
            other => Err(FinderError::Config(format!(
                "unknown response schema '{}', expected mission, flat or auto",
                other
            ))),
        }
    }
}

impl fmt::Display for ResponseSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mission => "mission",
            Self::Flat => "flat",
            Self::Auto => "auto",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub schema: ResponseSchema,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
            schema: ResponseSchema::default(),
            user_agent: "Walkthrough-Finder/1.0".to_string(),
            // Outer bound only; the controller's analyze timeout is shorter.
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub page_size: u32,
    pub result_cap: usize,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://www.googleapis.com".to_string(),
            page_size: 5,
            result_cap: DEFAULT_RESULT_CAP,
            user_agent: "Walkthrough-Finder/1.0".to_string(),
            timeout_seconds: 15,
            max_retries: 1,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub analyze_timeout: Duration,
    pub max_auto_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            analyze_timeout: Duration::from_secs(60),
            max_auto_retries: 2,
            retry_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_image_bytes: usize,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_image_bytes: 10 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Vision service authentication failed: {0}")]
    ServiceAuth(String),

    #[error("Rate limited by upstream service: {0}")]
    RateLimited(String),

    #[error("Malformed vision response: {0}")]
    MalformedResponse(String),

    #[error("Vision response did not include a game name")]
    AnalysisIncomplete,

    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("Analysis failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Upstream returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Submission was superseded by a newer one")]
    Cancelled,

    #[error("No failed submission to retry")]
    NothingToRetry,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FinderError {
    /// Whether the controller may re-run the analyze step after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork(_) | Self::Timeout(_))
    }

    /// Short, actionable text for end users. Never contains upstream detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "Please upload a PNG, JPG, GIF, or WebP image under 10MB.",
            Self::ServiceAuth(_) | Self::Config(_) => {
                "AI service configuration error. Please contact support."
            }
            Self::RateLimited(_) => "Too many requests. Please try again in a moment.",
            Self::MalformedResponse(_) | Self::AnalysisIncomplete => {
                "Could not identify the game from the screenshot. Please try a clearer image."
            }
            Self::TransientNetwork(_) | Self::Timeout(_) | Self::RetriesExhausted { .. } => {
                "The AI service is not responding. Please try again."
            }
            Self::Upstream { .. } | Self::SearchUnavailable(_) => {
                "Failed to analyze image with AI. Please try again."
            }
            Self::Cancelled => "This request was replaced by a newer upload.",
            Self::NothingToRetry => "There is no failed upload to retry.",
        }
    }
}

// Transport failures are classified here so `?` on reqwest calls lands in the
// right retry bucket.
impl From<reqwest::Error> for FinderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            return FinderError::TransientNetwork(err.to_string());
        }
        if err.is_decode() {
            return FinderError::MalformedResponse(err.to_string());
        }
        match err.status() {
            Some(status) => FinderError::Upstream {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => FinderError::TransientNetwork(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinderError>;
