use crate::prompts::analysis_prompt;
use crate::types::{
    AnalysisRequest, AnalysisResult, FinderError, FlatAnalysis, MissionAnalysis, ResponseSchema,
    Result, VisionConfig,
};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Turns a screenshot into a structured analysis.
///
/// Implementations make exactly one outbound call per `analyze` and keep no
/// state between calls. Retrying is the caller's business.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    fn analyzer_name(&self) -> String;

    fn is_configured(&self) -> bool {
        true
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RequestBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Vision client speaking the Anthropic Messages API.
pub struct ClaudeVisionClient {
    client: Client,
    config: VisionConfig,
}

impl ClaudeVisionClient {
    pub fn new(config: VisionConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .map_err(|e| FinderError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.endpoint.trim_end_matches('/'))
    }

    async fn classify_failure(status: StatusCode, response: reqwest::Response) -> FinderError {
        let raw = response.text().await.unwrap_or_default();
        let (kind, message) = match serde_json::from_str::<ErrorEnvelope>(&raw) {
            Ok(envelope) => (envelope.error.kind, envelope.error.message),
            Err(_) => (String::new(), raw.chars().take(200).collect()),
        };

        match (status, kind.as_str()) {
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _)
            | (_, "authentication_error" | "permission_error") => FinderError::ServiceAuth(message),
            (StatusCode::TOO_MANY_REQUESTS, _) | (_, "rate_limit_error") => {
                FinderError::RateLimited(message)
            }
            (_, "overloaded_error") => FinderError::TransientNetwork(message),
            (s, _) if s.is_server_error() => {
                FinderError::TransientNetwork(format!("HTTP {}: {}", s.as_u16(), message))
            }
            (s, _) => FinderError::Upstream {
                status: s.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl VisionAnalyzer for ClaudeVisionClient {
    fn analyzer_name(&self) -> String {
        format!("Claude ({})", self.config.model)
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            FinderError::ServiceAuth("vision API key is not configured".to_string())
        })?;

        let start_time = Instant::now();
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![
                    RequestBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: request.media_type.as_str(),
                            data: base64::engine::general_purpose::STANDARD.encode(&request.image),
                        },
                    },
                    RequestBlock::Text {
                        text: analysis_prompt(self.config.schema),
                    },
                ],
            }],
        };

        debug!(
            "Sending {} byte {} screenshot to {}",
            request.image.len(),
            request.media_type,
            self.config.model
        );

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error = Self::classify_failure(status, response).await;
            warn!("Vision request failed with HTTP {}: {}", status.as_u16(), error);
            return Err(error);
        }

        let reply: MessagesResponse = response.json().await.map_err(|e| {
            FinderError::MalformedResponse(format!("unreadable response body: {}", e))
        })?;

        let text = reply
            .content
            .into_iter()
            .find_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .ok_or_else(|| FinderError::MalformedResponse("no text block in response".to_string()))?;

        let result = parse_analysis(&text, self.config.schema)?;
        info!(
            "Identified '{}' in {}ms ({} search queries)",
            result.game_name(),
            start_time.elapsed().as_millis(),
            result.search_queries().len()
        );
        Ok(result)
    }
}

/// Slice from the first `{` to the last `}`; the model sometimes wraps its
/// JSON in prose or code fences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse the model's reply text into an [`AnalysisResult`] of the requested shape.
pub fn parse_analysis(text: &str, schema: ResponseSchema) -> Result<AnalysisResult> {
    let json = extract_json_object(text)
        .ok_or_else(|| FinderError::MalformedResponse("no JSON object in response".to_string()))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| FinderError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(FinderError::MalformedResponse("response is not a JSON object".to_string()));
    }

    let has_game_name = value
        .get("gameName")
        .and_then(Value::as_str)
        .map(|name| !name.trim().is_empty())
        .unwrap_or(false);
    if !has_game_name {
        return Err(FinderError::AnalysisIncomplete);
    }

    let schema = match schema {
        ResponseSchema::Auto if value.get("mission").is_some() => ResponseSchema::Mission,
        ResponseSchema::Auto => ResponseSchema::Flat,
        explicit => explicit,
    };

    let result = match schema {
        ResponseSchema::Mission => serde_json::from_value::<MissionAnalysis>(value)
            .map(AnalysisResult::Mission),
        _ => serde_json::from_value::<FlatAnalysis>(value).map(AnalysisResult::Flat),
    };

    result.map_err(|e| {
        FinderError::MalformedResponse(format!("response does not match {} schema: {}", schema, e))
    })
}
