use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::controller::{log_progress, PipelineOutcome};
use crate::types::{AnalysisRequest, AnalysisResult, FinderError, MediaType, MissionInfo, VideoResult};
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    vision_configured: bool,
    search_configured: bool,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        vision_configured: state.analyzer.is_configured(),
        search_configured: state.aggregator.is_configured(),
    })
}

/// Body of a JSON upload: base64 data (optionally a `data:` URL) plus its type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base64Upload {
    pub image: String,
    #[serde(default)]
    pub media_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnalysisDetails {
    Mission {
        #[serde(skip_serializing_if = "Option::is_none")]
        mission: Option<MissionInfo>,
        summary: String,
        tips: Vec<String>,
    },
    Flat {
        context: String,
        suggestions: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub game_name: String,
    #[serde(flatten)]
    pub details: AnalysisDetails,
    pub search_queries: Vec<String>,
    pub walkthrough: Option<VideoResult>,
    pub walkthroughs: Vec<VideoResult>,
    pub retry_count: u32,
}

impl From<PipelineOutcome> for AnalyzeResponse {
    fn from(outcome: PipelineOutcome) -> Self {
        let (game_name, details) = match outcome.analysis {
            AnalysisResult::Mission(a) => (
                a.game_name,
                AnalysisDetails::Mission {
                    mission: a.mission,
                    summary: a.summary,
                    tips: a.tips,
                },
            ),
            AnalysisResult::Flat(a) => (
                a.game_name,
                AnalysisDetails::Flat {
                    context: a.context,
                    suggestions: a.suggestions,
                },
            ),
        };
        let walkthroughs = outcome.walkthroughs.into_vec();

        Self {
            success: true,
            game_name,
            details,
            search_queries: outcome.queries,
            walkthrough: walkthroughs.first().cloned(),
            walkthroughs,
            retry_count: outcome.retry_count,
        }
    }
}

/// POST /api/analyze
///
/// Accepts either `multipart/form-data` with an `image` file field or a JSON
/// [`Base64Upload`], runs the full pipeline and returns the analysis with
/// its walkthroughs.
pub async fn analyze(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Json<AnalyzeResponse>> {
    let upload = read_upload(&state, request).await?;
    debug!("Accepted {} byte {} upload", upload.image.len(), upload.media_type);

    // Each HTTP request is its own submission; dropping the handler future
    // (client went away) cancels it.
    let controller = state.controller();
    let outcome = controller.submit(upload, &log_progress).await?;

    Ok(Json(AnalyzeResponse::from(outcome)))
}

async fn read_upload(state: &AppState, request: Request) -> ApiResult<AnalysisRequest> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?
        {
            if field.name() != Some("image") {
                continue;
            }

            let declared = field
                .content_type()
                .map(str::to_string)
                .or_else(|| {
                    field
                        .file_name()
                        .and_then(|name| name.rsplit_once('.'))
                        .and_then(|(_, ext)| MediaType::from_extension(ext))
                        .map(|media_type| media_type.as_str().to_string())
                })
                .unwrap_or_default();

            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;

            return Ok(validate_upload(data.to_vec(), &declared, state.max_image_bytes)?);
        }

        return Err(FinderError::InvalidInput("No image provided".to_string()).into());
    }

    if content_type.starts_with("application/json") {
        let Json(payload) = Json::<Base64Upload>::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        return Ok(decode_base64_upload(payload, state.max_image_bytes)?);
    }

    Err(FinderError::InvalidInput(
        "Expected a multipart/form-data or application/json upload".to_string(),
    )
    .into())
}

/// Decode a JSON upload. A `data:<type>;base64,` prefix supplies the media
/// type when `mediaType` is absent.
pub fn decode_base64_upload(
    payload: Base64Upload,
    max_image_bytes: usize,
) -> Result<AnalysisRequest, FinderError> {
    let (prefix_type, encoded) = match payload.image.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest.split_once(',').ok_or_else(|| {
                FinderError::InvalidInput("Malformed data URL".to_string())
            })?;
            let media_type = header.strip_suffix(";base64").unwrap_or(header);
            (Some(media_type.to_string()), data)
        }
        None => (None, payload.image.as_str()),
    };

    let declared = payload.media_type.or(prefix_type).unwrap_or_default();
    if encoded.trim().is_empty() {
        return Err(FinderError::InvalidInput("No image provided".to_string()));
    }

    let image = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| FinderError::InvalidInput("Image is not valid base64".to_string()))?;

    validate_upload(image, &declared, max_image_bytes)
}

/// Enforce presence, the media type allow-list and the size limit.
pub fn validate_upload(
    image: Vec<u8>,
    declared_type: &str,
    max_image_bytes: usize,
) -> Result<AnalysisRequest, FinderError> {
    if image.is_empty() {
        return Err(FinderError::InvalidInput("No image provided".to_string()));
    }

    let media_type = MediaType::from_str(declared_type).map_err(|_| {
        FinderError::InvalidInput(
            "Invalid image type. Please upload a PNG, JPG, GIF, or WebP image.".to_string(),
        )
    })?;

    if image.len() > max_image_bytes {
        return Err(FinderError::InvalidInput(format!(
            "Image size exceeds {}MB limit",
            max_image_bytes / (1024 * 1024)
        )));
    }

    Ok(AnalysisRequest::new(image, media_type))
}
