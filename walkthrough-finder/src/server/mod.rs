//! HTTP entrypoint consumed by the web front end.

pub mod error;
pub mod handlers;

use crate::aggregator::SearchAggregator;
use crate::analysis::{ClaudeVisionClient, VisionAnalyzer};
use crate::config::FinderConfig;
use crate::controller::PipelineController;
use crate::search::YouTubeSearchClient;
use crate::types::{Result, RetryPolicy};
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared handler state. Cheap to clone; everything inside is read-only
/// after startup.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<dyn VisionAnalyzer>,
    pub aggregator: Arc<SearchAggregator>,
    pub policy: RetryPolicy,
    pub max_image_bytes: usize,
}

impl AppState {
    pub fn new(
        analyzer: Arc<dyn VisionAnalyzer>,
        aggregator: Arc<SearchAggregator>,
        policy: RetryPolicy,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            analyzer,
            aggregator,
            policy,
            max_image_bytes,
        }
    }

    /// Wire the production vision and search clients from configuration.
    pub fn from_config(config: &FinderConfig) -> Result<Self> {
        let analyzer = ClaudeVisionClient::new(config.vision.clone())?;
        let search = YouTubeSearchClient::new(config.search.clone())?;
        let aggregator = SearchAggregator::new(Arc::new(search)).with_cap(config.search.result_cap);

        if !analyzer.is_configured() {
            warn!("ANTHROPIC_API_KEY is not set; every analysis will fail");
        }
        if !aggregator.is_configured() {
            warn!("YOUTUBE_API_KEY is not set; walkthrough search is disabled");
        }

        Ok(Self::new(
            Arc::new(analyzer),
            Arc::new(aggregator),
            config.retry.clone(),
            config.server.max_image_bytes,
        ))
    }

    pub fn controller(&self) -> PipelineController {
        PipelineController::new(self.analyzer.clone(), self.aggregator.clone(), self.policy.clone())
    }
}

pub fn router(state: AppState) -> Router {
    // Base64 bodies are a third larger than the image they carry.
    let body_limit = state.max_image_bytes * 2;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/analyze", post(handlers::analyze))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured front-end origins; `None` when none are set.
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE]),
    )
}
